//! Document and recipient payload types.
//!
//! The document body is opaque to the orchestration core: only the
//! document number is inspected (for artifact naming, logs, and error
//! records). Everything else passes through to the template layer.

use serde::{Deserialize, Serialize};

/// A document record submitted for rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Caller-supplied document identifier (e.g. an invoice number).
    pub document_number: String,
    /// Opaque document body consumed by the template layer.
    #[serde(flatten)]
    pub data: serde_json::Value,
}

impl DocumentRecord {
    /// Create a record from an identifier and an opaque body.
    pub fn new(document_number: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            document_number: document_number.into(),
            data,
        }
    }
}

/// Recipient and message data attached to a notification job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientData {
    /// Destination address. Validated at enqueue time; a notification
    /// job without one is rejected synchronously.
    #[serde(default)]
    pub to: Option<String>,
    /// Message subject. Defaults to `Invoice {document_number}`.
    #[serde(default)]
    pub subject: Option<String>,
    /// Recipient display name.
    #[serde(default)]
    pub client_name: Option<String>,
    /// Total amount shown in the message body.
    #[serde(default)]
    pub total_amount: Option<String>,
    /// Payment due date.
    #[serde(default)]
    pub due_date: Option<String>,
    /// Free-form message inserted into the body.
    #[serde(default)]
    pub custom_message: Option<String>,
    /// Sender company name.
    #[serde(default)]
    pub company_name: Option<String>,
}

impl RecipientData {
    /// The destination address, if present and non-empty.
    pub fn recipient(&self) -> Option<&str> {
        self.to.as_deref().filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_round_trip() {
        let json = serde_json::json!({
            "document_number": "INV-001",
            "client": "Acme",
            "total": 42.5,
        });
        let record: DocumentRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.document_number, "INV-001");
        assert_eq!(record.data["client"], "Acme");
    }

    #[test]
    fn test_empty_recipient_is_missing() {
        let data = RecipientData {
            to: Some(String::new()),
            ..Default::default()
        };
        assert!(data.recipient().is_none());
    }
}
