//! Request DTOs.
//!
//! Fields the original callers send in camelCase. `document` stays
//! optional in the schema so a missing body field maps to a 400 with a
//! useful message instead of a bare deserialization rejection.

use serde::Deserialize;

use papermill_core::types::document::{DocumentRecord, RecipientData};

/// POST /generate-invoice-pdf
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePdfRequest {
    pub document: Option<DocumentRecord>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub batch_id: Option<String>,
    #[serde(default)]
    pub priority: i32,
}

/// POST /send-invoice-email
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailRequest {
    pub document: Option<DocumentRecord>,
    pub email_data: Option<RecipientData>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub batch_id: Option<String>,
}

/// One entry of a bulk email submission.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkEmailEntry {
    pub document: DocumentRecord,
    #[serde(default)]
    pub email_data: Option<RecipientData>,
}

/// POST /send-bulk-emails
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkEmailRequest {
    pub documents: Option<Vec<BulkEmailEntry>>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub batch_id: Option<String>,
}

/// POST /generate-bulk-pdfs
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkPdfRequest {
    pub documents: Option<Vec<DocumentRecord>>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub batch_id: Option<String>,
    #[serde(default)]
    pub priority: i32,
}

/// POST /queue/batch/start
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartBatchRequest {
    #[serde(default)]
    pub tenant_id: Option<String>,
    pub batch_id: Option<String>,
    pub total: Option<i64>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub unique_name: Option<String>,
}

/// Query string for GET /queue/errors
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorsQuery {
    #[serde(default = "default_error_limit")]
    pub limit: usize,
}

fn default_error_limit() -> usize {
    50
}
