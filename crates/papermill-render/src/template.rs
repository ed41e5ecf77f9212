//! Document-to-markup conversion seam.
//!
//! Turning a data record into markup is a pure function as far as the
//! orchestration core is concerned; deployments plug in their own
//! template engines per tenant branding.

use papermill_core::result::AppResult;
use papermill_core::types::DocumentRecord;

/// Converts a document record to renderable markup.
pub trait Templater: Send + Sync + std::fmt::Debug {
    /// Produce markup for the given record.
    fn markup(&self, document: &DocumentRecord) -> AppResult<String>;
}

/// Built-in templater producing a plain invoice-style HTML page.
#[derive(Debug, Default, Clone)]
pub struct BasicTemplater;

impl Templater for BasicTemplater {
    fn markup(&self, document: &DocumentRecord) -> AppResult<String> {
        let mut rows = String::new();
        if let Some(fields) = document.data.as_object() {
            for (name, value) in fields {
                rows.push_str(&format!(
                    "<tr><th>{}</th><td>{}</td></tr>\n",
                    escape(name),
                    escape(&value_text(value))
                ));
            }
        }

        Ok(format!(
            "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{number}</title></head>\n\
             <body>\n<h1>Document {number}</h1>\n<table>\n{rows}</table>\n</body>\n</html>\n",
            number = escape(&document.document_number),
            rows = rows,
        ))
    }
}

fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markup_contains_document_number() {
        let record = DocumentRecord::new(
            "INV-42",
            serde_json::json!({"client": "Acme & Co", "total": 10}),
        );
        let html = BasicTemplater.markup(&record).unwrap();
        assert!(html.contains("Document INV-42"));
        assert!(html.contains("Acme &amp; Co"));
    }
}
