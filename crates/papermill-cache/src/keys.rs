//! Key builders for all Papermill store entries.
//!
//! Centralising key construction prevents typos and makes it easy
//! to find every key the application uses.

/// Scope suffix for errors that did not belong to a batch.
pub const INDIVIDUAL_SCOPE: &str = "individual";

// ── Batch keys ─────────────────────────────────────────────

/// Hash key for a batch's progress counters and metadata.
pub fn batch(tenant_id: &str, batch_id: &str) -> String {
    format!("batch:{tenant_id}:{batch_id}")
}

// ── Error log keys ─────────────────────────────────────────

/// List key for a tenant's recent errors, scoped to a batch when one
/// was supplied and the shared `individual` scope otherwise.
pub fn errors(tenant_id: &str, batch_id: Option<&str>) -> String {
    format!(
        "errors:{tenant_id}:{}",
        batch_id.unwrap_or(INDIVIDUAL_SCOPE)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_key() {
        assert_eq!(batch("t1", "b1"), "batch:t1:b1");
    }

    #[test]
    fn test_errors_key_scoping() {
        assert_eq!(errors("t1", Some("b1")), "errors:t1:b1");
        assert_eq!(errors("t1", None), "errors:t1:individual");
    }
}
