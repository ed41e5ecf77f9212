//! The failure pipeline: durable bounded error log + advisory callback.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use papermill_batch::BatchTracker;
use papermill_cache::keys;
use papermill_core::config::queue::QueueConfig;
use papermill_core::result::AppResult;
use papermill_core::traits::cache::CacheProvider;

use crate::notifier::{FailureNote, OwnerNotifier};

/// One entry in the bounded error log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    /// Job type that failed.
    pub job_kind: String,
    /// Document the job was processing.
    pub document_number: String,
    /// Failure message.
    pub error: String,
    /// Recipient for notification jobs.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub recipient: Option<String>,
    /// When the failure was recorded.
    pub timestamp: DateTime<Utc>,
    /// Batch the job belonged to, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub batch_id: Option<String>,
}

/// Records job failures and notifies the owning system.
#[derive(Debug, Clone)]
pub struct FailurePipeline {
    store: Arc<dyn CacheProvider>,
    batches: BatchTracker,
    notifier: Arc<dyn OwnerNotifier>,
    max_entries: usize,
    ttl: Duration,
}

impl FailurePipeline {
    /// Create a pipeline over the given store and notifier.
    pub fn new(
        store: Arc<dyn CacheProvider>,
        batches: BatchTracker,
        notifier: Arc<dyn OwnerNotifier>,
        config: &QueueConfig,
    ) -> Self {
        Self {
            store,
            batches,
            notifier,
            max_entries: config.error_log_max_entries,
            ttl: Duration::from_secs(config.error_log_ttl_seconds),
        }
    }

    /// Record one job failure.
    ///
    /// The log append is the durable part and its result is what this
    /// method returns. The owner callback that follows is best-effort:
    /// any failure there (network, timeout, non-2xx) is logged locally
    /// and swallowed, and is never retried.
    pub async fn record_failure(
        &self,
        tenant_id: &str,
        job_kind: &str,
        document_number: &str,
        error: &str,
        batch_id: Option<&str>,
        recipient: Option<&str>,
    ) -> AppResult<()> {
        let record = ErrorRecord {
            job_kind: job_kind.to_string(),
            document_number: document_number.to_string(),
            error: error.to_string(),
            recipient: recipient.map(str::to_string),
            timestamp: Utc::now(),
            batch_id: batch_id.map(str::to_string),
        };

        let key = keys::errors(tenant_id, batch_id);
        let json = serde_json::to_string(&record)?;
        self.store.list_push_front(&key, &json).await?;
        self.store
            .list_trim(&key, 0, self.max_entries as i64 - 1)
            .await?;
        self.store.expire(&key, self.ttl).await?;

        debug!(
            tenant_id,
            job_kind, document_number, "Recorded job failure"
        );

        self.notify_owner(tenant_id, record).await;
        Ok(())
    }

    /// Read the most recent errors for a tenant, scoped to a batch when
    /// one is given and the shared individual log otherwise.
    pub async fn recent_errors(
        &self,
        tenant_id: &str,
        batch_id: Option<&str>,
        limit: usize,
    ) -> AppResult<Vec<ErrorRecord>> {
        let key = keys::errors(tenant_id, batch_id);
        let raw = self.store.list_range(&key, 0, limit as i64 - 1).await?;

        // Tolerate unparsable entries from older deployments.
        Ok(raw
            .iter()
            .filter_map(|entry| serde_json::from_str(entry).ok())
            .collect())
    }

    /// Best-effort owner notification. Never propagates failure.
    async fn notify_owner(&self, tenant_id: &str, record: ErrorRecord) {
        let meta = match &record.batch_id {
            Some(batch_id) => match self.batches.meta(tenant_id, batch_id).await {
                Ok(meta) => meta.unwrap_or_default(),
                Err(e) => {
                    warn!(error = %e, "Failed to load batch metadata for owner callback");
                    Default::default()
                }
            },
            None => Default::default(),
        };

        let note = FailureNote {
            tenant_id: tenant_id.to_string(),
            job_kind: record.job_kind,
            document_number: record.document_number,
            error: record.error,
            batch_id: record.batch_id,
            recipient: record.recipient,
            meta,
        };

        if let Err(e) = self.notifier.notify(&note).await {
            warn!(
                tenant_id,
                error = %e,
                "Owner notification failed; continuing"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use papermill_cache::memory::MemoryCacheProvider;
    use papermill_core::config::cache::MemoryCacheConfig;
    use papermill_core::error::AppError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct FailingNotifier {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl OwnerNotifier for FailingNotifier {
        async fn notify(&self, _note: &FailureNote) -> AppResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::notification("callback unreachable"))
        }
    }

    fn make_pipeline(notifier: Arc<dyn OwnerNotifier>) -> FailurePipeline {
        let store: Arc<dyn CacheProvider> = Arc::new(MemoryCacheProvider::new(
            &MemoryCacheConfig {
                max_capacity: 1000,
                time_to_live_seconds: 600,
            },
            600,
        ));
        FailurePipeline::new(
            Arc::clone(&store),
            BatchTracker::new(store),
            notifier,
            &QueueConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_callback_failure_is_swallowed() {
        let notifier = Arc::new(FailingNotifier::default());
        let pipeline = make_pipeline(Arc::clone(&notifier) as Arc<dyn OwnerNotifier>);

        pipeline
            .record_failure("t1", "render-document", "INV-1", "boom", Some("b1"), None)
            .await
            .unwrap();

        assert_eq!(notifier.calls.load(Ordering::SeqCst), 1);
        let errors = pipeline.recent_errors("t1", Some("b1"), 50).await.unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].document_number, "INV-1");
    }

    #[tokio::test]
    async fn test_log_is_bounded_and_most_recent_first() {
        let pipeline = make_pipeline(Arc::new(FailingNotifier::default()));

        for i in 0..105 {
            pipeline
                .record_failure(
                    "t1",
                    "render-document",
                    &format!("INV-{i}"),
                    "boom",
                    Some("b1"),
                    None,
                )
                .await
                .unwrap();
        }

        let errors = pipeline.recent_errors("t1", Some("b1"), 200).await.unwrap();
        assert_eq!(errors.len(), 100);
        assert_eq!(errors[0].document_number, "INV-104");
        assert_eq!(errors[99].document_number, "INV-5");
    }

    #[tokio::test]
    async fn test_unbatched_failures_use_individual_scope() {
        let pipeline = make_pipeline(Arc::new(FailingNotifier::default()));

        pipeline
            .record_failure("t1", "send-notification", "INV-9", "no relay", None, Some("a@b.c"))
            .await
            .unwrap();

        let individual = pipeline.recent_errors("t1", None, 50).await.unwrap();
        assert_eq!(individual.len(), 1);
        assert_eq!(individual[0].recipient.as_deref(), Some("a@b.c"));

        let batched = pipeline.recent_errors("t1", Some("b1"), 50).await.unwrap();
        assert!(batched.is_empty());
    }
}
