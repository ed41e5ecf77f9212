//! Best-effort owner callback.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use papermill_batch::BatchMeta;
use papermill_core::config::notifier::NotifierConfig;
use papermill_core::error::AppError;
use papermill_core::result::AppResult;

/// Payload delivered to the owning system when a job fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureNote {
    /// Owning tenant.
    pub tenant_id: String,
    /// Job type that failed.
    pub job_kind: String,
    /// Document the job was processing.
    pub document_number: String,
    /// Failure message.
    pub error: String,
    /// Batch the job belonged to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
    /// Recipient for notification jobs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    /// Batch attribution metadata, when the batch is known.
    #[serde(flatten)]
    pub meta: BatchMeta,
}

/// Delivers failure notes to the tenant's owning system.
///
/// Implementations report delivery failures as errors; the pipeline is
/// the boundary that swallows them.
#[async_trait]
pub trait OwnerNotifier: Send + Sync + std::fmt::Debug {
    /// Deliver one failure note.
    async fn notify(&self, note: &FailureNote) -> AppResult<()>;
}

/// HTTP owner notifier posting failure notes to per-tenant callback URLs.
#[derive(Debug, Clone)]
pub struct HttpOwnerNotifier {
    client: reqwest::Client,
    config: NotifierConfig,
}

impl HttpOwnerNotifier {
    /// Create a notifier from configuration.
    pub fn new(config: &NotifierConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .unwrap_or_default();
        Self {
            client,
            config: config.clone(),
        }
    }
}

#[async_trait]
impl OwnerNotifier for HttpOwnerNotifier {
    async fn notify(&self, note: &FailureNote) -> AppResult<()> {
        let Some(url) = self.config.callback_url(&note.tenant_id) else {
            debug!(tenant_id = %note.tenant_id, "No owner callback configured, skipping");
            return Ok(());
        };

        let response = self
            .client
            .post(url)
            .json(note)
            .send()
            .await
            .map_err(|e| AppError::notification(format!("Owner callback failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::notification(format!(
                "Owner callback returned status {}",
                response.status()
            )));
        }

        Ok(())
    }
}
