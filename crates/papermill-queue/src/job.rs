//! Job model shared by the queue manager and handlers.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use papermill_core::types::document::{DocumentRecord, RecipientData};
use papermill_core::types::id::JobId;

/// The two kinds of work the service performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobKind {
    /// Render a document to PDF and store the artifact.
    Render,
    /// Deliver a rendered document to a recipient by mail.
    Notification,
}

impl JobKind {
    /// Wire name used in logs, error records, and owner callbacks.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Render => "render-document",
            JobKind::Notification => "send-notification",
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of queued work.
#[derive(Debug, Clone)]
pub struct Job {
    /// Job identifier, assigned at enqueue time.
    pub id: JobId,
    /// Owning tenant.
    pub tenant_id: String,
    /// What the job does.
    pub kind: JobKind,
    /// The document being processed.
    pub document: DocumentRecord,
    /// Recipient data; present on notification jobs.
    pub recipient: Option<RecipientData>,
    /// Batch this job belongs to, if any.
    pub batch_id: Option<String>,
    /// Higher runs first within a queue.
    pub priority: i32,
    /// Attempts already executed. Zero for a fresh job.
    pub attempts_made: u32,
    /// Total attempts allowed (initial try + retries).
    pub max_attempts: u32,
    /// When the job entered the queue.
    pub enqueued_at: DateTime<Utc>,
}

/// Caller-supplied enqueue parameters.
#[derive(Debug, Clone, Default)]
pub struct EnqueueOptions {
    /// Higher runs first. Defaults to 0.
    pub priority: i32,
    /// Hold the job for this long before it becomes dispatchable.
    pub delay: Option<Duration>,
    /// Batch to attribute the job to.
    pub batch_id: Option<String>,
}

impl EnqueueOptions {
    /// Options attributing the job to a batch.
    pub fn for_batch(batch_id: impl Into<String>) -> Self {
        Self {
            batch_id: Some(batch_id.into()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_wire_names() {
        assert_eq!(JobKind::Render.as_str(), "render-document");
        assert_eq!(JobKind::Notification.as_str(), "send-notification");
    }
}
