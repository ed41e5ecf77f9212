//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use papermill_notify::ErrorRecord;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status.
    pub status: String,
    /// Current time.
    pub timestamp: DateTime<Utc>,
    /// Version.
    pub version: String,
}

/// Enqueue acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedJobResponse {
    /// Always true.
    pub success: bool,
    /// Human-readable confirmation.
    pub message: String,
    /// Assigned job id.
    pub job_id: String,
    /// Tenant the job was queued for.
    pub tenant_id: String,
    /// Always "queued"; job outcome is observed via stats and errors.
    pub status: String,
    /// Batch attribution, when supplied.
    pub batch_id: Option<String>,
}

/// Bulk enqueue acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkQueuedResponse {
    /// Always true.
    pub success: bool,
    /// Human-readable confirmation.
    pub message: String,
    /// Assigned job ids, in submission order. Entries without a
    /// recipient are skipped and get no id.
    pub job_ids: Vec<String>,
    /// Tenant the jobs were queued for.
    pub tenant_id: String,
    /// Batch attribution, when supplied.
    pub batch_id: Option<String>,
}

/// Recent-errors listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorsResponse {
    /// Always true.
    pub success: bool,
    /// Tenant the errors belong to.
    pub tenant_id: String,
    /// Batch scope, or None for the per-tenant individual log.
    pub batch_id: Option<String>,
    /// Number of entries returned.
    pub count: usize,
    /// Most recent first.
    pub errors: Vec<ErrorRecord>,
}

/// Queue control acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueControlResponse {
    /// Always true.
    pub success: bool,
    /// Tenant the operation applied to.
    pub tenant_id: String,
    /// Waiting jobs dropped; only set for clear.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dropped: Option<usize>,
}
