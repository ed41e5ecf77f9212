//! Job queue configuration.

use serde::{Deserialize, Serialize};

/// Queue manager configuration shared by all tenant queues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Total attempts per job (initial try + retries).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay in milliseconds for exponential backoff
    /// (`base * 2^attempts_made`). Deployment profiles use 2000 or 3000.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    /// Concurrency for notification queues. Fixed and small; the
    /// bottleneck resource differs from rendering so it is independent
    /// of the per-tenant render concurrency.
    #[serde(default = "default_notification_concurrency")]
    pub notification_concurrency: usize,
    /// Retention for per-batch error logs in seconds.
    #[serde(default = "default_error_ttl")]
    pub error_log_ttl_seconds: u64,
    /// Maximum entries retained per error log.
    #[serde(default = "default_error_cap")]
    pub error_log_max_entries: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            notification_concurrency: default_notification_concurrency(),
            error_log_ttl_seconds: default_error_ttl(),
            error_log_max_entries: default_error_cap(),
        }
    }
}

fn default_max_attempts() -> u32 {
    2
}

fn default_backoff_base_ms() -> u64 {
    2000
}

fn default_notification_concurrency() -> usize {
    2
}

fn default_error_ttl() -> u64 {
    7 * 24 * 3600
}

fn default_error_cap() -> usize {
    100
}
