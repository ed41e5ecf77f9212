//! Application state shared across all handlers.

use std::sync::Arc;

use papermill_batch::BatchTracker;
use papermill_cache::CacheManager;
use papermill_core::config::AppConfig;
use papermill_core::tenants::TenantRegistry;
use papermill_mailer::MailerRegistry;
use papermill_notify::FailurePipeline;
use papermill_queue::QueueManager;

/// Application state passed to every Axum handler via `State<AppState>`.
///
/// All fields are cheap to clone; shared services are `Arc`-wrapped.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Configured tenants
    pub tenants: Arc<TenantRegistry>,
    /// Shared store (Redis or in-memory)
    pub cache: Arc<CacheManager>,
    /// Per-tenant job queues
    pub manager: Arc<QueueManager>,
    /// Batch progress counters
    pub batches: BatchTracker,
    /// Bounded error log and owner callbacks
    pub failures: FailurePipeline,
    /// Per-tenant mail transports
    pub mailer: MailerRegistry,
}

impl AppState {
    /// Resolve a request's tenant id, falling back to the configured
    /// default when the request does not name one.
    pub fn resolve_tenant<'a>(&'a self, requested: Option<&'a str>) -> Option<&'a str> {
        requested
            .filter(|t| !t.is_empty())
            .or_else(|| self.tenants.default_tenant())
    }
}
