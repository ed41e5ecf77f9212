//! Route definitions for the Papermill HTTP API.
//!
//! Routes keep the paths the original callers already use, so they are
//! mounted at the root rather than under an /api prefix.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let max_body = state.config.server.max_body_size_bytes;

    Router::new()
        .merge(job_routes())
        .merge(batch_routes())
        .merge(queue_routes())
        .merge(email_routes())
        .route("/health", get(handlers::health::health))
        .layer(DefaultBodyLimit::max(max_body))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Enqueue endpoints
fn job_routes() -> Router<AppState> {
    Router::new()
        .route("/generate-invoice-pdf", post(handlers::jobs::generate_pdf))
        .route(
            "/generate-bulk-pdfs",
            post(handlers::jobs::generate_bulk_pdfs),
        )
        .route("/send-invoice-email", post(handlers::jobs::send_email))
        .route("/send-bulk-emails", post(handlers::jobs::send_bulk_emails))
}

/// Batch lifecycle endpoints
fn batch_routes() -> Router<AppState> {
    Router::new()
        .route("/queue/batch/start", post(handlers::batch::start_batch))
        .route(
            "/queue/batch/:tenantId/:batchId",
            get(handlers::batch::batch_status),
        )
}

/// Queue stats, control, and error inspection
fn queue_routes() -> Router<AppState> {
    Router::new()
        .route("/queue/stats", get(handlers::queue::all_stats))
        .route("/tenant/:tenantId/stats", get(handlers::queue::tenant_stats))
        .route("/tenant/:tenantId/pause", post(handlers::queue::pause))
        .route("/tenant/:tenantId/resume", post(handlers::queue::resume))
        .route("/tenant/:tenantId/clear", post(handlers::queue::clear))
        .route(
            "/queue/errors/:tenantId",
            get(handlers::queue::tenant_errors),
        )
        .route(
            "/queue/errors/:tenantId/:batchId",
            get(handlers::queue::batch_errors),
        )
}

/// Mail transport verification
fn email_routes() -> Router<AppState> {
    Router::new()
        .route("/email/verify", get(handlers::email::verify_default))
        .route(
            "/email/verify/:tenantId",
            get(handlers::email::verify_tenant),
        )
}
