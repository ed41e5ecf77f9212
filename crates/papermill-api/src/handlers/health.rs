//! Health check handler.

use axum::extract::State;
use axum::Json;
use chrono::Utc;

use papermill_core::traits::cache::CacheProvider;

use crate::dto::response::HealthResponse;
use crate::state::AppState;

/// GET /health
///
/// Reports degraded rather than failing when the shared store is
/// unreachable, since render-only traffic can still be served.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let store_ok = state.cache.health_check().await.unwrap_or(false);

    Json(HealthResponse {
        status: if store_ok { "healthy" } else { "degraded" }.to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
