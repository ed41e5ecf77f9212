//! Queue stats, control, and error inspection handlers.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::Json;

use papermill_queue::QueueStats;

use crate::dto::request::ErrorsQuery;
use crate::dto::response::{ApiResponse, ErrorsResponse, QueueControlResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// GET /queue/stats
pub async fn all_stats(
    State(state): State<AppState>,
) -> Json<ApiResponse<HashMap<String, QueueStats>>> {
    Json(ApiResponse::ok(state.manager.all_stats().await))
}

/// GET /tenant/:tenantId/stats
pub async fn tenant_stats(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
) -> Result<Json<ApiResponse<QueueStats>>, ApiError> {
    let stats = state.manager.tenant_stats(&tenant_id).await?;
    Ok(Json(ApiResponse::ok(stats)))
}

/// POST /tenant/:tenantId/pause
pub async fn pause(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
) -> Result<Json<QueueControlResponse>, ApiError> {
    state.manager.pause(&tenant_id).await?;
    Ok(Json(QueueControlResponse {
        success: true,
        tenant_id,
        dropped: None,
    }))
}

/// POST /tenant/:tenantId/resume
pub async fn resume(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
) -> Result<Json<QueueControlResponse>, ApiError> {
    state.manager.resume(&tenant_id).await?;
    Ok(Json(QueueControlResponse {
        success: true,
        tenant_id,
        dropped: None,
    }))
}

/// POST /tenant/:tenantId/clear
pub async fn clear(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
) -> Result<Json<QueueControlResponse>, ApiError> {
    let dropped = state.manager.clear(&tenant_id).await?;
    Ok(Json(QueueControlResponse {
        success: true,
        tenant_id,
        dropped: Some(dropped),
    }))
}

/// GET /queue/errors/:tenantId
pub async fn tenant_errors(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Query(query): Query<ErrorsQuery>,
) -> Result<Json<ErrorsResponse>, ApiError> {
    recent_errors(state, tenant_id, None, query.limit).await
}

/// GET /queue/errors/:tenantId/:batchId
pub async fn batch_errors(
    State(state): State<AppState>,
    Path((tenant_id, batch_id)): Path<(String, String)>,
    Query(query): Query<ErrorsQuery>,
) -> Result<Json<ErrorsResponse>, ApiError> {
    recent_errors(state, tenant_id, Some(batch_id), query.limit).await
}

async fn recent_errors(
    state: AppState,
    tenant_id: String,
    batch_id: Option<String>,
    limit: usize,
) -> Result<Json<ErrorsResponse>, ApiError> {
    let errors = state
        .failures
        .recent_errors(&tenant_id, batch_id.as_deref(), limit)
        .await?;

    Ok(Json(ErrorsResponse {
        success: true,
        tenant_id,
        batch_id,
        count: errors.len(),
        errors,
    }))
}
