//! Batch lifecycle handlers.

use axum::extract::{Path, State};
use axum::Json;

use papermill_batch::{BatchMeta, BatchStatus};
use papermill_core::error::AppError;

use crate::dto::request::StartBatchRequest;
use crate::dto::response::ApiResponse;
use crate::error::ApiError;
use crate::state::AppState;

/// POST /queue/batch/start
///
/// Idempotent: re-starting an existing batch updates `total` and
/// metadata without erasing live progress counters.
pub async fn start_batch(
    State(state): State<AppState>,
    Json(req): Json<StartBatchRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let batch_id = req
        .batch_id
        .filter(|b| !b.is_empty())
        .ok_or_else(|| AppError::validation("batchId and total are required"))?;
    let total = req
        .total
        .ok_or_else(|| AppError::validation("batchId and total are required"))?;
    let tenant_id = state
        .resolve_tenant(req.tenant_id.as_deref())
        .map(str::to_string)
        .ok_or_else(|| AppError::queue("No tenant specified and no default tenant configured"))?;

    let meta = BatchMeta {
        user_id: req.user_id,
        app_id: req.app_id,
        unique_name: req.unique_name,
    };
    state
        .batches
        .start_batch(&tenant_id, &batch_id, total, &meta)
        .await?;

    Ok(Json(ApiResponse::ok(serde_json::json!({
        "tenantId": tenant_id,
        "batchId": batch_id,
    }))))
}

/// GET /queue/batch/:tenantId/:batchId
pub async fn batch_status(
    State(state): State<AppState>,
    Path((tenant_id, batch_id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<BatchStatus>>, ApiError> {
    let status = state
        .batches
        .status(&tenant_id, &batch_id)
        .await?
        .ok_or_else(|| AppError::not_found("Batch not found"))?;

    Ok(Json(ApiResponse::ok(status)))
}
