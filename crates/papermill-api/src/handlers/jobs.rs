//! Enqueue handlers: render jobs, notification jobs, bulk submissions.

use axum::extract::State;
use axum::Json;

use papermill_core::error::AppError;
use papermill_queue::EnqueueOptions;

use crate::dto::request::{BulkEmailRequest, BulkPdfRequest, GeneratePdfRequest, SendEmailRequest};
use crate::dto::response::{BulkQueuedResponse, QueuedJobResponse};
use crate::error::ApiError;
use crate::state::AppState;

fn require_tenant(state: &AppState, requested: Option<&str>) -> Result<String, ApiError> {
    state
        .resolve_tenant(requested)
        .map(str::to_string)
        .ok_or_else(|| {
            AppError::queue("No tenant specified and no default tenant configured").into()
        })
}

/// POST /generate-invoice-pdf
pub async fn generate_pdf(
    State(state): State<AppState>,
    Json(req): Json<GeneratePdfRequest>,
) -> Result<Json<QueuedJobResponse>, ApiError> {
    let document = req
        .document
        .ok_or_else(|| AppError::validation("Document data is required"))?;
    let tenant_id = require_tenant(&state, req.tenant_id.as_deref())?;

    let job_id = state
        .manager
        .enqueue_render(
            &tenant_id,
            document,
            EnqueueOptions {
                priority: req.priority,
                delay: None,
                batch_id: req.batch_id.clone(),
            },
        )
        .await?;

    tracing::info!(job_id = %job_id, tenant_id = %tenant_id, "PDF job queued");

    Ok(Json(QueuedJobResponse {
        success: true,
        message: "PDF generation job queued successfully".to_string(),
        job_id: job_id.to_string(),
        tenant_id,
        status: "queued".to_string(),
        batch_id: req.batch_id,
    }))
}

/// POST /generate-bulk-pdfs
///
/// Unlike the bulk email path there is nothing to skip per entry, so
/// the first enqueue error fails the submission.
pub async fn generate_bulk_pdfs(
    State(state): State<AppState>,
    Json(req): Json<BulkPdfRequest>,
) -> Result<Json<BulkQueuedResponse>, ApiError> {
    let documents = req
        .documents
        .ok_or_else(|| AppError::validation("Documents array is required"))?;
    let tenant_id = require_tenant(&state, req.tenant_id.as_deref())?;

    let mut job_ids = Vec::with_capacity(documents.len());
    for document in documents {
        let job_id = state
            .manager
            .enqueue_render(
                &tenant_id,
                document,
                EnqueueOptions {
                    priority: req.priority,
                    delay: None,
                    batch_id: req.batch_id.clone(),
                },
            )
            .await?;
        job_ids.push(job_id.to_string());
    }

    tracing::info!(
        tenant_id = %tenant_id,
        queued = job_ids.len(),
        "Bulk PDF jobs queued"
    );

    Ok(Json(BulkQueuedResponse {
        success: true,
        message: format!("Queued {} PDF jobs", job_ids.len()),
        job_ids,
        tenant_id,
        batch_id: req.batch_id,
    }))
}

/// POST /send-invoice-email
pub async fn send_email(
    State(state): State<AppState>,
    Json(req): Json<SendEmailRequest>,
) -> Result<Json<QueuedJobResponse>, ApiError> {
    let document = req
        .document
        .ok_or_else(|| AppError::validation("Document data is required"))?;
    let recipient = req
        .email_data
        .ok_or_else(|| AppError::validation("Email recipient is required"))?;
    let tenant_id = require_tenant(&state, req.tenant_id.as_deref())?;

    let job_id = state
        .manager
        .enqueue_notification(
            &tenant_id,
            document,
            recipient,
            EnqueueOptions {
                batch_id: req.batch_id.clone(),
                ..Default::default()
            },
        )
        .await?;

    tracing::info!(job_id = %job_id, tenant_id = %tenant_id, "Email job queued");

    Ok(Json(QueuedJobResponse {
        success: true,
        message: "Email job queued successfully".to_string(),
        job_id: job_id.to_string(),
        tenant_id,
        status: "queued".to_string(),
        batch_id: req.batch_id,
    }))
}

/// POST /send-bulk-emails
///
/// Entries without a recipient are skipped with a warning rather than
/// failing the whole submission; when the submission is batched the
/// queue manager still counts each skip against the batch.
pub async fn send_bulk_emails(
    State(state): State<AppState>,
    Json(req): Json<BulkEmailRequest>,
) -> Result<Json<BulkQueuedResponse>, ApiError> {
    let entries = req
        .documents
        .ok_or_else(|| AppError::validation("Documents array is required"))?;
    let tenant_id = require_tenant(&state, req.tenant_id.as_deref())?;

    let mut job_ids = Vec::with_capacity(entries.len());
    for entry in entries {
        let recipient = entry.email_data.unwrap_or_default();
        match state
            .manager
            .enqueue_notification(
                &tenant_id,
                entry.document,
                recipient,
                EnqueueOptions {
                    batch_id: req.batch_id.clone(),
                    ..Default::default()
                },
            )
            .await
        {
            Ok(job_id) => job_ids.push(job_id.to_string()),
            Err(e) if e.kind == papermill_core::error::ErrorKind::Validation => {
                tracing::warn!(
                    tenant_id = %tenant_id,
                    error = %e,
                    "Skipping bulk entry without recipient"
                );
            }
            Err(e) => return Err(e.into()),
        }
    }

    tracing::info!(
        tenant_id = %tenant_id,
        queued = job_ids.len(),
        "Bulk email jobs queued"
    );

    Ok(Json(BulkQueuedResponse {
        success: true,
        message: format!("Queued {} email jobs", job_ids.len()),
        job_ids,
        tenant_id,
        batch_id: req.batch_id,
    }))
}
