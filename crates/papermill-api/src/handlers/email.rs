//! Mail transport verification handlers.

use axum::extract::{Path, State};
use axum::Json;

use papermill_mailer::VerifyResult;

use crate::state::AppState;

/// GET /email/verify
pub async fn verify_default(State(state): State<AppState>) -> Json<VerifyResult> {
    let tenant_id = state.tenants.default_tenant().unwrap_or("default").to_string();
    Json(state.mailer.verify(&tenant_id).await)
}

/// GET /email/verify/:tenantId
pub async fn verify_tenant(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
) -> Json<VerifyResult> {
    Json(state.mailer.verify(&tenant_id).await)
}
