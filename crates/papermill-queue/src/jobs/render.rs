//! Document render job handler.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use papermill_render::{ArtifactStore, RenderPool, Templater};

use crate::executor::{JobExecutionError, JobHandler};
use crate::job::{Job, JobKind};

/// Renders a document to PDF and stores the artifact.
#[derive(Debug)]
pub struct RenderDocumentHandler {
    pool: Arc<RenderPool>,
    templater: Arc<dyn Templater>,
    artifacts: Arc<dyn ArtifactStore>,
}

impl RenderDocumentHandler {
    pub fn new(
        pool: Arc<RenderPool>,
        templater: Arc<dyn Templater>,
        artifacts: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            pool,
            templater,
            artifacts,
        }
    }
}

#[async_trait]
impl JobHandler for RenderDocumentHandler {
    fn kind(&self) -> JobKind {
        JobKind::Render
    }

    async fn execute(&self, job: &Job) -> Result<Value, JobExecutionError> {
        let number = job.document.document_number.trim();
        if number.is_empty() {
            return Err(JobExecutionError::Permanent(
                "Missing document number in render payload".to_string(),
            ));
        }

        let markup = self.templater.markup(&job.document)?;

        tracing::info!(
            job_id = %job.id,
            tenant_id = %job.tenant_id,
            document_number = number,
            "Rendering document"
        );

        let bytes = self.pool.render(&markup).await?;
        let artifact = self
            .artifacts
            .store(&job.tenant_id, number, &bytes)
            .await?;

        Ok(serde_json::json!({
            "success": true,
            "artifact": artifact,
            "documentNumber": number,
            "tenantId": job.tenant_id,
        }))
    }
}
