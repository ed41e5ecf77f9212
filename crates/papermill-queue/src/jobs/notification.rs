//! Notification job handler: render for attachment, compose, send.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use papermill_mailer::{compose_invoice_mail, MailAttachment, MailMessage, MailerRegistry};
use papermill_render::{RenderPool, Templater};

use crate::executor::{JobExecutionError, JobHandler};
use crate::job::{Job, JobKind};

/// Sends a document to its recipient by mail with the rendered PDF
/// attached. The document is rendered again here rather than read back
/// from a render job's artifact, so a notification job is complete on
/// its own.
#[derive(Debug)]
pub struct SendNotificationHandler {
    mailer: MailerRegistry,
    pool: Arc<RenderPool>,
    templater: Arc<dyn Templater>,
}

impl SendNotificationHandler {
    pub fn new(mailer: MailerRegistry, pool: Arc<RenderPool>, templater: Arc<dyn Templater>) -> Self {
        Self {
            mailer,
            pool,
            templater,
        }
    }
}

#[async_trait]
impl JobHandler for SendNotificationHandler {
    fn kind(&self) -> JobKind {
        JobKind::Notification
    }

    async fn execute(&self, job: &Job) -> Result<Value, JobExecutionError> {
        let recipient_data = job.recipient.as_ref().ok_or_else(|| {
            JobExecutionError::Permanent("Missing recipient data in notification payload".to_string())
        })?;
        let to = recipient_data.recipient().ok_or_else(|| {
            JobExecutionError::Permanent(format!(
                "No recipient email for document {}",
                job.document.document_number
            ))
        })?;

        let number = &job.document.document_number;
        let markup = self.templater.markup(&job.document)?;
        let pdf = self.pool.render(&markup).await?;

        let composed = compose_invoice_mail(number, recipient_data);
        let message = MailMessage {
            to: to.to_string(),
            subject: composed.subject,
            html_body: composed.html_body,
            attachment: Some(MailAttachment {
                filename: format!("{number}.pdf"),
                content: pdf,
                content_type: "application/pdf".to_string(),
            }),
        };

        let transport = self.mailer.transport(&job.tenant_id);
        let message_id = transport.send(&message).await?;

        tracing::info!(
            job_id = %job.id,
            tenant_id = %job.tenant_id,
            document_number = %number,
            message_id = %message_id,
            "Notification sent"
        );

        Ok(serde_json::json!({
            "success": true,
            "messageId": message_id,
            "recipient": message.to,
            "documentNumber": number,
        }))
    }
}
