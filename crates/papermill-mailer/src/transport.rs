//! Mail transport trait and implementations.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::info;

use papermill_core::config::mailer::TransportConfig;
use papermill_core::error::AppError;
use papermill_core::result::AppResult;

/// A file attached to an outbound message.
#[derive(Debug, Clone)]
pub struct MailAttachment {
    /// Attachment filename.
    pub filename: String,
    /// Raw content bytes.
    pub content: Vec<u8>,
    /// MIME type.
    pub content_type: String,
}

/// One outbound message.
#[derive(Debug, Clone)]
pub struct MailMessage {
    /// Destination address.
    pub to: String,
    /// Message subject.
    pub subject: String,
    /// HTML body.
    pub html_body: String,
    /// Optional attachment (the rendered document).
    pub attachment: Option<MailAttachment>,
}

/// Result of a transport verification probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResult {
    /// Whether the transport is usable.
    pub success: bool,
    /// Human-readable detail.
    pub message: String,
}

/// Delivers outbound mail.
#[async_trait]
pub trait MailTransport: Send + Sync + std::fmt::Debug {
    /// Send one message, returning the transport's message id.
    async fn send(&self, message: &MailMessage) -> AppResult<String>;

    /// Probe the transport without sending.
    async fn verify(&self) -> VerifyResult;
}

/// Transport used when no gateway is configured. Sending fails with a
/// transport error; the service still starts so render-only tenants work.
#[derive(Debug, Clone, Default)]
pub struct DisabledTransport;

#[async_trait]
impl MailTransport for DisabledTransport {
    async fn send(&self, _message: &MailMessage) -> AppResult<String> {
        Err(AppError::transport("Mail transport not configured"))
    }

    async fn verify(&self) -> VerifyResult {
        VerifyResult {
            success: false,
            message: "Transport not configured".to_string(),
        }
    }
}

/// HTTP mail gateway transport.
#[derive(Debug, Clone)]
pub struct HttpMailTransport {
    client: reqwest::Client,
    config: TransportConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GatewayAttachment {
    filename: String,
    content_type: String,
    /// Base64-encoded bytes.
    content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GatewayRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<GatewayAttachment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GatewayResponse {
    #[serde(default)]
    message_id: Option<String>,
}

impl HttpMailTransport {
    /// Create a transport from configuration.
    pub fn new(config: &TransportConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.send_timeout_seconds))
            .build()
            .unwrap_or_default();
        Self {
            client,
            config: config.clone(),
        }
    }
}

#[async_trait]
impl MailTransport for HttpMailTransport {
    async fn send(&self, message: &MailMessage) -> AppResult<String> {
        let attachments = message
            .attachment
            .iter()
            .map(|a| GatewayAttachment {
                filename: a.filename.clone(),
                content_type: a.content_type.clone(),
                content: base64::engine::general_purpose::STANDARD.encode(&a.content),
            })
            .collect();

        let request = GatewayRequest {
            from: &self.config.from,
            to: &message.to,
            subject: &message.subject,
            html: &message.html_body,
            attachments,
        };

        let mut builder = self.client.post(&self.config.gateway_url).json(&request);
        if let Some(token) = &self.config.api_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AppError::transport(format!("Mail gateway unreachable: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::transport(format!(
                "Mail gateway returned status {}",
                response.status()
            )));
        }

        let body: GatewayResponse = response.json().await.unwrap_or(GatewayResponse {
            message_id: None,
        });
        let message_id = body
            .message_id
            .unwrap_or_else(|| format!("papermill-{}", chrono::Utc::now().timestamp_millis()));

        info!(to = %message.to, message_id = %message_id, "Mail dispatched");
        Ok(message_id)
    }

    async fn verify(&self) -> VerifyResult {
        match self.client.head(&self.config.gateway_url).send().await {
            Ok(resp) if resp.status().is_success() || resp.status().as_u16() == 405 => {
                VerifyResult {
                    success: true,
                    message: "Mail gateway reachable".to_string(),
                }
            }
            Ok(resp) => VerifyResult {
                success: false,
                message: format!("Mail gateway returned status {}", resp.status()),
            },
            Err(e) => VerifyResult {
                success: false,
                message: format!("Mail gateway unreachable: {e}"),
            },
        }
    }
}
