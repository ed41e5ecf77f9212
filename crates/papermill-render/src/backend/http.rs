//! HTTP sidecar renderer backend.
//!
//! Drives a renderer sidecar service over HTTP: one `launch` establishes
//! the session and starts a health-probe loop; each execution context
//! maps to a sidecar context resource that is created, fed content,
//! rendered, and deleted per job.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use papermill_core::config::renderer::{PageOptions, RendererConfig};
use papermill_core::error::AppError;
use papermill_core::result::AppResult;

use super::{RenderBackend, RenderContext, RenderEngine};

/// Backend that launches engine sessions against the renderer sidecar.
#[derive(Debug, Clone)]
pub struct HttpRenderBackend {
    /// Sidecar base URL.
    base_url: String,
    /// Shared HTTP client.
    client: reqwest::Client,
    /// Interval between health probes.
    health_interval: Duration,
}

impl HttpRenderBackend {
    /// Create a backend from renderer configuration.
    pub fn new(config: &RendererConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            health_interval: Duration::from_secs(config.health_interval_seconds),
        }
    }
}

#[async_trait]
impl RenderBackend for HttpRenderBackend {
    async fn launch(&self) -> AppResult<Arc<dyn RenderEngine>> {
        info!(base_url = %self.base_url, "Launching rendering engine session");

        let health_url = format!("{}/healthz", self.base_url);
        let response = self
            .client
            .get(&health_url)
            .send()
            .await
            .map_err(|e| AppError::render(format!("Engine unreachable: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::render(format!(
                "Engine health check failed with status {}",
                response.status()
            )));
        }

        let (tx, rx) = watch::channel(false);
        let monitor = tokio::spawn(health_loop(
            self.client.clone(),
            health_url,
            self.health_interval,
            tx,
        ));

        info!("Rendering engine session established");
        Ok(Arc::new(HttpRenderEngine {
            base_url: self.base_url.clone(),
            client: self.client.clone(),
            disconnected: rx,
            monitor,
        }))
    }
}

/// Health probe loop; flips the disconnect channel on first failure.
async fn health_loop(
    client: reqwest::Client,
    health_url: String,
    interval: Duration,
    tx: watch::Sender<bool>,
) {
    loop {
        tokio::time::sleep(interval).await;
        let alive = match client.get(&health_url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        };
        if !alive {
            warn!("Rendering engine stopped responding to health probes");
            let _ = tx.send(true);
            return;
        }
    }
}

/// A live engine session on the sidecar.
#[derive(Debug)]
struct HttpRenderEngine {
    /// Sidecar base URL.
    base_url: String,
    /// Shared HTTP client.
    client: reqwest::Client,
    /// Disconnect signal fed by the health loop.
    disconnected: watch::Receiver<bool>,
    /// Health loop task handle.
    monitor: tokio::task::JoinHandle<()>,
}

#[derive(Debug, Deserialize)]
struct ContextCreated {
    id: String,
}

#[async_trait]
impl RenderEngine for HttpRenderEngine {
    fn is_connected(&self) -> bool {
        !*self.disconnected.borrow()
    }

    fn disconnected(&self) -> watch::Receiver<bool> {
        self.disconnected.clone()
    }

    async fn create_context(&self) -> AppResult<Box<dyn RenderContext>> {
        let url = format!("{}/contexts", self.base_url);
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| AppError::render(format!("Failed to create render context: {e}")))?
            .error_for_status()
            .map_err(|e| AppError::render(format!("Context creation rejected: {e}")))?;

        let created: ContextCreated = response
            .json()
            .await
            .map_err(|e| AppError::render(format!("Invalid context response: {e}")))?;

        debug!(context_id = %created.id, "Created render context");
        Ok(Box::new(HttpRenderContext {
            context_url: format!("{}/contexts/{}", self.base_url, created.id),
            client: self.client.clone(),
            closed: false,
        }))
    }

    async fn close(&self) -> AppResult<()> {
        self.monitor.abort();
        Ok(())
    }
}

impl Drop for HttpRenderEngine {
    fn drop(&mut self) {
        self.monitor.abort();
    }
}

/// One sidecar context resource.
#[derive(Debug)]
struct HttpRenderContext {
    /// Context resource URL on the sidecar.
    context_url: String,
    /// Shared HTTP client.
    client: reqwest::Client,
    /// Whether the context was already released.
    closed: bool,
}

#[async_trait]
impl RenderContext for HttpRenderContext {
    async fn set_content(&mut self, markup: &str) -> AppResult<()> {
        let url = format!("{}/content", self.context_url);
        self.client
            .put(&url)
            .header(reqwest::header::CONTENT_TYPE, "text/html")
            .body(markup.to_string())
            .send()
            .await
            .map_err(|e| AppError::render(format!("Failed to load content: {e}")))?
            .error_for_status()
            .map_err(|e| AppError::render(format!("Content rejected: {e}")))?;
        Ok(())
    }

    async fn render_document(&mut self, page: &PageOptions) -> AppResult<Vec<u8>> {
        let url = format!("{}/pdf", self.context_url);
        let response = self
            .client
            .post(&url)
            .json(page)
            .send()
            .await
            .map_err(|e| AppError::render(format!("Render request failed: {e}")))?
            .error_for_status()
            .map_err(|e| AppError::render(format!("Render rejected: {e}")))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::render(format!("Failed to read rendered document: {e}")))?;
        Ok(bytes.to_vec())
    }

    async fn close(&mut self) -> AppResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.client
            .delete(&self.context_url)
            .send()
            .await
            .map_err(|e| AppError::render(format!("Failed to release context: {e}")))?;
        Ok(())
    }
}
