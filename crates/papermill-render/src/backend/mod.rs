//! Rendering engine backend traits.
//!
//! The engine itself is an external collaborator; these traits are the
//! seam between the pool's lifecycle management and whatever transport
//! actually drives the engine (the HTTP sidecar in production, mocks in
//! tests).

pub mod http;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use papermill_core::config::renderer::PageOptions;
use papermill_core::result::AppResult;

pub use http::HttpRenderBackend;

/// Launches rendering engine instances.
#[async_trait]
pub trait RenderBackend: Send + Sync + std::fmt::Debug {
    /// Launch a new engine instance. Expensive and non-idempotent; the
    /// pool guarantees this is never called concurrently.
    async fn launch(&self) -> AppResult<Arc<dyn RenderEngine>>;
}

/// A connected rendering engine instance shared by all render jobs.
#[async_trait]
pub trait RenderEngine: Send + Sync + std::fmt::Debug {
    /// Whether the engine connection is still alive.
    fn is_connected(&self) -> bool;

    /// Channel that flips to `true` when the engine disconnects
    /// (crash, resource exhaustion).
    fn disconnected(&self) -> watch::Receiver<bool>;

    /// Create an isolated execution context for one unit of work.
    async fn create_context(&self) -> AppResult<Box<dyn RenderContext>>;

    /// Shut the engine down.
    async fn close(&self) -> AppResult<()>;
}

/// An isolated execution context inside the shared engine instance.
///
/// Contexts must always be closed, on success and failure paths alike;
/// the pool's scoped render entry point guarantees this for every call
/// path so engine-side resources never leak.
#[async_trait]
pub trait RenderContext: Send {
    /// Load markup into the context.
    async fn set_content(&mut self, markup: &str) -> AppResult<()>;

    /// Produce the finished binary document from the loaded content.
    async fn render_document(&mut self, page: &PageOptions) -> AppResult<Vec<u8>>;

    /// Release the context and its engine-side resources.
    async fn close(&mut self) -> AppResult<()>;
}
