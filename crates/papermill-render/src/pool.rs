//! The rendering resource pool.
//!
//! Lifecycle: Uninitialized → Launching → Ready, with Disconnected on an
//! asynchronous engine crash. Launch is single-flight: every caller that
//! arrives while a launch is in flight awaits the same shared future, so
//! N concurrent cold-starters produce exactly one underlying launch.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{info, warn};

use papermill_core::config::renderer::{PageOptions, RendererConfig};
use papermill_core::error::AppError;
use papermill_core::result::AppResult;

use crate::backend::{RenderBackend, RenderContext, RenderEngine};

/// Observable pool lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    /// No engine has been launched yet.
    Uninitialized,
    /// A launch is in flight; new callers await it.
    Launching,
    /// A connected engine is cached and reused.
    Ready,
    /// The engine went away; the next acquire relaunches.
    Disconnected,
}

/// Shared launch future; `AppError` is `Clone` so the result fans out to
/// every awaiting caller.
type LaunchFlight = Shared<BoxFuture<'static, Result<Arc<dyn RenderEngine>, AppError>>>;

struct PoolInner {
    state: PoolState,
    engine: Option<Arc<dyn RenderEngine>>,
    inflight: Option<LaunchFlight>,
}

/// Pool owning the one shared rendering engine instance.
pub struct RenderPool {
    backend: Arc<dyn RenderBackend>,
    inner: Arc<Mutex<PoolInner>>,
    launch_timeout: Duration,
    settle_timeout: Duration,
    page: PageOptions,
}

impl std::fmt::Debug for RenderPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderPool")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl RenderPool {
    /// Create a pool over the given backend.
    pub fn new(backend: Arc<dyn RenderBackend>, config: &RendererConfig) -> Self {
        Self {
            backend,
            inner: Arc::new(Mutex::new(PoolInner {
                state: PoolState::Uninitialized,
                engine: None,
                inflight: None,
            })),
            launch_timeout: Duration::from_secs(config.launch_timeout_seconds),
            settle_timeout: Duration::from_secs(config.settle_timeout_seconds),
            page: config.page.clone(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PoolState {
        self.inner.lock().expect("pool lock poisoned").state
    }

    /// Acquire the shared engine handle, launching it if necessary.
    ///
    /// A cached connected engine is returned without relaunching. From
    /// Uninitialized or Disconnected this starts a launch; callers that
    /// arrive during Launching await the same in-flight operation. A
    /// launch failure (including the launch timeout) fails this call but
    /// not the pool: the next caller retries.
    pub async fn acquire(&self) -> AppResult<Arc<dyn RenderEngine>> {
        let flight = {
            let mut inner = self.inner.lock().expect("pool lock poisoned");

            if let Some(engine) = &inner.engine {
                if engine.is_connected() {
                    return Ok(Arc::clone(engine));
                }
                warn!("Cached engine is disconnected, relaunching");
                inner.engine = None;
                inner.state = PoolState::Disconnected;
            }

            match &inner.inflight {
                Some(flight) => flight.clone(),
                None => {
                    let backend = Arc::clone(&self.backend);
                    let timeout = self.launch_timeout;
                    let flight: LaunchFlight = async move {
                        tokio::time::timeout(timeout, backend.launch())
                            .await
                            .map_err(|_| {
                                AppError::render(format!(
                                    "Engine launch timed out after {}s",
                                    timeout.as_secs()
                                ))
                            })?
                    }
                    .boxed()
                    .shared();
                    inner.inflight = Some(flight.clone());
                    inner.state = PoolState::Launching;
                    flight
                }
            }
        };

        let result = flight.clone().await;

        let mut inner = self.inner.lock().expect("pool lock poisoned");
        // Only the flight we awaited settles the pool state; a later
        // relaunch may already be in progress.
        if inner
            .inflight
            .as_ref()
            .is_some_and(|current| current.ptr_eq(&flight))
        {
            inner.inflight = None;
            match &result {
                Ok(engine) => {
                    info!("Rendering engine ready");
                    inner.state = PoolState::Ready;
                    inner.engine = Some(Arc::clone(engine));
                    self.spawn_disconnect_monitor(Arc::clone(engine));
                }
                Err(e) => {
                    warn!(error = %e, "Engine launch failed");
                    inner.state = PoolState::Disconnected;
                }
            }
        }
        drop(inner);

        result
    }

    /// Render markup to a finished binary document.
    ///
    /// This is the scoped-acquisition entry point used by job handlers:
    /// it borrows an isolated execution context from the shared engine
    /// and releases it on both success and failure paths.
    pub async fn render(&self, markup: &str) -> AppResult<Vec<u8>> {
        let engine = self.acquire().await?;
        let mut context = engine.create_context().await?;

        let result = self.render_in_context(context.as_mut(), markup).await;

        if let Err(e) = context.close().await {
            warn!(error = %e, "Failed to release render context");
        }

        result
    }

    async fn render_in_context(
        &self,
        context: &mut dyn RenderContext,
        markup: &str,
    ) -> AppResult<Vec<u8>> {
        tokio::time::timeout(self.settle_timeout, context.set_content(markup))
            .await
            .map_err(|_| {
                AppError::render(format!(
                    "Content did not settle within {}s",
                    self.settle_timeout.as_secs()
                ))
            })??;

        context.render_document(&self.page).await
    }

    /// Watch the engine's disconnect channel and move the pool to
    /// Disconnected so the next acquire relaunches.
    fn spawn_disconnect_monitor(&self, engine: Arc<dyn RenderEngine>) {
        let inner = Arc::clone(&self.inner);
        let mut disconnected = engine.disconnected();
        tokio::spawn(async move {
            loop {
                if *disconnected.borrow() {
                    break;
                }
                if disconnected.changed().await.is_err() {
                    // Engine dropped its sender; treat as disconnect.
                    break;
                }
            }
            warn!("Engine disconnected, pool will relaunch on next acquire");
            let mut inner = inner.lock().expect("pool lock poisoned");
            if inner
                .engine
                .as_ref()
                .is_some_and(|cached| Arc::ptr_eq(cached, &engine))
            {
                inner.engine = None;
                inner.state = PoolState::Disconnected;
            }
        });
    }

    /// Close the cached engine, if any. Used during shutdown.
    pub async fn shutdown(&self) {
        let engine = {
            let mut inner = self.inner.lock().expect("pool lock poisoned");
            inner.state = PoolState::Uninitialized;
            inner.inflight = None;
            inner.engine.take()
        };
        if let Some(engine) = engine {
            if let Err(e) = engine.close().await {
                warn!(error = %e, "Failed to close rendering engine");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockBackend, MockBehavior};
    use papermill_core::config::renderer::RendererConfig;

    fn make_pool(backend: Arc<MockBackend>) -> Arc<RenderPool> {
        let config = RendererConfig {
            launch_timeout_seconds: 5,
            settle_timeout_seconds: 5,
            ..RendererConfig::default()
        };
        Arc::new(RenderPool::new(backend, &config))
    }

    #[tokio::test]
    async fn test_single_flight_launch() {
        let backend = Arc::new(MockBackend::new(MockBehavior::default().launch_delay_ms(50)));
        let pool = make_pool(Arc::clone(&backend));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let pool = Arc::clone(&pool);
            handles.push(tokio::spawn(async move { pool.acquire().await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(backend.launches(), 1);
        assert_eq!(pool.state(), PoolState::Ready);
    }

    #[tokio::test]
    async fn test_acquire_reuses_cached_engine() {
        let backend = Arc::new(MockBackend::new(MockBehavior::default()));
        let pool = make_pool(Arc::clone(&backend));

        let first = pool.acquire().await.unwrap();
        let second = pool.acquire().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(backend.launches(), 1);
    }

    #[tokio::test]
    async fn test_relaunch_after_disconnect() {
        let backend = Arc::new(MockBackend::new(MockBehavior::default()));
        let pool = make_pool(Arc::clone(&backend));

        pool.acquire().await.unwrap();
        backend.disconnect_current();
        // The disconnect monitor runs asynchronously; acquire itself
        // also detects the dead handle, so no sleep is needed.
        pool.acquire().await.unwrap();
        assert_eq!(backend.launches(), 2);
    }

    #[tokio::test]
    async fn test_launch_failure_is_not_fatal_to_pool() {
        let backend = Arc::new(MockBackend::new(
            MockBehavior::default().fail_first_launches(1),
        ));
        let pool = make_pool(Arc::clone(&backend));

        assert!(pool.acquire().await.is_err());
        assert_eq!(pool.state(), PoolState::Disconnected);
        // Next caller retries and succeeds.
        pool.acquire().await.unwrap();
        assert_eq!(pool.state(), PoolState::Ready);
        assert_eq!(backend.launches(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_failed_launch_fans_out() {
        let backend = Arc::new(MockBackend::new(
            MockBehavior::default()
                .fail_first_launches(1)
                .launch_delay_ms(50),
        ));
        let pool = make_pool(Arc::clone(&backend));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let pool = Arc::clone(&pool);
            handles.push(tokio::spawn(async move { pool.acquire().await }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_err());
        }
        assert_eq!(backend.launches(), 1);
    }

    #[tokio::test]
    async fn test_render_closes_context_on_success() {
        let backend = Arc::new(MockBackend::new(MockBehavior::default()));
        let pool = make_pool(Arc::clone(&backend));

        let bytes = pool.render("<html></html>").await.unwrap();
        assert!(!bytes.is_empty());
        assert_eq!(backend.contexts_created(), 1);
        assert_eq!(backend.contexts_closed(), 1);
    }

    #[tokio::test]
    async fn test_render_closes_context_on_failure() {
        let backend = Arc::new(MockBackend::new(MockBehavior::default().fail_renders()));
        let pool = make_pool(Arc::clone(&backend));

        assert!(pool.render("<html></html>").await.is_err());
        assert_eq!(backend.contexts_created(), 1);
        assert_eq!(backend.contexts_closed(), 1);
    }
}
