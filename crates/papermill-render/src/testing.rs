//! Mock rendering backends for tests.
//!
//! Enabled for consumers via the `testing` feature so queue and API
//! tests can drive the pool without a sidecar.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use papermill_core::config::renderer::PageOptions;
use papermill_core::error::AppError;
use papermill_core::result::AppResult;

use crate::backend::{RenderBackend, RenderContext, RenderEngine};

/// Configurable mock behavior.
#[derive(Debug, Clone, Default)]
pub struct MockBehavior {
    launch_delay_ms: u64,
    fail_first_launches: usize,
    fail_renders: bool,
}

impl MockBehavior {
    /// Delay every launch by the given number of milliseconds.
    pub fn launch_delay_ms(mut self, ms: u64) -> Self {
        self.launch_delay_ms = ms;
        self
    }

    /// Fail the first `n` launches before succeeding.
    pub fn fail_first_launches(mut self, n: usize) -> Self {
        self.fail_first_launches = n;
        self
    }

    /// Make every render call fail.
    pub fn fail_renders(mut self) -> Self {
        self.fail_renders = true;
        self
    }
}

/// Mock backend counting launches and context lifecycle events.
#[derive(Debug)]
pub struct MockBackend {
    behavior: MockBehavior,
    launches: AtomicUsize,
    launch_failures_left: AtomicUsize,
    contexts_created: Arc<AtomicUsize>,
    contexts_closed: Arc<AtomicUsize>,
    current_disconnect: Mutex<Option<watch::Sender<bool>>>,
}

impl MockBackend {
    /// Create a mock backend with the given behavior.
    pub fn new(behavior: MockBehavior) -> Self {
        let launch_failures_left = AtomicUsize::new(behavior.fail_first_launches);
        Self {
            behavior,
            launches: AtomicUsize::new(0),
            launch_failures_left,
            contexts_created: Arc::new(AtomicUsize::new(0)),
            contexts_closed: Arc::new(AtomicUsize::new(0)),
            current_disconnect: Mutex::new(None),
        }
    }

    /// Number of launch invocations so far.
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    /// Number of contexts created.
    pub fn contexts_created(&self) -> usize {
        self.contexts_created.load(Ordering::SeqCst)
    }

    /// Number of contexts released.
    pub fn contexts_closed(&self) -> usize {
        self.contexts_closed.load(Ordering::SeqCst)
    }

    /// Simulate an engine crash on the most recently launched engine.
    pub fn disconnect_current(&self) {
        if let Some(tx) = self
            .current_disconnect
            .lock()
            .expect("mock lock poisoned")
            .as_ref()
        {
            let _ = tx.send(true);
        }
    }
}

#[async_trait]
impl RenderBackend for MockBackend {
    async fn launch(&self) -> AppResult<Arc<dyn RenderEngine>> {
        self.launches.fetch_add(1, Ordering::SeqCst);

        if self.behavior.launch_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.behavior.launch_delay_ms)).await;
        }

        if self
            .launch_failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(AppError::render("mock launch failure"));
        }

        let (tx, rx) = watch::channel(false);
        *self
            .current_disconnect
            .lock()
            .expect("mock lock poisoned") = Some(tx);

        Ok(Arc::new(MockEngine {
            disconnected: rx,
            fail_renders: self.behavior.fail_renders,
            contexts_created: Arc::clone(&self.contexts_created),
            contexts_closed: Arc::clone(&self.contexts_closed),
        }))
    }
}

#[derive(Debug)]
struct MockEngine {
    disconnected: watch::Receiver<bool>,
    fail_renders: bool,
    contexts_created: Arc<AtomicUsize>,
    contexts_closed: Arc<AtomicUsize>,
}

#[async_trait]
impl RenderEngine for MockEngine {
    fn is_connected(&self) -> bool {
        !*self.disconnected.borrow()
    }

    fn disconnected(&self) -> watch::Receiver<bool> {
        self.disconnected.clone()
    }

    async fn create_context(&self) -> AppResult<Box<dyn RenderContext>> {
        self.contexts_created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockContext {
            fail_renders: self.fail_renders,
            contexts_closed: Arc::clone(&self.contexts_closed),
            closed: false,
        }))
    }

    async fn close(&self) -> AppResult<()> {
        Ok(())
    }
}

struct MockContext {
    fail_renders: bool,
    contexts_closed: Arc<AtomicUsize>,
    closed: bool,
}

#[async_trait]
impl RenderContext for MockContext {
    async fn set_content(&mut self, _markup: &str) -> AppResult<()> {
        Ok(())
    }

    async fn render_document(&mut self, _page: &PageOptions) -> AppResult<Vec<u8>> {
        if self.fail_renders {
            return Err(AppError::render("mock render failure"));
        }
        Ok(b"%PDF-1.4 mock".to_vec())
    }

    async fn close(&mut self) -> AppResult<()> {
        if !self.closed {
            self.closed = true;
            self.contexts_closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
