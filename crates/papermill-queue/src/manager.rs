//! Queue manager: provisions per-tenant queue pairs and owns enqueue.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use papermill_batch::BatchTracker;
use papermill_core::config::queue::QueueConfig;
use papermill_core::error::AppError;
use papermill_core::result::AppResult;
use papermill_core::tenants::TenantRegistry;
use papermill_core::types::document::{DocumentRecord, RecipientData};
use papermill_core::types::id::JobId;
use papermill_notify::FailurePipeline;

use crate::executor::JobExecutor;
use crate::job::{EnqueueOptions, Job, JobKind};
use crate::queue::{spawn_dispatcher, QueueStats, RunnerContext, TenantQueue};

/// The render and notification queues of one tenant.
#[derive(Debug)]
struct TenantQueuePair {
    render: Arc<TenantQueue>,
    notification: Arc<TenantQueue>,
}

impl TenantQueuePair {
    fn for_kind(&self, kind: JobKind) -> &Arc<TenantQueue> {
        match kind {
            JobKind::Render => &self.render,
            JobKind::Notification => &self.notification,
        }
    }
}

/// Provisions and fronts every tenant queue.
///
/// Queues exist only for tenants present in configuration at startup;
/// enqueueing for anyone else is a queue error, not a lazy provision.
#[derive(Debug)]
pub struct QueueManager {
    queues: HashMap<String, TenantQueuePair>,
    ctx: Arc<RunnerContext>,
    max_attempts: u32,
    shutdown: watch::Sender<bool>,
    dispatchers: Vec<JoinHandle<()>>,
}

impl QueueManager {
    /// Provision queue pairs for every configured tenant and start their
    /// dispatchers.
    pub fn new(
        registry: &TenantRegistry,
        config: &QueueConfig,
        executor: JobExecutor,
        batches: BatchTracker,
        failures: FailurePipeline,
    ) -> Self {
        let ctx = Arc::new(RunnerContext {
            executor,
            batches,
            failures,
            backoff_base_ms: config.backoff_base_ms,
        });

        let (shutdown, shutdown_rx) = watch::channel(false);
        let mut queues = HashMap::new();
        let mut dispatchers = Vec::new();

        for tenant in registry.iter() {
            let render = Arc::new(TenantQueue::new(
                format!("{}:render", tenant.id),
                tenant.concurrency,
            ));
            let notification = Arc::new(TenantQueue::new(
                format!("{}:notification", tenant.id),
                config.notification_concurrency,
            ));

            dispatchers.push(spawn_dispatcher(
                Arc::clone(&render),
                Arc::clone(&ctx),
                shutdown_rx.clone(),
            ));
            dispatchers.push(spawn_dispatcher(
                Arc::clone(&notification),
                Arc::clone(&ctx),
                shutdown_rx.clone(),
            ));

            tracing::info!(
                tenant_id = %tenant.id,
                render_concurrency = tenant.concurrency,
                notification_concurrency = config.notification_concurrency,
                "Provisioned tenant queues"
            );

            queues.insert(
                tenant.id.clone(),
                TenantQueuePair {
                    render,
                    notification,
                },
            );
        }

        Self {
            queues,
            ctx,
            max_attempts: config.max_attempts.max(1),
            shutdown,
            dispatchers,
        }
    }

    fn pair(&self, tenant_id: &str) -> AppResult<&TenantQueuePair> {
        self.queues.get(tenant_id).ok_or_else(|| {
            AppError::queue(format!("No queues provisioned for tenant '{tenant_id}'"))
        })
    }

    /// Queue a render job. Returns the job id immediately; the outcome
    /// is observed through stats, batch status, and the error log.
    pub async fn enqueue_render(
        &self,
        tenant_id: &str,
        document: DocumentRecord,
        opts: EnqueueOptions,
    ) -> AppResult<JobId> {
        self.enqueue(tenant_id, JobKind::Render, document, None, opts)
            .await
    }

    /// Queue a notification job.
    ///
    /// Recipient presence is checked here, synchronously: a job without
    /// a destination address is never enqueued and never retried, but it
    /// still counts against its batch and lands in the error log so bulk
    /// submitters see it.
    pub async fn enqueue_notification(
        &self,
        tenant_id: &str,
        document: DocumentRecord,
        recipient: RecipientData,
        opts: EnqueueOptions,
    ) -> AppResult<JobId> {
        self.pair(tenant_id)?;

        if recipient.recipient().is_none() {
            let message = format!(
                "No recipient email for document {}",
                document.document_number
            );
            tracing::warn!(
                tenant_id,
                document_number = %document.document_number,
                "Rejected notification job with no recipient"
            );
            if let Some(batch_id) = opts.batch_id.as_deref() {
                if let Err(e) = self.ctx.batches.incr_failed(tenant_id, batch_id).await {
                    tracing::error!(tenant_id, batch_id, error = %e, "Failed to record batch failure");
                }
                if let Err(e) = self
                    .ctx
                    .failures
                    .record_failure(
                        tenant_id,
                        JobKind::Notification.as_str(),
                        &document.document_number,
                        &message,
                        Some(batch_id),
                        None,
                    )
                    .await
                {
                    tracing::error!(tenant_id, batch_id, error = %e, "Failed to record rejection");
                }
            }
            return Err(AppError::validation(message));
        }

        self.enqueue(tenant_id, JobKind::Notification, document, Some(recipient), opts)
            .await
    }

    async fn enqueue(
        &self,
        tenant_id: &str,
        kind: JobKind,
        document: DocumentRecord,
        recipient: Option<RecipientData>,
        opts: EnqueueOptions,
    ) -> AppResult<JobId> {
        let queue = Arc::clone(self.pair(tenant_id)?.for_kind(kind));

        let job = Job {
            id: JobId::new(),
            tenant_id: tenant_id.to_string(),
            kind,
            document,
            recipient,
            batch_id: opts.batch_id,
            priority: opts.priority,
            attempts_made: 0,
            max_attempts: self.max_attempts,
            enqueued_at: Utc::now(),
        };
        let id = job.id;

        tracing::debug!(
            job_id = %id,
            tenant_id,
            kind = %kind,
            priority = job.priority,
            batch_id = job.batch_id.as_deref().unwrap_or("-"),
            "Enqueued job"
        );

        queue.push(job, opts.delay).await;
        Ok(id)
    }

    /// Stats for one tenant, both queues combined.
    pub async fn tenant_stats(&self, tenant_id: &str) -> AppResult<QueueStats> {
        let pair = self.pair(tenant_id)?;
        Ok(pair.render.stats().await.merge(pair.notification.stats().await))
    }

    /// Stats for every provisioned tenant.
    pub async fn all_stats(&self) -> HashMap<String, QueueStats> {
        let mut out = HashMap::with_capacity(self.queues.len());
        for (tenant_id, pair) in &self.queues {
            let stats = pair.render.stats().await.merge(pair.notification.stats().await);
            out.insert(tenant_id.clone(), stats);
        }
        out
    }

    /// Pause both queues of a tenant.
    pub async fn pause(&self, tenant_id: &str) -> AppResult<()> {
        let pair = self.pair(tenant_id)?;
        pair.render.pause().await;
        pair.notification.pause().await;
        Ok(())
    }

    /// Resume both queues of a tenant.
    pub async fn resume(&self, tenant_id: &str) -> AppResult<()> {
        let pair = self.pair(tenant_id)?;
        pair.render.resume().await;
        pair.notification.resume().await;
        Ok(())
    }

    /// Drop every waiting job of a tenant. Returns how many were
    /// dropped. In-flight jobs run to completion.
    pub async fn clear(&self, tenant_id: &str) -> AppResult<usize> {
        let pair = self.pair(tenant_id)?;
        let dropped = pair.render.clear().await + pair.notification.clear().await;
        Ok(dropped)
    }

    /// Whether a tenant has provisioned queues.
    pub fn has_tenant(&self, tenant_id: &str) -> bool {
        self.queues.contains_key(tenant_id)
    }

    /// Stop all dispatchers. Waiting jobs stay queued in memory and are
    /// lost with the process; in-flight jobs run to completion.
    pub async fn shutdown(&self) {
        let _ = self.shutdown.send(true);
        tracing::info!("Queue manager shutting down");
    }
}

impl Drop for QueueManager {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
        for handle in &self.dispatchers {
            handle.abort();
        }
    }
}
