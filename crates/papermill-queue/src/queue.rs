//! Per-tenant in-memory queue and the dispatcher that drains it.
//!
//! Each queue holds two heaps: jobs that are dispatchable now, ordered
//! by priority, and delayed jobs ordered by the time they become ready.
//! A single dispatcher task per queue promotes delayed jobs, pops the
//! highest-priority ready job, and runs it under a semaphore so at most
//! `concurrency` jobs of that queue are in flight. Terminal accounting
//! (batch counters, the failure pipeline) happens exactly once per job,
//! here in the runner, never in handlers.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex, Notify, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use papermill_batch::BatchTracker;
use papermill_notify::FailurePipeline;

use crate::executor::JobExecutor;
use crate::job::Job;

/// Snapshot of one queue's counters.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct QueueStats {
    /// Jobs waiting to be dispatched, delayed jobs included.
    pub waiting: usize,
    /// Jobs currently executing.
    pub active: usize,
    /// Jobs that finished successfully.
    pub completed: u64,
    /// Jobs that finalized as failed.
    pub failed: u64,
    /// Everything the queue has seen and not dropped.
    pub total: u64,
}

impl QueueStats {
    /// Combine two snapshots (render + notification queues of a tenant).
    pub fn merge(self, other: QueueStats) -> QueueStats {
        QueueStats {
            waiting: self.waiting + other.waiting,
            active: self.active + other.active,
            completed: self.completed + other.completed,
            failed: self.failed + other.failed,
            total: self.total + other.total,
        }
    }
}

/// A job that is dispatchable now. Max-heap: higher priority first,
/// earlier sequence breaks ties.
#[derive(Debug)]
struct ReadyJob {
    priority: i32,
    seq: u64,
    job: Job,
}

impl PartialEq for ReadyJob {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for ReadyJob {}

impl PartialOrd for ReadyJob {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ReadyJob {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// A job held until its ready time. Stored in a min-heap via `Reverse`.
#[derive(Debug)]
struct DelayedJob {
    ready_at: Instant,
    seq: u64,
    job: Job,
}

impl PartialEq for DelayedJob {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for DelayedJob {}

impl PartialOrd for DelayedJob {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DelayedJob {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ready_at
            .cmp(&other.ready_at)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

#[derive(Debug, Default)]
struct QueueState {
    ready: BinaryHeap<ReadyJob>,
    delayed: BinaryHeap<Reverse<DelayedJob>>,
    paused: bool,
    seq: u64,
}

impl QueueState {
    /// Move every delayed job whose ready time has passed into the
    /// ready heap. Retried jobs keep their original priority.
    fn promote_ready(&mut self, now: Instant) {
        while let Some(Reverse(top)) = self.delayed.peek() {
            if top.ready_at > now {
                break;
            }
            if let Some(Reverse(entry)) = self.delayed.pop() {
                self.ready.push(ReadyJob {
                    priority: entry.job.priority,
                    seq: entry.seq,
                    job: entry.job,
                });
            }
        }
    }
}

/// One tenant's queue for a single job kind.
#[derive(Debug)]
pub struct TenantQueue {
    /// Label for logs, `{tenant}:{kind}`.
    name: String,
    state: Mutex<QueueState>,
    notify: Notify,
    semaphore: Arc<Semaphore>,
    active: AtomicUsize,
    completed: AtomicU64,
    failed: AtomicU64,
}

impl TenantQueue {
    pub fn new(name: impl Into<String>, concurrency: usize) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
            semaphore: Arc::new(Semaphore::new(concurrency.max(1))),
            active: AtomicUsize::new(0),
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Add a job, optionally delayed.
    pub async fn push(&self, job: Job, delay: Option<Duration>) {
        let mut state = self.state.lock().await;
        state.seq += 1;
        let seq = state.seq;
        match delay.filter(|d| !d.is_zero()) {
            Some(delay) => state.delayed.push(Reverse(DelayedJob {
                ready_at: Instant::now() + delay,
                seq,
                job,
            })),
            None => state.ready.push(ReadyJob {
                priority: job.priority,
                seq,
                job,
            }),
        }
        drop(state);
        self.notify.notify_one();
    }

    /// Stop dispatching. In-flight jobs run to completion.
    pub async fn pause(&self) {
        self.state.lock().await.paused = true;
        tracing::info!(queue = %self.name, "Queue paused");
    }

    /// Resume dispatching.
    pub async fn resume(&self) {
        self.state.lock().await.paused = false;
        self.notify.notify_one();
        tracing::info!(queue = %self.name, "Queue resumed");
    }

    /// Drop every waiting job, delayed jobs included. Returns how many
    /// were dropped. In-flight jobs are unaffected.
    pub async fn clear(&self) -> usize {
        let mut state = self.state.lock().await;
        let dropped = state.ready.len() + state.delayed.len();
        state.ready.clear();
        state.delayed.clear();
        drop(state);
        tracing::info!(queue = %self.name, dropped, "Queue cleared");
        dropped
    }

    /// Counter snapshot.
    pub async fn stats(&self) -> QueueStats {
        let state = self.state.lock().await;
        let waiting = state.ready.len() + state.delayed.len();
        drop(state);
        let active = self.active.load(AtomicOrdering::SeqCst);
        let completed = self.completed.load(AtomicOrdering::SeqCst);
        let failed = self.failed.load(AtomicOrdering::SeqCst);
        QueueStats {
            waiting,
            active,
            completed,
            failed,
            total: waiting as u64 + active as u64 + completed + failed,
        }
    }

    /// Wait until a job is dispatchable and pop it. Honors the paused
    /// flag and delayed ready times.
    async fn next_ready(&self) -> Job {
        loop {
            let deadline = {
                let mut state = self.state.lock().await;
                if state.paused {
                    None
                } else {
                    state.promote_ready(Instant::now());
                    if let Some(entry) = state.ready.pop() {
                        return entry.job;
                    }
                    state.delayed.peek().map(|Reverse(top)| top.ready_at)
                }
            };

            match deadline {
                Some(deadline) => {
                    tokio::select! {
                        _ = self.notify.notified() => {}
                        _ = tokio::time::sleep_until(deadline) => {}
                    }
                }
                None => self.notify.notified().await,
            }
        }
    }
}

/// Services shared by every dispatcher: the handler registry, batch
/// counters, and the failure pipeline.
#[derive(Debug)]
pub(crate) struct RunnerContext {
    pub executor: JobExecutor,
    pub batches: BatchTracker,
    pub failures: FailurePipeline,
    pub backoff_base_ms: u64,
}

impl RunnerContext {
    fn backoff(&self, attempts_made: u32) -> Duration {
        let exp = attempts_made.min(16);
        Duration::from_millis(self.backoff_base_ms.saturating_mul(1 << exp))
    }
}

/// Spawn the dispatcher task for one queue. Runs until shutdown.
pub(crate) fn spawn_dispatcher(
    queue: Arc<TenantQueue>,
    ctx: Arc<RunnerContext>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(queue = %queue.name, "Queue dispatcher started");
        loop {
            let permit = match Arc::clone(&queue.semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };

            let job = tokio::select! {
                job = queue.next_ready() => job,
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            };

            // Counted active from the moment it leaves the heap, so a
            // dispatched job is never invisible to stats.
            queue.active.fetch_add(1, AtomicOrdering::SeqCst);
            let queue = Arc::clone(&queue);
            let ctx = Arc::clone(&ctx);
            tokio::spawn(async move {
                run_job(&queue, &ctx, job, permit).await;
            });
        }
    })
}

/// Execute one attempt and settle the outcome. A transient failure with
/// attempts left goes back on the queue with exponential backoff;
/// everything else finalizes here, exactly once.
async fn run_job(
    queue: &TenantQueue,
    ctx: &RunnerContext,
    mut job: Job,
    permit: OwnedSemaphorePermit,
) {
    let outcome = ctx.executor.execute(&job).await;

    match outcome {
        Ok(result) => {
            queue.completed.fetch_add(1, AtomicOrdering::SeqCst);
            if let Some(batch_id) = &job.batch_id {
                if let Err(e) = ctx.batches.incr_completed(&job.tenant_id, batch_id).await {
                    tracing::error!(
                        job_id = %job.id,
                        batch_id = %batch_id,
                        error = %e,
                        "Failed to record batch completion"
                    );
                }
            }
            tracing::info!(
                job_id = %job.id,
                queue = %queue.name,
                result = %result,
                "Job completed"
            );
            // Decremented only after the batch counters have landed, so
            // an empty `active` count always means fully finalized.
            queue.active.fetch_sub(1, AtomicOrdering::SeqCst);
        }
        Err(err) if err.is_transient() && job.attempts_made + 1 < job.max_attempts => {
            let delay = ctx.backoff(job.attempts_made);
            job.attempts_made += 1;
            tracing::warn!(
                job_id = %job.id,
                queue = %queue.name,
                attempt = job.attempts_made,
                max_attempts = job.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = err.message(),
                "Job failed, scheduling retry"
            );
            queue.push(job, Some(delay)).await;
            queue.active.fetch_sub(1, AtomicOrdering::SeqCst);
            drop(permit);
            return;
        }
        Err(err) => {
            queue.failed.fetch_add(1, AtomicOrdering::SeqCst);
            finalize_failure(queue, ctx, &job, err.message()).await;
            queue.active.fetch_sub(1, AtomicOrdering::SeqCst);
        }
    }

    drop(permit);
}

/// Terminal failure bookkeeping: one batch increment, one error-log
/// record, one `failed` event.
async fn finalize_failure(queue: &TenantQueue, ctx: &RunnerContext, job: &Job, message: &str) {
    if let Some(batch_id) = &job.batch_id {
        if let Err(e) = ctx.batches.incr_failed(&job.tenant_id, batch_id).await {
            tracing::error!(
                job_id = %job.id,
                batch_id = %batch_id,
                error = %e,
                "Failed to record batch failure"
            );
        }
    }

    let recipient = job
        .recipient
        .as_ref()
        .and_then(|r| r.recipient())
        .map(str::to_string);

    if let Err(e) = ctx
        .failures
        .record_failure(
            &job.tenant_id,
            job.kind.as_str(),
            &job.document.document_number,
            message,
            job.batch_id.as_deref(),
            recipient.as_deref(),
        )
        .await
    {
        tracing::error!(job_id = %job.id, error = %e, "Failed to record job failure");
    }

    tracing::error!(
        job_id = %job.id,
        queue = %queue.name,
        document_number = %job.document.document_number,
        error = message,
        "Job failed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use papermill_core::types::document::DocumentRecord;
    use papermill_core::types::id::JobId;

    use crate::job::JobKind;

    fn job(priority: i32, number: &str) -> Job {
        Job {
            id: JobId::new(),
            tenant_id: "t1".to_string(),
            kind: JobKind::Render,
            document: DocumentRecord::new(number, serde_json::json!({})),
            recipient: None,
            batch_id: None,
            priority,
            attempts_made: 0,
            max_attempts: 2,
            enqueued_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_priority_order_with_fifo_tiebreak() {
        let queue = TenantQueue::new("t1:render", 1);
        queue.push(job(0, "low-1"), None).await;
        queue.push(job(5, "high"), None).await;
        queue.push(job(0, "low-2"), None).await;

        assert_eq!(queue.next_ready().await.document.document_number, "high");
        assert_eq!(queue.next_ready().await.document.document_number, "low-1");
        assert_eq!(queue.next_ready().await.document.document_number, "low-2");
    }

    #[tokio::test]
    async fn test_delayed_job_does_not_block_ready_job() {
        let queue = TenantQueue::new("t1:render", 1);
        queue
            .push(job(10, "delayed"), Some(Duration::from_millis(50)))
            .await;
        queue.push(job(0, "ready"), None).await;

        assert_eq!(queue.next_ready().await.document.document_number, "ready");
        assert_eq!(
            queue.next_ready().await.document.document_number,
            "delayed"
        );
    }

    #[tokio::test]
    async fn test_pause_holds_dispatch_until_resume() {
        let queue = Arc::new(TenantQueue::new("t1:render", 1));
        queue.pause().await;
        queue.push(job(0, "held"), None).await;

        let waiter = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.next_ready().await })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!waiter.is_finished());

        queue.resume().await;
        let popped = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(popped.document.document_number, "held");
    }

    #[tokio::test]
    async fn test_clear_drops_waiting_jobs() {
        let queue = TenantQueue::new("t1:render", 1);
        queue.push(job(0, "a"), None).await;
        queue.push(job(0, "b"), Some(Duration::from_secs(60))).await;

        assert_eq!(queue.clear().await, 2);
        let stats = queue.stats().await;
        assert_eq!(stats.waiting, 0);
        assert_eq!(stats.total, 0);
    }
}
