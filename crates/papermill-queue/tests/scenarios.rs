//! End-to-end queue scenarios over an in-memory store: batch accounting
//! under retries, recipient validation, and queue controls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use papermill_batch::{BatchMeta, BatchTracker};
use papermill_cache::memory::MemoryCacheProvider;
use papermill_core::config::cache::MemoryCacheConfig;
use papermill_core::config::queue::QueueConfig;
use papermill_core::config::tenant::{TenantConfig, TenantsConfig};
use papermill_core::tenants::TenantRegistry;
use papermill_core::traits::cache::CacheProvider;
use papermill_core::types::document::{DocumentRecord, RecipientData};
use papermill_notify::notifier::{FailureNote, OwnerNotifier};
use papermill_notify::FailurePipeline;
use papermill_queue::{
    EnqueueOptions, Job, JobExecutionError, JobExecutor, JobHandler, JobKind, QueueManager,
};

#[derive(Debug)]
struct NoopNotifier;

#[async_trait]
impl OwnerNotifier for NoopNotifier {
    async fn notify(&self, _note: &FailureNote) -> papermill_core::result::AppResult<()> {
        Ok(())
    }
}

/// Scripted handler: behavior keyed by document number prefix.
///
/// - `always-fail-*` fails transiently on every attempt
/// - `retry-once-*` fails transiently on the first attempt only
/// - anything else succeeds
#[derive(Debug, Default)]
struct ScriptedRenderHandler {
    attempts: Mutex<HashMap<String, u32>>,
}

impl ScriptedRenderHandler {
    fn attempts_for(&self, number: &str) -> u32 {
        self.attempts
            .lock()
            .unwrap()
            .get(number)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl JobHandler for ScriptedRenderHandler {
    fn kind(&self) -> JobKind {
        JobKind::Render
    }

    async fn execute(&self, job: &Job) -> Result<Value, JobExecutionError> {
        let number = job.document.document_number.clone();
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let n = attempts.entry(number.clone()).or_insert(0);
            *n += 1;
            *n
        };

        if number.starts_with("always-fail") {
            Err(JobExecutionError::Transient(
                "render backend unavailable".to_string(),
            ))
        } else if number.starts_with("retry-once") && attempt == 1 {
            Err(JobExecutionError::Transient("transient glitch".to_string()))
        } else {
            Ok(serde_json::json!({ "success": true }))
        }
    }
}

struct Harness {
    manager: QueueManager,
    batches: BatchTracker,
    failures: FailurePipeline,
    handler: Arc<ScriptedRenderHandler>,
}

fn harness() -> Harness {
    let store: Arc<dyn CacheProvider> =
        Arc::new(MemoryCacheProvider::new(&MemoryCacheConfig::default(), 300));
    let batches = BatchTracker::new(Arc::clone(&store));
    let queue_config = QueueConfig {
        backoff_base_ms: 10,
        ..Default::default()
    };
    let failures = FailurePipeline::new(
        Arc::clone(&store),
        batches.clone(),
        Arc::new(NoopNotifier),
        &queue_config,
    );

    let registry = TenantRegistry::from_config(&TenantsConfig {
        entries: vec![TenantConfig {
            id: "t1".to_string(),
            display_name: "Tenant One".to_string(),
            concurrency: 3,
            rate_limit_per_minute: 100,
            email_rate_limit_per_minute: 50,
        }],
        default_tenant: Some("t1".to_string()),
    });

    let handler = Arc::new(ScriptedRenderHandler::default());
    let mut executor = JobExecutor::new();
    executor.register(Arc::clone(&handler) as Arc<dyn JobHandler>);

    let manager = QueueManager::new(
        &registry,
        &queue_config,
        executor,
        batches.clone(),
        failures.clone(),
    );

    Harness {
        manager,
        batches,
        failures,
        handler,
    }
}

fn document(number: &str) -> DocumentRecord {
    DocumentRecord::new(number, serde_json::json!({ "client": "Acme" }))
}

/// Poll until the tenant queue is fully drained.
async fn drain(manager: &QueueManager, tenant: &str) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let stats = manager.tenant_stats(tenant).await.unwrap();
        if stats.waiting == 0 && stats.active == 0 {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "queue did not drain: {stats:?}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_unknown_tenant_is_rejected() {
    let h = harness();
    let err = h
        .manager
        .enqueue_render("ghost", document("INV-1"), EnqueueOptions::default())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("ghost"));
}

#[tokio::test]
async fn test_transient_failure_retries_then_succeeds() {
    let h = harness();
    h.manager
        .enqueue_render("t1", document("retry-once-1"), EnqueueOptions::default())
        .await
        .unwrap();

    drain(&h.manager, "t1").await;

    let stats = h.manager.tenant_stats("t1").await.unwrap();
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.failed, 0);
    assert_eq!(h.handler.attempts_for("retry-once-1"), 2);
}

#[tokio::test]
async fn test_batch_scenario_two_successes_one_double_failure() {
    let h = harness();
    h.batches
        .start_batch("t1", "b1", 3, &BatchMeta::default())
        .await
        .unwrap();

    for number in ["INV-1", "INV-2", "always-fail-1"] {
        h.manager
            .enqueue_render("t1", document(number), EnqueueOptions::for_batch("b1"))
            .await
            .unwrap();
    }

    drain(&h.manager, "t1").await;

    let status = h.batches.status("t1", "b1").await.unwrap().unwrap();
    assert_eq!(status.total, 3);
    assert_eq!(status.completed, 2);
    assert_eq!(status.failed, 1);
    assert_eq!(status.pending, 0);

    // The failed job exhausted both attempts but was finalized once.
    assert_eq!(h.handler.attempts_for("always-fail-1"), 2);
    let errors = h.failures.recent_errors("t1", Some("b1"), 50).await.unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].document_number, "always-fail-1");
    assert_eq!(errors[0].job_kind, "render-document");
}

#[tokio::test]
async fn test_missing_recipient_fails_synchronously_and_counts() {
    let h = harness();
    h.batches
        .start_batch("t1", "b2", 1, &BatchMeta::default())
        .await
        .unwrap();

    let err = h
        .manager
        .enqueue_notification(
            "t1",
            document("INV-9"),
            RecipientData::default(),
            EnqueueOptions::for_batch("b2"),
        )
        .await
        .unwrap_err();
    assert!(err.to_string().contains("recipient"));

    let status = h.batches.status("t1", "b2").await.unwrap().unwrap();
    assert_eq!(status.failed, 1);
    assert_eq!(status.pending, 0);

    let errors = h.failures.recent_errors("t1", Some("b2"), 50).await.unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].job_kind, "send-notification");

    // Nothing reached the queue or the handler.
    let stats = h.manager.tenant_stats("t1").await.unwrap();
    assert_eq!(stats.total, 0);
    assert_eq!(h.handler.attempts_for("INV-9"), 0);
}

#[tokio::test]
async fn test_pause_and_clear() {
    let h = harness();
    h.manager.pause("t1").await.unwrap();

    for number in ["INV-1", "INV-2", "INV-3"] {
        h.manager
            .enqueue_render("t1", document(number), EnqueueOptions::default())
            .await
            .unwrap();
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    let stats = h.manager.tenant_stats("t1").await.unwrap();
    assert_eq!(stats.waiting, 3);
    assert_eq!(stats.completed, 0);

    let dropped = h.manager.clear("t1").await.unwrap();
    assert_eq!(dropped, 3);

    h.manager.resume("t1").await.unwrap();
    drain(&h.manager, "t1").await;
    let stats = h.manager.tenant_stats("t1").await.unwrap();
    assert_eq!(stats.completed, 0);
    assert_eq!(stats.total, 0);
}

#[tokio::test]
async fn test_drained_stats_imply_settled_batch_counters() {
    let h = harness();
    h.batches
        .start_batch("t1", "b3", 1, &BatchMeta::default())
        .await
        .unwrap();

    h.manager
        .enqueue_render("t1", document("always-fail-2"), EnqueueOptions::for_batch("b3"))
        .await
        .unwrap();

    // As soon as stats report the queue empty, the batch counters and
    // error log must already reflect the terminal failure. No grace
    // sleep here on purpose.
    drain(&h.manager, "t1").await;

    let status = h.batches.status("t1", "b3").await.unwrap().unwrap();
    assert_eq!(status.failed, 1);
    assert_eq!(status.pending, 0);
    let errors = h.failures.recent_errors("t1", Some("b3"), 50).await.unwrap();
    assert_eq!(errors.len(), 1);
}
