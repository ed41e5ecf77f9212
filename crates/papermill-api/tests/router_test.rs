//! Router-level tests over an in-memory store and a mock render backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use papermill_api::{build_router, AppState};
use papermill_batch::BatchTracker;
use papermill_cache::memory::MemoryCacheProvider;
use papermill_cache::CacheManager;
use papermill_core::config::tenant::{TenantConfig, TenantsConfig};
use papermill_core::config::AppConfig;
use papermill_core::tenants::TenantRegistry;
use papermill_core::traits::cache::CacheProvider;
use papermill_mailer::MailerRegistry;
use papermill_notify::notifier::{FailureNote, OwnerNotifier};
use papermill_notify::FailurePipeline;
use papermill_queue::jobs::{RenderDocumentHandler, SendNotificationHandler};
use papermill_queue::{JobExecutor, JobHandler, QueueManager};
use papermill_render::testing::{MockBackend, MockBehavior};
use papermill_render::{
    BasicTemplater, LocalArtifactStore, RenderBackend, RenderPool, Templater,
};

#[derive(Debug)]
struct NoopNotifier;

#[async_trait]
impl OwnerNotifier for NoopNotifier {
    async fn notify(&self, _note: &FailureNote) -> papermill_core::result::AppResult<()> {
        Ok(())
    }
}

fn test_app() -> Router {
    let mut config = AppConfig::default();
    config.queue.backoff_base_ms = 10;
    config.tenants = TenantsConfig {
        entries: vec![TenantConfig {
            id: "t1".to_string(),
            display_name: "Tenant One".to_string(),
            concurrency: 2,
            rate_limit_per_minute: 100,
            email_rate_limit_per_minute: 50,
        }],
        default_tenant: Some("t1".to_string()),
    };

    let store: Arc<dyn CacheProvider> =
        Arc::new(MemoryCacheProvider::new(&config.cache.memory, 300));
    let cache = Arc::new(CacheManager::from_provider(Arc::clone(&store)));
    let batches = BatchTracker::new(Arc::clone(&store));
    let failures = FailurePipeline::new(
        Arc::clone(&store),
        batches.clone(),
        Arc::new(NoopNotifier),
        &config.queue,
    );

    let backend = Arc::new(MockBackend::new(MockBehavior::default()));
    let pool = Arc::new(RenderPool::new(
        backend as Arc<dyn RenderBackend>,
        &config.renderer,
    ));
    let templater: Arc<dyn Templater> = Arc::new(BasicTemplater);
    let artifacts = Arc::new(LocalArtifactStore::new(
        std::env::temp_dir().join(format!("papermill-api-test-{}", uuid_suffix())),
    ));
    let mailer = MailerRegistry::from_config(&config.mailer);

    let mut executor = JobExecutor::new();
    executor.register(Arc::new(RenderDocumentHandler::new(
        Arc::clone(&pool),
        Arc::clone(&templater),
        artifacts,
    )) as Arc<dyn JobHandler>);
    executor.register(Arc::new(SendNotificationHandler::new(
        mailer.clone(),
        Arc::clone(&pool),
        Arc::clone(&templater),
    )) as Arc<dyn JobHandler>);

    let tenants = Arc::new(TenantRegistry::from_config(&config.tenants));
    let manager = Arc::new(QueueManager::new(
        tenants.as_ref(),
        &config.queue,
        executor,
        batches.clone(),
        failures.clone(),
    ));

    build_router(AppState {
        config: Arc::new(config),
        tenants,
        cache,
        manager,
        batches,
        failures,
        mailer,
    })
}

fn uuid_suffix() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos()
}

async fn request(
    app: &Router,
    method: &str,
    path: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(path);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn test_health() {
    let app = test_app();
    let (status, body) = request(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_generate_pdf_requires_document() {
    let app = test_app();
    let (status, body) = request(
        &app,
        "POST",
        "/generate-invoice-pdf",
        Some(json!({ "tenantId": "t1" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_generate_pdf_queues_with_default_tenant() {
    let app = test_app();
    let (status, body) = request(
        &app,
        "POST",
        "/generate-invoice-pdf",
        Some(json!({ "document": { "document_number": "INV-1", "client": "Acme" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["tenantId"], "t1");
    assert_eq!(body["status"], "queued");
    assert!(body["jobId"].as_str().is_some());
}

#[tokio::test]
async fn test_send_email_requires_recipient() {
    let app = test_app();
    let (status, _) = request(
        &app,
        "POST",
        "/send-invoice-email",
        Some(json!({ "document": { "document_number": "INV-1" } })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = request(
        &app,
        "POST",
        "/send-invoice-email",
        Some(json!({
            "document": { "document_number": "INV-1" },
            "emailData": { "to": "" },
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_bulk_emails_skip_entries_without_recipient() {
    let app = test_app();
    let (status, body) = request(
        &app,
        "POST",
        "/send-bulk-emails",
        Some(json!({
            "documents": [
                {
                    "document": { "document_number": "INV-1" },
                    "emailData": { "to": "a@example.com" },
                },
                {
                    "document": { "document_number": "INV-2" },
                },
            ],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["jobIds"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_bulk_pdfs_queue_every_document() {
    let app = test_app();

    let (status, body) = request(&app, "POST", "/generate-bulk-pdfs", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    let (status, body) = request(
        &app,
        "POST",
        "/generate-bulk-pdfs",
        Some(json!({
            "documents": [
                { "document_number": "INV-1", "client": "Acme" },
                { "document_number": "INV-2", "client": "Acme" },
            ],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["jobIds"].as_array().unwrap().len(), 2);
    assert_eq!(body["tenantId"], "t1");
}

#[tokio::test]
async fn test_batch_start_validation_and_status() {
    let app = test_app();

    let (status, _) = request(
        &app,
        "POST",
        "/queue/batch/start",
        Some(json!({ "batchId": "b1" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = request(&app, "GET", "/queue/batch/t1/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = request(
        &app,
        "POST",
        "/queue/batch/start",
        Some(json!({ "batchId": "b1", "total": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = request(&app, "GET", "/queue/batch/t1/b1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(body["data"]["pending"], 2);
}

#[tokio::test]
async fn test_batched_render_jobs_complete() {
    let app = test_app();

    let (status, _) = request(
        &app,
        "POST",
        "/queue/batch/start",
        Some(json!({ "batchId": "b2", "total": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    for number in ["INV-1", "INV-2"] {
        let (status, _) = request(
            &app,
            "POST",
            "/generate-invoice-pdf",
            Some(json!({
                "document": { "document_number": number },
                "batchId": "b2",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let (_, body) = request(&app, "GET", "/queue/batch/t1/b2", None).await;
        if body["data"]["pending"] == 0 {
            assert_eq!(body["data"]["completed"], 2);
            assert_eq!(body["data"]["failed"], 0);
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "batch never drained");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn test_stats_and_controls() {
    let app = test_app();

    let (status, body) = request(&app, "GET", "/queue/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["t1"].is_object());

    let (status, _) = request(&app, "GET", "/tenant/ghost/stats", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = request(&app, "POST", "/tenant/t1/pause", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = request(&app, "POST", "/tenant/t1/clear", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dropped"], 0);

    let (status, _) = request(&app, "POST", "/tenant/t1/resume", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_recent_errors_empty() {
    let app = test_app();
    let (status, body) = request(&app, "GET", "/queue/errors/t1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);

    let (status, body) = request(&app, "GET", "/queue/errors/t1/b9?limit=5", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn test_email_verify_reports_unconfigured_transport() {
    let app = test_app();
    let (status, body) = request(&app, "GET", "/email/verify/t1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
}
