//! Papermill server: multi-tenant document generation and notification.
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use papermill_core::config::AppConfig;
use papermill_core::error::AppError;
use papermill_core::tenants::TenantRegistry;
use papermill_core::traits::cache::CacheProvider;

#[tokio::main]
async fn main() {
    let env = std::env::var("PAPERMILL_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!("Loaded configuration (env: {})", env);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Papermill v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Tenants ──────────────────────────────────────────
    let tenants = Arc::new(TenantRegistry::from_config(&config.tenants));
    if tenants.is_empty() {
        tracing::warn!("No tenants configured; enqueue requests will be rejected");
    } else {
        tracing::info!("Loaded {} tenant(s)", tenants.len());
    }

    // ── Step 2: Shared store ─────────────────────────────────────
    tracing::info!(
        "Initializing cache (provider: {})...",
        config.cache.provider
    );
    let cache = Arc::new(papermill_cache::CacheManager::new(&config.cache).await?);
    let store: Arc<dyn CacheProvider> = Arc::clone(&cache) as Arc<dyn CacheProvider>;
    tracing::info!("Cache initialized");

    // ── Step 3: Batch tracking and failure pipeline ──────────────
    let batches = papermill_batch::BatchTracker::new(Arc::clone(&store));
    let notifier = Arc::new(papermill_notify::HttpOwnerNotifier::new(&config.notifier));
    let failures = papermill_notify::FailurePipeline::new(
        Arc::clone(&store),
        batches.clone(),
        notifier,
        &config.queue,
    );

    // ── Step 4: Render pool and artifact store ───────────────────
    tracing::info!(
        "Initializing render pool (engine: {})...",
        config.renderer.base_url
    );
    let backend = Arc::new(papermill_render::backend::http::HttpRenderBackend::new(
        &config.renderer,
    ));
    let pool = Arc::new(papermill_render::RenderPool::new(
        backend as Arc<dyn papermill_render::RenderBackend>,
        &config.renderer,
    ));
    let templater: Arc<dyn papermill_render::Templater> =
        Arc::new(papermill_render::BasicTemplater);
    let artifacts = Arc::new(papermill_render::LocalArtifactStore::new(
        &config.renderer.artifact_dir,
    ));

    tokio::fs::create_dir_all(&config.renderer.artifact_dir)
        .await
        .map_err(|e| {
            AppError::internal(format!(
                "Failed to create artifact dir '{}': {}",
                config.renderer.artifact_dir, e
            ))
        })?;

    // ── Step 5: Mail transports ──────────────────────────────────
    let mailer = papermill_mailer::MailerRegistry::from_config(&config.mailer);

    // ── Step 6: Job handlers and queues ──────────────────────────
    let mut executor = papermill_queue::JobExecutor::new();
    executor.register(Arc::new(papermill_queue::jobs::RenderDocumentHandler::new(
        Arc::clone(&pool),
        Arc::clone(&templater),
        artifacts,
    )));
    executor.register(Arc::new(
        papermill_queue::jobs::SendNotificationHandler::new(
            mailer.clone(),
            Arc::clone(&pool),
            Arc::clone(&templater),
        ),
    ));

    let manager = Arc::new(papermill_queue::QueueManager::new(
        tenants.as_ref(),
        &config.queue,
        executor,
        batches.clone(),
        failures.clone(),
    ));
    tracing::info!("Queue manager started");

    // ── Step 7: Build and start HTTP server ──────────────────────
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let state = papermill_api::AppState {
        config: Arc::new(config),
        tenants,
        cache,
        manager: Arc::clone(&manager),
        batches,
        failures,
        mailer,
    };
    let app = papermill_api::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!("Papermill server listening on {}", addr);

    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
    });

    server
        .await
        .map_err(|e| AppError::internal(format!("Server error: {}", e)))?;

    // ── Step 8: Stop background work ─────────────────────────────
    manager.shutdown().await;
    pool.shutdown().await;

    tracing::info!("Papermill server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
