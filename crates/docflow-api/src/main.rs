//! Axum API server binary. Runs the job executor in-process.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use docflow_api::{create_router, metrics, ApiConfig, AppState};
use docflow_db::{JobRepository, SqliteJobRepository};
use docflow_storage::FileStorage;
use docflow_worker::{recover_orphaned_jobs, JobExecutor, ProcessingContext, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    info!("Starting docflow-api");

    let config = ApiConfig::from_env();
    let worker_config = WorkerConfig::from_env();
    info!(
        "API config: host={}, port={}, environment={}",
        config.host, config.port, config.environment
    );
    info!(
        "Worker config: max_jobs={}, storage_root={}, database={}, stale_job_policy={}",
        worker_config.max_concurrent_jobs,
        worker_config.storage.root.display(),
        worker_config.database_path.display(),
        worker_config.stale_job_policy
    );

    let metrics_handle = if config.metrics_enabled {
        info!("Prometheus metrics enabled at /metrics");
        Some(metrics::init_metrics().context("failed to install Prometheus recorder")?)
    } else {
        None
    };

    let storage = FileStorage::from_config(&worker_config.storage);
    storage
        .ensure_layout()
        .await
        .context("failed to prepare storage root")?;

    let repo: Arc<dyn JobRepository> = Arc::new(
        SqliteJobRepository::open(&worker_config.database_path)
            .context("failed to open job database")?,
    );

    let (queue, receiver) = docflow_queue::channel();

    // Must finish before the listener accepts requests
    let report = recover_orphaned_jobs(repo.as_ref(), &queue, worker_config.stale_job_policy)
        .await
        .context("failed to recover orphaned jobs")?;
    if report.found > 0 {
        info!(
            found = report.found,
            requeued = report.requeued,
            failed = report.failed,
            "Orphaned job recovery finished"
        );
    }

    let ctx = ProcessingContext::from_config(&worker_config, Arc::clone(&repo));
    let executor = JobExecutor::new(worker_config.clone(), ctx);
    let executor_shutdown = executor.shutdown_handle();
    let executor_task = tokio::spawn(async move { executor.run(receiver).await });

    let state = AppState::new(
        config.clone(),
        repo,
        storage,
        queue,
        worker_config.tools.clone(),
    );
    let app = create_router(state, metrics_handle);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid bind address")?;

    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    executor_shutdown.shutdown();
    match executor_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("Job executor failed: {}", e),
        Err(e) => error!("Job executor task panicked: {}", e),
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Colored output for development, JSON when `LOG_FORMAT=json`.
fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("docflow=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
