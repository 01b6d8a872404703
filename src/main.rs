use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::watch;

use fleet_savings::app;
use fleet_savings::config::AppConfig;
use fleet_savings::db;
use fleet_savings::external::castai::CastAiClient;
use fleet_savings::external::cost_provider::CostReportSource;
use fleet_savings::jobs::system_clock;
use fleet_savings::jobs::worker::{JobDependencies, Worker};
use fleet_savings::logging::{init_logging, LoggingConfig};
use fleet_savings::services::job_scheduler_service::{JobSchedulerService, MaintenanceContext};
use fleet_savings::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    init_logging(LoggingConfig::from_env())
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    let config = AppConfig::from_env();
    config.validate().map_err(anyhow::Error::msg)?;

    let pool = db::connect(&config.database_url, 5)
        .await
        .with_context(|| format!("failed to open database {}", config.database_url))?;
    tracing::info!("🗄️ Database ready at {}", config.database_url);

    let state = AppState::new(pool.clone());

    let cost_source: Arc<dyn CostReportSource> = Arc::new(
        CastAiClient::new(&config.cost_api_base_url).context("invalid COST_API_BASE_URL")?,
    );
    tracing::info!("📊 Using cost report API at {}", config.cost_api_base_url);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = Worker::new(
        state.queue.clone(),
        JobDependencies {
            pool: pool.clone(),
            cost_source,
            output_dir: config.report_output_dir.clone(),
            clock: system_clock(),
        },
        config.worker_config(),
    );
    let worker_handle = tokio::spawn(worker.run(shutdown_rx));

    let mut scheduler = if config.scheduler_enabled {
        let mut scheduler = JobSchedulerService::new(MaintenanceContext {
            queue: state.queue.clone(),
            retention_days: config.job_retention_days,
        })
        .await?;
        scheduler.start(&config.maintenance_schedule()).await?;
        Some(scheduler)
    } else {
        tracing::info!("⏸️ Job scheduler disabled (JOB_SCHEDULER_ENABLED=false)");
        None
    };

    let app = app::create_app(state);
    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!("🚀 Fleet savings backend running at http://{}/", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down...");
    if let Some(scheduler) = scheduler.as_mut() {
        if let Err(e) = scheduler.stop().await {
            tracing::warn!("Scheduler did not stop cleanly: {}", e);
        }
    }
    // The worker finishes its current job before exiting.
    let _ = shutdown_tx.send(true);
    if let Err(e) = worker_handle.await {
        tracing::error!("Worker task ended abnormally: {}", e);
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
