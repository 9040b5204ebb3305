use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

use stronghold_app::{
    config::Config, events::TracingEventPublisher, job_registry::AppJobRegistry,
    jobs::worker::JobWorker,
};
use stronghold_db::{establish_connection_pool, uow::PostgresUnitOfWorkProvider};

mod logs;
use logs::setup_logging;

#[tokio::main]
#[cfg(not(tarpaulin_include))]
async fn main() -> anyhow::Result<()> {
    let _log_guard = setup_logging();
    let (config, worker) = setup_app().await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handles = worker.run(shutdown_rx);
    info!(
        workers = config.worker_count,
        server_speed = config.server_speed,
        "Stronghold simulation core started"
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested, waiting for workers");
    shutdown_tx.send(true)?;
    for handle in handles {
        handle.await?;
    }

    info!("Stronghold stopped");
    Ok(())
}

async fn setup_app() -> anyhow::Result<(Arc<Config>, Arc<JobWorker>)> {
    let config = Arc::new(Config::from_env());
    let db_pool = establish_connection_pool().await?;

    sqlx::migrate!("../migrations").run(&db_pool).await?;

    let uow_provider = Arc::new(PostgresUnitOfWorkProvider::new(db_pool));
    let app_registry = Arc::new(AppJobRegistry::new());
    let worker = Arc::new(JobWorker::new(
        uow_provider,
        app_registry,
        config.clone(),
        Arc::new(TracingEventPublisher),
    ));

    Ok((config, worker))
}
