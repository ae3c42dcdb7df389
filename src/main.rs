// SPDX-License-Identifier: GPL-3.0-only
mod adapter;
mod api;
mod catalog;
mod config;
mod lock;
mod logging;
mod photos;
mod runlog;
mod store;
mod sync;

#[cfg(test)]
mod test_helpers;

use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};

use adapter::{select_adapter, HostInfo};
use api::HttpServer;
use catalog::{LsiCatalogClient, RemoteCatalog};
use config::Config;
use lock::{SqliteLock, SyncLock};
use logging::setup_logging;
use photos::{HttpPhotoFetcher, PhotoFetcher};
use runlog::{RunLogStore, SqliteRunLogStore};
use store::{LocalStore, SqliteStore};
use sync::{spawn_scheduler, ReconciliationEngine, SyncContext, SyncError};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load()?;
    config.validate()?;

    // Initialize logging
    setup_logging(&config.log_level)?;

    info!("Starting estate-sync v{}", env!("CARGO_PKG_VERSION"));

    let once = std::env::args().skip(1).any(|arg| arg == "--once");

    // Shared database for records, the sync lock and run logs
    let pool = store::sqlite::connect(&config.store_db_path).await?;
    info!("Store opened at {}", config.store_db_path.display());

    let local_store: Arc<dyn LocalStore> =
        Arc::new(SqliteStore::new(pool.clone(), config.upload_dir.clone()).await?);
    let lock: Arc<dyn SyncLock> = Arc::new(SqliteLock::new(pool.clone(), config.lock_ttl()).await?);
    let run_logs: Arc<dyn RunLogStore> = Arc::new(
        SqliteRunLogStore::new(pool, config.log_retention(), config.log_history_len).await?,
    );

    let catalog: Arc<dyn RemoteCatalog> = Arc::new(LsiCatalogClient::from_config(&config)?);
    let photo_fetcher: Arc<dyn PhotoFetcher> = Arc::new(HttpPhotoFetcher::new(
        Duration::from_secs(config.photo_timeout_secs),
        config.photo_download_retries,
    )?);

    let host = HostInfo {
        theme: config.theme.clone(),
    };
    let adapter = select_adapter(&host).ok_or(SyncError::NoCompatibleAdapter)?;

    let config = Arc::new(config);
    let engine = Arc::new(ReconciliationEngine::new(SyncContext {
        config: Arc::clone(&config),
        catalog,
        store: local_store,
        lock,
        run_logs: Arc::clone(&run_logs),
        photos: photo_fetcher,
        adapter,
    })?);

    if once {
        let summary = engine.run_sync().await?;
        info!(run = %summary.run, state = ?summary.state, "Single run complete");
        return Ok(());
    }

    // Spawn tasks
    let scheduler_task = spawn_scheduler(Arc::clone(&engine), config.auto_sync_interval);
    if scheduler_task.is_none() {
        info!("Automatic sync disabled, runs are only started through the local API");
    }

    let http_server = HttpServer::new(Arc::clone(&engine), run_logs, config.local_api_bind);
    let http_task = tokio::spawn(async move {
        if let Err(e) = http_server.serve().await {
            error!(error = %e, "HTTP server error");
        }
    });

    info!("All services started. Waiting for shutdown signal...");

    // Wait for shutdown signal
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received shutdown signal (Ctrl+C)");
        }
        Err(err) => {
            error!(error = %err, "Unable to listen for shutdown signal");
        }
    }

    info!("Initiating shutdown...");

    if let Some(task) = scheduler_task {
        task.abort();
    }
    http_task.abort();

    info!("Shutdown complete");
    Ok(())
}
