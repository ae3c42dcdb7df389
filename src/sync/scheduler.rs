// SPDX-License-Identifier: GPL-3.0-only
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info};

use crate::config::AutoSyncInterval;
use crate::sync::engine::ReconciliationEngine;
use crate::sync::error::SyncError;

/// Start the periodic trigger, unless automatic sync is disabled
pub fn spawn_scheduler(engine: Arc<ReconciliationEngine>, interval: AutoSyncInterval) -> Option<JoinHandle<()>> {
    let period = interval.period()?;
    info!(interval = ?interval, "Scheduled sync enabled");
    Some(tokio::spawn(run_every(engine, period)))
}

/// Trigger a run every `period`, the first one a full period after start
pub async fn run_every(engine: Arc<ReconciliationEngine>, period: Duration) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        // A panicking run must not take the schedule down with it
        let run = tokio::spawn({
            let engine = Arc::clone(&engine);
            async move { engine.run_sync().await }
        });
        let outcome = run
            .await
            .unwrap_or_else(|e| Err(SyncError::Internal(format!("Sync task failed: {}", e))));

        match outcome {
            Ok(summary) => info!(run = %summary.run, state = ?summary.state, "Scheduled sync done"),
            Err(SyncError::AlreadyRunning) => info!("Scheduled sync skipped, a run is in progress"),
            Err(e) => error!(error = %e, "Scheduled sync failed"),
        }
    }
}
