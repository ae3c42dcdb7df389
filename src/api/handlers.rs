// SPDX-License-Identifier: GPL-3.0-only
use axum::extract::Path;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::runlog::RunLogStore;
use crate::sync::{ReconciliationEngine, RunSummary, SyncError};

const MISSING_LOG: &str = "No sync log available for this date.";

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SyncStatus {
    pub running: bool,
    pub adapter: &'static str,
    pub last_run: Option<RunSummary>,
}

pub struct ApiHandlers {
    engine: Arc<ReconciliationEngine>,
    run_logs: Arc<dyn RunLogStore>,
}

impl ApiHandlers {
    pub fn new(engine: Arc<ReconciliationEngine>, run_logs: Arc<dyn RunLogStore>) -> Self {
        Self { engine, run_logs }
    }
}

impl ApiHandlers {
    pub async fn health() -> Json<ApiResponse<&'static str>> {
        Json(ApiResponse::success("ok"))
    }

    /// Start a run in the background
    pub async fn start_sync(&self) -> Result<(StatusCode, Json<ApiResponse<String>>), StatusCode> {
        match self.engine.is_running().await {
            Ok(true) => return Err(StatusCode::CONFLICT),
            Ok(false) => {}
            Err(e) => {
                error!(error = %e, "Failed to read sync lock");
                return Err(StatusCode::INTERNAL_SERVER_ERROR);
            }
        }

        info!("Sync requested through the local API");
        let engine = Arc::clone(&self.engine);
        tokio::spawn(async move {
            match engine.run_sync().await {
                Ok(summary) => info!(run = %summary.run, state = ?summary.state, "Requested sync done"),
                Err(SyncError::AlreadyRunning) => warn!("Requested sync lost the race for the lock"),
                Err(e) => error!(error = %e, "Requested sync failed"),
            }
        });

        Ok((
            StatusCode::ACCEPTED,
            Json(ApiResponse::success("Sync started".to_string())),
        ))
    }

    pub async fn sync_status(&self) -> Result<Json<ApiResponse<SyncStatus>>, StatusCode> {
        match self.engine.is_running().await {
            Ok(running) => Ok(Json(ApiResponse::success(SyncStatus {
                running,
                adapter: self.engine.adapter_name(),
                last_run: self.engine.last_run().await,
            }))),
            Err(e) => {
                error!(error = %e, "Failed to read sync lock");
                Err(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    pub async fn list_logs(&self) -> Result<Json<ApiResponse<Vec<String>>>, StatusCode> {
        match self.run_logs.history().await {
            Ok(history) => Ok(Json(ApiResponse::success(history))),
            Err(e) => {
                error!(error = %e, "Failed to list run logs");
                Err(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    /// Lines of one run, or a single placeholder line once the log has expired
    pub async fn get_log(
        &self,
        Path(date): Path<String>,
    ) -> Result<Json<ApiResponse<Vec<String>>>, StatusCode> {
        match self.run_logs.load(&date).await {
            Ok(Some(lines)) => Ok(Json(ApiResponse::success(lines))),
            Ok(None) => Ok(Json(ApiResponse::success(vec![MISSING_LOG.to_string()]))),
            Err(e) => {
                error!(error = %e, date = %date, "Failed to load run log");
                Err(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}
