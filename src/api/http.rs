// SPDX-License-Identifier: GPL-3.0-only
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use crate::api::handlers::{ApiHandlers, ApiResponse, SyncStatus};
use crate::runlog::RunLogStore;
use crate::sync::ReconciliationEngine;

pub struct HttpServer {
    handlers: ApiHandlers,
    addr: SocketAddr,
}

impl HttpServer {
    pub fn new(
        engine: Arc<ReconciliationEngine>,
        run_logs: Arc<dyn RunLogStore>,
        addr: SocketAddr,
    ) -> Self {
        Self {
            handlers: ApiHandlers::new(engine, run_logs),
            addr,
        }
    }

    pub fn router(handlers: Arc<ApiHandlers>) -> Router {
        Router::new()
            .route("/api/health", get(health_handler))
            .route("/api/sync", post(start_sync_handler))
            .route("/api/sync/status", get(sync_status_handler))
            .route("/api/logs", get(list_logs_handler))
            .route("/api/logs/:date", get(get_log_handler))
            .with_state(handlers)
    }

    pub async fn serve(self) -> anyhow::Result<()> {
        let app = Self::router(Arc::new(self.handlers));

        info!(addr = %self.addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

async fn health_handler() -> Json<ApiResponse<&'static str>> {
    ApiHandlers::health().await
}

async fn start_sync_handler(
    State(handlers): State<Arc<ApiHandlers>>,
) -> Result<(StatusCode, Json<ApiResponse<String>>), StatusCode> {
    handlers.start_sync().await
}

async fn sync_status_handler(
    State(handlers): State<Arc<ApiHandlers>>,
) -> Result<Json<ApiResponse<SyncStatus>>, StatusCode> {
    handlers.sync_status().await
}

async fn list_logs_handler(
    State(handlers): State<Arc<ApiHandlers>>,
) -> Result<Json<ApiResponse<Vec<String>>>, StatusCode> {
    handlers.list_logs().await
}

async fn get_log_handler(
    State(handlers): State<Arc<ApiHandlers>>,
    Path(date): Path<String>,
) -> Result<Json<ApiResponse<Vec<String>>>, StatusCode> {
    handlers.get_log(Path(date)).await
}
