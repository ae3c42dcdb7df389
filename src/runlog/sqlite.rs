// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::sqlite::SqlitePool;
use tracing::{debug, warn};

use crate::runlog::models::RunLog;
use crate::runlog::traits::RunLogStore;
use crate::store::kv;

const LOG_PREFIX: &str = "estate_sync_log_";
const HISTORY_OPTION: &str = "estate_sync_log_history";

pub struct SqliteRunLogStore {
    pool: SqlitePool,
    retention: Duration,
    history_len: usize,
}

impl SqliteRunLogStore {
    pub async fn new(pool: SqlitePool, retention: Duration, history_len: usize) -> anyhow::Result<Self> {
        kv::init_schema(&pool).await?;
        Ok(Self {
            pool,
            retention,
            history_len,
        })
    }

    fn transient_name(key: &str) -> String {
        format!("{}{}", LOG_PREFIX, key)
    }
}

#[async_trait]
impl RunLogStore for SqliteRunLogStore {
    async fn persist(&self, log: &RunLog) -> anyhow::Result<()> {
        let now = Utc::now();
        let key = log.key();

        let lines = serde_json::to_string(log.lines())?;
        kv::set_transient(&self.pool, &Self::transient_name(&key), &lines, now + self.retention).await?;

        let mut history = self.history().await?;
        history.retain(|existing| existing != &key);
        history.insert(0, key.clone());
        history.truncate(self.history_len);
        kv::set_option(&self.pool, HISTORY_OPTION, &serde_json::to_string(&history)?).await?;

        let purged = kv::purge_expired(&self.pool, LOG_PREFIX, now).await?;
        debug!(key = %key, lines = log.lines().len(), purged, "Persisted run log");
        Ok(())
    }

    async fn history(&self) -> anyhow::Result<Vec<String>> {
        let Some(raw) = kv::get_option(&self.pool, HISTORY_OPTION).await? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str(&raw) {
            Ok(history) => Ok(history),
            Err(e) => {
                warn!(error = %e, "Discarding unreadable run log history");
                Ok(Vec::new())
            }
        }
    }

    async fn load(&self, key: &str) -> anyhow::Result<Option<Vec<String>>> {
        match kv::get_transient(&self.pool, &Self::transient_name(key), Utc::now()).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}
