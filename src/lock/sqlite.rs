// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::sqlite::SqlitePool;
use tracing::debug;

use crate::lock::traits::SyncLock;
use crate::store::kv;
use crate::store::sqlite::format_timestamp;

const LOCK_NAME: &str = "estate_sync_lock";

/// Lock stored as a transient row; an expired row counts as free
pub struct SqliteLock {
    pool: SqlitePool,
    ttl: Duration,
}

impl SqliteLock {
    pub async fn new(pool: SqlitePool, ttl: Duration) -> anyhow::Result<Self> {
        kv::init_schema(&pool).await?;
        Ok(Self { pool, ttl })
    }
}

#[async_trait]
impl SyncLock for SqliteLock {
    async fn acquire(&self, holder: &str) -> anyhow::Result<bool> {
        let now = Utc::now();

        // Single statement: the row is only taken over when it is ours or stale.
        let result = sqlx::query(
            r#"
            INSERT INTO transients (name, value, expires_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(name) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at
            WHERE transients.value = excluded.value OR transients.expires_at <= ?4
            "#,
        )
        .bind(LOCK_NAME)
        .bind(holder)
        .bind(format_timestamp(&(now + self.ttl)))
        .bind(format_timestamp(&now))
        .execute(&self.pool)
        .await?;

        let acquired = result.rows_affected() == 1;
        debug!(holder = %holder, acquired, "Sync lock acquire");
        Ok(acquired)
    }

    async fn release(&self, holder: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM transients WHERE name = ?1 AND (value = ?2 OR expires_at <= ?3)")
            .bind(LOCK_NAME)
            .bind(holder)
            .bind(format_timestamp(&Utc::now()))
            .execute(&self.pool)
            .await?;

        debug!(holder = %holder, "Sync lock released");
        Ok(())
    }

    async fn is_held(&self) -> anyhow::Result<bool> {
        Ok(kv::get_transient(&self.pool, LOCK_NAME, Utc::now()).await?.is_some())
    }
}
