// SPDX-License-Identifier: GPL-3.0-only
//! Key/value side tables: `transients` (values with an expiry) and `options`
//! (permanent values). Used by the sync lock and the run logs.
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

use crate::store::sqlite::format_timestamp;

pub async fn init_schema(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transients (
            name TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            expires_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS options (
            name TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Unexpired value of a transient
pub async fn get_transient(pool: &SqlitePool, name: &str, now: DateTime<Utc>) -> anyhow::Result<Option<String>> {
    let row = sqlx::query("SELECT value FROM transients WHERE name = ?1 AND expires_at > ?2")
        .bind(name)
        .bind(format_timestamp(&now))
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|row| row.get("value")))
}

pub async fn set_transient(
    pool: &SqlitePool,
    name: &str,
    value: &str,
    expires_at: DateTime<Utc>,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO transients (name, value, expires_at) VALUES (?1, ?2, ?3)
        ON CONFLICT(name) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at
        "#,
    )
    .bind(name)
    .bind(value)
    .bind(format_timestamp(&expires_at))
    .execute(pool)
    .await?;
    Ok(())
}

/// Drop every transient whose name starts with `prefix` and that has expired
pub async fn purge_expired(pool: &SqlitePool, prefix: &str, now: DateTime<Utc>) -> anyhow::Result<u64> {
    let result = sqlx::query("DELETE FROM transients WHERE substr(name, 1, length(?1)) = ?1 AND expires_at <= ?2")
        .bind(prefix)
        .bind(format_timestamp(&now))
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn get_option(pool: &SqlitePool, name: &str) -> anyhow::Result<Option<String>> {
    let row = sqlx::query("SELECT value FROM options WHERE name = ?1")
        .bind(name)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|row| row.get("value")))
}

pub async fn set_option(pool: &SqlitePool, name: &str, value: &str) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO options (name, value) VALUES (?1, ?2)
        ON CONFLICT(name) DO UPDATE SET value = excluded.value
        "#,
    )
    .bind(name)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}
