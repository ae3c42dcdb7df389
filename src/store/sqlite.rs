// SPDX-License-Identifier: GPL-3.0-only
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::store::models::{
    Attachment, AttachmentDraft, AttachmentUpdate, FieldValue, LocalRecord, RecordDraft, RecordId,
    RecordStatus,
};
use crate::store::traits::LocalStore;

const PHOTO_SUBDIR: &str = "property-photos";

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS records (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        record_type TEXT NOT NULL,
        title TEXT NOT NULL,
        slug TEXT NOT NULL,
        content TEXT NOT NULL,
        status TEXT NOT NULL,
        author_id INTEGER,
        created_at TEXT NOT NULL,
        modified_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_records_type ON records (record_type, status)",
    r#"
    CREATE TABLE IF NOT EXISTS custom_fields (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        record_id INTEGER NOT NULL,
        field_key TEXT NOT NULL,
        field_value TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_custom_fields_record ON custom_fields (record_id, field_key)",
    r#"
    CREATE TABLE IF NOT EXISTS attachments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        parent_id INTEGER NOT NULL,
        name TEXT NOT NULL UNIQUE,
        title TEXT NOT NULL,
        position INTEGER NOT NULL,
        mime_type TEXT NOT NULL,
        location TEXT NOT NULL,
        modified_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS taxonomy_terms (
        record_id INTEGER NOT NULL,
        taxonomy TEXT NOT NULL,
        term TEXT NOT NULL,
        position INTEGER NOT NULL,
        PRIMARY KEY (record_id, taxonomy, term)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS primary_images (
        record_id INTEGER PRIMARY KEY,
        attachment_id INTEGER NOT NULL
    )
    "#,
];

/// Open (creating it if needed) the SQLite database shared by the store, lock and run logs
pub async fn connect(db_path: &Path) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    Ok(pool)
}

/// Serialized form of every stored timestamp; fixed width so that text
/// comparison in SQL orders like time
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(s: &str) -> anyhow::Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("Invalid stored timestamp: {}", s))?
        .with_timezone(&Utc))
}

pub struct SqliteStore {
    pool: SqlitePool,
    upload_dir: PathBuf,
}

impl SqliteStore {
    pub async fn new(pool: SqlitePool, upload_dir: PathBuf) -> anyhow::Result<Self> {
        let store = Self { pool, upload_dir };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> anyhow::Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        info!("Initialized SQLite store schema");
        Ok(())
    }

    fn record_from_row(&self, row: &SqliteRow) -> anyhow::Result<LocalRecord> {
        Ok(LocalRecord {
            id: row.get::<i64, _>("id"),
            record_type: row.get::<String, _>("record_type"),
            title: row.get::<String, _>("title"),
            slug: row.get::<String, _>("slug"),
            content: row.get::<String, _>("content"),
            status: row.get::<String, _>("status").parse()?,
            created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
            modified_at: parse_timestamp(&row.get::<String, _>("modified_at"))?,
            author_id: row.get::<Option<i64>, _>("author_id"),
            custom_fields: BTreeMap::new(),
        })
    }

    fn attachment_from_row(&self, row: &SqliteRow) -> anyhow::Result<Attachment> {
        Ok(Attachment {
            id: row.get::<i64, _>("id"),
            parent_id: row.get::<i64, _>("parent_id"),
            name: row.get::<String, _>("name"),
            title: row.get::<String, _>("title"),
            position: row.get::<i64, _>("position"),
            mime_type: row.get::<String, _>("mime_type"),
            location: row.get::<String, _>("location"),
            modified_at: parse_timestamp(&row.get::<String, _>("modified_at"))?,
        })
    }

    /// Attachment names are unique: a taken name gets a `-N` suffix
    async fn unique_attachment_name(&self, name: &str) -> anyhow::Result<String> {
        let mut candidate = name.to_string();
        let mut suffix = 2;

        loop {
            let taken: i64 = sqlx::query("SELECT COUNT(*) AS n FROM attachments WHERE name = ?1")
                .bind(&candidate)
                .fetch_one(&self.pool)
                .await?
                .get("n");
            if taken == 0 {
                return Ok(candidate);
            }
            candidate = format!("{}-{}", name, suffix);
            suffix += 1;
        }
    }

    async fn write_file(&self, name: &str, mime_type: &str, content: &[u8]) -> anyhow::Result<PathBuf> {
        let dir = self.upload_dir.join(PHOTO_SUBDIR);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let path = dir.join(format!("{}.{}", name, extension_for(mime_type)));
        tokio::fs::write(&path, content)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        debug!(path = %path.display(), bytes = content.len(), "Wrote attachment file");
        Ok(path)
    }

    async fn touch(&self, id: RecordId) -> anyhow::Result<()> {
        sqlx::query("UPDATE records SET modified_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(format_timestamp(&Utc::now()))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "jpg",
    }
}

#[async_trait]
impl LocalStore for SqliteStore {
    async fn find_by_type(
        &self,
        record_type: &str,
        statuses: &[RecordStatus],
    ) -> anyhow::Result<Vec<LocalRecord>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; statuses.len()].join(", ");
        let sql = format!(
            "SELECT * FROM records WHERE record_type = ? AND status IN ({}) ORDER BY id",
            placeholders
        );
        let mut query = sqlx::query(&sql).bind(record_type);
        for status in statuses {
            query = query.bind(status.as_str());
        }
        let rows = query.fetch_all(&self.pool).await?;

        let mut records = Vec::with_capacity(rows.len());
        let mut positions = HashMap::new();
        for row in rows {
            let record = self.record_from_row(&row)?;
            positions.insert(record.id, records.len());
            records.push(record);
        }

        let field_rows = sqlx::query(
            r#"
            SELECT f.record_id, f.field_key, f.field_value
            FROM custom_fields f
            JOIN records r ON r.id = f.record_id
            WHERE r.record_type = ?1
            ORDER BY f.id
            "#,
        )
        .bind(record_type)
        .fetch_all(&self.pool)
        .await?;

        for row in field_rows {
            let record_id: i64 = row.get("record_id");
            if let Some(&index) = positions.get(&record_id) {
                records[index]
                    .custom_fields
                    .entry(row.get("field_key"))
                    .or_default()
                    .push(row.get("field_value"));
            }
        }

        Ok(records)
    }

    async fn find_attachments(&self, parent: RecordId) -> anyhow::Result<Vec<Attachment>> {
        let rows = sqlx::query("SELECT * FROM attachments WHERE parent_id = ?1 ORDER BY id")
            .bind(parent)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(|row| self.attachment_from_row(row)).collect()
    }

    async fn create(&self, draft: &RecordDraft) -> anyhow::Result<RecordId> {
        let result = sqlx::query(
            r#"
            INSERT INTO records (record_type, title, slug, content, status, author_id, created_at, modified_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&draft.record_type)
        .bind(&draft.title)
        .bind(&draft.slug)
        .bind(&draft.content)
        .bind(draft.status.as_str())
        .bind(draft.author_id)
        .bind(format_timestamp(&draft.created_at))
        .bind(format_timestamp(&Utc::now()))
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        debug!(record_id = id, record_type = %draft.record_type, "Created record");
        Ok(id)
    }

    async fn update(&self, id: RecordId, draft: &RecordDraft) -> anyhow::Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE records
            SET record_type = ?2, title = ?3, slug = ?4, content = ?5, status = ?6,
                author_id = COALESCE(?7, author_id), created_at = ?8, modified_at = ?9
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&draft.record_type)
        .bind(&draft.title)
        .bind(&draft.slug)
        .bind(&draft.content)
        .bind(draft.status.as_str())
        .bind(draft.author_id)
        .bind(format_timestamp(&draft.created_at))
        .bind(format_timestamp(&Utc::now()))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            anyhow::bail!("Record {} does not exist", id);
        }
        Ok(())
    }

    async fn trash(&self, id: RecordId) -> anyhow::Result<()> {
        let result = sqlx::query("UPDATE records SET status = ?2, modified_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(RecordStatus::Trashed.as_str())
            .bind(format_timestamp(&Utc::now()))
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            anyhow::bail!("Record {} does not exist", id);
        }
        Ok(())
    }

    async fn set_custom_field(&self, id: RecordId, key: &str, value: &FieldValue) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM custom_fields WHERE record_id = ?1 AND field_key = ?2")
            .bind(id)
            .bind(key)
            .execute(&mut *tx)
            .await?;
        sqlx::query("INSERT INTO custom_fields (record_id, field_key, field_value) VALUES (?1, ?2, ?3)")
            .bind(id)
            .bind(key)
            .bind(value.to_string())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn add_custom_field(&self, id: RecordId, key: &str, value: &FieldValue) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO custom_fields (record_id, field_key, field_value) VALUES (?1, ?2, ?3)")
            .bind(id)
            .bind(key)
            .bind(value.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn remove_custom_field(&self, id: RecordId, key: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM custom_fields WHERE record_id = ?1 AND field_key = ?2")
            .bind(id)
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_attachment(&self, draft: AttachmentDraft) -> anyhow::Result<RecordId> {
        let name = self.unique_attachment_name(&draft.name).await?;
        let path = self.write_file(&name, &draft.mime_type, &draft.content).await?;

        let result = sqlx::query(
            r#"
            INSERT INTO attachments (parent_id, name, title, position, mime_type, location, modified_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(draft.parent_id)
        .bind(&name)
        .bind(&draft.title)
        .bind(draft.position)
        .bind(&draft.mime_type)
        .bind(path.to_string_lossy().to_string())
        .bind(format_timestamp(&Utc::now()))
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        debug!(attachment_id = id, parent_id = draft.parent_id, name = %name, "Created attachment");
        Ok(id)
    }

    async fn update_attachment(&self, id: RecordId, update: AttachmentUpdate) -> anyhow::Result<()> {
        let row = sqlx::query("SELECT * FROM attachments WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Attachment {} does not exist", id))?;
        let current = self.attachment_from_row(&row)?;

        let mime_type = update.mime_type.unwrap_or(current.mime_type);
        let location = match update.content {
            Some(ref content) => {
                let path = self
                    .write_file(&current.name, &mime_type, content)
                    .await?
                    .to_string_lossy()
                    .to_string();
                // A new format means a new extension; drop the stale file
                if path != current.location {
                    if let Err(e) = tokio::fs::remove_file(&current.location).await {
                        warn!(location = %current.location, error = %e, "Failed to remove replaced attachment file");
                    }
                }
                path
            }
            None => current.location,
        };

        sqlx::query(
            r#"
            UPDATE attachments
            SET title = ?2, position = ?3, mime_type = ?4, location = ?5, modified_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(update.title.unwrap_or(current.title))
        .bind(update.position.unwrap_or(current.position))
        .bind(&mime_type)
        .bind(location)
        .bind(format_timestamp(&Utc::now()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_attachment(&self, id: RecordId) -> anyhow::Result<()> {
        let location: Option<String> = sqlx::query("SELECT location FROM attachments WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| row.get("location"));

        sqlx::query("DELETE FROM attachments WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM primary_images WHERE attachment_id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if let Some(location) = location {
            if let Err(e) = tokio::fs::remove_file(&location).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %location, error = %e, "Failed to remove attachment file");
                }
            }
        }
        Ok(())
    }

    async fn set_taxonomy_terms(&self, id: RecordId, taxonomy: &str, terms: &[String]) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM taxonomy_terms WHERE record_id = ?1 AND taxonomy = ?2")
            .bind(id)
            .bind(taxonomy)
            .execute(&mut *tx)
            .await?;
        for (position, term) in terms.iter().enumerate() {
            sqlx::query(
                "INSERT OR IGNORE INTO taxonomy_terms (record_id, taxonomy, term, position) VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(id)
            .bind(taxonomy)
            .bind(term)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        self.touch(id).await
    }

    async fn add_taxonomy_terms(&self, id: RecordId, taxonomy: &str, terms: &[String]) -> anyhow::Result<()> {
        for term in terms {
            sqlx::query(
                r#"
                INSERT OR IGNORE INTO taxonomy_terms (record_id, taxonomy, term, position)
                VALUES (?1, ?2, ?3,
                    (SELECT COUNT(*) FROM taxonomy_terms WHERE record_id = ?1 AND taxonomy = ?2))
                "#,
            )
            .bind(id)
            .bind(taxonomy)
            .bind(term)
            .execute(&self.pool)
            .await?;
        }
        self.touch(id).await
    }

    async fn set_primary_image(&self, id: RecordId, attachment: RecordId) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO primary_images (record_id, attachment_id) VALUES (?1, ?2)
            ON CONFLICT(record_id) DO UPDATE SET attachment_id = excluded.attachment_id
            "#,
        )
        .bind(id)
        .bind(attachment)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
