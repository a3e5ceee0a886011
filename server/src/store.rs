//! Durable paste storage.
//!
//! All shared state lives here. The view path goes through
//! [`PasteStore::consume`], a single conditional update that checks
//! aliveness and bumps the counter in one statement, so SQLite's own write
//! serialization is what keeps concurrent viewers from over-consuming.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use thiserror::Error;
use tracing::debug;

use crate::paste::Paste;
use crate::short_code::PasteId;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("a paste with id {0} already exists")]
    Conflict(PasteId),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait PasteStore: Send + Sync {
    /// Creates the schema if it does not exist yet.
    async fn migrate(&self) -> StoreResult<()>;

    async fn health_check(&self) -> StoreResult<()>;

    /// Persists a new paste. Fails with [`StoreError::Conflict`] if the id
    /// is taken.
    async fn insert(&self, paste: &Paste) -> StoreResult<()>;

    /// Unconditional lookup. Does not check aliveness nor count a view, so
    /// it must stay off the public view path.
    async fn fetch_raw(&self, id: &PasteId) -> StoreResult<Option<Paste>>;

    /// Counts one view if and only if the paste exists and is alive at
    /// `now`, returning the row after the increment.
    async fn consume(&self, id: &PasteId, now: DateTime<Utc>) -> StoreResult<Option<Paste>>;

    /// Removes a paste. Removing an unknown id is not an error.
    async fn delete(&self, id: &PasteId) -> StoreResult<()>;
}

/// SQLite-backed paste store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `path` and runs the
    /// migrations.
    pub async fn new(path: impl AsRef<Path>, max_connections: u32) -> StoreResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Database(e.into()))?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // Writers queue on the database lock instead of failing fast.
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[derive(sqlx::FromRow)]
struct PasteRow {
    id: String,
    content: String,
    expires_at: Option<i64>,
    max_views: Option<i64>,
    view_count: i64,
    created_at: i64,
}

fn from_millis(column: &str, millis: i64) -> StoreResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| StoreError::Corrupt(format!("{column} out of range: {millis}")))
}

impl TryFrom<PasteRow> for Paste {
    type Error = StoreError;

    fn try_from(row: PasteRow) -> StoreResult<Self> {
        Ok(Self {
            id: row
                .id
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("id {:?}: {e}", row.id)))?,
            content: row.content,
            expires_at: row
                .expires_at
                .map(|ms| from_millis("expires_at", ms))
                .transpose()?,
            max_views: row.max_views,
            view_count: row.view_count,
            created_at: from_millis("created_at", row.created_at)?,
        })
    }
}

const PASTE_COLUMNS: &str = "id, content, expires_at, max_views, view_count, created_at";

#[async_trait]
impl PasteStore for SqliteStore {
    async fn migrate(&self) -> StoreResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS pastes (
                id TEXT PRIMARY KEY NOT NULL,
                content TEXT NOT NULL,
                expires_at INTEGER,
                max_views INTEGER CHECK (max_views IS NULL OR max_views > 0),
                view_count INTEGER NOT NULL DEFAULT 0
                    CHECK (max_views IS NULL OR view_count <= max_views),
                created_at INTEGER NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert(&self, paste: &Paste) -> StoreResult<()> {
        let result = sqlx::query(
            r"
            INSERT INTO pastes (id, content, expires_at, max_views, view_count, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(paste.id.as_str())
        .bind(&paste.content)
        .bind(paste.expires_at.map(|t| t.timestamp_millis()))
        .bind(paste.max_views)
        .bind(paste.view_count)
        .bind(paste.created_at.timestamp_millis())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StoreError::Conflict(paste.id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn fetch_raw(&self, id: &PasteId) -> StoreResult<Option<Paste>> {
        let row: Option<PasteRow> =
            sqlx::query_as(&format!("SELECT {PASTE_COLUMNS} FROM pastes WHERE id = ?1"))
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await?;

        row.map(Paste::try_from).transpose()
    }

    async fn consume(&self, id: &PasteId, now: DateTime<Utc>) -> StoreResult<Option<Paste>> {
        // The WHERE clause re-checks both expiry rules in the same statement
        // that increments, so no two callers can take the last view.
        let row: Option<PasteRow> = sqlx::query_as(&format!(
            r"
            UPDATE pastes
            SET view_count = view_count + 1
            WHERE id = ?1
              AND (expires_at IS NULL OR expires_at > ?2)
              AND (max_views IS NULL OR view_count < max_views)
            RETURNING {PASTE_COLUMNS}
            "
        ))
        .bind(id.as_str())
        .bind(now.timestamp_millis())
        .fetch_optional(&self.pool)
        .await?;

        if row.is_none() {
            debug!(%id, "no live paste to consume");
        }

        row.map(Paste::try_from).transpose()
    }

    async fn delete(&self, id: &PasteId) -> StoreResult<()> {
        sqlx::query("DELETE FROM pastes WHERE id = ?1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
