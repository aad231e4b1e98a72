//! Persistence sink: durable extraction results and per-page outcome logs.
//!
//! Backed by SQLite in WAL mode so up to `N` visit tasks can write
//! concurrently through one pool. All tables are insert-only and keyed by
//! `(url, timestamp)` — a correction is a new record, never an update.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use log::debug;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};
use std::path::Path;

use crate::engine::types::{ExtractionResult, PageLogEntry, PageStatus};
use crate::extract::TableRow;

/// Receives extraction results and page logs from the crawl engine.
///
/// Both calls are fire-and-forget from the engine's perspective, but
/// implementations must not silently drop data: failures are returned so
/// the caller can report them.
#[async_trait]
pub trait Sink: Send + Sync {
    async fn record(&self, result: &ExtractionResult) -> Result<()>;
    async fn log_page(&self, entry: &PageLogEntry) -> Result<()>;
}

const SCHEMA_SQL: &str = r#"
-- One row per successfully rendered page; keywords stored as a JSON array.
CREATE TABLE IF NOT EXISTS extraction_results (
    url TEXT NOT NULL,
    retrieved_at INTEGER NOT NULL,
    matched_keywords TEXT NOT NULL,
    PRIMARY KEY (url, retrieved_at)
);

-- Vendor/shipping tuples, in source order per result.
CREATE TABLE IF NOT EXISTS vendor_rows (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL,
    retrieved_at INTEGER NOT NULL,
    row_index INTEGER NOT NULL,
    vendor_name TEXT NOT NULL,
    ship_from TEXT NOT NULL,
    ship_to TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_vendor_rows_result
    ON vendor_rows(url, retrieved_at);

-- One row per crawl attempt, success or failure.
CREATE TABLE IF NOT EXISTS page_log (
    url TEXT NOT NULL,
    logged_at INTEGER NOT NULL,
    status TEXT NOT NULL,
    error TEXT,
    PRIMARY KEY (url, logged_at)
);
"#;

/// SQLite-backed [`Sink`].
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the store at `{data_dir}/tortrawl.sqlite`.
    ///
    /// An unreachable store is the one persistence failure that is fatal to
    /// a run, so this is called before any browser is launched.
    pub async fn open(data_dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(data_dir)
            .await
            .context("Failed to create data directory")?;

        let db_path = data_dir.join("tortrawl.sqlite");
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .context("Failed to open SQLite database")?;

        sqlx::query(SCHEMA_SQL)
            .execute(&pool)
            .await
            .context("Failed to initialize database schema")?;

        Ok(Self { pool })
    }

    /// All page-log entries, oldest first. Primarily for inspection and
    /// tests; the engine keeps its own running summary.
    pub async fn page_log(&self) -> Result<Vec<PageLogEntry>> {
        let rows = sqlx::query(
            "SELECT url, logged_at, status, error FROM page_log ORDER BY logged_at",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to query page log")?;

        rows.iter()
            .map(|row| {
                let status = match row.get::<String, _>("status").as_str() {
                    "success" => PageStatus::Success,
                    "no_match" => PageStatus::NoMatch,
                    _ => PageStatus::Failed,
                };
                Ok(PageLogEntry {
                    url: row.get("url"),
                    status,
                    error: row.get("error"),
                    logged_at: millis_to_datetime(row.get("logged_at"))?,
                })
            })
            .collect()
    }

    /// Number of recorded extraction results.
    pub async fn result_count(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM extraction_results")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count extraction results")?;
        Ok(row.0)
    }

    /// Vendor rows recorded for a URL across all retrievals, in insert order.
    pub async fn vendor_rows_for(&self, url: &str) -> Result<Vec<TableRow>> {
        let rows = sqlx::query(
            r"
            SELECT vendor_name, ship_from, ship_to
            FROM vendor_rows WHERE url = ?
            ORDER BY retrieved_at, row_index
            ",
        )
        .bind(url)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query vendor rows")?;

        Ok(rows
            .iter()
            .map(|row| TableRow {
                vendor_name: row.get("vendor_name"),
                ship_from: row.get("ship_from"),
                ship_to: row.get("ship_to"),
            })
            .collect())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn millis_to_datetime(millis: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| anyhow::anyhow!("timestamp {millis} out of range"))
}

#[async_trait]
impl Sink for SqliteStore {
    /// Insert the result and its vendor rows in one transaction.
    async fn record(&self, result: &ExtractionResult) -> Result<()> {
        let retrieved_at = result.retrieved_at.timestamp_millis();
        let keywords_json = serde_json::to_string(&result.matched_keywords)
            .context("Failed to serialize matched keywords")?;

        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        sqlx::query(
            "INSERT INTO extraction_results (url, retrieved_at, matched_keywords) VALUES (?, ?, ?)",
        )
        .bind(&result.url)
        .bind(retrieved_at)
        .bind(&keywords_json)
        .execute(&mut *tx)
        .await
        .context("Failed to insert extraction result")?;

        for (index, row) in result.table_rows.iter().enumerate() {
            sqlx::query(
                r"
                INSERT INTO vendor_rows
                    (url, retrieved_at, row_index, vendor_name, ship_from, ship_to)
                VALUES (?, ?, ?, ?, ?, ?)
                ",
            )
            .bind(&result.url)
            .bind(retrieved_at)
            .bind(index as i64)
            .bind(&row.vendor_name)
            .bind(&row.ship_from)
            .bind(&row.ship_to)
            .execute(&mut *tx)
            .await
            .context("Failed to insert vendor row")?;
        }

        tx.commit().await.context("Failed to commit result")?;
        debug!(
            "Recorded {} ({} keywords, {} rows)",
            result.url,
            result.matched_keywords.len(),
            result.table_rows.len()
        );
        Ok(())
    }

    async fn log_page(&self, entry: &PageLogEntry) -> Result<()> {
        sqlx::query("INSERT INTO page_log (url, logged_at, status, error) VALUES (?, ?, ?, ?)")
            .bind(&entry.url)
            .bind(entry.logged_at.timestamp_millis())
            .bind(entry.status.as_str())
            .bind(&entry.error)
            .execute(&self.pool)
            .await
            .context("Failed to insert page log entry")?;
        Ok(())
    }
}
