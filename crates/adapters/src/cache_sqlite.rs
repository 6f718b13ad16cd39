//! SQLite summary cache implementation
//!
//! Rows are keyed by the content-addressed article hash; the url and title
//! columns exist for inspection only and never participate in lookups.

use async_trait::async_trait;
use chrono::{Duration, SecondsFormat, Utc};
use feed_digest_domain::{CacheError, SummaryCache, compute_content_hash};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::path::Path;

/// SQLite-backed summary cache
pub struct SqliteSummaryCache {
    pool: SqlitePool,
}

impl SqliteSummaryCache {
    /// Open (or create) the cache database at `db_path`
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CacheError::Database(format!("Failed to create directory: {}", e)))?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await
            .map_err(|e| CacheError::Database(e.to_string()))?;

        let cache = Self { pool };
        cache.run_migrations().await?;

        Ok(cache)
    }

    /// Create an in-memory cache (for testing)
    pub async fn in_memory() -> Result<Self, CacheError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| CacheError::Database(e.to_string()))?;

        let cache = Self { pool };
        cache.run_migrations().await?;

        Ok(cache)
    }

    async fn run_migrations(&self) -> Result<(), CacheError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS summaries (
                article_hash TEXT PRIMARY KEY,
                url TEXT,
                title TEXT,
                summary TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| CacheError::Database(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl SummaryCache for SqliteSummaryCache {
    async fn get(
        &self,
        url: &str,
        title: &str,
        content: &str,
    ) -> Result<Option<String>, CacheError> {
        let article_hash = compute_content_hash(url, content);

        let row: Option<(String,)> =
            sqlx::query_as("SELECT summary FROM summaries WHERE article_hash = ?")
                .bind(&article_hash)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| CacheError::Database(e.to_string()))?;

        if row.is_some() {
            tracing::debug!(title = %title, "Summary cache hit");
        }

        Ok(row.map(|(summary,)| summary))
    }

    async fn set(
        &self,
        url: &str,
        title: &str,
        content: &str,
        summary: &str,
    ) -> Result<(), CacheError> {
        let article_hash = compute_content_hash(url, content);
        // Fixed-width UTC timestamps keep string comparison in cleanup
        // equivalent to chronological comparison.
        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

        sqlx::query(
            r#"
            INSERT INTO summaries (article_hash, url, title, summary, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(article_hash) DO UPDATE SET
                summary = excluded.summary,
                created_at = excluded.created_at
            "#,
        )
        .bind(&article_hash)
        .bind(url)
        .bind(title)
        .bind(summary)
        .bind(&created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| CacheError::Database(e.to_string()))?;

        tracing::info!(title = %title, "Cached summary for article");
        Ok(())
    }

    async fn cleanup(&self, max_age_days: i64) -> Result<u64, CacheError> {
        let cutoff = (Utc::now() - Duration::days(max_age_days))
            .to_rfc3339_opts(SecondsFormat::Secs, true);

        let result = sqlx::query("DELETE FROM summaries WHERE created_at < ?")
            .bind(&cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| CacheError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
