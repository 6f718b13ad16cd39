//! Port definitions (traits) for external dependencies
//!
//! These traits define the boundaries between the digest pipeline and
//! external systems. Adapters implement these traits to connect to real
//! infrastructure (HTTP, SQLite, the summarization API, the filesystem).

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{ExtractedArticle, FetchedFeed, OutputFormat, PriorItem};
use crate::settings::DigestSettings;

/// Error type for feed fetching
#[derive(Debug, Error)]
pub enum FeedFetchError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Feed parse error: {0}")]
    Parse(String),
}

/// Port for fetching and parsing an RSS/Atom feed
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedFeed, FeedFetchError>;
}

/// Port for extracting the full text of an article page.
///
/// Best-effort by contract: implementations must return sentinel fallback
/// values instead of failing, so a broken article page degrades a single
/// article rather than aborting the run.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> ExtractedArticle;
}

/// Error type for summarization
#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("API error: {0}")]
    Api(String),
    #[error("Invalid response format: {0}")]
    InvalidFormat(String),
    #[error("Rate limited")]
    RateLimited,
    #[error("Timeout")]
    Timeout,
}

/// Port for the external summarization call: prompt inputs in, text or a
/// distinguishable failure out. Failures are non-fatal to the pipeline.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Whether a summarization backend is configured at all
    fn is_enabled(&self) -> bool;

    async fn summarize(
        &self,
        title: &str,
        content: &str,
        settings: &DigestSettings,
    ) -> Result<String, SummarizeError>;
}

/// Error type for the summary cache backing store.
///
/// Unlike every other non-fatal edge, cache storage errors abort the run:
/// a broken store would silently lose cache state otherwise.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Port for the content-addressed summary cache
#[async_trait]
pub trait SummaryCache: Send + Sync {
    /// Whether caching is enabled; a disabled cache is never consulted
    /// and never cleaned up
    fn is_enabled(&self) -> bool {
        true
    }

    /// Look up a cached summary by (url, content-prefix) hash. The title is
    /// only used for logging; it does not participate in the key.
    async fn get(
        &self,
        url: &str,
        title: &str,
        content: &str,
    ) -> Result<Option<String>, CacheError>;

    /// Upsert a summary under the (url, content-prefix) hash
    async fn set(
        &self,
        url: &str,
        title: &str,
        content: &str,
        summary: &str,
    ) -> Result<(), CacheError>;

    /// Delete entries strictly older than `max_age_days`; returns the number
    /// of rows removed
    async fn cleanup(&self, max_age_days: i64) -> Result<u64, CacheError>;
}

/// Error type for writing digest output
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Port for persisting rendered digests and loading previously emitted output
#[async_trait]
pub trait OutputStore: Send + Sync {
    /// Load previously emitted output for a digest in one format, as a map
    /// from article URL to the stored record. Any read or parse failure is a
    /// cold start and yields an empty map, never an error.
    async fn load_previous(
        &self,
        digest_id: &str,
        format: OutputFormat,
    ) -> HashMap<String, PriorItem>;

    /// Write rendered content for a digest in one format, returning the path
    async fn write(
        &self,
        digest_id: &str,
        format: OutputFormat,
        content: &str,
    ) -> Result<PathBuf, OutputError>;

    /// The address readers will use for this digest file; embedded as the
    /// JSON Feed `feed_url`
    fn feed_url(&self, digest_id: &str, format: OutputFormat) -> String;
}

/// Port for time/clock operations (enables deterministic testing)
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Real clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
