//! Entry processing use case - turns raw feed entries into a date bucket
//!
//! Each entry either reuses a record from previously published output
//! (incremental merge) or goes through the full pipeline: full-text
//! resolution, summarization through the cache, image selection and date
//! bucketing.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::model::{Article, DigestBucket, ExtractedArticle, FeedEntry, PriorItem};
use crate::ports::{CacheError, Clock, SummaryCache, Summarizer, TextExtractor};
use crate::settings::DigestSettings;

/// Errors from entry processing. Extraction and summarization failures
/// degrade per-article and never surface here; only a broken cache backing
/// store aborts processing.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

/// Processes the entries of one source feed into a [`DigestBucket`]
pub struct EntryProcessor<E, S, C, Cl>
where
    E: TextExtractor + ?Sized,
    S: Summarizer + ?Sized,
    C: SummaryCache + ?Sized,
    Cl: Clock + ?Sized,
{
    extractor: Arc<E>,
    summarizer: Arc<S>,
    cache: Arc<C>,
    clock: Arc<Cl>,
}

impl<E, S, C, Cl> EntryProcessor<E, S, C, Cl>
where
    E: TextExtractor + ?Sized,
    S: Summarizer + ?Sized,
    C: SummaryCache + ?Sized,
    Cl: Clock + ?Sized,
{
    pub fn new(extractor: Arc<E>, summarizer: Arc<S>, cache: Arc<C>, clock: Arc<Cl>) -> Self {
        Self {
            extractor,
            summarizer,
            cache,
            clock,
        }
    }

    /// Process all entries of one feed. `prior` is the union of article
    /// records loaded from every requested output format of the digest;
    /// entries whose URL appears there are reused verbatim with no cache
    /// lookup and no summarization call.
    pub async fn process_entries(
        &self,
        entries: Vec<FeedEntry>,
        feed_url: &str,
        settings: &DigestSettings,
        prior: &HashMap<String, PriorItem>,
    ) -> Result<DigestBucket, ProcessError> {
        let source_label = source_label(feed_url);
        let mut bucket = DigestBucket::default();

        for entry in entries {
            // A missing link is unusual but not fatal; the entry is still
            // processed under an empty URL.
            let url = entry.url.clone().unwrap_or_default();

            if let Some(prev) = prior.get(&url) {
                tracing::debug!(url = %url, "Skipping already processed article");
                let published = entry
                    .published
                    .or(prev.date_published)
                    .unwrap_or_else(|| self.clock.now());
                bucket.push(Article {
                    title: prev.title.clone(),
                    url,
                    summary: prev.summary(),
                    published,
                    feed_url: feed_url.to_string(),
                    source_label: source_label.clone(),
                    image: None,
                });
                continue;
            }

            let published = entry.published.unwrap_or_else(|| self.clock.now());

            // Prefer entry-embedded content; fall back to full-text
            // extraction, which also supplies a fallback title and a
            // candidate image.
            let mut extraction: Option<ExtractedArticle> = None;
            let (title, full_text) = match entry.content.as_deref().filter(|c| !c.is_empty()) {
                Some(content) => (
                    entry.title.clone().unwrap_or_else(|| "No title".to_string()),
                    content.to_string(),
                ),
                None => {
                    let extracted = self.extractor.extract(&url).await;
                    let title = entry
                        .title
                        .clone()
                        .unwrap_or_else(|| extracted.title.clone());
                    let text = extracted.text.clone();
                    extraction = Some(extracted);
                    (title, text)
                }
            };

            let summary = self
                .summarize(feed_url, &title, &full_text, settings)
                .await?;

            let image = entry
                .media_image
                .clone()
                .or_else(|| entry.enclosure_image.clone())
                .or_else(|| extraction.as_ref().and_then(|e| e.image.clone()));

            bucket.push(Article {
                title,
                url,
                summary,
                published,
                feed_url: feed_url.to_string(),
                source_label: source_label.clone(),
                image,
            });
        }

        Ok(bucket)
    }

    /// Summarize one article's content, consulting the cache first.
    /// Summarization failures fall back to a truncated excerpt; only cache
    /// storage errors propagate.
    async fn summarize(
        &self,
        feed_url: &str,
        title: &str,
        content: &str,
        settings: &DigestSettings,
    ) -> Result<String, ProcessError> {
        if !settings.do_summarize {
            return Ok(truncate_excerpt(content, settings.summary_length));
        }

        if self.cache.is_enabled() {
            if let Some(cached) = self.cache.get(feed_url, title, content).await? {
                return Ok(cached);
            }
        }

        if !self.summarizer.is_enabled() {
            tracing::warn!(title = %title, "No summarization backend configured, returning excerpt");
            return Ok(truncate_excerpt(content, settings.summary_length));
        }

        match self.summarizer.summarize(title, content, settings).await {
            Ok(summary) => {
                if self.cache.is_enabled() {
                    self.cache.set(feed_url, title, content, &summary).await?;
                }
                Ok(summary)
            }
            Err(error) => {
                tracing::error!(title = %title, error = %error, "Summarization failed, returning excerpt");
                Ok(truncate_excerpt(content, settings.summary_length))
            }
        }
    }
}

/// Truncate content to `max_chars` characters, appending an ellipsis marker
/// only when something was actually cut off
pub fn truncate_excerpt(content: &str, max_chars: usize) -> String {
    let mut excerpt: String = content.chars().take(max_chars).collect();
    if content.chars().count() > max_chars {
        excerpt.push_str("...");
    }
    excerpt
}

/// Host of the feed URL, used as the per-source grouping label
pub fn source_label(feed_url: &str) -> String {
    url::Url::parse(feed_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default()
}
