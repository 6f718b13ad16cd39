//! Domain models and value objects

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::settings::SettingsOverrides;

/// Output format of a rendered digest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Rss,
    Atom,
}

impl OutputFormat {
    /// File extension used for digest output files
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Rss => "xml",
            OutputFormat::Atom => "atom",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Rss => "rss",
            OutputFormat::Atom => "atom",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single normalized feed entry as delivered by a [`crate::ports::FeedSource`]
#[derive(Debug, Clone, Default)]
pub struct FeedEntry {
    /// Canonical link of the article, if the feed provided one
    pub url: Option<String>,
    /// Entry title from the feed
    pub title: Option<String>,
    /// Entry-embedded full content (Atom content / content:encoded)
    pub content: Option<String>,
    /// Publication time in UTC, if the feed provided one
    pub published: Option<DateTime<Utc>>,
    /// Image URL taken from a media-content element
    pub media_image: Option<String>,
    /// Image URL taken from an enclosure with an image MIME type
    pub enclosure_image: Option<String>,
}

/// A fetched and parsed feed
#[derive(Debug, Clone, Default)]
pub struct FetchedFeed {
    /// Feed-level title
    pub title: Option<String>,
    /// Entries in document order
    pub entries: Vec<FeedEntry>,
}

/// Result of full-text extraction for an article page.
///
/// Extraction is best-effort: failures surface as sentinel values rather
/// than errors so a broken article page never aborts a run.
#[derive(Debug, Clone)]
pub struct ExtractedArticle {
    pub title: String,
    pub text: String,
    pub published: Option<DateTime<Utc>>,
    pub image: Option<String>,
}

impl ExtractedArticle {
    /// Sentinel returned when the article page could not be fetched or parsed
    pub fn unavailable() -> Self {
        Self {
            title: "Unable to extract title".to_string(),
            text: "Unable to extract content".to_string(),
            published: None,
            image: None,
        }
    }
}

/// A fully processed article, owned by the date bucket it was appended to.
/// Never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub title: String,
    pub url: String,
    pub summary: String,
    /// Publication timestamp in UTC
    pub published: DateTime<Utc>,
    /// URL of the feed this article came from
    pub feed_url: String,
    /// Host of the feed URL, used for per-source grouping in rendered output
    pub source_label: String,
    pub image: Option<String>,
}

/// An article record recovered from previously emitted digest output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriorItem {
    pub title: String,
    pub content_text: Option<String>,
    pub content_html: Option<String>,
    pub date_published: Option<DateTime<Utc>>,
}

impl PriorItem {
    /// The stored summary text, preferring plain text over HTML
    pub fn summary(&self) -> String {
        self.content_text
            .clone()
            .or_else(|| self.content_html.clone())
            .unwrap_or_default()
    }
}

/// Articles grouped by UTC calendar date within one digest's aggregation pass.
///
/// Insertion order is preserved within a date, across all sources of the
/// digest. Built fresh on every run; only its rendered output is persisted.
#[derive(Debug, Clone, Default)]
pub struct DigestBucket {
    days: BTreeMap<NaiveDate, Vec<Article>>,
}

impl DigestBucket {
    /// Append an article under the calendar date of its UTC timestamp
    pub fn push(&mut self, article: Article) {
        let date = article.published.date_naive();
        self.days.entry(date).or_default().push(article);
    }

    /// Merge another bucket into this one, preserving per-date insertion order.
    /// The merge is associative, so per-source buckets can be accumulated in
    /// any grouping as long as sources are visited in configuration order.
    pub fn merge(&mut self, other: DigestBucket) {
        for (date, articles) in other.days {
            self.days.entry(date).or_default().extend(articles);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.days.values().all(|articles| articles.is_empty())
    }

    pub fn article_count(&self) -> usize {
        self.days.values().map(Vec::len).sum()
    }

    /// Dates most-recent-first, each with its articles in insertion order
    pub fn days_desc(&self) -> impl Iterator<Item = (&NaiveDate, &[Article])> {
        self.days
            .iter()
            .rev()
            .map(|(date, articles)| (date, articles.as_slice()))
    }
}

/// Configuration for a single source feed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Feed URL; a source without one is logged and skipped
    pub url: Option<String>,
    /// Overridable settings at source level (highest precedence)
    #[serde(flatten, default)]
    pub settings: SettingsOverrides,
}

/// A named group of sources sharing an extra settings layer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceGroup {
    pub sources: Vec<SourceConfig>,
    #[serde(flatten, default)]
    pub settings: SettingsOverrides,
}

/// One entry in a digest's source list: either a single feed or a group of
/// feeds. Only one level of nesting is processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceEntry {
    Group(SourceGroup),
    Feed(SourceConfig),
}

/// Configuration for one digest: a named aggregation unit producing its own
/// output files from one or more sources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestConfig {
    pub name: String,
    /// Explicit output identifier; derived from `name` when absent
    #[serde(default)]
    pub digest_id: Option<String>,
    #[serde(flatten, default)]
    pub settings: SettingsOverrides,
    #[serde(default)]
    pub sources: Vec<SourceEntry>,
}

impl DigestConfig {
    /// Effective digest id: the explicit one, else a slug of the name
    pub fn effective_id(&self) -> String {
        self.digest_id
            .clone()
            .unwrap_or_else(|| slugify_digest_id(&self.name))
    }
}

/// Derive a digest id from its display name: lowercased, spaces and hyphens
/// become underscores, every other non-alphanumeric character is stripped.
pub fn slugify_digest_id(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect()
}
