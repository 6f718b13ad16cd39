//! Filesystem digest output store
//!
//! Writes rendered digests under one output directory as
//! `<digest_id>.<ext>` and reads them back on the next run so already
//! published articles are reused instead of re-summarized.
//!
//! JSON Feed items aggregate a whole day, so loading recovers the
//! per-article records by parsing the day's `content_text` back apart.
//! RSS and Atom entries are keyed literally by their link.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feed_digest_domain::usecases::render::JsonFeed;
use feed_digest_domain::{OutputError, OutputFormat, OutputStore, PriorItem};

/// Output store writing digest files to a local directory
pub struct FsOutputStore {
    dir: PathBuf,
    /// Public base URL under which the output directory is served, if any
    base_url: Option<String>,
}

impl FsOutputStore {
    pub fn new(dir: impl Into<PathBuf>, base_url: Option<String>) -> Self {
        Self {
            dir: dir.into(),
            base_url: base_url.map(|base| base.trim_end_matches('/').to_string()),
        }
    }

    fn file_path(&self, digest_id: &str, format: OutputFormat) -> PathBuf {
        self.dir.join(format!("{digest_id}.{}", format.extension()))
    }

    /// Write an index.html linking every digest file currently in the
    /// output directory
    pub async fn write_index(&self) -> Result<PathBuf, OutputError> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| OutputError::Io(e.to_string()))?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| OutputError::Io(e.to_string()))?
        {
            if let Ok(name) = entry.file_name().into_string() {
                if name.ends_with(".json") || name.ends_with(".xml") || name.ends_with(".atom") {
                    names.push(name);
                }
            }
        }
        names.sort();

        let mut html = String::from(
            "<!DOCTYPE html>\n<html>\n<head><title>Digests</title></head>\n<body>\n<h1>Digests</h1>\n<ul>\n",
        );
        for name in &names {
            html.push_str(&format!("<li><a href=\"{name}\">{name}</a></li>\n"));
        }
        html.push_str("</ul>\n</body>\n</html>\n");

        let path = self.dir.join("index.html");
        tokio::fs::write(&path, html)
            .await
            .map_err(|e| OutputError::Io(e.to_string()))?;
        Ok(path)
    }
}

#[async_trait]
impl OutputStore for FsOutputStore {
    async fn load_previous(
        &self,
        digest_id: &str,
        format: OutputFormat,
    ) -> HashMap<String, PriorItem> {
        let path = self.file_path(digest_id, format);

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(_) => {
                tracing::debug!(path = %path.display(), "No previous output, starting fresh");
                return HashMap::new();
            }
        };

        let loaded = match format {
            OutputFormat::Json => load_json(&content),
            OutputFormat::Rss => load_rss(&content),
            OutputFormat::Atom => load_atom(&content),
        };

        match loaded {
            Some(items) => items,
            None => {
                tracing::warn!(path = %path.display(), "Could not parse previous output, starting fresh");
                HashMap::new()
            }
        }
    }

    async fn write(
        &self,
        digest_id: &str,
        format: OutputFormat,
        content: &str,
    ) -> Result<PathBuf, OutputError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| OutputError::Io(e.to_string()))?;

        let path = self.file_path(digest_id, format);
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| OutputError::Io(e.to_string()))?;
        Ok(path)
    }

    fn feed_url(&self, digest_id: &str, format: OutputFormat) -> String {
        let file = format!("{digest_id}.{}", format.extension());
        match &self.base_url {
            Some(base) => format!("{base}/{file}"),
            None => file,
        }
    }
}

fn load_json(content: &str) -> Option<HashMap<String, PriorItem>> {
    let feed: JsonFeed = serde_json::from_str(content).ok()?;
    let mut items = HashMap::new();

    for item in feed.items {
        let date_published = item
            .date_published
            .as_deref()
            .and_then(parse_rfc3339);

        // Recover the individual articles folded into the day's text body.
        for (url, mut prior) in parse_digest_text(&item.content_text) {
            prior.date_published = date_published;
            items.entry(url).or_insert(prior);
        }

        // The day item itself is keyed by its own URL as well, matching the
        // literal keying of the XML formats.
        if !item.url.is_empty() {
            items.entry(item.url.clone()).or_insert(PriorItem {
                title: item.title,
                content_text: Some(item.content_text),
                content_html: Some(item.content_html),
                date_published,
            });
        }
    }

    Some(items)
}

fn load_rss(content: &str) -> Option<HashMap<String, PriorItem>> {
    let channel = rss::Channel::read_from(content.as_bytes()).ok()?;
    let mut items = HashMap::new();

    for item in channel.items() {
        let Some(link) = item.link() else { continue };
        items.insert(
            link.to_string(),
            PriorItem {
                title: item.title().unwrap_or_default().to_string(),
                content_text: item.description().map(str::to_string),
                content_html: item.content().map(str::to_string),
                date_published: item
                    .pub_date()
                    .and_then(|d| DateTime::parse_from_rfc2822(d).ok())
                    .map(|d| d.with_timezone(&Utc)),
            },
        );
    }

    Some(items)
}

fn load_atom(content: &str) -> Option<HashMap<String, PriorItem>> {
    let feed = atom_syndication::Feed::read_from(content.as_bytes()).ok()?;
    let mut items = HashMap::new();

    for entry in feed.entries() {
        let Some(link) = entry.links().first() else { continue };
        items.insert(
            link.href().to_string(),
            PriorItem {
                title: entry.title().to_string(),
                content_text: None,
                content_html: entry.content().and_then(|c| c.value().map(str::to_string)),
                date_published: entry
                    .published()
                    .map(|d| d.with_timezone(&Utc)),
            },
        );
    }

    Some(items)
}

/// Split a rendered day's plain-text body back into per-article records.
///
/// The text format is blank-line separated blocks; an article block is
/// `title`, summary lines, then a final `URL: <link>` line. Header blocks
/// (the day heading and `From <source>` lines) never end with a URL line
/// and fall through.
pub fn parse_digest_text(text: &str) -> Vec<(String, PriorItem)> {
    let mut articles = Vec::new();

    for block in text.split("\n\n") {
        let lines: Vec<&str> = block.lines().collect();
        if lines.len() < 2 {
            continue;
        }

        let Some(url) = lines[lines.len() - 1].strip_prefix("URL: ") else {
            continue;
        };
        if url.is_empty() {
            continue;
        }

        let title = lines[0].to_string();
        let summary = lines[1..lines.len() - 1].join("\n");

        articles.push((
            url.to_string(),
            PriorItem {
                title,
                content_text: Some(summary),
                content_html: None,
                date_published: None,
            },
        ));
    }

    articles
}

fn parse_rfc3339(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}
