//! Digest rendering use case - turns a date bucket into syndication formats
//!
//! All formats share the same grouping semantics: dates most-recent-first,
//! one feed item per date, articles grouped by source in the order sources
//! were first encountered, with a per-source sub-heading only when more than
//! one source contributed to that date.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Article, DigestBucket, OutputFormat};

/// Configuration for rendering
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Base URL used for feed links and entry identifiers
    pub link_base: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            link_base: "https://example.com/".to_string(),
        }
    }
}

/// JSON Feed v1.1 document (https://jsonfeed.org/version/1.1)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonFeed {
    pub version: String,
    pub title: String,
    pub home_page_url: String,
    pub feed_url: String,
    pub items: Vec<JsonFeedItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonFeedItem {
    pub id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content_html: String,
    #[serde(default)]
    pub content_text: String,
    #[serde(default)]
    pub date_published: Option<String>,
}

pub const JSON_FEED_VERSION: &str = "https://jsonfeed.org/version/1.1";

/// One rendered day of a digest, shared across output formats
struct DaySection {
    date: NaiveDate,
    html: String,
    text: String,
    /// Link of the day's feed item: the first article's feed URL
    link: String,
    /// Publish timestamp of the day's feed item: the first article's
    published: DateTime<Utc>,
}

/// Renders a [`DigestBucket`] into the requested output formats
#[derive(Debug, Clone, Default)]
pub struct DigestRenderer {
    config: RenderConfig,
}

impl DigestRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Render one digest into each requested format. `json_feed_url` is
    /// embedded as the JSON Feed's own address.
    pub fn render(
        &self,
        bucket: &DigestBucket,
        digest_name: &str,
        digest_id: &str,
        formats: &[OutputFormat],
        json_feed_url: &str,
    ) -> Vec<(OutputFormat, String)> {
        let sections = self.day_sections(bucket);

        formats
            .iter()
            .map(|format| {
                let content = match format {
                    OutputFormat::Json => {
                        self.render_json(&sections, digest_name, json_feed_url)
                    }
                    OutputFormat::Rss => self.render_rss(&sections, digest_name, digest_id),
                    OutputFormat::Atom => self.render_atom(&sections, digest_name, digest_id),
                };
                (*format, content)
            })
            .collect()
    }

    /// Build the per-day HTML and text blocks, most recent date first,
    /// skipping empty dates
    fn day_sections(&self, bucket: &DigestBucket) -> Vec<DaySection> {
        let mut sections = Vec::new();

        for (date, articles) in bucket.days_desc() {
            if articles.is_empty() {
                continue;
            }

            let mut html = format!("<h1>Daily Digest for {date}</h1>\n");
            let mut text = format!("Daily Digest for {date}\n\n");

            let by_source = group_by_source(articles);
            let multi_source = by_source.len() > 1;

            for (label, source_articles) in &by_source {
                if multi_source {
                    html.push_str(&format!("<h2>From {label}</h2>\n"));
                    text.push_str(&format!("From {label}\n\n"));
                }

                for article in source_articles {
                    html.push_str(&format!(
                        "<h3><a href='{}'>{}</a></h3>\n",
                        article.url, article.title
                    ));
                    text.push_str(&format!("{}\n", article.title));

                    if let Some(image) = &article.image {
                        html.push_str(&format!(
                            "<img src='{}' style='max-width:100%; margin:10px 0;' alt='{}' />\n",
                            image, article.title
                        ));
                    }

                    html.push_str(&format!("<p>{}</p>\n", article.summary));
                    text.push_str(&format!("{}\n", article.summary));
                    text.push_str(&format!("URL: {}\n\n", article.url));
                    html.push_str("<hr>\n");
                }
            }

            let first = &articles[0];
            sections.push(DaySection {
                date: *date,
                html,
                text,
                link: first.feed_url.clone(),
                published: first.published,
            });
        }

        sections
    }

    fn render_json(&self, sections: &[DaySection], digest_name: &str, feed_url: &str) -> String {
        let items = sections
            .iter()
            .map(|section| JsonFeedItem {
                id: format!("digest-{}", section.date),
                url: section.link.clone(),
                title: format!("Daily Digest for {}", section.date),
                content_html: section.html.clone(),
                content_text: section.text.clone(),
                date_published: Some(rfc3339(section.published)),
            })
            .collect();

        let feed = JsonFeed {
            version: JSON_FEED_VERSION.to_string(),
            title: digest_name.to_string(),
            home_page_url: String::new(),
            feed_url: feed_url.to_string(),
            items,
        };

        // Field order is fixed by the struct, so identical buckets always
        // serialize to identical bytes.
        serde_json::to_string_pretty(&feed).unwrap_or_default()
    }

    fn render_rss(&self, sections: &[DaySection], digest_name: &str, digest_id: &str) -> String {
        let items: Vec<rss::Item> = sections
            .iter()
            .map(|section| {
                let guid = rss::GuidBuilder::default()
                    .value(self.entry_id(digest_id, section.date))
                    .permalink(false)
                    .build();

                rss::ItemBuilder::default()
                    .title(Some(format!("Daily Digest for {}", section.date)))
                    .link(Some(self.entry_link(section)))
                    .guid(Some(guid))
                    .pub_date(Some(section.published.to_rfc2822()))
                    .content(Some(section.html.clone()))
                    .build()
            })
            .collect();

        let channel = rss::ChannelBuilder::default()
            .title(digest_name.to_string())
            .link(self.config.link_base.clone())
            .description("Daily digest of articles".to_string())
            .language(Some("en".to_string()))
            .items(items)
            .build();

        channel.to_string()
    }

    fn render_atom(&self, sections: &[DaySection], digest_name: &str, digest_id: &str) -> String {
        let updated = sections
            .first()
            .map(|s| s.published)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

        let entries: Vec<atom_syndication::Entry> = sections
            .iter()
            .map(|section| {
                let link = atom_syndication::LinkBuilder::default()
                    .href(self.entry_link(section))
                    .build();

                let content = atom_syndication::ContentBuilder::default()
                    .value(Some(section.html.clone()))
                    .content_type(Some("html".to_string()))
                    .build();

                atom_syndication::EntryBuilder::default()
                    .title(format!("Daily Digest for {}", section.date))
                    .id(self.entry_id(digest_id, section.date))
                    .updated(section.published.fixed_offset())
                    .published(Some(section.published.fixed_offset()))
                    .links(vec![link])
                    .content(Some(content))
                    .build()
            })
            .collect();

        let feed = atom_syndication::FeedBuilder::default()
            .title(digest_name.to_string())
            .id(format!(
                "{}{}",
                self.config.link_base,
                digest_name.to_lowercase().replace(' ', "-")
            ))
            .updated(updated.fixed_offset())
            .entries(entries)
            .build();

        feed.to_string()
    }

    fn entry_id(&self, digest_id: &str, date: NaiveDate) -> String {
        format!("{}digest/{}/{}", self.config.link_base, digest_id, date)
    }

    /// RSS and Atom entries need a link element; fall back to the
    /// configured base when the source URL is unknown. JSON items keep
    /// the url as-is.
    fn entry_link(&self, section: &DaySection) -> String {
        if section.link.is_empty() {
            self.config.link_base.clone()
        } else {
            section.link.clone()
        }
    }
}

/// Group a date's articles by source label, preserving the order sources
/// were first encountered
fn group_by_source(articles: &[Article]) -> Vec<(String, Vec<&Article>)> {
    let mut groups: Vec<(String, Vec<&Article>)> = Vec::new();

    for article in articles {
        match groups.iter_mut().find(|(label, _)| *label == article.source_label) {
            Some((_, members)) => members.push(article),
            None => groups.push((article.source_label.clone(), vec![article])),
        }
    }

    groups
}

/// RFC 3339 with whole seconds and a numeric offset, matching the format
/// re-parsed on incremental loads
pub fn rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Secs, false)
}
