//! HTTP full-text article extraction
//!
//! Fetches the article page and pulls the readable parts out of the HTML:
//! title (Open Graph first), paragraph text, lead image and publication time.
//! Strictly best-effort, as the [`TextExtractor`] port requires: every
//! failure mode degrades to sentinel values.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feed_digest_domain::{ExtractedArticle, TextExtractor};
use reqwest::Client;
use scraper::{Html, Selector};

static OG_TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[property="og:title"]"#).expect("static selector"));
static OG_IMAGE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[property="og:image"]"#).expect("static selector"));
static PUBLISHED_TIME: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[property="article:published_time"]"#).expect("static selector")
});
static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("static selector"));
static H1: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").expect("static selector"));
static ARTICLE_P: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("article p").expect("static selector"));
static MAIN_P: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("main p").expect("static selector"));
static ANY_P: LazyLock<Selector> = LazyLock::new(|| Selector::parse("p").expect("static selector"));
static ARTICLE_IMG: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("article img").expect("static selector"));

const USER_AGENT: &str = concat!("feed-digest/", env!("CARGO_PKG_VERSION"));

/// Text extractor fetching article pages over HTTP
pub struct HttpTextExtractor {
    client: Client,
}

impl HttpTextExtractor {
    pub fn new(timeout_secs: u64) -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to build HTTP client");

        Self { client }
    }
}

impl Default for HttpTextExtractor {
    fn default() -> Self {
        Self::new(30)
    }
}

#[async_trait]
impl TextExtractor for HttpTextExtractor {
    async fn extract(&self, url: &str) -> ExtractedArticle {
        let response = match self.client.get(url).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                tracing::warn!(url = %url, status = %response.status(), "Article page returned error status");
                return ExtractedArticle::unavailable();
            }
            Err(error) => {
                tracing::warn!(url = %url, error = %error, "Failed to fetch article page");
                return ExtractedArticle::unavailable();
            }
        };

        let body = match response.text().await {
            Ok(body) => body,
            Err(error) => {
                tracing::warn!(url = %url, error = %error, "Failed to read article page body");
                return ExtractedArticle::unavailable();
            }
        };

        // Html is not Send, so all parsing happens after the last await
        extract_from_html(&body)
    }
}

/// Pull title, paragraph text, lead image and publication time out of a page
fn extract_from_html(html: &str) -> ExtractedArticle {
    let fallback = ExtractedArticle::unavailable();
    let document = Html::parse_document(html);

    let title = meta_content(&document, &OG_TITLE)
        .or_else(|| element_text(&document, &TITLE))
        .or_else(|| element_text(&document, &H1))
        .unwrap_or(fallback.title);

    let text = paragraphs(&document, &ARTICLE_P)
        .or_else(|| paragraphs(&document, &MAIN_P))
        .or_else(|| paragraphs(&document, &ANY_P))
        .unwrap_or(fallback.text);

    let image = meta_content(&document, &OG_IMAGE).or_else(|| {
        document
            .select(&ARTICLE_IMG)
            .find_map(|img| img.value().attr("src").map(str::to_string))
    });

    let published = meta_content(&document, &PUBLISHED_TIME)
        .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
        .map(|ts| ts.with_timezone(&Utc));

    ExtractedArticle {
        title,
        text,
        published,
        image,
    }
}

fn meta_content(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .find_map(|element| element.value().attr("content"))
        .map(str::trim)
        .filter(|content| !content.is_empty())
        .map(str::to_string)
}

fn element_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Join the non-empty paragraph texts under `selector`, or None when the
/// selector matches nothing useful
fn paragraphs(document: &Html, selector: &Selector) -> Option<String> {
    let joined = document
        .select(selector)
        .map(|p| p.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

    if joined.is_empty() { None } else { Some(joined) }
}
