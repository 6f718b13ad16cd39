//! Digest run orchestration
//!
//! One run walks every configured digest: resolves per-source settings,
//! fetches and processes each source, reuses article records from previously
//! emitted output, renders the accumulated bucket into each requested format
//! and writes the files. Source and article failures degrade locally; only
//! cache and output-write errors abort the run.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::model::{DigestBucket, DigestConfig, OutputFormat, SourceConfig, SourceEntry};
use crate::ports::{CacheError, Clock, FeedSource, OutputError, OutputStore, SummaryCache, Summarizer, TextExtractor};
use crate::settings::{DigestSettings, SettingsOverrides};
use crate::usecases::process::{EntryProcessor, ProcessError};
use crate::usecases::render::DigestRenderer;

#[derive(Debug, Error)]
pub enum DigestRunError {
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error(transparent)]
    Output(#[from] OutputError),
}

/// Run-level configuration, already loaded and validated by the caller
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    /// Global settings layer, lowest precedence of the cascade
    pub global: SettingsOverrides,
    /// All configured digests, in configuration order
    pub digests: Vec<DigestConfig>,
    /// When set, only the digest whose name matches exactly is run
    pub digest_filter: Option<String>,
    /// Cache entries older than this many days are deleted after the run
    pub cache_retention_days: i64,
}

/// What a run produced: written output paths per digest name and format
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub written: BTreeMap<String, BTreeMap<OutputFormat, PathBuf>>,
}

impl RunReport {
    pub fn is_empty(&self) -> bool {
        self.written.is_empty()
    }

    pub fn file_count(&self) -> usize {
        self.written.values().map(BTreeMap::len).sum()
    }
}

/// Orchestrates one full aggregation run over all configured digests
pub struct DigestRun<F, E, S, C, O, Cl>
where
    F: FeedSource + ?Sized,
    E: TextExtractor + ?Sized,
    S: Summarizer + ?Sized,
    C: SummaryCache + ?Sized,
    O: OutputStore + ?Sized,
    Cl: Clock + ?Sized,
{
    feeds: Arc<F>,
    processor: EntryProcessor<E, S, C, Cl>,
    cache: Arc<C>,
    outputs: Arc<O>,
    renderer: DigestRenderer,
}

impl<F, E, S, C, O, Cl> DigestRun<F, E, S, C, O, Cl>
where
    F: FeedSource + ?Sized,
    E: TextExtractor + ?Sized,
    S: Summarizer + ?Sized,
    C: SummaryCache + ?Sized,
    O: OutputStore + ?Sized,
    Cl: Clock + ?Sized,
{
    pub fn new(
        feeds: Arc<F>,
        extractor: Arc<E>,
        summarizer: Arc<S>,
        cache: Arc<C>,
        outputs: Arc<O>,
        clock: Arc<Cl>,
        renderer: DigestRenderer,
    ) -> Self {
        Self {
            feeds,
            processor: EntryProcessor::new(extractor, summarizer, Arc::clone(&cache), clock),
            cache,
            outputs,
            renderer,
        }
    }

    pub async fn run(&self, config: &RunConfig) -> Result<RunReport, DigestRunError> {
        let mut report = RunReport::default();

        for digest in &config.digests {
            if let Some(filter) = &config.digest_filter {
                if digest.name != *filter {
                    tracing::debug!(digest = %digest.name, "Skipping digest not matching filter");
                    continue;
                }
            }

            let written = self.run_digest(&config.global, digest).await?;
            if !written.is_empty() {
                report.written.insert(digest.name.clone(), written);
            }
        }

        if self.cache.is_enabled() {
            let removed = self.cache.cleanup(config.cache_retention_days).await?;
            if removed > 0 {
                tracing::info!(removed = removed, "Cleaned up expired cache entries");
            }
        }

        Ok(report)
    }

    async fn run_digest(
        &self,
        global: &SettingsOverrides,
        digest: &DigestConfig,
    ) -> Result<BTreeMap<OutputFormat, PathBuf>, DigestRunError> {
        let digest_id = digest.effective_id();
        tracing::info!(digest = %digest.name, digest_id = %digest_id, "Processing digest");

        let sources = flatten_sources(digest);

        // Prior output is loaded once per format the digest can emit, then
        // unioned; reprocessing a URL already present in any format would
        // burn a summarization call for nothing.
        let formats_in_play: BTreeSet<OutputFormat> = sources
            .iter()
            .map(|(source, layer)| DigestSettings::resolve(global, Some(layer), &source.settings))
            .chain(std::iter::once(DigestSettings::resolve(
                global,
                None,
                &digest.settings,
            )))
            .flat_map(|settings| settings.output_formats)
            .collect();

        let mut prior = HashMap::new();
        for format in &formats_in_play {
            for (url, item) in self.outputs.load_previous(&digest_id, *format).await {
                prior.entry(url).or_insert(item);
            }
        }
        tracing::debug!(
            digest_id = %digest_id,
            prior_articles = prior.len(),
            "Loaded previously published articles"
        );

        let mut bucket = DigestBucket::default();
        for (source, layer) in &sources {
            let Some(url) = source.url.as_deref().filter(|u| !u.is_empty()) else {
                tracing::warn!(digest = %digest.name, "Skipping source without a URL");
                continue;
            };

            let settings = DigestSettings::resolve(global, Some(layer), &source.settings);

            let feed = match self.feeds.fetch(url).await {
                Ok(feed) => feed,
                Err(error) => {
                    tracing::warn!(url = %url, error = %error, "Failed to fetch feed, skipping source");
                    continue;
                }
            };

            tracing::info!(
                url = %url,
                feed_title = %feed.title.as_deref().unwrap_or("(untitled)"),
                entries = feed.entries.len(),
                "Fetched feed"
            );

            let source_bucket = self
                .processor
                .process_entries(feed.entries, url, &settings, &prior)
                .await?;
            bucket.merge(source_bucket);
        }

        if bucket.is_empty() {
            tracing::info!(digest = %digest.name, "No articles for digest, skipping output");
            return Ok(BTreeMap::new());
        }

        let digest_settings = DigestSettings::resolve(global, None, &digest.settings);
        let json_feed_url = self.outputs.feed_url(&digest_id, OutputFormat::Json);
        let rendered = self.renderer.render(
            &bucket,
            &digest.name,
            &digest_id,
            &digest_settings.output_formats,
            &json_feed_url,
        );

        let mut written = BTreeMap::new();
        for (format, content) in rendered {
            let path = self.outputs.write(&digest_id, format, &content).await?;
            tracing::info!(
                digest_id = %digest_id,
                format = %format,
                path = %path.display(),
                articles = bucket.article_count(),
                "Wrote digest output"
            );
            written.insert(format, path);
        }

        Ok(written)
    }
}

/// Flatten a digest's source entries into leaf sources, pairing each with the
/// digest-level layer (for grouped sources, the digest layer with the group's
/// overrides folded in). Only one level of grouping is recognized.
fn flatten_sources(digest: &DigestConfig) -> Vec<(&SourceConfig, SettingsOverrides)> {
    let mut flat = Vec::new();

    for entry in &digest.sources {
        match entry {
            SourceEntry::Feed(source) => {
                flat.push((source, digest.settings.clone()));
            }
            SourceEntry::Group(group) => {
                let layer = digest.settings.merged_with(&group.settings);
                for source in &group.sources {
                    flat.push((source, layer.clone()));
                }
            }
        }
    }

    flat
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExtractedArticle, FeedEntry, FetchedFeed, PriorItem};
    use crate::ports::{FeedFetchError, SummarizeError};
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::Mutex;

    struct FakeFeeds {
        feeds: HashMap<String, FetchedFeed>,
    }

    impl FakeFeeds {
        fn new(feeds: Vec<(&str, FetchedFeed)>) -> Self {
            Self {
                feeds: feeds
                    .into_iter()
                    .map(|(url, feed)| (url.to_string(), feed))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl FeedSource for FakeFeeds {
        async fn fetch(&self, url: &str) -> Result<FetchedFeed, FeedFetchError> {
            self.feeds
                .get(url)
                .cloned()
                .ok_or_else(|| FeedFetchError::Http(format!("no feed at {url}")))
        }
    }

    struct NoopExtractor;

    #[async_trait]
    impl TextExtractor for NoopExtractor {
        async fn extract(&self, _url: &str) -> ExtractedArticle {
            ExtractedArticle::unavailable()
        }
    }

    struct EchoSummarizer;

    #[async_trait]
    impl Summarizer for EchoSummarizer {
        fn is_enabled(&self) -> bool {
            true
        }

        async fn summarize(
            &self,
            title: &str,
            _content: &str,
            _settings: &DigestSettings,
        ) -> Result<String, SummarizeError> {
            Ok(format!("summary of {title}"))
        }
    }

    #[derive(Default)]
    struct CountingCache {
        cleanups: Mutex<Vec<i64>>,
    }

    #[async_trait]
    impl SummaryCache for CountingCache {
        async fn get(
            &self,
            _url: &str,
            _title: &str,
            _content: &str,
        ) -> Result<Option<String>, CacheError> {
            Ok(None)
        }

        async fn set(
            &self,
            _url: &str,
            _title: &str,
            _content: &str,
            _summary: &str,
        ) -> Result<(), CacheError> {
            Ok(())
        }

        async fn cleanup(&self, max_age_days: i64) -> Result<u64, CacheError> {
            self.cleanups.lock().unwrap().push(max_age_days);
            Ok(3)
        }
    }

    #[derive(Default)]
    struct MemoryOutputs {
        prior: Mutex<HashMap<(String, OutputFormat), HashMap<String, PriorItem>>>,
        written: Mutex<Vec<(String, OutputFormat, String)>>,
    }

    impl MemoryOutputs {
        fn with_prior(digest_id: &str, format: OutputFormat, url: &str, item: PriorItem) -> Self {
            let outputs = Self::default();
            outputs
                .prior
                .lock()
                .unwrap()
                .entry((digest_id.to_string(), format))
                .or_default()
                .insert(url.to_string(), item);
            outputs
        }
    }

    #[async_trait]
    impl OutputStore for MemoryOutputs {
        async fn load_previous(
            &self,
            digest_id: &str,
            format: OutputFormat,
        ) -> HashMap<String, PriorItem> {
            self.prior
                .lock()
                .unwrap()
                .get(&(digest_id.to_string(), format))
                .cloned()
                .unwrap_or_default()
        }

        async fn write(
            &self,
            digest_id: &str,
            format: OutputFormat,
            content: &str,
        ) -> Result<PathBuf, OutputError> {
            self.written
                .lock()
                .unwrap()
                .push((digest_id.to_string(), format, content.to_string()));
            Ok(PathBuf::from(format!("{digest_id}.{}", format.extension())))
        }

        fn feed_url(&self, digest_id: &str, format: OutputFormat) -> String {
            format!("{digest_id}.{}", format.extension())
        }
    }

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn entry(url: &str) -> FeedEntry {
        FeedEntry {
            url: Some(url.to_string()),
            title: Some(format!("Title {url}")),
            content: Some(format!("Body of {url}")),
            published: Some(Utc.with_ymd_and_hms(2024, 3, 5, 9, 0, 0).unwrap()),
            media_image: None,
            enclosure_image: None,
        }
    }

    fn digest(name: &str, sources: Vec<SourceEntry>) -> DigestConfig {
        DigestConfig {
            name: name.to_string(),
            digest_id: None,
            settings: SettingsOverrides::default(),
            sources,
        }
    }

    fn feed_source(url: &str) -> SourceEntry {
        SourceEntry::Feed(SourceConfig {
            url: Some(url.to_string()),
            settings: SettingsOverrides::default(),
        })
    }

    fn run_with(
        feeds: FakeFeeds,
        outputs: MemoryOutputs,
    ) -> (
        DigestRun<FakeFeeds, NoopExtractor, EchoSummarizer, CountingCache, MemoryOutputs, FixedClock>,
        Arc<MemoryOutputs>,
        Arc<CountingCache>,
    ) {
        let outputs = Arc::new(outputs);
        let cache = Arc::new(CountingCache::default());
        let run = DigestRun::new(
            Arc::new(feeds),
            Arc::new(NoopExtractor),
            Arc::new(EchoSummarizer),
            Arc::clone(&cache),
            Arc::clone(&outputs),
            Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap())),
            DigestRenderer::default(),
        );
        (run, outputs, cache)
    }

    #[tokio::test]
    async fn writes_one_file_per_format_and_reports_paths() {
        let feeds = FakeFeeds::new(vec![(
            "https://a.example.com/feed",
            FetchedFeed {
                title: Some("A".to_string()),
                entries: vec![entry("https://a.example.com/1")],
            },
        )]);
        let (run, outputs, _) = run_with(feeds, MemoryOutputs::default());

        let mut digest = digest("Tech News", vec![feed_source("https://a.example.com/feed")]);
        digest.settings.output_formats =
            Some(vec![OutputFormat::Json, OutputFormat::Rss, OutputFormat::Atom]);

        let config = RunConfig {
            digests: vec![digest],
            cache_retention_days: 30,
            ..Default::default()
        };
        let report = run.run(&config).await.unwrap();

        assert_eq!(report.file_count(), 3);
        // The report is keyed by the configured name; files use the slug.
        let paths = &report.written["Tech News"];
        assert_eq!(paths[&OutputFormat::Json], PathBuf::from("tech_news.json"));
        assert_eq!(paths[&OutputFormat::Rss], PathBuf::from("tech_news.xml"));
        assert_eq!(paths[&OutputFormat::Atom], PathBuf::from("tech_news.atom"));
        assert_eq!(outputs.written.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn filter_runs_only_matching_digest() {
        let feeds = FakeFeeds::new(vec![(
            "https://a.example.com/feed",
            FetchedFeed {
                title: None,
                entries: vec![entry("https://a.example.com/1")],
            },
        )]);
        let (run, outputs, _) = run_with(feeds, MemoryOutputs::default());

        let config = RunConfig {
            digests: vec![
                digest("Wanted", vec![feed_source("https://a.example.com/feed")]),
                digest("Other", vec![feed_source("https://a.example.com/feed")]),
            ],
            digest_filter: Some("Wanted".to_string()),
            cache_retention_days: 30,
            ..Default::default()
        };
        let report = run.run(&config).await.unwrap();

        assert_eq!(report.written.len(), 1);
        assert!(report.written.contains_key("Wanted"));
        assert_eq!(outputs.written.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn broken_source_degrades_without_killing_digest() {
        let feeds = FakeFeeds::new(vec![(
            "https://good.example.com/feed",
            FetchedFeed {
                title: None,
                entries: vec![entry("https://good.example.com/1")],
            },
        )]);
        let (run, outputs, _) = run_with(feeds, MemoryOutputs::default());

        let config = RunConfig {
            digests: vec![digest(
                "Mixed",
                vec![
                    SourceEntry::Feed(SourceConfig::default()),
                    feed_source("https://down.example.com/feed"),
                    feed_source("https://good.example.com/feed"),
                ],
            )],
            cache_retention_days: 30,
            ..Default::default()
        };
        let report = run.run(&config).await.unwrap();

        assert_eq!(report.file_count(), 1);
        let (_, _, content) = outputs.written.lock().unwrap()[0].clone();
        assert!(content.contains("https://good.example.com/1"));
    }

    #[tokio::test]
    async fn prior_articles_survive_into_new_output() {
        let feeds = FakeFeeds::new(vec![(
            "https://a.example.com/feed",
            FetchedFeed {
                title: None,
                entries: vec![entry("https://a.example.com/1"), entry("https://a.example.com/2")],
            },
        )]);
        let outputs = MemoryOutputs::with_prior(
            "daily",
            OutputFormat::Json,
            "https://a.example.com/1",
            PriorItem {
                title: "Old title".to_string(),
                content_text: Some("old summary".to_string()),
                content_html: None,
                date_published: Some(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()),
            },
        );
        let (run, outputs, _) = run_with(feeds, outputs);

        let config = RunConfig {
            digests: vec![digest("Daily", vec![feed_source("https://a.example.com/feed")])],
            cache_retention_days: 30,
            ..Default::default()
        };
        run.run(&config).await.unwrap();

        let (_, _, content) = outputs.written.lock().unwrap()[0].clone();
        assert!(content.contains("Old title"));
        assert!(content.contains("old summary"));
        assert!(content.contains("summary of Title https://a.example.com/2"));
    }

    #[tokio::test]
    async fn empty_digest_writes_nothing() {
        let feeds = FakeFeeds::new(vec![(
            "https://a.example.com/feed",
            FetchedFeed {
                title: None,
                entries: vec![],
            },
        )]);
        let (run, outputs, _) = run_with(feeds, MemoryOutputs::default());

        let config = RunConfig {
            digests: vec![digest("Empty", vec![feed_source("https://a.example.com/feed")])],
            cache_retention_days: 30,
            ..Default::default()
        };
        let report = run.run(&config).await.unwrap();

        assert!(report.is_empty());
        assert!(outputs.written.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn cache_cleanup_runs_with_configured_retention() {
        let feeds = FakeFeeds::new(vec![]);
        let (run, _, cache) = run_with(feeds, MemoryOutputs::default());

        let config = RunConfig {
            digests: vec![],
            cache_retention_days: 7,
            ..Default::default()
        };
        run.run(&config).await.unwrap();

        assert_eq!(*cache.cleanups.lock().unwrap(), vec![7]);
    }
}
