//! Run command - fetch, summarize, render and write all digests

use anyhow::{Context, Result};
use feed_digest_adapters::cache::{NullSummaryCache, SqliteSummaryCache};
use feed_digest_adapters::extract::HttpTextExtractor;
use feed_digest_adapters::feed::HttpFeedSource;
use feed_digest_adapters::llm::{AnthropicSummarizer, StubSummarizer};
use feed_digest_adapters::output::FsOutputStore;
use feed_digest_domain::usecases::render::DigestRenderer;
use feed_digest_domain::usecases::run_digest::{DigestRun, RunConfig};
use feed_digest_domain::{SummaryCache, Summarizer, SystemClock};
use secrecy::SecretString;
use std::path::PathBuf;
use std::sync::Arc;

use crate::args::RunArgs;
use crate::config::AppConfig;

pub async fn execute(args: RunArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;

    if config.digests.is_empty() {
        anyhow::bail!("No digests configured; add a [[digests]] section to the config file");
    }

    tracing::info!(
        digests = config.digests.len(),
        digest_filter = ?args.digest,
        output_dir = %config.general.output_directory.display(),
        "Starting digest run"
    );

    // Build dependencies
    let timeout = config.general.http_timeout_secs;

    let cache: Arc<dyn SummaryCache> = if config.general.cache_enabled && !args.no_cache {
        let db_path = config.general.cache_directory.join("summary_cache.db");
        Arc::new(
            SqliteSummaryCache::new(&db_path)
                .await
                .context("Failed to initialize summary cache")?,
        )
    } else {
        Arc::new(NullSummaryCache)
    };

    let summarizer: Arc<dyn Summarizer> = match config.resolve_api_key(args.api_key.clone()) {
        Some(api_key) => Arc::new(AnthropicSummarizer::new(SecretString::from(api_key), timeout)),
        None => {
            tracing::warn!("No API key provided. Summarization will be disabled.");
            Arc::new(StubSummarizer::disabled())
        }
    };

    let outputs = Arc::new(FsOutputStore::new(
        &config.general.output_directory,
        config.general.base_url.clone(),
    ));

    let run = DigestRun::new(
        Arc::new(HttpFeedSource::new(timeout)),
        Arc::new(HttpTextExtractor::new(timeout)),
        summarizer,
        cache,
        Arc::clone(&outputs),
        Arc::new(SystemClock),
        DigestRenderer::default(),
    );

    let run_config = RunConfig {
        global: config.settings.clone(),
        digests: config.digests.clone(),
        digest_filter: args.digest.clone(),
        cache_retention_days: config.general.cache_retention_days,
    };

    let report = run.run(&run_config).await?;

    if report.is_empty() {
        tracing::warn!("Run complete but no digest output was produced");
        std::process::exit(2);
    }

    let index = outputs.write_index().await.context("Failed to write index")?;
    tracing::info!(
        digests = report.written.len(),
        files = report.file_count(),
        index = %index.display(),
        "Digest run complete"
    );

    Ok(())
}
