//! Stub summarizer for testing and keyless operation

use async_trait::async_trait;
use feed_digest_domain::{DigestSettings, SummarizeError, Summarizer};

/// Stub summarizer that returns configurable responses.
///
/// The disabled variant stands in when no API key is configured: the
/// pipeline sees a backend that is not enabled and falls back to excerpts.
pub struct StubSummarizer {
    enabled: bool,
    response: Result<Option<String>, SummarizeError>,
}

impl StubSummarizer {
    /// A summarizer that reports itself as not configured
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            response: Ok(None),
        }
    }

    /// A summarizer that always returns the given summary
    pub fn with_response(summary: impl Into<String>) -> Self {
        Self {
            enabled: true,
            response: Ok(Some(summary.into())),
        }
    }

    /// A summarizer that always fails with the given error
    pub fn with_error(error: SummarizeError) -> Self {
        Self {
            enabled: true,
            response: Err(error),
        }
    }

    /// Echo mode: summarize by restating the article title
    pub fn echo() -> Self {
        Self {
            enabled: true,
            response: Ok(None),
        }
    }
}

impl Default for StubSummarizer {
    fn default() -> Self {
        Self::disabled()
    }
}

#[async_trait]
impl Summarizer for StubSummarizer {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn summarize(
        &self,
        title: &str,
        _content: &str,
        _settings: &DigestSettings,
    ) -> Result<String, SummarizeError> {
        match &self.response {
            Ok(Some(summary)) => Ok(summary.clone()),
            Ok(None) => Ok(format!("Stub summary of: {title}")),
            Err(SummarizeError::Api(msg)) => Err(SummarizeError::Api(msg.clone())),
            Err(SummarizeError::InvalidFormat(msg)) => {
                Err(SummarizeError::InvalidFormat(msg.clone()))
            }
            Err(SummarizeError::RateLimited) => Err(SummarizeError::RateLimited),
            Err(SummarizeError::Timeout) => Err(SummarizeError::Timeout),
        }
    }
}
