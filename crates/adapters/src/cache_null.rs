//! Disabled summary cache

use async_trait::async_trait;
use feed_digest_domain::{CacheError, SummaryCache};

/// Cache used when caching is turned off: never hit, never written,
/// never cleaned up
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSummaryCache;

#[async_trait]
impl SummaryCache for NullSummaryCache {
    fn is_enabled(&self) -> bool {
        false
    }

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

    async fn cleanup(&self, _max_age_days: i64) -> Result<u64, CacheError> {
        Ok(0)
    }
}
