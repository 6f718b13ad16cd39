//! feed-digest adapters crate
//!
//! This crate contains infrastructure adapters implementing the domain ports:
//! - `feed`: HTTP feed fetching and parsing
//! - `extract`: HTTP full-text article extraction
//! - `llm`: Summarization provider adapters
//! - `cache`: SQLite and disabled summary caches
//! - `output`: Filesystem digest output store

mod cache_null;
mod cache_sqlite;
mod extract_http;
mod feed_http;
mod output_fs;

pub mod llm;

/// Re-exports for feed adapters
pub mod feed {
    pub use crate::feed_http::HttpFeedSource;
}

/// Re-exports for extraction adapters
pub mod extract {
    pub use crate::extract_http::HttpTextExtractor;
}

/// Re-exports for cache adapters
pub mod cache {
    pub use crate::cache_null::NullSummaryCache;
    pub use crate::cache_sqlite::SqliteSummaryCache;
}

/// Re-exports for output adapters
pub mod output {
    pub use crate::output_fs::FsOutputStore;
}
