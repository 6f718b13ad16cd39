//! feed-digest domain crate
//!
//! This crate contains the core digest pipeline following hexagonal architecture:
//! - `model`: Domain entities and value objects
//! - `settings`: Cascading configuration resolution
//! - `ports`: Trait definitions for external dependencies (adapters)
//! - `usecases`: Application use cases / business logic

pub mod model;
pub mod ports;
pub mod settings;
pub mod usecases;

pub use model::*;
pub use ports::*;
pub use settings::{DigestSettings, SettingsOverrides};

use sha2::{Digest, Sha256};

/// Number of leading content characters that participate in the cache key.
/// Keeps hashing cheap for very large article bodies.
pub const CONTENT_HASH_PREFIX_CHARS: usize = 1000;

/// Compute the content-addressed cache key for an article.
///
/// The hash covers the source URL and the first
/// [`CONTENT_HASH_PREFIX_CHARS`] characters of the content. It deliberately
/// ignores the summarization configuration, so a model or prompt change
/// keeps serving cached summaries until age-based eviction.
pub fn compute_content_hash(url: &str, content: &str) -> String {
    let prefix: String = content.chars().take(CONTENT_HASH_PREFIX_CHARS).collect();

    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hasher.update(b":");
    hasher.update(prefix.as_bytes());
    format!("{:x}", hasher.finalize())
}
