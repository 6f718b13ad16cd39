//! Configuration loading and management
//!
//! The file has three parts: fixed application sections (`[general]`,
//! `[anthropic]`), a global `[settings]` layer of overridable digest
//! settings, and the `[[digests]]` list where the same settings keys can be
//! repeated at digest, group and source level.

use anyhow::{Context, Result};
use feed_digest_domain::{DigestConfig, SettingsOverrides};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub anthropic: AnthropicConfig,

    /// Global settings layer, lowest precedence of the cascade
    #[serde(default)]
    pub settings: SettingsOverrides,

    #[serde(default)]
    pub digests: Vec<DigestConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_output_directory")]
    pub output_directory: PathBuf,

    /// Public base URL under which the output directory is served
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    #[serde(default = "default_cache_directory")]
    pub cache_directory: PathBuf,

    #[serde(default = "default_cache_retention_days")]
    pub cache_retention_days: i64,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    /// Environment variable consulted for the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Inline API key; the environment variable takes precedence
    #[serde(default)]
    pub api_key: Option<String>,
}

// Default value functions
fn default_output_directory() -> PathBuf {
    PathBuf::from("./output")
}

fn default_true() -> bool {
    true
}

fn default_cache_directory() -> PathBuf {
    PathBuf::from("./.cache")
}

fn default_cache_retention_days() -> i64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_http_timeout() -> u64 {
    30
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output_directory: default_output_directory(),
            base_url: None,
            cache_enabled: default_true(),
            cache_directory: default_cache_directory(),
            cache_retention_days: default_cache_retention_days(),
            log_level: default_log_level(),
            http_timeout_secs: default_http_timeout(),
        }
    }
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            api_key: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Try default config path if none specified
        let default_path = PathBuf::from("./config.toml");
        let path = config_path.unwrap_or(&default_path);

        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        } else if config_path.is_some() {
            // User specified a path that doesn't exist
            anyhow::bail!("Config file not found: {}", path.display());
        }

        // Add environment variable overrides
        builder = builder.add_source(
            config::Environment::with_prefix("FEED_DIGEST")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Resolve the API key: explicit flag, then environment, then config file
    pub fn resolve_api_key(&self, flag: Option<String>) -> Option<String> {
        flag.or_else(|| std::env::var(&self.anthropic.api_key_env).ok())
            .or_else(|| self.anthropic.api_key.clone())
            .filter(|key| !key.is_empty())
    }

    /// Generate example configuration as TOML string
    pub fn example_toml() -> String {
        r#"# feed-digest configuration

[general]
output_directory = "./output"
# base_url = "https://digests.example.com"
cache_enabled = true
cache_directory = "./.cache"
cache_retention_days = 30
log_level = "info"
http_timeout_secs = 30

[anthropic]
api_key_env = "ANTHROPIC_API_KEY"
# api_key = "sk-ant-..."  # prefer the environment variable

# Global defaults; every key can be overridden per digest, group or source
[settings]
summary_length = 150
model = "claude-3-haiku-20240307"
max_tokens = 150
temperature = 0.3
output_formats = ["json"]
do_summarize = true
# system_prompt = "You are a helpful assistant that summarizes articles concisely."
# user_prompt = "Summarize in one sentence."

[[digests]]
name = "Tech News"
# digest_id = "tech"  # derived from the name when omitted
output_formats = ["json", "rss"]

[[digests.sources]]
url = "https://news.ycombinator.com/rss"

[[digests.sources]]
url = "https://example.com/feed.xml"
summary_length = 100

[[digests]]
name = "Science Daily"
do_summarize = false

# A source group: its settings apply to every source inside it
[[digests.sources]]
summary_length = 200

[[digests.sources.sources]]
url = "https://example.org/science.atom"
"#
        .to_string()
    }
}
