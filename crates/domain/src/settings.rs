//! Cascading configuration resolution
//!
//! Settings cascade global → digest → source, with source taking the highest
//! precedence and hardcoded defaults filling any key no layer provides. This
//! is a pure ordered-override merge over the recognized keys; unrecognized
//! keys never survive deserialization, so they cannot leak into the result.

use serde::{Deserialize, Serialize};

use crate::model::OutputFormat;

/// One layer of overridable settings. Every field is optional; an unset field
/// defers to the next layer down.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_formats: Option<Vec<OutputFormat>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub do_summarize: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_prompt: Option<String>,
}

impl SettingsOverrides {
    /// Layer `overrides` on top of `self`: any key set in `overrides` wins.
    /// Used to fold a source group's settings into its parent digest layer.
    pub fn merged_with(&self, overrides: &SettingsOverrides) -> SettingsOverrides {
        SettingsOverrides {
            summary_length: overrides.summary_length.or(self.summary_length),
            model: overrides.model.clone().or_else(|| self.model.clone()),
            system_prompt: overrides
                .system_prompt
                .clone()
                .or_else(|| self.system_prompt.clone()),
            max_tokens: overrides.max_tokens.or(self.max_tokens),
            temperature: overrides.temperature.or(self.temperature),
            output_formats: overrides
                .output_formats
                .clone()
                .or_else(|| self.output_formats.clone()),
            do_summarize: overrides.do_summarize.or(self.do_summarize),
            user_prompt: overrides
                .user_prompt
                .clone()
                .or_else(|| self.user_prompt.clone()),
        }
    }
}

/// Fully resolved settings for a single source. Always contains every
/// recognized key; immutable once computed.
#[derive(Debug, Clone, PartialEq)]
pub struct DigestSettings {
    pub summary_length: usize,
    pub model: String,
    pub system_prompt: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub output_formats: Vec<OutputFormat>,
    pub do_summarize: bool,
    pub user_prompt: Option<String>,
}

impl Default for DigestSettings {
    fn default() -> Self {
        Self {
            summary_length: default_summary_length(),
            model: default_model(),
            system_prompt: default_system_prompt(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            output_formats: default_output_formats(),
            do_summarize: true,
            user_prompt: None,
        }
    }
}

impl DigestSettings {
    /// Resolve the effective settings for one source by cascading the global,
    /// digest and source layers over the fixed defaults. Pure function, no I/O.
    pub fn resolve(
        global: &SettingsOverrides,
        digest: Option<&SettingsOverrides>,
        source: &SettingsOverrides,
    ) -> Self {
        let mut layered = global.clone();
        if let Some(digest) = digest {
            layered = layered.merged_with(digest);
        }
        layered = layered.merged_with(source);

        let defaults = Self::default();
        Self {
            summary_length: layered.summary_length.unwrap_or(defaults.summary_length),
            model: layered.model.unwrap_or(defaults.model),
            system_prompt: layered.system_prompt.unwrap_or(defaults.system_prompt),
            max_tokens: layered.max_tokens.unwrap_or(defaults.max_tokens),
            temperature: layered.temperature.unwrap_or(defaults.temperature),
            output_formats: layered.output_formats.unwrap_or(defaults.output_formats),
            do_summarize: layered.do_summarize.unwrap_or(defaults.do_summarize),
            user_prompt: layered.user_prompt,
        }
    }
}

fn default_summary_length() -> usize {
    150
}

fn default_model() -> String {
    "claude-3-haiku-20240307".to_string()
}

fn default_system_prompt() -> String {
    "You are a helpful assistant that summarizes articles concisely.".to_string()
}

fn default_max_tokens() -> u32 {
    150
}

fn default_temperature() -> f64 {
    0.3
}

fn default_output_formats() -> Vec<OutputFormat> {
    vec![OutputFormat::Json]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_all_keys() {
        let resolved = DigestSettings::resolve(
            &SettingsOverrides::default(),
            None,
            &SettingsOverrides::default(),
        );
        assert_eq!(resolved, DigestSettings::default());
        assert_eq!(resolved.summary_length, 150);
        assert_eq!(resolved.model, "claude-3-haiku-20240307");
        assert_eq!(resolved.max_tokens, 150);
        assert_eq!(resolved.temperature, 0.3);
        assert_eq!(resolved.output_formats, vec![OutputFormat::Json]);
        assert!(resolved.do_summarize);
        assert!(resolved.user_prompt.is_none());
    }

    #[test]
    fn source_overrides_digest_overrides_global() {
        let global = SettingsOverrides {
            summary_length: Some(100),
            model: Some("global-model".to_string()),
            temperature: Some(0.9),
            ..Default::default()
        };
        let digest = SettingsOverrides {
            summary_length: Some(200),
            do_summarize: Some(false),
            ..Default::default()
        };
        let source = SettingsOverrides {
            summary_length: Some(300),
            ..Default::default()
        };

        let resolved = DigestSettings::resolve(&global, Some(&digest), &source);
        assert_eq!(resolved.summary_length, 300);
        assert_eq!(resolved.model, "global-model");
        assert_eq!(resolved.temperature, 0.9);
        assert!(!resolved.do_summarize);
        // Keys no layer sets fall back to defaults.
        assert_eq!(resolved.max_tokens, 150);
    }

    #[test]
    fn unknown_keys_are_dropped_on_deserialization() {
        let json = r#"{"summary_length": 42, "output_directory": "output", "bogus": true}"#;
        let layer: SettingsOverrides = serde_json::from_str(json).unwrap();
        assert_eq!(layer.summary_length, Some(42));
        assert_eq!(
            layer,
            SettingsOverrides {
                summary_length: Some(42),
                ..Default::default()
            }
        );
    }

    #[test]
    fn group_layer_merges_over_digest_layer() {
        let digest = SettingsOverrides {
            summary_length: Some(100),
            model: Some("digest-model".to_string()),
            ..Default::default()
        };
        let group = SettingsOverrides {
            summary_length: Some(50),
            ..Default::default()
        };

        let merged = digest.merged_with(&group);
        assert_eq!(merged.summary_length, Some(50));
        assert_eq!(merged.model.as_deref(), Some("digest-model"));
    }

    #[test]
    fn output_formats_parse_from_lowercase_names() {
        let layer: SettingsOverrides =
            serde_json::from_str(r#"{"output_formats": ["json", "rss", "atom"]}"#).unwrap();
        assert_eq!(
            layer.output_formats,
            Some(vec![OutputFormat::Json, OutputFormat::Rss, OutputFormat::Atom])
        );
    }
}
