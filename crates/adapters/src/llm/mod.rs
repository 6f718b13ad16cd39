//! Summarization provider adapters

pub mod anthropic;
pub mod stub;

pub use anthropic::AnthropicSummarizer;
pub use stub::StubSummarizer;

use feed_digest_domain::DigestSettings;

/// Build the user message for a summarization request. A configured
/// `user_prompt` replaces the generated one verbatim.
pub fn build_user_prompt(title: &str, content: &str, settings: &DigestSettings) -> String {
    match &settings.user_prompt {
        Some(prompt) => prompt.clone(),
        None => format!(
            "Summarize this article in about 2-3 sentences. Title: {title}\n\nContent: {content}"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_prompt_carries_title_and_content() {
        let prompt = build_user_prompt("A Title", "The body", &DigestSettings::default());
        assert!(prompt.starts_with("Summarize this article"));
        assert!(prompt.contains("Title: A Title"));
        assert!(prompt.contains("Content: The body"));
    }

    #[test]
    fn configured_prompt_is_used_verbatim() {
        let settings = DigestSettings {
            user_prompt: Some("Give me one sentence.".to_string()),
            ..DigestSettings::default()
        };
        assert_eq!(
            build_user_prompt("A Title", "The body", &settings),
            "Give me one sentence."
        );
    }
}
