//! Anthropic Claude API adapter

use std::time::Duration;

use async_trait::async_trait;
use feed_digest_domain::{DigestSettings, SummarizeError, Summarizer};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::build_user_prompt;

const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic summarizer. Model, token budget, temperature and prompts come
/// from the per-source resolved settings on every call.
pub struct AnthropicSummarizer {
    client: Client,
    api_key: SecretString,
    api_url: String,
}

impl AnthropicSummarizer {
    pub fn new(api_key: SecretString, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key,
            api_url: DEFAULT_API_URL.to_string(),
        }
    }

    /// Point the adapter at a different endpoint (for testing against a mock)
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }
}

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
    system: String,
    temperature: f64,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    r#type: String,
    #[serde(default)]
    text: String,
}

#[async_trait]
impl Summarizer for AnthropicSummarizer {
    fn is_enabled(&self) -> bool {
        true
    }

    async fn summarize(
        &self,
        title: &str,
        content: &str,
        settings: &DigestSettings,
    ) -> Result<String, SummarizeError> {
        let request = AnthropicRequest {
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            messages: vec![Message {
                role: "user".to_string(),
                content: build_user_prompt(title, content, settings),
            }],
            system: settings.system_prompt.clone(),
            temperature: settings.temperature,
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SummarizeError::Timeout
                } else {
                    SummarizeError::Api(e.to_string())
                }
            })?;

        if response.status() == 429 {
            return Err(SummarizeError::RateLimited);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizeError::Api(format!(
                "API returned {}: {}",
                status, body
            )));
        }

        let api_response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| SummarizeError::InvalidFormat(e.to_string()))?;

        let text = api_response
            .content
            .into_iter()
            .filter_map(|c| if c.r#type == "text" { Some(c.text) } else { None })
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(SummarizeError::InvalidFormat("Empty response".to_string()));
        }

        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn summarizer(server: &MockServer) -> AnthropicSummarizer {
        AnthropicSummarizer::new(SecretString::from("test-key"), 5)
            .with_api_url(format!("{}/v1/messages", server.uri()))
    }

    #[tokio::test]
    async fn sends_resolved_settings_and_returns_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .and(body_partial_json(serde_json::json!({
                "model": "claude-3-haiku-20240307",
                "max_tokens": 150,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [{"type": "text", "text": "A crisp summary."}]
            })))
            .mount(&server)
            .await;

        let summary = summarizer(&server)
            .summarize("Title", "Body", &DigestSettings::default())
            .await
            .unwrap();
        assert_eq!(summary, "A crisp summary.");
    }

    #[tokio::test]
    async fn rate_limit_is_distinguished() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let error = summarizer(&server)
            .summarize("Title", "Body", &DigestSettings::default())
            .await
            .unwrap_err();
        assert!(matches!(error, SummarizeError::RateLimited));
    }

    #[tokio::test]
    async fn non_text_only_response_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [{"type": "tool_use"}]
            })))
            .mount(&server)
            .await;

        let error = summarizer(&server)
            .summarize("Title", "Body", &DigestSettings::default())
            .await
            .unwrap_err();
        assert!(matches!(error, SummarizeError::InvalidFormat(_)));
    }
}
