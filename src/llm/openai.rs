//! OpenAI-compatible chat-completions client
//!
//! Async HTTP client used for every decision-making turn. Requests are
//! always non-streaming; streaming to the browser happens after parsing.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::core::config::LlmConfig;
use crate::core::{truncate_chars, Message, QuillError, Result};
use crate::llm::traits::{LLMProvider, ProviderFactory};

/// Client for an OpenAI-compatible `/chat/completions` endpoint
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    endpoint: Url,
    model: String,
    token: String,
    max_message_chars: usize,
}

/// Chat-completions request body
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    stream: bool,
    messages: &'a [Message],
}

/// Chat-completions response (non-streaming)
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiClient {
    /// Create a client from configuration and a resolved bearer token
    pub fn from_config(config: &LlmConfig, token: impl Into<String>) -> Result<Self> {
        Self::with_client(build_http_client(config)?, config, token)
    }

    /// Create a client sharing an existing connection pool
    pub fn with_client(client: Client, config: &LlmConfig, token: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client,
            endpoint: config.completions_url()?,
            model: config.model.clone(),
            token: token.into(),
            max_message_chars: config.max_message_chars,
        })
    }

    /// Model identifier sent with each request
    pub fn model(&self) -> &str {
        &self.model
    }
}

fn build_http_client(config: &LlmConfig) -> Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?)
}

/// Hands out per-request clients over one shared connection pool
#[derive(Clone)]
pub struct OpenAiFactory {
    client: Client,
    config: LlmConfig,
}

impl OpenAiFactory {
    pub fn new(config: LlmConfig) -> Result<Self> {
        // Fail at startup rather than on the first request.
        config.completions_url()?;
        Ok(Self {
            client: build_http_client(&config)?,
            config,
        })
    }
}

impl ProviderFactory for OpenAiFactory {
    fn connect(&self, token: &str) -> Result<Arc<dyn LLMProvider>> {
        let client = OpenAiClient::with_client(self.client.clone(), &self.config, token)?;
        Ok(Arc::new(client))
    }
}

/// Prepare messages for transmission: trim, drop empty, cap length.
pub fn sanitize_messages(messages: &[Message], max_chars: usize) -> Vec<Message> {
    messages
        .iter()
        .filter_map(|m| {
            let content = truncate_chars(m.content.trim(), max_chars);
            if content.is_empty() {
                None
            } else {
                Some(Message::new(m.role, content))
            }
        })
        .collect()
}

fn preview(text: &str) -> &str {
    truncate_chars(text, 200)
}

#[async_trait]
impl LLMProvider for OpenAiClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        let messages = sanitize_messages(messages, self.max_message_chars);

        tracing::debug!(
            model = %self.model,
            messages = messages.len(),
            last = messages.last().map(|m| preview(&m.content)).unwrap_or(""),
            "Sending completion request"
        );

        let request = ChatRequest {
            model: &self.model,
            stream: false,
            messages: &messages,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status, body = %body, "Completion request failed");
            return Err(QuillError::upstream(status, body));
        }

        let body: ChatResponse = response.json().await?;
        let content = extract_content(body);

        tracing::debug!(
            chars = content.chars().count(),
            preview = preview(&content),
            "Completion received"
        );

        Ok(content)
    }

    fn name(&self) -> &str {
        "openai-compatible"
    }
}

fn extract_content(response: ChatResponse) -> String {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Role;

    #[test]
    fn test_sanitize_trims_and_drops_empty() {
        let messages = vec![
            Message::system("  prompt  "),
            Message::user("   "),
            Message::assistant("\nreply\n"),
        ];
        let clean = sanitize_messages(&messages, 8000);
        assert_eq!(clean.len(), 2);
        assert_eq!(clean[0].content, "prompt");
        assert_eq!(clean[1].role, Role::Assistant);
        assert_eq!(clean[1].content, "reply");
    }

    #[test]
    fn test_sanitize_caps_length() {
        let long = "x".repeat(9000);
        let clean = sanitize_messages(&[Message::user(long)], 8000);
        assert_eq!(clean[0].content.chars().count(), 8000);
    }

    #[test]
    fn test_extract_content_takes_first_choice() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"Hi there"}},{"message":{"content":"other"}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_content(response), "Hi there");
    }

    #[test]
    fn test_extract_content_missing_is_empty() {
        let response: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert_eq!(extract_content(response), "");

        let response: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert_eq!(extract_content(response), "");
    }

    #[test]
    fn test_client_creation() {
        let config = LlmConfig {
            base_url: "http://localhost:9999/v1".to_string(),
            model: "deepseek-v3.1".to_string(),
            timeout_secs: 5,
            max_message_chars: 8000,
        };
        let client = OpenAiClient::from_config(&config, "sk-test").unwrap();
        assert_eq!(client.model(), "deepseek-v3.1");
        assert_eq!(
            client.endpoint.as_str(),
            "http://localhost:9999/v1/chat/completions"
        );
    }

    #[test]
    fn test_factory_rejects_bad_url() {
        let config = LlmConfig {
            base_url: "not a url".to_string(),
            ..LlmConfig::default()
        };
        assert!(OpenAiFactory::new(config).is_err());
    }
}
