//! OpenAI-compatible chat-completions client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::completion::{CompletionClient, CompletionRequest};
use crate::error::LlmError;
use crate::Result;

/// Completion endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL; `/chat/completions` is appended
    pub base_url: String,
    /// Bearer token
    pub api_key: Option<String>,
    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        LlmConfig {
            base_url: std::env::var("DEEPSEEK_BASE_URL")
                .unwrap_or_else(|_| "https://api.deepseek.com".to_string()),
            api_key: std::env::var("DEEPSEEK_API_KEY").ok(),
            timeout_secs: 300,
        }
    }
}

impl LlmConfig {
    /// Create a new config from environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Create config for a specific endpoint
    pub fn new(base_url: &str) -> Self {
        LlmConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    /// Set API key
    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = Some(api_key.to_string());
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// HTTP client for `/chat/completions`
pub struct ChatCompletionClient {
    config: LlmConfig,
    http_client: reqwest::Client,
}

impl ChatCompletionClient {
    /// Create a new client. Fails if no API key is configured.
    pub fn new(config: LlmConfig) -> Result<Self> {
        if config.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            return Err(LlmError::NotConfigured("missing API key".to_string()));
        }

        let http_client = reqwest::Client::builder()
            .user_agent(format!("codeweaver/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(ChatCompletionClient {
            config,
            http_client,
        })
    }

    /// Create client from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(LlmConfig::from_env())
    }
}

#[async_trait]
impl CompletionClient for ChatCompletionClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let url = self.config.completions_url();
        debug!(
            %url,
            model = %request.model,
            temperature = request.temperature,
            messages = request.messages.len(),
            "requesting completion"
        );

        let mut req = self.http_client.post(&url).json(request);
        if let Some(key) = &self.config.api_key {
            req = req.bearer_auth(key.trim());
        }

        let response = req.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        parse_completion(&text)
    }
}

/// Extract the first choice's message content.
fn parse_completion(body: &str) -> Result<String> {
    let chat: ChatResponse = serde_json::from_str(body)?;
    chat.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or(LlmError::EmptyResponse)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_config_new() {
        let config = LlmConfig::new("https://api.deepseek.com/").with_api_key("sk-test");
        assert_eq!(config.completions_url(), "https://api.deepseek.com/chat/completions");
        assert_eq!(config.api_key, Some("sk-test".to_string()));
    }

    #[test]
    fn test_client_requires_api_key() {
        let mut config = LlmConfig::new("http://localhost:11434/v1");
        config.api_key = None;
        assert!(matches!(
            ChatCompletionClient::new(config),
            Err(LlmError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_parse_completion_first_choice() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"[\"a.js\"]"}}]}"#;
        assert_eq!(parse_completion(body).unwrap(), "[\"a.js\"]");
    }

    #[test]
    fn test_parse_completion_without_choices() {
        assert!(matches!(
            parse_completion(r#"{"choices":[]}"#),
            Err(LlmError::EmptyResponse)
        ));
        assert!(matches!(
            parse_completion(r#"{"choices":[{"message":{"content":null}}]}"#),
            Err(LlmError::EmptyResponse)
        ));
    }

    #[test]
    fn test_parse_completion_invalid_json() {
        assert!(matches!(parse_completion("<html>"), Err(LlmError::Json(_))));
    }
}
