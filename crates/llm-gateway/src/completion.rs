//! Completion request model and client trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role-tagged message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Output-format hint. Serialized as `{"type": "json_object"}` etc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    Text,
    JsonObject,
}

/// A single completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, temperature: f32) -> Self {
        CompletionRequest {
            model: model.into(),
            messages: Vec::new(),
            temperature,
            response_format: None,
        }
    }

    pub fn system(mut self, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage::system(content));
        self
    }

    pub fn user(mut self, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage::user(content));
        self
    }

    /// Ask the endpoint for a JSON-only response.
    pub fn json_only(mut self) -> Self {
        self.response_format = Some(ResponseFormat::JsonObject);
        self
    }
}

/// Anything that can turn a request into one generated text.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder_keeps_message_order() {
        let req = CompletionRequest::new("deepseek-coder", 0.1)
            .system("sys")
            .user("usr")
            .json_only();
        assert_eq!(req.messages.len(), 2);
        assert_eq!(req.messages[0].role, Role::System);
        assert_eq!(req.messages[1].role, Role::User);
        assert_eq!(req.response_format, Some(ResponseFormat::JsonObject));
    }

    #[test]
    fn test_request_wire_format() {
        let req = CompletionRequest::new("m", 0.2).user("hi").json_only();
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["response_format"]["type"], "json_object");
    }

    #[test]
    fn test_free_form_request_omits_response_format() {
        let req = CompletionRequest::new("m", 0.2).user("hi");
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("response_format").is_none());
    }
}
