//! Error types for llm-gateway

use thiserror::Error;

/// Errors that can occur when requesting a completion
#[derive(Error, Debug)]
pub enum LlmError {
    /// Endpoint or credentials missing
    #[error("completion endpoint is not configured: {0}")]
    NotConfigured(String),

    /// Connection, TLS or timeout failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// Endpoint answered with a non-success status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Endpoint answered without any generated text
    #[error("completion response contained no message content")]
    EmptyResponse,

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Http(err.to_string())
    }
}
