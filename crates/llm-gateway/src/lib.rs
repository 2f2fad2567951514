//! LLM-Gateway: Chat Completions for CodeWeaver
//!
//! A deliberately small surface: one request type, one trait, one HTTP
//! implementation for OpenAI-compatible `/chat/completions` endpoints
//! (DeepSeek, OpenAI, Ollama), and a scripted fake for tests.

mod client;
mod completion;
mod error;
pub mod fakes;

pub use client::{ChatCompletionClient, LlmConfig};
pub use completion::{ChatMessage, CompletionClient, CompletionRequest, ResponseFormat, Role};
pub use error::LlmError;

/// Result type for completion calls
pub type Result<T> = std::result::Result<T, LlmError>;
