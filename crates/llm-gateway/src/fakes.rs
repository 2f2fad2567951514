//! In-memory fakes for `CompletionClient` (testing only)
//!
//! `ScriptedCompletions` answers requests from a fixed queue and records
//! every request it saw, so tests can assert on prompts and temperatures.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::completion::{CompletionClient, CompletionRequest};
use crate::error::LlmError;
use crate::Result;

/// Completion client that replays canned responses in order.
#[derive(Debug, Default)]
pub struct ScriptedCompletions {
    responses: Mutex<VecDeque<Result<String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompletions {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ScriptedCompletions {
            responses: Mutex::new(responses.into_iter().map(|s| Ok(s.into())).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue an endpoint failure as the next answer.
    pub fn push_error(&self, status: u16, message: &str) {
        self.responses.lock().unwrap().push_back(Err(LlmError::Api {
            status,
            message: message.to_string(),
        }));
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletions {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(LlmError::EmptyResponse))
    }
}
