//! Stage 2: ask the model for complete file rewrites plus PR metadata.

use std::sync::Arc;

use llm_gateway::{CompletionClient, CompletionRequest};

use crate::error::{Result, Stage, WeaveError};

const SYNTH_SYSTEM_PROMPT: &str = r#"You are CodeWeaver, a senior full-stack engineer.
Using the user's task and the code context provided, produce the complete new
contents of every file you modify or create.

Output every modified or new file in exactly this form:

<file path="path/to/filename.ext">
FULL NEW FILE CONTENT
</file>

Always emit the whole file, never a diff or an excerpt.

Finish with exactly one pull-request metadata block containing a JSON object:

<pr_meta>
{"title": "Short pull request title", "description": "What changed and why"}
</pr_meta>"#;

pub fn synth_user_prompt(instruction: &str, context: &str) -> String {
    format!(
        "Task: \"{instruction}\"\n\n\
         Relevant code context:\n{context}\n\n\
         Produce the changes now."
    )
}

/// Issues the synthesis completion and returns the raw text.
pub struct CodeSynthesizer {
    client: Arc<dyn CompletionClient>,
    model: String,
    temperature: f32,
}

impl CodeSynthesizer {
    pub fn new(client: Arc<dyn CompletionClient>, model: &str, temperature: f32) -> Self {
        Self {
            client,
            model: model.to_string(),
            temperature,
        }
    }

    pub fn request(&self, instruction: &str, context: &str) -> CompletionRequest {
        CompletionRequest::new(&self.model, self.temperature)
            .system(SYNTH_SYSTEM_PROMPT)
            .user(synth_user_prompt(instruction, context))
    }

    pub async fn synthesize(&self, instruction: &str, context: &str) -> Result<String> {
        let request = self.request(instruction, context);
        self.client
            .complete(&request)
            .await
            .map_err(|source| WeaveError::Completion {
                stage: Stage::Synthesis,
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm_gateway::fakes::ScriptedCompletions;
    use llm_gateway::Role;

    #[test]
    fn system_prompt_states_both_block_forms() {
        assert!(SYNTH_SYSTEM_PROMPT.contains("<file path=\""));
        assert!(SYNTH_SYSTEM_PROMPT.contains("</file>"));
        assert!(SYNTH_SYSTEM_PROMPT.contains("<pr_meta>"));
        assert!(SYNTH_SYSTEM_PROMPT.contains("</pr_meta>"));
    }

    #[tokio::test]
    async fn synthesis_request_is_free_form() {
        let fake = Arc::new(ScriptedCompletions::new(["<file path=\"a\">b</file>"]));
        let synth = CodeSynthesizer::new(fake.clone(), "deepseek-coder", 0.2);

        let raw = synth
            .synthesize("add a", "\n--- FILE: a ---\n\n")
            .await
            .unwrap();
        assert_eq!(raw, "<file path=\"a\">b</file>");

        let seen = &fake.requests()[0];
        assert!(seen.response_format.is_none());
        assert_eq!(seen.messages[0].role, Role::System);
        assert!(seen.messages[1].content.contains("--- FILE: a ---"));
        assert!((seen.temperature - 0.2).abs() < f32::EPSILON);
    }
}
