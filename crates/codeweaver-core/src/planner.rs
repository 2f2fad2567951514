//! Stage 1: decide which files the synthesizer needs to see.

use std::collections::HashSet;
use std::sync::Arc;

use llm_gateway::{CompletionClient, CompletionRequest};

use crate::error::{Result, Stage, WeaveError};
use crate::markup::strip_code_fences;

const PLAN_SYSTEM_PROMPT: &str = "\
You are CodeWeaver, a senior engineer preparing to change a repository.
Your only job right now is to decide which existing files must be read to
complete the user's task.
Reply with a JSON array of file paths and nothing else, for example:
[\"src/app.js\", \"package.json\"]
Reply with [] if no existing file needs to be read.";

/// Build the planning prompt from the instruction and the repository's paths.
pub fn plan_user_prompt(instruction: &str, file_list: &str) -> String {
    format!(
        "Task: \"{instruction}\"\n\n\
         Files in the repository:\n{file_list}\n\n\
         List the paths whose current contents you must read."
    )
}

/// Parse a planning response into an ordered, duplicate-free list of paths.
///
/// Code fences are stripped first. Anything other than a JSON array of
/// strings is an error; there is no fallback to an empty plan.
pub fn parse_plan(raw: &str) -> Result<Vec<String>> {
    let cleaned = strip_code_fences(raw);
    let paths: Vec<String> = serde_json::from_str(&cleaned).map_err(|e| {
        let excerpt: String = cleaned.chars().take(120).collect();
        WeaveError::PlanParse(format!("{e} (response began: {excerpt:?})"))
    })?;

    let mut seen = HashSet::new();
    Ok(paths
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty() && seen.insert(p.clone()))
        .collect())
}

/// Issues the planning completion.
pub struct ChangePlanner {
    client: Arc<dyn CompletionClient>,
    model: String,
    temperature: f32,
}

impl ChangePlanner {
    pub fn new(client: Arc<dyn CompletionClient>, model: &str, temperature: f32) -> Self {
        Self {
            client,
            model: model.to_string(),
            temperature,
        }
    }

    pub fn request(&self, instruction: &str, file_list: &str) -> CompletionRequest {
        CompletionRequest::new(&self.model, self.temperature)
            .system(PLAN_SYSTEM_PROMPT)
            .user(plan_user_prompt(instruction, file_list))
            .json_only()
    }

    /// Ask the model which paths to read. `file_list` is newline-joined.
    pub async fn plan(&self, instruction: &str, file_list: &str) -> Result<Vec<String>> {
        let request = self.request(instruction, file_list);
        let raw = self
            .client
            .complete(&request)
            .await
            .map_err(|source| WeaveError::Completion {
                stage: Stage::Planning,
                source,
            })?;
        parse_plan(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm_gateway::fakes::ScriptedCompletions;
    use llm_gateway::ResponseFormat;

    #[test]
    fn fenced_and_bare_arrays_parse_identically() {
        let fenced = parse_plan("```json\n[\"a.js\"]\n```").unwrap();
        let bare = parse_plan("[\"a.js\"]").unwrap();
        assert_eq!(fenced, bare);
        assert_eq!(bare, vec!["a.js".to_string()]);
    }

    #[test]
    fn empty_array_is_valid_plan() {
        assert!(parse_plan("[]").unwrap().is_empty());
    }

    #[test]
    fn object_is_rejected() {
        let err = parse_plan(r#"{"files": ["a.js"]}"#).unwrap_err();
        assert!(matches!(err, WeaveError::PlanParse(_)));
    }

    #[test]
    fn non_string_items_are_rejected() {
        assert!(parse_plan("[1, 2]").is_err());
        assert!(parse_plan("[\"a.js\", null]").is_err());
    }

    #[test]
    fn prose_is_rejected() {
        let err = parse_plan("I think you should read a.js").unwrap_err();
        assert!(err.to_string().contains("response began"));
    }

    #[test]
    fn duplicates_collapse_keeping_first_position() {
        let plan = parse_plan(r#"["b.js", "a.js", "b.js", " ", "c.js"]"#).unwrap();
        assert_eq!(plan, vec!["b.js", "a.js", "c.js"]);
    }

    #[tokio::test]
    async fn plan_request_is_json_only_and_cold() {
        let fake = Arc::new(ScriptedCompletions::new(["[\"README.md\"]"]));
        let planner = ChangePlanner::new(fake.clone(), "deepseek-coder", 0.1);

        let plan = planner.plan("fix typo", "README.md\nsrc/lib.rs").await.unwrap();
        assert_eq!(plan, vec!["README.md"]);

        let seen = fake.requests();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].response_format, Some(ResponseFormat::JsonObject));
        assert!((seen[0].temperature - 0.1).abs() < f32::EPSILON);
        assert!(seen[0].messages[1].content.contains("src/lib.rs"));
        assert!(seen[0].messages[1].content.contains("fix typo"));
    }

    #[tokio::test]
    async fn completion_failure_is_tagged_with_stage() {
        let fake = Arc::new(ScriptedCompletions::new(Vec::<String>::new()));
        fake.push_error(401, "invalid key");
        let planner = ChangePlanner::new(fake, "m", 0.1);
        let err = planner.plan("x", "").await.unwrap_err();
        assert!(matches!(
            err,
            WeaveError::Completion {
                stage: Stage::Planning,
                ..
            }
        ));
    }
}
