//! Pipeline configuration.

use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL: &str = "deepseek-coder";
pub const DEFAULT_BRANCH_PREFIX: &str = "ai-feature";

/// Tunables for one `Pipeline`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaveConfig {
    /// Model used for file selection
    pub planner_model: String,
    /// Model used for code synthesis
    pub synth_model: String,
    /// Planning is classificatory; keep it near-deterministic
    pub plan_temperature: f32,
    pub synth_temperature: f32,
    /// Target branch; `None` means the repository's primary branch
    pub base_branch: Option<String>,
    pub branch_prefix: String,
    /// Open a pull request even when the model produced no file blocks
    pub allow_empty_change_set: bool,
    /// Fail the run on unterminated or nested file blocks
    pub strict_markup: bool,
}

impl Default for WeaveConfig {
    fn default() -> Self {
        let model =
            std::env::var("CODEWEAVER_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        WeaveConfig {
            planner_model: model.clone(),
            synth_model: model,
            plan_temperature: 0.1,
            synth_temperature: 0.2,
            base_branch: None,
            branch_prefix: DEFAULT_BRANCH_PREFIX.to_string(),
            allow_empty_change_set: false,
            strict_markup: true,
        }
    }
}

impl WeaveConfig {
    /// Create a new config from environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Use one model for both stages
    pub fn with_model(mut self, model: &str) -> Self {
        self.planner_model = model.to_string();
        self.synth_model = model.to_string();
        self
    }

    pub fn with_base_branch(mut self, branch: &str) -> Self {
        self.base_branch = Some(branch.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_temperatures_order() {
        let config = WeaveConfig::default();
        assert!(config.plan_temperature < config.synth_temperature);
        assert!(config.strict_markup);
        assert!(!config.allow_empty_change_set);
        assert_eq!(config.branch_prefix, "ai-feature");
    }

    #[test]
    fn test_with_model_sets_both_stages() {
        let config = WeaveConfig::default().with_model("gpt-4o");
        assert_eq!(config.planner_model, "gpt-4o");
        assert_eq!(config.synth_model, "gpt-4o");
    }
}
