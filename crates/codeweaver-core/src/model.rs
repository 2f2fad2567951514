//! Data carried between pipeline stages.

use repo_objects::ObjectId;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PR_TITLE: &str = "AI Update";
pub const DEFAULT_PR_DESCRIPTION: &str = "Automated changes by CodeWeaver";

/// Current content of one planned file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContext {
    pub path: String,
    pub content: String,
}

/// Full replacement content for one path (modify or create).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    pub content: String,
}

impl FileChange {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        FileChange {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Changes in order of appearance. Duplicate paths are applied in order.
pub type ChangeSet = Vec<FileChange>;

/// Pull-request title and body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestMeta {
    pub title: String,
    pub description: String,
}

impl Default for PullRequestMeta {
    fn default() -> Self {
        PullRequestMeta {
            title: DEFAULT_PR_TITLE.to_string(),
            description: DEFAULT_PR_DESCRIPTION.to_string(),
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub pull_request_url: String,
    pub change_set: ChangeSet,
    pub meta: PullRequestMeta,
    pub branch: String,
    pub commit: ObjectId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_meta() {
        let meta = PullRequestMeta::default();
        assert_eq!(meta.title, "AI Update");
        assert_eq!(meta.description, "Automated changes by CodeWeaver");
    }

    #[test]
    fn test_run_result_serializes_camel_case() {
        let result = RunResult {
            pull_request_url: "https://github.test/o/r/pull/1".to_string(),
            change_set: vec![FileChange::new("a.txt", "a")],
            meta: PullRequestMeta::default(),
            branch: "ai-feature-1".to_string(),
            commit: ObjectId::new("c0ffee"),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["pullRequestUrl"], "https://github.test/o/r/pull/1");
        assert_eq!(json["changeSet"][0]["path"], "a.txt");
        assert_eq!(json["commit"], "c0ffee");
    }
}
