//! Pipeline error taxonomy for CodeWeaver.

use llm_gateway::LlmError;
use repo_objects::HostError;

/// Pipeline stage issuing a completion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Planning,
    Synthesis,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Planning => f.write_str("planning"),
            Stage::Synthesis => f.write_str("synthesis"),
        }
    }
}

/// CodeWeaver pipeline errors.
///
/// Every stage failure aborts the run and surfaces as exactly one of these.
#[derive(Debug, thiserror::Error)]
pub enum WeaveError {
    #[error("planning response is not a JSON array of paths: {0}")]
    PlanParse(String),

    #[error("failed to read {what}: {source}")]
    Read {
        what: String,
        #[source]
        source: HostError,
    },

    #[error("{stage} completion failed: {source}")]
    Completion {
        stage: Stage,
        #[source]
        source: LlmError,
    },

    #[error("synthesis output is structurally malformed: {0}")]
    MalformedSynthesis(String),

    #[error("synthesis produced no file changes")]
    EmptyChangeSet,

    #[error("branch `{0}` already exists")]
    BranchCollision(String),

    #[error("failed to {step}: {source}")]
    Write {
        step: &'static str,
        #[source]
        source: HostError,
    },

    #[error("invalid repository: {0}")]
    InvalidRepository(String),
}

impl WeaveError {
    pub(crate) fn read(what: impl Into<String>, source: HostError) -> Self {
        WeaveError::Read {
            what: what.into(),
            source,
        }
    }

    pub(crate) fn write(step: &'static str, source: HostError) -> Self {
        WeaveError::Write { step, source }
    }

    /// Short machine-readable tag for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            WeaveError::PlanParse(_) => "plan_parse",
            WeaveError::Read { .. } => "read",
            WeaveError::Completion { .. } => "completion",
            WeaveError::MalformedSynthesis(_) => "malformed_synthesis",
            WeaveError::EmptyChangeSet => "empty_change_set",
            WeaveError::BranchCollision(_) => "branch_collision",
            WeaveError::Write { .. } => "write",
            WeaveError::InvalidRepository(_) => "invalid_repository",
        }
    }
}

/// Result type for CodeWeaver pipeline operations.
pub type Result<T> = std::result::Result<T, WeaveError>;
