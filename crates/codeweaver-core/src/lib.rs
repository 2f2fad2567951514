//! CodeWeaver Core Library
//!
//! Turns a natural-language instruction into a pull request against a hosted
//! repository. A run proceeds in two model stages followed by one atomic
//! publication:
//!
//! 1. **Plan**: the model picks which existing files it needs to read.
//! 2. **Synthesize**: the model rewrites whole files from that context and
//!    proposes pull-request metadata, in a small tag markup.
//! 3. **Publish**: every change lands in one commit on a fresh branch built
//!    from git objects, then a pull request is opened.
//!
//! ## Key Components
//!
//! - `Pipeline`: the orchestrator
//! - `markup::parse_response`: tokenizer for the synthesis markup
//! - `AtomicCommitBuilder`: blob → tree → commit → ref publication
//! - `obs`/`telemetry`: structured tracing events and subscriber setup

pub mod branch;
pub mod commit;
pub mod config;
pub mod context;
pub mod error;
pub mod markup;
pub mod model;
pub mod obs;
pub mod pipeline;
pub mod planner;
pub mod snapshot;
pub mod synthesizer;
pub mod telemetry;

pub use branch::{BranchNamer, TimestampBranchNamer};
pub use commit::{AtomicCommitBuilder, Publication};
pub use config::WeaveConfig;
pub use context::{render_context, ContextAssembler};
pub use error::{Result, Stage, WeaveError};
pub use markup::{parse_response, Diagnostic, DiagnosticKind, ParsedResponse};
pub use model::{ChangeSet, FileChange, FileContext, PullRequestMeta, RunResult};
pub use pipeline::{Pipeline, PlanOutcome};
pub use planner::{parse_plan, ChangePlanner};
pub use snapshot::{RepositorySnapshotReader, Snapshot};
pub use synthesizer::CodeSynthesizer;
pub use telemetry::init_tracing;
