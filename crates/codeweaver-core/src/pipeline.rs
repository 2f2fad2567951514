//! End-to-end orchestration: snapshot, plan, read, synthesize, publish.
//!
//! Stages run strictly in sequence and every failure aborts the run. Nothing
//! on the host changes until the synthesis output has been parsed and
//! accepted, so a run that fails before publication leaves no trace.

use std::sync::Arc;
use std::time::Instant;

use llm_gateway::CompletionClient;
use repo_objects::{HostingProvider, ObjectId, RepoRef};
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::branch::{BranchNamer, TimestampBranchNamer};
use crate::commit::AtomicCommitBuilder;
use crate::config::WeaveConfig;
use crate::context::ContextAssembler;
use crate::error::{Result, WeaveError};
use crate::markup::{parse_response, ParsedResponse};
use crate::model::RunResult;
use crate::obs;
use crate::planner::ChangePlanner;
use crate::snapshot::{RepositorySnapshotReader, Snapshot};
use crate::synthesizer::CodeSynthesizer;

/// Result of the read-only planning stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanOutcome {
    pub branch: String,
    pub commit: ObjectId,
    /// Number of regular files the planner chose from
    pub candidates: usize,
    pub plan: Vec<String>,
}

/// The CodeWeaver pipeline bound to one model endpoint and one host.
pub struct Pipeline {
    completions: Arc<dyn CompletionClient>,
    host: Arc<dyn HostingProvider>,
    namer: Arc<dyn BranchNamer>,
    config: WeaveConfig,
}

impl Pipeline {
    pub fn new(
        completions: Arc<dyn CompletionClient>,
        host: Arc<dyn HostingProvider>,
        config: WeaveConfig,
    ) -> Self {
        let namer = Arc::new(TimestampBranchNamer::new(&config.branch_prefix));
        Self {
            completions,
            host,
            namer,
            config,
        }
    }

    /// Replace the default timestamp namer.
    pub fn with_branch_namer(mut self, namer: Arc<dyn BranchNamer>) -> Self {
        self.namer = namer;
        self
    }

    pub fn config(&self) -> &WeaveConfig {
        &self.config
    }

    /// Run all stages and open a pull request against the base branch.
    pub async fn run(&self, owner: &str, name: &str, instruction: &str) -> Result<RunResult> {
        let repo = parse_repo(owner, name)?;
        let run_id = new_run_id();
        let repo_label = repo.to_string();
        let started = Instant::now();

        async {
            obs::emit_run_started(&run_id, &repo_label, instruction.chars().count());
            let outcome = self.run_stages(&run_id, &repo, instruction).await;
            let elapsed = started.elapsed().as_millis() as u64;
            match &outcome {
                Ok(result) => obs::emit_run_finished(&run_id, elapsed, result.change_set.len()),
                Err(e) => obs::emit_run_failed(&run_id, elapsed, e),
            }
            outcome
        }
        .instrument(obs::run_span(&run_id, &repo_label))
        .await
    }

    /// Snapshot and plan only; performs no writes.
    pub async fn plan(&self, owner: &str, name: &str, instruction: &str) -> Result<PlanOutcome> {
        let repo = parse_repo(owner, name)?;
        let run_id = new_run_id();
        let repo_label = repo.to_string();

        async {
            let (snapshot, plan) = self.plan_stage(&run_id, &repo, instruction).await?;
            Ok(PlanOutcome {
                branch: snapshot.branch,
                commit: snapshot.commit,
                candidates: snapshot.entries.iter().filter(|e| e.is_blob()).count(),
                plan,
            })
        }
        .instrument(obs::run_span(&run_id, &repo_label))
        .await
    }

    async fn plan_stage(
        &self,
        run_id: &str,
        repo: &RepoRef,
        instruction: &str,
    ) -> Result<(Snapshot, Vec<String>)> {
        let reader = RepositorySnapshotReader::new(self.host.clone());
        let snapshot = reader
            .snapshot(repo, self.config.base_branch.as_deref())
            .await?;

        let paths: Vec<&str> = snapshot.blob_paths().collect();
        let file_list = paths.join("\n");
        let planner = ChangePlanner::new(
            self.completions.clone(),
            &self.config.planner_model,
            self.config.plan_temperature,
        );
        let plan = planner.plan(instruction, &file_list).await?;
        obs::emit_plan_completed(run_id, paths.len(), &plan);

        Ok((snapshot, plan))
    }

    async fn run_stages(&self, run_id: &str, repo: &RepoRef, instruction: &str) -> Result<RunResult> {
        let (snapshot, plan) = self.plan_stage(run_id, repo, instruction).await?;

        // Read at the observed commit so all contents share one tree.
        let reader = RepositorySnapshotReader::new(self.host.clone());
        let context = ContextAssembler::new(&reader)
            .assemble(repo, snapshot.commit.as_str(), &plan)
            .await?;
        obs::emit_context_assembled(run_id, plan.len(), context.len());

        let synthesizer = CodeSynthesizer::new(
            self.completions.clone(),
            &self.config.synth_model,
            self.config.synth_temperature,
        );
        let raw = synthesizer.synthesize(instruction, &context).await?;
        let parsed = self.accept(run_id, parse_response(&raw))?;

        let branch = self.namer.next_name();
        let publication = AtomicCommitBuilder::new(self.host.clone())
            .publish(repo, &snapshot.branch, &branch, &parsed.changes, &parsed.meta)
            .await?;
        obs::emit_commit_published(
            run_id,
            &publication.branch,
            publication.commit.as_str(),
            &publication.pull_request.url,
        );

        Ok(RunResult {
            pull_request_url: publication.pull_request.url,
            change_set: parsed.changes,
            meta: parsed.meta,
            branch: publication.branch,
            commit: publication.commit,
        })
    }

    /// Apply markup and empty-change-set policy to a parsed response.
    fn accept(&self, run_id: &str, parsed: ParsedResponse) -> Result<ParsedResponse> {
        for diagnostic in &parsed.diagnostics {
            obs::emit_markup_diagnostic(run_id, diagnostic);
        }

        if self.config.strict_markup {
            let structural: Vec<String> = parsed
                .structural_diagnostics()
                .map(ToString::to_string)
                .collect();
            if !structural.is_empty() {
                return Err(WeaveError::MalformedSynthesis(structural.join("; ")));
            }
        }

        obs::emit_synthesis_parsed(run_id, parsed.changes.len(), parsed.meta_defaulted);

        if parsed.changes.is_empty() && !self.config.allow_empty_change_set {
            return Err(WeaveError::EmptyChangeSet);
        }
        Ok(parsed)
    }
}

fn parse_repo(owner: &str, name: &str) -> Result<RepoRef> {
    RepoRef::new(owner, name).map_err(|e| WeaveError::InvalidRepository(e.to_string()))
}

fn new_run_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
