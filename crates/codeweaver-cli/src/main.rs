//! CodeWeaver - instruction-to-pull-request CLI
//!
//! The `codeweaver` command turns a natural-language instruction into a
//! pull request against a hosted repository.
//!
//! ## Commands
//!
//! - `run`: plan, synthesize, commit on a new branch and open a pull request
//! - `plan`: show which files the model would read, without writing anything
//!
//! Results are printed to stdout as `{"success": true, "data": ...}` or
//! `{"success": false, "error": ...}`. Logs go to stderr.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use codeweaver_core::{Pipeline, WeaveConfig, WeaveError};
use llm_gateway::{ChatCompletionClient, LlmConfig};
use repo_objects::{GitHubClient, GitHubConfig, RepoRef};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "codeweaver")]
#[command(author = "CodeWeaver Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Turn an instruction into a multi-file pull request", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and open a pull request
    Run {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        endpoints: EndpointArgs,

        /// Open a pull request even if the model changed no files
        #[arg(long)]
        allow_empty: bool,

        /// Drop unterminated or nested file blocks instead of failing
        #[arg(long)]
        lenient_markup: bool,
    },

    /// Show the files the planner would read; writes nothing
    Plan {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        endpoints: EndpointArgs,
    },
}

#[derive(Args)]
struct TargetArgs {
    /// Repository as `owner/name` or a web URL
    #[arg(short, long)]
    repo: String,

    /// Natural-language instruction
    #[arg(short, long)]
    prompt: String,

    /// Branch to read from and target (default: the repository's primary branch)
    #[arg(long)]
    base_branch: Option<String>,

    /// Model used for both stages
    #[arg(long, env = "CODEWEAVER_MODEL", default_value = codeweaver_core::config::DEFAULT_MODEL)]
    model: String,
}

#[derive(Args)]
struct EndpointArgs {
    /// GitHub token with contents and pull-request write access
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// GitHub REST API root
    #[arg(long, env = "GITHUB_API_URL", default_value = "https://api.github.com")]
    github_api_url: String,

    /// Completion endpoint API key
    #[arg(long, env = "DEEPSEEK_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// OpenAI-compatible completion endpoint
    #[arg(long, env = "DEEPSEEK_BASE_URL", default_value = "https://api.deepseek.com")]
    base_url: String,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    codeweaver_core::init_tracing(cli.json, level);

    let envelope = match cli.command {
        Commands::Run {
            target,
            endpoints,
            allow_empty,
            lenient_markup,
        } => {
            let mut config = weave_config(&target);
            config.allow_empty_change_set = allow_empty;
            config.strict_markup = !lenient_markup;
            cmd_run(&target, &endpoints, config).await?
        }
        Commands::Plan { target, endpoints } => {
            cmd_plan(&target, &endpoints, weave_config(&target)).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&envelope)?);
    if envelope["success"] == Value::Bool(true) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn weave_config(target: &TargetArgs) -> WeaveConfig {
    let mut config = WeaveConfig::default().with_model(&target.model);
    if let Some(branch) = &target.base_branch {
        config = config.with_base_branch(branch);
    }
    config
}

fn build_pipeline(endpoints: &EndpointArgs, config: WeaveConfig) -> Result<Pipeline> {
    let mut github = GitHubConfig::new(&endpoints.github_api_url);
    if let Some(token) = &endpoints.github_token {
        github = github.with_token(token);
    }
    let host = GitHubClient::new(github).context("Failed to build GitHub client")?;

    let mut llm = LlmConfig::new(&endpoints.base_url);
    if let Some(key) = &endpoints.api_key {
        llm = llm.with_api_key(key);
    }
    let completions =
        ChatCompletionClient::new(llm).context("Failed to build completion client")?;

    Ok(Pipeline::new(Arc::new(completions), Arc::new(host), config))
}

async fn cmd_run(target: &TargetArgs, endpoints: &EndpointArgs, config: WeaveConfig) -> Result<Value> {
    let repo = RepoRef::parse(&target.repo).context("Invalid --repo")?;
    let pipeline = build_pipeline(endpoints, config)?;
    info!(repo = %repo, "starting run");

    let outcome = pipeline.run(&repo.owner, &repo.name, &target.prompt).await;
    envelope(outcome)
}

async fn cmd_plan(target: &TargetArgs, endpoints: &EndpointArgs, config: WeaveConfig) -> Result<Value> {
    let repo = RepoRef::parse(&target.repo).context("Invalid --repo")?;
    let pipeline = build_pipeline(endpoints, config)?;

    let outcome = pipeline.plan(&repo.owner, &repo.name, &target.prompt).await;
    envelope(outcome)
}

/// Wrap a pipeline outcome in the `success`/`data`/`error` envelope.
fn envelope<T: Serialize>(outcome: std::result::Result<T, WeaveError>) -> Result<Value> {
    Ok(match outcome {
        Ok(data) => {
            let data = serde_json::to_value(data)?;
            json!({ "success": true, "data": data })
        }
        Err(e) => json!({ "success": false, "error": e.to_string(), "kind": e.kind() }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use codeweaver_core::{FileChange, PullRequestMeta, RunResult};
    use repo_objects::ObjectId;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_flags_parse() {
        let cli = Cli::try_parse_from([
            "codeweaver",
            "--json",
            "run",
            "--repo",
            "https://github.com/octocat/hello",
            "--prompt",
            "Add a hello.txt file",
            "--base-branch",
            "develop",
            "--model",
            "deepseek-chat",
            "--allow-empty",
        ])
        .unwrap();

        assert!(cli.json);
        match cli.command {
            Commands::Run {
                target,
                allow_empty,
                lenient_markup,
                ..
            } => {
                assert_eq!(target.repo, "https://github.com/octocat/hello");
                assert_eq!(target.prompt, "Add a hello.txt file");
                assert!(allow_empty);
                assert!(!lenient_markup);

                let config = weave_config(&target);
                assert_eq!(config.base_branch.as_deref(), Some("develop"));
                assert_eq!(config.planner_model, "deepseek-chat");
                assert_eq!(config.synth_model, "deepseek-chat");
            }
            Commands::Plan { .. } => panic!("expected run"),
        }
    }

    #[test]
    fn test_plan_requires_prompt() {
        let result = Cli::try_parse_from(["codeweaver", "plan", "--repo", "octocat/hello"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_envelope_success_shape() {
        let result = RunResult {
            pull_request_url: "https://github.com/octocat/hello/pull/7".to_string(),
            change_set: vec![FileChange::new("hello.txt", "hi")],
            meta: PullRequestMeta::default(),
            branch: "ai-feature-1-deadbeef".to_string(),
            commit: ObjectId::new("c0ffee"),
        };
        let value = envelope(Ok(result)).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(
            value["data"]["pullRequestUrl"],
            "https://github.com/octocat/hello/pull/7"
        );
        assert_eq!(value["data"]["changeSet"][0]["path"], "hello.txt");
    }

    #[test]
    fn test_envelope_failure_shape() {
        let value = envelope::<RunResult>(Err(WeaveError::EmptyChangeSet)).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "synthesis produced no file changes");
        assert_eq!(value["kind"], "empty_change_set");
        assert!(value.get("data").is_none());
    }
}
