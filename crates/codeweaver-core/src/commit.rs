//! Publishes a change set as one commit on a new branch, then opens a PR.
//!
//! Atomicity comes from the object model: the new tree captures the whole
//! resulting layout, and nothing becomes visible until the branch ref is
//! created. A failure before that point leaves only unreferenced objects
//! behind, which are never cleaned up here.

use std::sync::Arc;

use repo_objects::{
    HostError, HostingProvider, ObjectId, PullRequest, PullRequestSpec, RepoRef, TreeOverlay,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, WeaveError};
use crate::model::{FileChange, PullRequestMeta};

/// Where a change set ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    pub branch: String,
    pub commit: ObjectId,
    pub pull_request: PullRequest,
}

/// Collapse duplicate paths so the last write wins, keeping first-seen order.
fn overlay_entries(writes: Vec<TreeOverlay>) -> Vec<TreeOverlay> {
    let mut overlay: Vec<TreeOverlay> = Vec::with_capacity(writes.len());
    for write in writes {
        match overlay.iter_mut().find(|o| o.path == write.path) {
            Some(existing) => existing.blob = write.blob,
            None => overlay.push(write),
        }
    }
    overlay
}

pub struct AtomicCommitBuilder {
    host: Arc<dyn HostingProvider>,
}

impl AtomicCommitBuilder {
    pub fn new(host: Arc<dyn HostingProvider>) -> Self {
        Self { host }
    }

    /// Commit `changes` on top of `base_branch` as `branch`, then open a PR.
    pub async fn publish(
        &self,
        repo: &RepoRef,
        base_branch: &str,
        branch: &str,
        changes: &[FileChange],
        meta: &PullRequestMeta,
    ) -> Result<Publication> {
        let tip = self
            .host
            .branch_tip(repo, base_branch)
            .await
            .map_err(|e| WeaveError::read(format!("branch {base_branch}"), e))?;
        let base_tree = self
            .host
            .commit_tree(repo, &tip)
            .await
            .map_err(|e| WeaveError::read(format!("commit {tip}"), e))?;

        let mut writes = Vec::with_capacity(changes.len());
        for change in changes {
            let blob = self
                .host
                .create_blob(repo, &change.content)
                .await
                .map_err(|e| WeaveError::write("create blob", e))?;
            debug!(path = %change.path, blob = %blob.short(), "blob created");
            writes.push(TreeOverlay {
                path: change.path.clone(),
                blob,
            });
        }

        let tree = self
            .host
            .create_tree(repo, &base_tree, &overlay_entries(writes))
            .await
            .map_err(|e| WeaveError::write("create tree", e))?;

        let commit = self
            .host
            .create_commit(repo, &meta.title, &tree, std::slice::from_ref(&tip))
            .await
            .map_err(|e| WeaveError::write("create commit", e))?;
        debug!(tree = %tree.short(), commit = %commit.short(), parent = %tip.short(), "commit created");

        self.host
            .create_branch(repo, branch, &commit)
            .await
            .map_err(|e| match e {
                HostError::RefAlreadyExists(name) => WeaveError::BranchCollision(name),
                other => WeaveError::write("create branch", other),
            })?;

        let spec = PullRequestSpec {
            title: meta.title.clone(),
            body: meta.description.clone(),
            head: branch.to_string(),
            base: base_branch.to_string(),
        };
        let pull_request = self
            .host
            .open_pull_request(repo, &spec)
            .await
            .map_err(|e| WeaveError::write("open pull request", e))?;

        Ok(Publication {
            branch: branch.to_string(),
            commit,
            pull_request,
        })
    }
}
