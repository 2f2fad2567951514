//! Read-only view of a repository branch at one commit.

use std::sync::Arc;

use repo_objects::{HostingProvider, ObjectId, RepoRef, TreeEntry};
use tracing::debug;

use crate::error::{Result, WeaveError};

/// A branch's file tree as observed at one moment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub branch: String,
    /// Tip commit at the time of the read
    pub commit: ObjectId,
    pub tree: ObjectId,
    pub entries: Vec<TreeEntry>,
}

impl Snapshot {
    /// Paths of regular files, in listing order.
    pub fn blob_paths(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|e| e.is_blob())
            .map(|e| e.path.as_str())
    }
}

/// Fetches trees and file contents from the hosting provider.
pub struct RepositorySnapshotReader {
    host: Arc<dyn HostingProvider>,
}

impl RepositorySnapshotReader {
    pub fn new(host: Arc<dyn HostingProvider>) -> Self {
        Self { host }
    }

    /// Resolve `branch` (or the primary branch) and list its full tree.
    pub async fn snapshot(&self, repo: &RepoRef, branch: Option<&str>) -> Result<Snapshot> {
        let branch = match branch {
            Some(b) => b.to_string(),
            None => self
                .host
                .default_branch(repo)
                .await
                .map_err(|e| WeaveError::read(format!("default branch of {repo}"), e))?,
        };

        let commit = self
            .host
            .branch_tip(repo, &branch)
            .await
            .map_err(|e| WeaveError::read(format!("branch {branch}"), e))?;
        let tree = self
            .host
            .commit_tree(repo, &commit)
            .await
            .map_err(|e| WeaveError::read(format!("commit {commit}"), e))?;
        let entries = self
            .host
            .list_tree(repo, &tree)
            .await
            .map_err(|e| WeaveError::read(format!("tree {tree}"), e))?;

        debug!(
            repo = %repo,
            branch = %branch,
            commit = %commit.short(),
            entries = entries.len(),
            "snapshot read"
        );

        Ok(Snapshot {
            branch,
            commit,
            tree,
            entries,
        })
    }

    /// Decoded text of `path` at `reference`; `None` if the path is absent.
    pub async fn read_file(
        &self,
        repo: &RepoRef,
        reference: &str,
        path: &str,
    ) -> Result<Option<String>> {
        self.host
            .read_file(repo, reference, path)
            .await
            .map_err(|e| WeaveError::read(path, e))
    }
}
