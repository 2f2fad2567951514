//! Object API trait definitions for CodeWeaver
//!
//! These traits model a hosting provider's commit graph:
//! - `RepositoryReader`: read-only walk from branch name to file contents
//! - `ObjectWriter`: content-addressed writes plus ref and pull-request creation
//!
//! All traits are async and provider-agnostic. An in-memory implementation
//! lives in the `fakes` module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::HostError;

/// Result type for hosting-provider operations
pub type HostResult<T> = std::result::Result<T, HostError>;

/// Git mode for a regular, non-executable file.
pub const REGULAR_FILE_MODE: &str = "100644";

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Opaque object identifier (a commit, tree or blob SHA).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn new(id: impl Into<String>) -> Self {
        ObjectId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 7 chars), as git prints it.
    pub fn short(&self) -> &str {
        &self.0[..7.min(self.0.len())]
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `owner/name` pair identifying a hosted repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> HostResult<Self> {
        let owner = owner.into();
        let name = name.into();
        if !is_valid_segment(&owner) || !is_valid_segment(&name) {
            return Err(HostError::InvalidRepository(format!("{owner}/{name}")));
        }
        Ok(RepoRef { owner, name })
    }

    /// Parse `owner/name` or a web URL such as `https://github.com/owner/name`.
    ///
    /// A trailing `/` or `.git` suffix is ignored. For URLs the last two path
    /// segments are taken as owner and name.
    pub fn parse(input: &str) -> HostResult<Self> {
        let trimmed = input.trim().trim_end_matches('/');
        let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);

        let segments: Vec<&str> = if let Some((_, rest)) = trimmed.split_once("://") {
            rest.split('/').skip(1).collect()
        } else {
            trimmed.split('/').collect()
        };

        match segments.as_slice() {
            [.., owner, name] => Self::new(*owner, *name)
                .map_err(|_| HostError::InvalidRepository(input.to_string())),
            _ => Err(HostError::InvalidRepository(input.to_string())),
        }
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

// ---------------------------------------------------------------------------
// Tree data
// ---------------------------------------------------------------------------

/// Kind of an entry in a recursive tree listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Blob,
    Tree,
    /// Submodule pointer
    Commit,
}

/// One entry of a repository tree at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    pub kind: EntryKind,
    pub id: ObjectId,
}

impl TreeEntry {
    pub fn is_blob(&self) -> bool {
        self.kind == EntryKind::Blob
    }
}

/// A regular-file entry laid over a base tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeOverlay {
    pub path: String,
    pub blob: ObjectId,
}

/// Request to open a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestSpec {
    pub title: String,
    pub body: String,
    /// Branch carrying the change
    pub head: String,
    /// Branch the change targets
    pub base: String,
}

/// An opened pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    /// Web URL for humans
    pub url: String,
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Read-only access to a repository's commit graph.
///
/// Guarantees:
/// - `read_file` returns `Ok(None)` when the path does not exist at the given
///   reference or is not a regular file (a directory, symlink or submodule);
///   transport and auth failures are always `Err`. Large files are returned in
///   full, never truncated or empty.
/// - `list_tree` is recursive: nested paths are fully qualified.
#[async_trait]
pub trait RepositoryReader: Send + Sync {
    /// Name of the repository's primary branch.
    async fn default_branch(&self, repo: &RepoRef) -> HostResult<String>;

    /// Commit the branch currently points at.
    async fn branch_tip(&self, repo: &RepoRef, branch: &str) -> HostResult<ObjectId>;

    /// Root tree of a commit.
    async fn commit_tree(&self, repo: &RepoRef, commit: &ObjectId) -> HostResult<ObjectId>;

    /// Recursive listing of a tree.
    async fn list_tree(&self, repo: &RepoRef, tree: &ObjectId) -> HostResult<Vec<TreeEntry>>;

    /// Decoded text of the blob at `path`, as of `reference` (branch or commit).
    async fn read_file(
        &self,
        repo: &RepoRef,
        reference: &str,
        path: &str,
    ) -> HostResult<Option<String>>;
}

/// Write access to a repository's object store, refs and pull requests.
///
/// Blob, tree and commit creation never change what any branch points at.
/// Only `create_branch` makes objects reachable, and it must fail with
/// `HostError::RefAlreadyExists` rather than move an existing ref.
#[async_trait]
pub trait ObjectWriter: Send + Sync {
    /// Store UTF-8 text as a blob.
    async fn create_blob(&self, repo: &RepoRef, content: &str) -> HostResult<ObjectId>;

    /// Create a tree equal to `base_tree` with every overlay entry written in order.
    async fn create_tree(
        &self,
        repo: &RepoRef,
        base_tree: &ObjectId,
        overlay: &[TreeOverlay],
    ) -> HostResult<ObjectId>;

    /// Create a commit object.
    async fn create_commit(
        &self,
        repo: &RepoRef,
        message: &str,
        tree: &ObjectId,
        parents: &[ObjectId],
    ) -> HostResult<ObjectId>;

    /// Create `refs/heads/<name>` pointing at `target`. Create-only.
    async fn create_branch(&self, repo: &RepoRef, name: &str, target: &ObjectId)
        -> HostResult<()>;

    /// Open a pull request.
    async fn open_pull_request(
        &self,
        repo: &RepoRef,
        spec: &PullRequestSpec,
    ) -> HostResult<PullRequest>;
}

/// A provider that can both read and write.
pub trait HostingProvider: RepositoryReader + ObjectWriter {}

impl<T: RepositoryReader + ObjectWriter> HostingProvider for T {}
