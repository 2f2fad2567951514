//! In-memory fakes for the object traits (testing only)
//!
//! Provides `MemoryHosting`, a single-repository object store with git-like
//! semantics: content-addressed blobs, trees and commits, create-only branch
//! refs, and a pull-request list. Writes can be made to fail at a chosen
//! step with [`FailPoint`].

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::HostError;
use crate::object_traits::*;

/// Operation at which `MemoryHosting` should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    ReadFile,
    CreateBlob,
    CreateTree,
    CreateCommit,
    CreateBranch,
    OpenPullRequest,
}

/// A commit as stored by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitObject {
    pub tree: ObjectId,
    pub parents: Vec<ObjectId>,
    pub message: String,
}

/// A pull request as recorded by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRecord {
    pub number: u64,
    pub spec: PullRequestSpec,
    pub url: String,
}

#[derive(Debug, Default)]
struct Inner {
    default_branch: String,
    blobs: HashMap<ObjectId, String>,
    /// Trees are stored flattened: full path → blob id
    trees: HashMap<ObjectId, BTreeMap<String, ObjectId>>,
    commits: HashMap<ObjectId, CommitObject>,
    /// Branch name → commit
    refs: BTreeMap<String, ObjectId>,
    pulls: Vec<PullRequestRecord>,
    fail_on: Option<FailPoint>,
}

/// In-memory hosting provider for a single repository.
#[derive(Debug)]
pub struct MemoryHosting {
    repo: RepoRef,
    inner: Mutex<Inner>,
}

fn hash_object(kind: &str, payload: &[u8]) -> ObjectId {
    let mut hasher = Sha256::new();
    hasher.update(format!("{kind} {}\0", payload.len()).as_bytes());
    hasher.update(payload);
    ObjectId::new(hex::encode(hasher.finalize()))
}

fn tree_id(entries: &BTreeMap<String, ObjectId>) -> ObjectId {
    let mut payload = Vec::new();
    for (path, id) in entries {
        payload.extend_from_slice(REGULAR_FILE_MODE.as_bytes());
        payload.push(b' ');
        payload.extend_from_slice(path.as_bytes());
        payload.push(0);
        payload.extend_from_slice(id.as_str().as_bytes());
        payload.push(b'\n');
    }
    hash_object("tree", &payload)
}

fn commit_id(commit: &CommitObject) -> ObjectId {
    let mut payload = format!("tree {}\n", commit.tree);
    for parent in &commit.parents {
        payload.push_str(&format!("parent {parent}\n"));
    }
    payload.push('\n');
    payload.push_str(&commit.message);
    hash_object("commit", payload.as_bytes())
}

/// Same rules the GitHub tree API enforces on entry paths.
fn is_valid_tree_path(path: &str) -> bool {
    !path.is_empty()
        && !path.starts_with('/')
        && !path.ends_with('/')
        && path
            .split('/')
            .all(|seg| !seg.is_empty() && seg != "." && seg != ".." && seg != ".git")
}

impl MemoryHosting {
    /// Create an empty repository whose primary branch has one empty commit.
    pub fn new(repo: RepoRef, default_branch: &str) -> Self {
        Self::with_files(repo, default_branch, &[])
    }

    /// Create a repository whose primary branch has one commit holding `files`.
    pub fn with_files(repo: RepoRef, default_branch: &str, files: &[(&str, &str)]) -> Self {
        let mut inner = Inner {
            default_branch: default_branch.to_string(),
            ..Inner::default()
        };

        let mut entries = BTreeMap::new();
        for (path, content) in files {
            let id = hash_object("blob", content.as_bytes());
            inner.blobs.insert(id.clone(), (*content).to_string());
            entries.insert((*path).to_string(), id);
        }
        let tree = tree_id(&entries);
        inner.trees.insert(tree.clone(), entries);

        let root = CommitObject {
            tree,
            parents: Vec::new(),
            message: "Initial commit".to_string(),
        };
        let root_id = commit_id(&root);
        inner.commits.insert(root_id.clone(), root);
        inner.refs.insert(default_branch.to_string(), root_id);

        MemoryHosting {
            repo,
            inner: Mutex::new(inner),
        }
    }

    /// Make the next and all later calls of `point` fail.
    pub fn fail_on(&self, point: FailPoint) {
        self.inner.lock().unwrap().fail_on = Some(point);
    }

    /// Stop injecting failures.
    pub fn clear_failure(&self) {
        self.inner.lock().unwrap().fail_on = None;
    }

    /// Move a branch as if someone else pushed to it.
    pub fn push_files(&self, branch: &str, files: &[(&str, &str)], message: &str) -> ObjectId {
        let mut inner = self.inner.lock().unwrap();
        let parent = inner.refs.get(branch).cloned();
        let mut entries = parent
            .as_ref()
            .and_then(|c| inner.commits.get(c))
            .and_then(|c| inner.trees.get(&c.tree))
            .cloned()
            .unwrap_or_default();
        for (path, content) in files {
            let id = hash_object("blob", content.as_bytes());
            inner.blobs.insert(id.clone(), (*content).to_string());
            entries.insert((*path).to_string(), id);
        }
        let tree = tree_id(&entries);
        inner.trees.insert(tree.clone(), entries);
        let commit = CommitObject {
            tree,
            parents: parent.into_iter().collect(),
            message: message.to_string(),
        };
        let id = commit_id(&commit);
        inner.commits.insert(id.clone(), commit);
        inner.refs.insert(branch.to_string(), id.clone());
        id
    }

    /// Every file reachable from `branch`, with contents.
    pub fn branch_files(&self, branch: &str) -> Option<BTreeMap<String, String>> {
        let inner = self.inner.lock().unwrap();
        let commit = inner.commits.get(inner.refs.get(branch)?)?;
        let tree = inner.trees.get(&commit.tree)?;
        tree.iter()
            .map(|(path, id)| Some((path.clone(), inner.blobs.get(id)?.clone())))
            .collect()
    }

    /// Commit `branch` points at.
    pub fn branch_commit(&self, branch: &str) -> Option<(ObjectId, CommitObject)> {
        let inner = self.inner.lock().unwrap();
        let id = inner.refs.get(branch)?.clone();
        let commit = inner.commits.get(&id)?.clone();
        Some((id, commit))
    }

    /// All branch names.
    pub fn branches(&self) -> Vec<String> {
        self.inner.lock().unwrap().refs.keys().cloned().collect()
    }

    /// Pull requests opened so far, in order.
    pub fn pull_requests(&self) -> Vec<PullRequestRecord> {
        self.inner.lock().unwrap().pulls.clone()
    }

    /// Number of stored blobs (reachable or not).
    pub fn blob_count(&self) -> usize {
        self.inner.lock().unwrap().blobs.len()
    }

    /// Number of stored commits (reachable or not).
    pub fn commit_count(&self) -> usize {
        self.inner.lock().unwrap().commits.len()
    }

    fn check_repo(&self, repo: &RepoRef) -> HostResult<()> {
        if repo == &self.repo {
            Ok(())
        } else {
            Err(HostError::NotFound(format!("repository {repo}")))
        }
    }
}

fn check_fail(inner: &Inner, point: FailPoint) -> HostResult<()> {
    if inner.fail_on == Some(point) {
        return Err(HostError::Api {
            status: 500,
            message: format!("injected failure at {point:?}"),
        });
    }
    Ok(())
}

/// Directory entries implied by a flat path map.
fn implied_dirs(entries: &BTreeMap<String, ObjectId>) -> BTreeSet<String> {
    let mut dirs = BTreeSet::new();
    for path in entries.keys() {
        let mut end = 0;
        while let Some(pos) = path[end..].find('/') {
            end += pos;
            dirs.insert(path[..end].to_string());
            end += 1;
        }
    }
    dirs
}

#[async_trait]
impl RepositoryReader for MemoryHosting {
    async fn default_branch(&self, repo: &RepoRef) -> HostResult<String> {
        self.check_repo(repo)?;
        Ok(self.inner.lock().unwrap().default_branch.clone())
    }

    async fn branch_tip(&self, repo: &RepoRef, branch: &str) -> HostResult<ObjectId> {
        self.check_repo(repo)?;
        let inner = self.inner.lock().unwrap();
        inner
            .refs
            .get(branch)
            .cloned()
            .ok_or_else(|| HostError::NotFound(format!("branch {branch}")))
    }

    async fn commit_tree(&self, repo: &RepoRef, commit: &ObjectId) -> HostResult<ObjectId> {
        self.check_repo(repo)?;
        let inner = self.inner.lock().unwrap();
        inner
            .commits
            .get(commit)
            .map(|c| c.tree.clone())
            .ok_or_else(|| HostError::NotFound(format!("commit {commit}")))
    }

    async fn list_tree(&self, repo: &RepoRef, tree: &ObjectId) -> HostResult<Vec<TreeEntry>> {
        self.check_repo(repo)?;
        let inner = self.inner.lock().unwrap();
        let entries = inner
            .trees
            .get(tree)
            .ok_or_else(|| HostError::NotFound(format!("tree {tree}")))?;

        let mut listing: Vec<TreeEntry> = implied_dirs(entries)
            .into_iter()
            .map(|dir| TreeEntry {
                id: hash_object("tree", format!("{tree}:{dir}").as_bytes()),
                path: dir,
                kind: EntryKind::Tree,
            })
            .collect();
        listing.extend(entries.iter().map(|(path, id)| TreeEntry {
            path: path.clone(),
            kind: EntryKind::Blob,
            id: id.clone(),
        }));
        listing.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(listing)
    }

    async fn read_file(
        &self,
        repo: &RepoRef,
        reference: &str,
        path: &str,
    ) -> HostResult<Option<String>> {
        self.check_repo(repo)?;
        let inner = self.inner.lock().unwrap();
        check_fail(&inner, FailPoint::ReadFile)?;

        let commit_id = inner
            .refs
            .get(reference)
            .cloned()
            .unwrap_or_else(|| ObjectId::new(reference));
        let commit = inner
            .commits
            .get(&commit_id)
            .ok_or_else(|| HostError::NotFound(format!("reference {reference}")))?;
        let tree = inner
            .trees
            .get(&commit.tree)
            .ok_or_else(|| HostError::NotFound(format!("tree {}", commit.tree)))?;

        Ok(tree.get(path).and_then(|id| inner.blobs.get(id)).cloned())
    }
}

#[async_trait]
impl ObjectWriter for MemoryHosting {
    async fn create_blob(&self, repo: &RepoRef, content: &str) -> HostResult<ObjectId> {
        self.check_repo(repo)?;
        let mut inner = self.inner.lock().unwrap();
        check_fail(&inner, FailPoint::CreateBlob)?;
        let id = hash_object("blob", content.as_bytes());
        inner.blobs.insert(id.clone(), content.to_string());
        Ok(id)
    }

    async fn create_tree(
        &self,
        repo: &RepoRef,
        base_tree: &ObjectId,
        overlay: &[TreeOverlay],
    ) -> HostResult<ObjectId> {
        self.check_repo(repo)?;
        let mut inner = self.inner.lock().unwrap();
        check_fail(&inner, FailPoint::CreateTree)?;

        let mut entries = inner
            .trees
            .get(base_tree)
            .cloned()
            .ok_or_else(|| HostError::NotFound(format!("tree {base_tree}")))?;
        for item in overlay {
            if !is_valid_tree_path(&item.path) {
                return Err(HostError::Api {
                    status: 422,
                    message: format!("tree.path contains a malformed path component: {}", item.path),
                });
            }
            if !inner.blobs.contains_key(&item.blob) {
                return Err(HostError::NotFound(format!("blob {}", item.blob)));
            }
            entries.insert(item.path.clone(), item.blob.clone());
        }

        let id = tree_id(&entries);
        inner.trees.insert(id.clone(), entries);
        Ok(id)
    }

    async fn create_commit(
        &self,
        repo: &RepoRef,
        message: &str,
        tree: &ObjectId,
        parents: &[ObjectId],
    ) -> HostResult<ObjectId> {
        self.check_repo(repo)?;
        let mut inner = self.inner.lock().unwrap();
        check_fail(&inner, FailPoint::CreateCommit)?;

        if !inner.trees.contains_key(tree) {
            return Err(HostError::NotFound(format!("tree {tree}")));
        }
        if let Some(missing) = parents.iter().find(|p| !inner.commits.contains_key(*p)) {
            return Err(HostError::NotFound(format!("commit {missing}")));
        }

        let commit = CommitObject {
            tree: tree.clone(),
            parents: parents.to_vec(),
            message: message.to_string(),
        };
        let id = commit_id(&commit);
        inner.commits.insert(id.clone(), commit);
        Ok(id)
    }

    async fn create_branch(
        &self,
        repo: &RepoRef,
        name: &str,
        target: &ObjectId,
    ) -> HostResult<()> {
        self.check_repo(repo)?;
        let mut inner = self.inner.lock().unwrap();
        check_fail(&inner, FailPoint::CreateBranch)?;

        if inner.refs.contains_key(name) {
            return Err(HostError::RefAlreadyExists(name.to_string()));
        }
        if !inner.commits.contains_key(target) {
            return Err(HostError::NotFound(format!("commit {target}")));
        }
        inner.refs.insert(name.to_string(), target.clone());
        Ok(())
    }

    async fn open_pull_request(
        &self,
        repo: &RepoRef,
        spec: &PullRequestSpec,
    ) -> HostResult<PullRequest> {
        self.check_repo(repo)?;
        let mut inner = self.inner.lock().unwrap();
        check_fail(&inner, FailPoint::OpenPullRequest)?;

        for branch in [&spec.head, &spec.base] {
            if !inner.refs.contains_key(branch.as_str()) {
                return Err(HostError::Api {
                    status: 422,
                    message: format!("branch {branch} does not exist"),
                });
            }
        }

        let number = inner.pulls.len() as u64 + 1;
        let url = format!(
            "https://github.test/{}/{}/pull/{number}",
            self.repo.owner, self.repo.name
        );
        inner.pulls.push(PullRequestRecord {
            number,
            spec: spec.clone(),
            url: url.clone(),
        });
        Ok(PullRequest { number, url })
    }
}
