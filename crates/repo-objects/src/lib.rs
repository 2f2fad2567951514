//! Repo-Objects: Hosting-Provider Object API for CodeWeaver
//!
//! This crate is the only place that talks to the source-control host. It
//! exposes the commit graph of a remote repository as content-addressed
//! objects (blob, tree, commit) plus the two mutable surfaces the pipeline
//! needs: branch references and pull requests.
//!
//! ## Key Components
//!
//! - `RepositoryReader`: branch → commit → tree → entries, and file contents
//! - `ObjectWriter`: blob/tree/commit creation, create-only refs, pull requests
//! - `GitHubClient`: REST implementation of both traits
//! - `fakes::MemoryHosting`: in-memory object store for tests

mod error;
pub mod fakes;
mod github;
pub mod object_traits;

pub use error::HostError;
pub use github::{GitHubClient, GitHubConfig};
pub use object_traits::{
    EntryKind, HostResult, HostingProvider, ObjectId, ObjectWriter, PullRequest,
    PullRequestSpec, RepoRef, RepositoryReader, TreeEntry, TreeOverlay, REGULAR_FILE_MODE,
};
