//! Trait contract tests for RepositoryReader and ObjectWriter.
//!
//! These tests pin down the behaviour the pipeline relies on, using the
//! in-memory fake. Any conforming provider must behave the same way.

use repo_objects::fakes::{FailPoint, MemoryHosting};
use repo_objects::*;

fn repo() -> RepoRef {
    RepoRef::new("octocat", "hello-world").unwrap()
}

fn seeded() -> MemoryHosting {
    MemoryHosting::with_files(
        repo(),
        "main",
        &[
            ("README.md", "# hello\n"),
            ("src/lib.rs", "pub fn hi() {}\n"),
            ("src/util/mod.rs", "// util\n"),
        ],
    )
}

// ===========================================================================
// RepositoryReader
// ===========================================================================

#[tokio::test]
async fn reader_walks_branch_to_tree() {
    let host = seeded();
    let branch = host.default_branch(&repo()).await.unwrap();
    assert_eq!(branch, "main");

    let tip = host.branch_tip(&repo(), &branch).await.unwrap();
    let tree = host.commit_tree(&repo(), &tip).await.unwrap();
    let entries = host.list_tree(&repo(), &tree).await.unwrap();

    let blobs: Vec<_> = entries
        .iter()
        .filter(|e| e.is_blob())
        .map(|e| e.path.as_str())
        .collect();
    assert_eq!(blobs, vec!["README.md", "src/lib.rs", "src/util/mod.rs"]);

    let dirs: Vec<_> = entries
        .iter()
        .filter(|e| e.kind == EntryKind::Tree)
        .map(|e| e.path.as_str())
        .collect();
    assert_eq!(dirs, vec!["src", "src/util"]);
}

#[tokio::test]
async fn reader_missing_branch_is_not_found() {
    let host = seeded();
    let err = host.branch_tip(&repo(), "develop").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn reader_read_file_returns_contents() {
    let host = seeded();
    let content = host.read_file(&repo(), "main", "src/lib.rs").await.unwrap();
    assert_eq!(content.as_deref(), Some("pub fn hi() {}\n"));
}

#[tokio::test]
async fn reader_read_file_by_commit_id() {
    let host = seeded();
    let tip = host.branch_tip(&repo(), "main").await.unwrap();
    let content = host
        .read_file(&repo(), tip.as_str(), "README.md")
        .await
        .unwrap();
    assert_eq!(content.as_deref(), Some("# hello\n"));
}

#[tokio::test]
async fn reader_missing_path_is_none_not_error() {
    let host = seeded();
    let content = host.read_file(&repo(), "main", "nope.txt").await.unwrap();
    assert!(content.is_none());
}

#[tokio::test]
async fn reader_directory_path_is_none() {
    let host = seeded();
    for dir in ["src", "src/util"] {
        let content = host.read_file(&repo(), "main", dir).await.unwrap();
        assert!(content.is_none(), "{dir} should not read as a file");
    }
}

#[tokio::test]
async fn reader_transport_failure_is_error_not_none() {
    let host = seeded();
    host.fail_on(FailPoint::ReadFile);
    let result = host.read_file(&repo(), "main", "README.md").await;
    assert!(matches!(result, Err(HostError::Api { status: 500, .. })));
}

#[tokio::test]
async fn reader_unknown_repository_is_not_found() {
    let host = seeded();
    let other = RepoRef::new("octocat", "other").unwrap();
    assert!(host.default_branch(&other).await.unwrap_err().is_not_found());
}

// ===========================================================================
// ObjectWriter
// ===========================================================================

#[tokio::test]
async fn writer_tree_overlay_keeps_base_entries() {
    let host = seeded();
    let tip = host.branch_tip(&repo(), "main").await.unwrap();
    let base = host.commit_tree(&repo(), &tip).await.unwrap();

    let blob = host.create_blob(&repo(), "changed\n").await.unwrap();
    let tree = host
        .create_tree(
            &repo(),
            &base,
            &[TreeOverlay {
                path: "README.md".to_string(),
                blob,
            }],
        )
        .await
        .unwrap();
    let commit = host
        .create_commit(&repo(), "Update readme", &tree, &[tip.clone()])
        .await
        .unwrap();
    host.create_branch(&repo(), "feature", &commit).await.unwrap();

    let files = host.branch_files("feature").unwrap();
    assert_eq!(files["README.md"], "changed\n");
    assert_eq!(files["src/lib.rs"], "pub fn hi() {}\n");
    assert_eq!(files["src/util/mod.rs"], "// util\n");

    let (_, stored) = host.branch_commit("feature").unwrap();
    assert_eq!(stored.parents, vec![tip]);
    assert_eq!(stored.message, "Update readme");
}

#[tokio::test]
async fn writer_objects_are_unreachable_until_ref_created() {
    let host = seeded();
    let before = host.branch_files("main").unwrap();
    let tip = host.branch_tip(&repo(), "main").await.unwrap();
    let base = host.commit_tree(&repo(), &tip).await.unwrap();

    let blob = host.create_blob(&repo(), "new").await.unwrap();
    let tree = host
        .create_tree(
            &repo(),
            &base,
            &[TreeOverlay {
                path: "new.txt".to_string(),
                blob,
            }],
        )
        .await
        .unwrap();
    host.create_commit(&repo(), "orphan", &tree, &[tip])
        .await
        .unwrap();

    assert_eq!(host.branches(), vec!["main".to_string()]);
    assert_eq!(host.branch_files("main").unwrap(), before);
}

#[tokio::test]
async fn writer_create_branch_is_create_only() {
    let host = seeded();
    let tip = host.branch_tip(&repo(), "main").await.unwrap();
    host.create_branch(&repo(), "dup", &tip).await.unwrap();

    let moved = host.push_files("main", &[("x.txt", "x")], "move main");
    let err = host.create_branch(&repo(), "dup", &moved).await.unwrap_err();
    assert!(matches!(err, HostError::RefAlreadyExists(ref name) if name == "dup"));

    let (still, _) = host.branch_commit("dup").unwrap();
    assert_eq!(still, tip);
}

#[tokio::test]
async fn writer_rejects_malformed_tree_paths() {
    let host = seeded();
    let tip = host.branch_tip(&repo(), "main").await.unwrap();
    let base = host.commit_tree(&repo(), &tip).await.unwrap();
    let blob = host.create_blob(&repo(), "x").await.unwrap();

    let err = host
        .create_tree(
            &repo(),
            &base,
            &[TreeOverlay {
                path: "/abs.txt".to_string(),
                blob,
            }],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, HostError::Api { status: 422, .. }));
}

#[tokio::test]
async fn writer_pull_request_requires_existing_branches() {
    let host = seeded();
    let spec = PullRequestSpec {
        title: "t".to_string(),
        body: "b".to_string(),
        head: "missing".to_string(),
        base: "main".to_string(),
    };
    assert!(host.open_pull_request(&repo(), &spec).await.is_err());
    assert!(host.pull_requests().is_empty());
}

#[tokio::test]
async fn writer_pull_request_returns_url() {
    let host = seeded();
    let tip = host.branch_tip(&repo(), "main").await.unwrap();
    host.create_branch(&repo(), "topic", &tip).await.unwrap();

    let pr = host
        .open_pull_request(
            &repo(),
            &PullRequestSpec {
                title: "Topic".to_string(),
                body: "Body".to_string(),
                head: "topic".to_string(),
                base: "main".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(pr.number, 1);
    assert!(pr.url.ends_with("/octocat/hello-world/pull/1"));
}
