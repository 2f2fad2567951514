//! GitHub REST client
//!
//! Implements the object traits on top of the Git Data API
//! (`/git/refs`, `/git/commits`, `/git/trees`, `/git/blobs`), the Contents
//! API for decoded file reads, and the Pulls API.

use async_trait::async_trait;
use base64::Engine;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::HostError;
use crate::object_traits::{
    EntryKind, HostResult, ObjectId, ObjectWriter, PullRequest, PullRequestSpec, RepoRef,
    RepositoryReader, TreeEntry, TreeOverlay, REGULAR_FILE_MODE,
};

const GITHUB_API_VERSION: &str = "2022-11-28";

/// GitHub configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// REST API root
    pub api_url: String,
    /// Personal access or app token
    pub token: Option<String>,
    /// User-Agent header (required by GitHub)
    pub user_agent: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        GitHubConfig {
            api_url: std::env::var("GITHUB_API_URL")
                .unwrap_or_else(|_| "https://api.github.com".to_string()),
            token: std::env::var("GITHUB_TOKEN").ok(),
            user_agent: format!("codeweaver/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl GitHubConfig {
    /// Create a new config from environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Create config for a specific API root
    pub fn new(api_url: &str) -> Self {
        GitHubConfig {
            api_url: api_url.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    /// Set authentication token
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }
}

/// GitHub client for commit-graph reads and writes
pub struct GitHubClient {
    config: GitHubConfig,
    http_client: reqwest::Client,
}

impl GitHubClient {
    /// Create a new GitHub client
    pub fn new(config: GitHubConfig) -> HostResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(GitHubClient {
            config,
            http_client,
        })
    }

    /// Create client from environment variables
    pub fn from_env() -> HostResult<Self> {
        Self::new(GitHubConfig::from_env())
    }

    /// Full text of a blob through the Git Data API (no size cap).
    async fn read_blob(&self, repo: &RepoRef, path: &str, sha: &str) -> HostResult<String> {
        let url = self.repo_url(repo, &format!("/git/blobs/{sha}"));
        let blob: BlobResponse = self.get_json(&url).await?;
        match blob.encoding.as_str() {
            "base64" => decode_content(path, &blob.content),
            "utf-8" => Ok(blob.content),
            other => Err(HostError::Decode {
                what: path.to_string(),
                reason: format!("unsupported blob encoding `{other}`"),
            }),
        }
    }

    fn repo_url(&self, repo: &RepoRef, suffix: &str) -> String {
        format!(
            "{}/repos/{}/{}{}",
            self.config.api_url.trim_end_matches('/'),
            repo.owner,
            repo.name,
            suffix
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let mut req = self
            .http_client
            .request(method, url)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION);
        if let Some(token) = &self.config.token {
            req = req.bearer_auth(token);
        }
        req
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> HostResult<T> {
        debug!(%url, "GET");
        let response = self.request(Method::GET, url).send().await?;
        let response = check_status(response, url).await?;
        Ok(response.json::<T>().await?)
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> HostResult<T> {
        debug!(%url, "POST");
        let response = self.request(Method::POST, url).json(body).send().await?;
        let response = check_status(response, url).await?;
        Ok(response.json::<T>().await?)
    }
}

/// Map non-success responses onto `HostError`.
async fn check_status(response: Response, url: &str) -> HostResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiMessage>(&body)
        .map(|m| m.message)
        .unwrap_or(body);

    Err(match status {
        StatusCode::NOT_FOUND => HostError::NotFound(url.to_string()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => HostError::Unauthorized {
            status: status.as_u16(),
            message,
        },
        _ => HostError::Api {
            status: status.as_u16(),
            message,
        },
    })
}

/// Decode a Contents API payload (base64 with embedded newlines).
fn decode_content(path: &str, encoded: &str) -> HostResult<String> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| HostError::Decode {
            what: path.to_string(),
            reason: e.to_string(),
        })?;

    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            warn!(%path, "file is not valid UTF-8, decoding lossily");
            Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ApiMessage {
    message: String,
}

#[derive(Deserialize)]
struct RepositoryResponse {
    default_branch: String,
}

#[derive(Deserialize)]
struct ShaOnly {
    sha: String,
}

#[derive(Deserialize)]
struct RefResponse {
    object: ShaOnly,
}

#[derive(Deserialize)]
struct CommitResponse {
    tree: ShaOnly,
}

#[derive(Deserialize)]
struct TreeResponse {
    tree: Vec<RawTreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Deserialize)]
struct RawTreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: EntryKind,
    sha: String,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(rename = "type")]
    kind: String,
    sha: String,
    content: Option<String>,
    encoding: Option<String>,
}

#[derive(Deserialize)]
struct BlobResponse {
    content: String,
    encoding: String,
}

/// Where the text of a Contents API file lives.
#[derive(Debug, PartialEq, Eq)]
enum FilePayload {
    Inline(String),
    /// Too large to inline; fetch the blob by sha
    Blob(String),
}

/// Classify a Contents API object. Anything but a regular file is `None`.
fn file_payload(path: &str, content: ContentResponse) -> HostResult<Option<FilePayload>> {
    if content.kind != "file" {
        return Ok(None);
    }
    match content.encoding.as_deref() {
        Some("base64") => {
            let encoded = content.content.unwrap_or_default();
            decode_content(path, &encoded).map(|text| Some(FilePayload::Inline(text)))
        }
        // Files over 1 MB come back with `encoding: none` and no content
        Some("none") | None => Ok(Some(FilePayload::Blob(content.sha))),
        Some(other) => Err(HostError::Decode {
            what: path.to_string(),
            reason: format!("unsupported encoding `{other}`"),
        }),
    }
}

#[derive(Serialize)]
struct CreateBlob<'a> {
    content: &'a str,
    encoding: &'static str,
}

#[derive(Serialize)]
struct CreateTree<'a> {
    base_tree: &'a str,
    tree: Vec<CreateTreeEntry<'a>>,
}

#[derive(Serialize)]
struct CreateTreeEntry<'a> {
    path: &'a str,
    mode: &'static str,
    #[serde(rename = "type")]
    kind: &'static str,
    sha: &'a str,
}

#[derive(Serialize)]
struct CreateCommit<'a> {
    message: &'a str,
    tree: &'a str,
    parents: Vec<&'a str>,
}

#[derive(Serialize)]
struct CreateRef<'a> {
    #[serde(rename = "ref")]
    reference: String,
    sha: &'a str,
}

#[derive(Serialize)]
struct CreatePull<'a> {
    title: &'a str,
    body: &'a str,
    head: &'a str,
    base: &'a str,
}

#[derive(Deserialize)]
struct PullResponse {
    number: u64,
    html_url: String,
}

// ---------------------------------------------------------------------------
// Trait implementations
// ---------------------------------------------------------------------------

#[async_trait]
impl RepositoryReader for GitHubClient {
    async fn default_branch(&self, repo: &RepoRef) -> HostResult<String> {
        let info: RepositoryResponse = self.get_json(&self.repo_url(repo, "")).await?;
        Ok(info.default_branch)
    }

    async fn branch_tip(&self, repo: &RepoRef, branch: &str) -> HostResult<ObjectId> {
        let url = self.repo_url(repo, &format!("/git/ref/heads/{branch}"));
        let reference: RefResponse = self.get_json(&url).await?;
        Ok(ObjectId::new(reference.object.sha))
    }

    async fn commit_tree(&self, repo: &RepoRef, commit: &ObjectId) -> HostResult<ObjectId> {
        let url = self.repo_url(repo, &format!("/git/commits/{commit}"));
        let commit: CommitResponse = self.get_json(&url).await?;
        Ok(ObjectId::new(commit.tree.sha))
    }

    async fn list_tree(&self, repo: &RepoRef, tree: &ObjectId) -> HostResult<Vec<TreeEntry>> {
        let url = self.repo_url(repo, &format!("/git/trees/{tree}?recursive=1"));
        let listing: TreeResponse = self.get_json(&url).await?;
        if listing.truncated {
            warn!(repo = %repo, tree = %tree.short(), "tree listing truncated by provider");
        }
        Ok(listing
            .tree
            .into_iter()
            .map(|e| TreeEntry {
                path: e.path,
                kind: e.kind,
                id: ObjectId::new(e.sha),
            })
            .collect())
    }

    async fn read_file(
        &self,
        repo: &RepoRef,
        reference: &str,
        path: &str,
    ) -> HostResult<Option<String>> {
        let base = self.repo_url(repo, "/contents");
        let mut url =
            reqwest::Url::parse(&base).map_err(|e| HostError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| HostError::InvalidUrl(base.clone()))?
            .extend(path.split('/').filter(|s| !s.is_empty()));
        url.query_pairs_mut().append_pair("ref", reference);

        let value: serde_json::Value = match self.get_json(url.as_str()).await {
            Ok(value) => value,
            Err(HostError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        // A directory listing comes back as an array
        if value.is_array() {
            debug!(%path, "path is a directory");
            return Ok(None);
        }

        let content: ContentResponse = serde_json::from_value(value)?;
        match file_payload(path, content)? {
            Some(FilePayload::Inline(text)) => Ok(Some(text)),
            Some(FilePayload::Blob(sha)) => self.read_blob(repo, path, &sha).await.map(Some),
            None => {
                debug!(%path, "path is not a regular file");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl ObjectWriter for GitHubClient {
    async fn create_blob(&self, repo: &RepoRef, content: &str) -> HostResult<ObjectId> {
        let body = CreateBlob {
            content,
            encoding: "utf-8",
        };
        let blob: ShaOnly = self
            .post_json(&self.repo_url(repo, "/git/blobs"), &body)
            .await?;
        Ok(ObjectId::new(blob.sha))
    }

    async fn create_tree(
        &self,
        repo: &RepoRef,
        base_tree: &ObjectId,
        overlay: &[TreeOverlay],
    ) -> HostResult<ObjectId> {
        let body = CreateTree {
            base_tree: base_tree.as_str(),
            tree: overlay
                .iter()
                .map(|o| CreateTreeEntry {
                    path: &o.path,
                    mode: REGULAR_FILE_MODE,
                    kind: "blob",
                    sha: o.blob.as_str(),
                })
                .collect(),
        };
        let tree: ShaOnly = self
            .post_json(&self.repo_url(repo, "/git/trees"), &body)
            .await?;
        Ok(ObjectId::new(tree.sha))
    }

    async fn create_commit(
        &self,
        repo: &RepoRef,
        message: &str,
        tree: &ObjectId,
        parents: &[ObjectId],
    ) -> HostResult<ObjectId> {
        let body = CreateCommit {
            message,
            tree: tree.as_str(),
            parents: parents.iter().map(ObjectId::as_str).collect(),
        };
        let commit: ShaOnly = self
            .post_json(&self.repo_url(repo, "/git/commits"), &body)
            .await?;
        Ok(ObjectId::new(commit.sha))
    }

    async fn create_branch(
        &self,
        repo: &RepoRef,
        name: &str,
        target: &ObjectId,
    ) -> HostResult<()> {
        let body = CreateRef {
            reference: format!("refs/heads/{name}"),
            sha: target.as_str(),
        };
        let created: HostResult<serde_json::Value> = self
            .post_json(&self.repo_url(repo, "/git/refs"), &body)
            .await;

        match created {
            Ok(_) => Ok(()),
            Err(HostError::Api { status: 422, message })
                if message.to_ascii_lowercase().contains("already exists") =>
            {
                Err(HostError::RefAlreadyExists(name.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    async fn open_pull_request(
        &self,
        repo: &RepoRef,
        spec: &PullRequestSpec,
    ) -> HostResult<PullRequest> {
        let body = CreatePull {
            title: &spec.title,
            body: &spec.body,
            head: &spec.head,
            base: &spec.base,
        };
        let pull: PullResponse = self.post_json(&self.repo_url(repo, "/pulls"), &body).await?;
        Ok(PullRequest {
            number: pull.number,
            url: pull.html_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_github_config_new_strips_trailing_slash() {
        let config = GitHubConfig::new("https://ghe.example.com/api/v3/");
        assert_eq!(config.api_url, "https://ghe.example.com/api/v3");
        assert!(config.user_agent.starts_with("codeweaver/"));
    }

    #[test]
    fn test_github_config_with_token() {
        let config = GitHubConfig::new("https://api.github.com").with_token("ghp_secret");
        assert_eq!(config.token, Some("ghp_secret".to_string()));
    }

    #[test]
    fn test_repo_url_layout() {
        let client = GitHubClient::new(GitHubConfig::new("https://api.github.com")).unwrap();
        let repo = RepoRef::new("octocat", "hello-world").unwrap();
        assert_eq!(
            client.repo_url(&repo, "/git/blobs"),
            "https://api.github.com/repos/octocat/hello-world/git/blobs"
        );
    }

    #[test]
    fn test_decode_content_with_line_breaks() {
        // "Hello World\n" split the way the Contents API wraps base64
        let encoded = "SGVsbG8g\nV29ybGQK\n";
        assert_eq!(decode_content("hello.txt", encoded).unwrap(), "Hello World\n");
    }

    #[test]
    fn test_decode_content_rejects_garbage() {
        let err = decode_content("x.bin", "!!!not base64!!!").unwrap_err();
        assert!(matches!(err, HostError::Decode { .. }));
    }

    #[test]
    fn test_create_tree_wire_format() {
        let body = CreateTree {
            base_tree: "t0",
            tree: vec![CreateTreeEntry {
                path: "src/main.rs",
                mode: REGULAR_FILE_MODE,
                kind: "blob",
                sha: "b1",
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["base_tree"], "t0");
        assert_eq!(json["tree"][0]["mode"], "100644");
        assert_eq!(json["tree"][0]["type"], "blob");
    }

    fn content(json: &str) -> ContentResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_large_file_payload_points_at_blob() {
        let large = content(r#"{"type":"file","sha":"b1g","encoding":"none","content":""}"#);
        assert_eq!(
            file_payload("big.json", large).unwrap(),
            Some(FilePayload::Blob("b1g".to_string()))
        );
    }

    #[test]
    fn test_empty_file_payload_is_inline() {
        let empty = content(r#"{"type":"file","sha":"e","encoding":"base64","content":""}"#);
        assert_eq!(
            file_payload("empty.txt", empty).unwrap(),
            Some(FilePayload::Inline(String::new()))
        );
    }

    #[test]
    fn test_symlink_payload_is_not_a_file() {
        let link = content(r#"{"type":"symlink","sha":"l","target":"README.md"}"#);
        assert_eq!(file_payload("docs", link).unwrap(), None);
    }

    #[test]
    fn test_raw_tree_entry_parses_submodule() {
        let raw: RawTreeEntry =
            serde_json::from_str(r#"{"path":"vendor/lib","type":"commit","sha":"abc"}"#).unwrap();
        assert_eq!(raw.kind, EntryKind::Commit);
    }
}
