//! `GitHubClient::read_file` against a canned local HTTP server.
//!
//! The server answers exact request paths (query string ignored) with fixed
//! JSON bodies and 404 for everything else.

use repo_objects::{GitHubClient, GitHubConfig, RepoRef, RepositoryReader};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

type Routes = Vec<(&'static str, &'static str)>;

async fn serve(routes: Routes) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let routes = routes.clone();
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut chunk = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = socket.read(&mut chunk).await.unwrap();
                    if n == 0 {
                        return;
                    }
                    request.extend_from_slice(&chunk[..n]);
                }

                let head = String::from_utf8_lossy(&request);
                let target = head.split_whitespace().nth(1).unwrap_or("");
                let path = target.split('?').next().unwrap_or("");
                let (status, body) = routes
                    .iter()
                    .find(|(route, _)| *route == path)
                    .map(|(_, body)| ("200 OK", *body))
                    .unwrap_or(("404 Not Found", r#"{"message":"Not Found"}"#));

                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
            });
        }
    });

    format!("http://{addr}")
}

async fn client(routes: Routes) -> GitHubClient {
    let base = serve(routes).await;
    GitHubClient::new(GitHubConfig::new(&base)).unwrap()
}

fn repo() -> RepoRef {
    RepoRef::new("octocat", "hello").unwrap()
}

#[tokio::test]
async fn small_file_is_decoded_inline() {
    let gh = client(vec![(
        "/repos/octocat/hello/contents/README.md",
        r#"{"type":"file","sha":"r1","encoding":"base64","content":"IyBo\nZWxsbwo=\n"}"#,
    )])
    .await;

    let content = gh.read_file(&repo(), "main", "README.md").await.unwrap();
    assert_eq!(content.as_deref(), Some("# hello\n"));
}

#[tokio::test]
async fn large_file_is_fetched_through_blob_api() {
    let gh = client(vec![
        (
            "/repos/octocat/hello/contents/src/big.rs",
            r#"{"type":"file","sha":"b1g","size":2000000,"encoding":"none","content":""}"#,
        ),
        (
            "/repos/octocat/hello/git/blobs/b1g",
            r#"{"sha":"b1g","size":12,"encoding":"base64","content":"Zm4gYmlnKCkge30K"}"#,
        ),
    ])
    .await;

    let content = gh.read_file(&repo(), "main", "src/big.rs").await.unwrap();
    assert_eq!(content.as_deref(), Some("fn big() {}\n"));
}

#[tokio::test]
async fn large_file_without_blob_is_an_error_not_empty() {
    let gh = client(vec![(
        "/repos/octocat/hello/contents/huge.bin",
        r#"{"type":"file","sha":"gone","encoding":"none","content":""}"#,
    )])
    .await;

    let result = gh.read_file(&repo(), "main", "huge.bin").await;
    assert!(result.is_err(), "got {result:?}");
}

#[tokio::test]
async fn directory_path_is_none() {
    let gh = client(vec![(
        "/repos/octocat/hello/contents/src",
        r#"[{"type":"file","name":"lib.rs","path":"src/lib.rs","sha":"a"}]"#,
    )])
    .await;

    let content = gh.read_file(&repo(), "main", "src").await.unwrap();
    assert!(content.is_none());
}

#[tokio::test]
async fn missing_path_is_none() {
    let gh = client(Vec::new()).await;

    let content = gh.read_file(&repo(), "main", "nope.txt").await.unwrap();
    assert!(content.is_none());
}
