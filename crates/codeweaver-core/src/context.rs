//! Builds the labelled context document handed to the synthesizer.

use repo_objects::RepoRef;
use tracing::debug;

use crate::error::Result;
use crate::model::FileContext;
use crate::snapshot::RepositorySnapshotReader;

/// Render contexts as `\n--- FILE: <path> ---\n<content>\n` sections, in order.
pub fn render_context(files: &[FileContext]) -> String {
    files
        .iter()
        .map(|f| format!("\n--- FILE: {} ---\n{}\n", f.path, f.content))
        .collect()
}

/// Fetches planned files and concatenates them.
pub struct ContextAssembler<'a> {
    reader: &'a RepositorySnapshotReader,
}

impl<'a> ContextAssembler<'a> {
    pub fn new(reader: &'a RepositorySnapshotReader) -> Self {
        Self { reader }
    }

    /// Read every planned path at `reference`, in plan order.
    ///
    /// Paths that do not exist contribute empty content; the synthesizer may
    /// be about to create them. Any other read failure aborts.
    pub async fn gather(
        &self,
        repo: &RepoRef,
        reference: &str,
        plan: &[String],
    ) -> Result<Vec<FileContext>> {
        let mut files = Vec::with_capacity(plan.len());
        for path in plan {
            let content = match self.reader.read_file(repo, reference, path).await? {
                Some(content) => content,
                None => {
                    debug!(%path, "planned file does not exist yet");
                    String::new()
                }
            };
            files.push(FileContext {
                path: path.clone(),
                content,
            });
        }
        Ok(files)
    }

    /// `gather` followed by `render_context`.
    pub async fn assemble(&self, repo: &RepoRef, reference: &str, plan: &[String]) -> Result<String> {
        let files = self.gather(repo, reference, plan).await?;
        Ok(render_context(&files))
    }
}
