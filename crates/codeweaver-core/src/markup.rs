//! Tokenizer and grammar for the synthesis markup.
//!
//! The model answers in free text that embeds two kinds of blocks:
//!
//! ```text
//! <file path="src/lib.rs">
//! ...full file body...
//! </file>
//!
//! <pr_meta>
//! {"title": "...", "description": "..."}
//! </pr_meta>
//! ```
//!
//! Parsing runs in two passes. The lexer finds tag tokens and ignores all
//! other text. The grammar pass pairs each open tag with the first matching
//! close tag after it, so adjacent blocks can never merge. Anything unusual is
//! reported as a [`Diagnostic`] instead of being silently dropped; the caller
//! decides which diagnostics are fatal.

use serde::Deserialize;

use crate::model::{ChangeSet, FileChange, PullRequestMeta};

const FILE_OPEN_PREFIX: &str = "<file";
const FILE_CLOSE: &str = "</file>";
const META_OPEN: &str = "<pr_meta>";
const META_CLOSE: &str = "</pr_meta>";

/// What went wrong, and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Byte offset of the offending tag in the raw response
    pub offset: usize,
    pub detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// `<file` tag without a well-formed `path="..."` attribute
    MalformedFileOpen,
    /// `<file path="...">` with no `</file>` after it
    UnterminatedFileBlock,
    /// `<file path="...">` inside another file block's body
    NestedFileOpen,
    MissingMeta,
    UnterminatedMeta,
    MalformedMeta,
    /// A second `<pr_meta>` block; only the first one counts
    DuplicateMeta,
    /// `<pr_meta>` inside a file body; it stays file content
    EmbeddedMeta,
}

impl DiagnosticKind {
    /// Diagnostics that make the set of file blocks ambiguous.
    pub fn is_structural(self) -> bool {
        matches!(
            self,
            DiagnosticKind::UnterminatedFileBlock | DiagnosticKind::NestedFileOpen
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticKind::MalformedFileOpen => "malformed_file_open",
            DiagnosticKind::UnterminatedFileBlock => "unterminated_file_block",
            DiagnosticKind::NestedFileOpen => "nested_file_open",
            DiagnosticKind::MissingMeta => "missing_meta",
            DiagnosticKind::UnterminatedMeta => "unterminated_meta",
            DiagnosticKind::MalformedMeta => "malformed_meta",
            DiagnosticKind::DuplicateMeta => "duplicate_meta",
            DiagnosticKind::EmbeddedMeta => "embedded_meta",
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at byte {}: {}",
            self.kind.as_str(),
            self.offset,
            self.detail
        )
    }
}

/// Everything extracted from one synthesis response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse {
    pub changes: ChangeSet,
    pub meta: PullRequestMeta,
    /// `true` when `meta` is the fixed fallback
    pub meta_defaulted: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParsedResponse {
    pub fn structural_diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.kind.is_structural())
    }
}

/// Remove Markdown code-fence markers (```` ```json ```` and ```` ``` ````) and trim.
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenKind {
    FileOpen { path: String },
    FileClose,
    MetaOpen,
    MetaClose,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Token {
    kind: TokenKind,
    start: usize,
    end: usize,
}

/// Parse the remainder of a `<file` tag; returns the path and bytes consumed.
fn lex_file_open(after: &str) -> Option<(String, usize)> {
    let attrs = after.trim_start();
    if attrs.len() == after.len() {
        return None;
    }
    let value = attrs.strip_prefix("path=\"")?;
    let quote = value.find(['"', '\n'])?;
    if !value[quote..].starts_with('"') || quote == 0 {
        return None;
    }
    let path = &value[..quote];
    let rest = value[quote + 1..].trim_start_matches([' ', '\t']);
    let rest = rest.strip_prefix('>')?;
    Some((path.to_string(), after.len() - rest.len()))
}

fn tokenize(src: &str, diagnostics: &mut Vec<Diagnostic>) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    while let Some(rel) = src[pos..].find('<') {
        let start = pos + rel;
        let rest = &src[start..];

        let simple = [
            (FILE_CLOSE, TokenKind::FileClose),
            (META_OPEN, TokenKind::MetaOpen),
            (META_CLOSE, TokenKind::MetaClose),
        ]
        .into_iter()
        .find(|(tag, _)| rest.starts_with(tag));

        if let Some((tag, kind)) = simple {
            let end = start + tag.len();
            tokens.push(Token { kind, start, end });
            pos = end;
            continue;
        }

        if let Some(after) = rest.strip_prefix(FILE_OPEN_PREFIX) {
            // `<files>`, `<filename>` and friends are ordinary text
            let is_tag = after
                .chars()
                .next()
                .is_some_and(|c| c.is_whitespace() || c == '>');
            if is_tag {
                if let Some((path, consumed)) = lex_file_open(after) {
                    let end = start + FILE_OPEN_PREFIX.len() + consumed;
                    tokens.push(Token {
                        kind: TokenKind::FileOpen { path },
                        start,
                        end,
                    });
                    pos = end;
                    continue;
                }
                let line = rest.lines().next().unwrap_or(rest);
                diagnostics.push(Diagnostic {
                    kind: DiagnosticKind::MalformedFileOpen,
                    offset: start,
                    detail: format!("ignored tag `{line}`"),
                });
            }
        }

        pos = start + 1;
    }

    tokens
}

// ---------------------------------------------------------------------------
// Grammar
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct MetaBody {
    title: String,
    description: String,
}

/// Inner text when a single Markdown fence wraps all of `text`.
fn unwrap_fence(text: &str) -> Option<&str> {
    let inner = text.strip_prefix("```")?.strip_suffix("```")?;
    // Drop the info string (`json`) on the opening line
    let inner = inner.split_once('\n').map_or(inner, |(_, rest)| rest);
    Some(inner.trim())
}

fn parse_meta(body: &str) -> std::result::Result<PullRequestMeta, String> {
    let body = body.trim();
    let parsed: MetaBody = match serde_json::from_str(body) {
        Ok(parsed) => parsed,
        Err(e) => unwrap_fence(body)
            .and_then(|inner| serde_json::from_str(inner).ok())
            .ok_or_else(|| e.to_string())?,
    };
    if parsed.title.trim().is_empty() {
        return Err("title is empty".to_string());
    }
    Ok(PullRequestMeta {
        title: parsed.title.trim().to_string(),
        description: parsed.description,
    })
}

/// Parse a raw synthesis response.
///
/// Never fails: zero file blocks is an empty change set, and a missing or
/// unparsable metadata block yields [`PullRequestMeta::default`].
pub fn parse_response(src: &str) -> ParsedResponse {
    let mut diagnostics = Vec::new();
    let tokens = tokenize(src, &mut diagnostics);

    let mut changes = Vec::new();
    let mut meta: Option<PullRequestMeta> = None;
    let mut meta_blocks = 0usize;
    let mut i = 0;

    while i < tokens.len() {
        let open = &tokens[i];
        match &open.kind {
            TokenKind::FileOpen { path } => {
                let mut nested = Vec::new();
                let close = tokens[i + 1..].iter().position(|t| match &t.kind {
                    TokenKind::FileClose => true,
                    TokenKind::FileOpen { path: inner } => {
                        nested.push(Diagnostic {
                            kind: DiagnosticKind::NestedFileOpen,
                            offset: t.start,
                            detail: format!("`{inner}` opened inside `{path}`"),
                        });
                        false
                    }
                    TokenKind::MetaOpen => {
                        nested.push(Diagnostic {
                            kind: DiagnosticKind::EmbeddedMeta,
                            offset: t.start,
                            detail: format!("kept as content of `{path}`"),
                        });
                        false
                    }
                    _ => false,
                });

                match close {
                    Some(rel) => {
                        let close = &tokens[i + 1 + rel];
                        changes.push(FileChange::new(
                            path.clone(),
                            src[open.end..close.start].trim(),
                        ));
                        diagnostics.extend(nested);
                        i += rel + 2;
                    }
                    None => {
                        diagnostics.push(Diagnostic {
                            kind: DiagnosticKind::UnterminatedFileBlock,
                            offset: open.start,
                            detail: format!("`{path}` has no closing tag"),
                        });
                        i += 1;
                    }
                }
            }
            TokenKind::MetaOpen => {
                let close = tokens[i + 1..]
                    .iter()
                    .position(|t| t.kind == TokenKind::MetaClose);
                match close {
                    Some(rel) => {
                        let close = &tokens[i + 1 + rel];
                        meta_blocks += 1;
                        if meta_blocks == 1 {
                            match parse_meta(&src[open.end..close.start]) {
                                Ok(parsed) => meta = Some(parsed),
                                Err(reason) => diagnostics.push(Diagnostic {
                                    kind: DiagnosticKind::MalformedMeta,
                                    offset: open.start,
                                    detail: reason,
                                }),
                            }
                        } else {
                            diagnostics.push(Diagnostic {
                                kind: DiagnosticKind::DuplicateMeta,
                                offset: open.start,
                                detail: "ignored".to_string(),
                            });
                        }
                        i += rel + 2;
                    }
                    None => {
                        diagnostics.push(Diagnostic {
                            kind: DiagnosticKind::UnterminatedMeta,
                            offset: open.start,
                            detail: "no closing tag".to_string(),
                        });
                        i += 1;
                    }
                }
            }
            // Stray close tags are prose
            TokenKind::FileClose | TokenKind::MetaClose => i += 1,
        }
    }

    let has_meta_diagnostic = diagnostics.iter().any(|d| {
        matches!(
            d.kind,
            DiagnosticKind::MalformedMeta
                | DiagnosticKind::UnterminatedMeta
                | DiagnosticKind::EmbeddedMeta
        )
    });
    if meta.is_none() && !has_meta_diagnostic {
        diagnostics.push(Diagnostic {
            kind: DiagnosticKind::MissingMeta,
            offset: src.len(),
            detail: "no <pr_meta> block".to_string(),
        });
    }

    diagnostics.sort_by_key(|d| d.offset);
    ParsedResponse {
        changes,
        meta_defaulted: meta.is_none(),
        meta: meta.unwrap_or_default(),
        diagnostics,
    }
}
