//! Error types for repo-objects

use thiserror::Error;

/// Errors returned by a hosting provider.
///
/// `NotFound` is only produced for lookups of a single named object; every
/// other failure (transport, auth, rate limiting) keeps its own variant so
/// callers never mistake an outage for a missing file.
#[derive(Error, Debug)]
pub enum HostError {
    /// Object, ref, path or repository does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Create-only ref creation hit an existing name
    #[error("reference already exists: {0}")]
    RefAlreadyExists(String),

    /// Credentials missing or rejected
    #[error("authentication rejected ({status}): {message}")]
    Unauthorized { status: u16, message: String },

    /// Any other non-success API response
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Connection, TLS or timeout failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// Response payload could not be decoded
    #[error("failed to decode {what}: {reason}")]
    Decode { what: String, reason: String },

    /// Repository reference could not be parsed
    #[error("invalid repository reference: {0}")]
    InvalidRepository(String),

    /// Request URL could not be built
    #[error("invalid request URL: {0}")]
    InvalidUrl(String),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for HostError {
    fn from(err: reqwest::Error) -> Self {
        HostError::Http(err.to_string())
    }
}

impl HostError {
    /// Whether this error means "the named thing does not exist".
    pub fn is_not_found(&self) -> bool {
        matches!(self, HostError::NotFound(_))
    }
}
