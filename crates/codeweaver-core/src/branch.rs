//! Branch names for published changes.

use chrono::{DateTime, Utc};

/// Source of names for new branches.
pub trait BranchNamer: Send + Sync {
    fn next_name(&self) -> String;
}

/// `<prefix>-<unix millis>-<8 hex>`; the random tail separates runs that
/// start within the same millisecond.
#[derive(Debug, Clone)]
pub struct TimestampBranchNamer {
    prefix: String,
}

impl TimestampBranchNamer {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.trim_end_matches('-').to_string(),
        }
    }

    pub fn name_at(&self, at: DateTime<Utc>, nonce: &str) -> String {
        format!("{}-{}-{}", self.prefix, at.timestamp_millis(), nonce)
    }
}

impl BranchNamer for TimestampBranchNamer {
    fn next_name(&self) -> String {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        self.name_at(Utc::now(), &nonce[..8])
    }
}
