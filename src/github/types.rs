// GitHub API response types.
// Defines structs for deserializing GraphQL blame data and the REST repository lookup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// GitHub user or organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Owner {
    pub login: String,
    pub avatar_url: Option<String>,
}

/// GitHub repository (REST shape).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
    pub owner: Owner,
    pub private: bool,
    pub default_branch: String,
}

/// GitHub account linked to a commit author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitUser {
    pub url: String,
    pub avatar_url: Option<String>,
}

/// Commit author as recorded in git, with the linked account when GitHub knows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitAuthor {
    pub name: String,
    pub user: Option<GitUser>,
}

/// Commit a blame range is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    pub oid: String,
    pub message: String,
    pub authored_date: DateTime<Utc>,
    pub url: String,
    pub author: CommitAuthor,
}

impl Commit {
    /// Abbreviated object id used in hover text.
    pub fn short_oid(&self) -> &str {
        let end = self
            .oid
            .char_indices()
            .nth(6)
            .map(|(i, _)| i)
            .unwrap_or(self.oid.len());
        &self.oid[..end]
    }
}

/// Contiguous, 1-indexed, inclusive line interval attributed to one commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlameRange {
    pub starting_line: u32,
    pub ending_line: u32,
    /// Age class supplied by GitHub, 0 (newest) through 10 (oldest).
    pub age: i64,
    pub commit: Commit,
}

impl BlameRange {
    /// Whether this range covers the given 0-indexed line.
    pub fn contains_line(&self, line: u32) -> bool {
        let line = line + 1;
        self.starting_line <= line && line <= self.ending_line
    }
}

/// GraphQL response envelope.
#[derive(Debug, Deserialize)]
pub struct GraphqlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphqlError>,
}

/// Single GraphQL error entry.
#[derive(Debug, Deserialize)]
pub struct GraphqlError {
    pub message: String,
}

/// Rate limit information from response headers.
#[derive(Debug, Clone, Default)]
pub struct RateLimit {
    pub limit: u64,
    /// Unknown until a response carried `x-ratelimit-remaining`.
    pub remaining: Option<u64>,
    pub reset: u64,
}

impl RateLimit {
    /// Whether GitHub reported the quota as used up.
    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }

    /// Reset time as `HH:MM:SS` UTC.
    pub fn reset_at(&self) -> String {
        i64::try_from(self.reset)
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|dt| dt.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}
