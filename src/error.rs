// Error types for remote-blame.
// Every fetch outcome is shared between waiters, so errors are cloneable and carry messages.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlameError {
    #[error("No remote metadata for {0}")]
    MetadataUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("GitHub API request failed: {0}")]
    RemoteRequestFailed(String),

    #[error("Malformed blame response: {0}")]
    MalformedResponse(String),

    #[error("Rate limit exceeded, resets at {reset_at}")]
    RateLimited { reset_at: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for BlameError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BlameError::MalformedResponse(err.to_string())
        } else {
            BlameError::RemoteRequestFailed(err.to_string())
        }
    }
}

impl From<serde_json::Error> for BlameError {
    fn from(err: serde_json::Error) -> Self {
        BlameError::MalformedResponse(err.to_string())
    }
}

impl From<std::io::Error> for BlameError {
    fn from(err: std::io::Error) -> Self {
        BlameError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for BlameError {
    fn from(err: toml::de::Error) -> Self {
        BlameError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BlameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_errors_are_malformed_responses() {
        let err = serde_json::from_str::<u32>("not json").unwrap_err();
        assert!(matches!(
            BlameError::from(err),
            BlameError::MalformedResponse(_)
        ));
    }

    #[test]
    fn test_display() {
        let err = BlameError::RateLimited {
            reset_at: "12:00:00".to_string(),
        };
        assert_eq!(err.to_string(), "Rate limit exceeded, resets at 12:00:00");
    }
}
