// Credential acquisition.
// The fetcher asks for a token once per fetch attempt and treats it as opaque.

use async_trait::async_trait;

use crate::error::{BlameError, Result};

const TOKEN_VARS: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];

/// Source of the credential passed to the remote API.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn token(&self) -> Result<String>;
}

/// Reads the token from GITHUB_TOKEN, falling back to GH_TOKEN.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvToken;

#[async_trait]
impl CredentialProvider for EnvToken {
    async fn token(&self) -> Result<String> {
        TOKEN_VARS
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|token| !token.trim().is_empty())
            .ok_or_else(|| {
                BlameError::AuthFailed("set GITHUB_TOKEN or GH_TOKEN".to_string())
            })
    }
}

/// A fixed token.
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl CredentialProvider for StaticToken {
    async fn token(&self) -> Result<String> {
        if self.0.trim().is_empty() {
            return Err(BlameError::AuthFailed("empty token".to_string()));
        }
        Ok(self.0.clone())
    }
}
