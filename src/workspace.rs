// Virtual workspace metadata.
// Maps workspace file identities to the repository, path, and revision they are served from.

#![allow(dead_code)]

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::auth::CredentialProvider;
use crate::error::{BlameError, Result};
use crate::github::GitHubClient;

const VFS_PREFIX: &str = "vfs://github";

/// Opaque, session-stable key for a file in the workspace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileIdentity(String);

impl FileIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identity of a GitHub-served file given as `owner/repo/path`, optionally pinned to a ref.
    pub fn github(path: &str, revision: Option<&str>) -> Self {
        let path = path.trim_start_matches('/');
        match revision {
            Some(rev) => Self(format!("{}/{}?ref={}", VFS_PREFIX, path, rev)),
            None => Self(format!("{}/{}", VFS_PREFIX, path)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of ref a revision was resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadType {
    Branch,
    RemoteBranch,
    Tag,
    Commit,
}

/// Revision a workspace file is served at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionInfo {
    pub kind: HeadType,
    pub name: String,
    pub revision: String,
}

/// Repository coordinates of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderLocation {
    pub owner: String,
    pub repo: String,
    pub path: String,
}

impl ProviderLocation {
    /// Parse a provider path of the shape `/<owner>/<repo>/<path...>`.
    pub fn parse(provider_path: &str) -> Result<Self> {
        let unavailable = || BlameError::MetadataUnavailable(provider_path.to_string());

        let rest = provider_path.strip_prefix('/').ok_or_else(unavailable)?;
        let mut parts = rest.splitn(3, '/');
        let owner = parts.next().filter(|s| !s.is_empty()).ok_or_else(unavailable)?;
        let repo = parts.next().filter(|s| !s.is_empty()).ok_or_else(unavailable)?;
        let path = parts.next().filter(|s| !s.is_empty()).ok_or_else(unavailable)?;

        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            path: path.to_string(),
        })
    }
}

/// Host collaborator that knows where workspace files come from.
#[async_trait]
pub trait WorkspaceProvider: Send + Sync {
    /// Revision the file is served at, or None when the file is not remote-tracked.
    async fn revision(&self, file: &FileIdentity) -> Result<Option<RevisionInfo>>;

    /// Provider path `/<owner>/<repo>/<path>` for the file.
    fn provider_path(&self, file: &FileIdentity) -> Option<String>;
}

/// Parsed `vfs://github/...` identity.
#[derive(Debug, PartialEq, Eq)]
struct VfsUri<'a> {
    provider_path: &'a str,
    revision: Option<&'a str>,
}

impl<'a> VfsUri<'a> {
    fn parse(file: &'a FileIdentity) -> Option<Self> {
        let rest = file.as_str().strip_prefix(VFS_PREFIX)?;
        if !rest.starts_with('/') {
            return None;
        }
        let (provider_path, query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (rest, None),
        };
        let revision = query.and_then(|q| {
            q.split('&')
                .filter_map(|pair| pair.strip_prefix("ref="))
                .find(|rev| !rev.is_empty())
        });
        Some(Self {
            provider_path,
            revision,
        })
    }
}

fn classify(revision: &str) -> HeadType {
    if revision.len() == 40 && revision.chars().all(|c| c.is_ascii_hexdigit()) {
        HeadType::Commit
    } else if revision.starts_with("refs/tags/") {
        HeadType::Tag
    } else {
        HeadType::Branch
    }
}

/// Workspace served straight from GitHub.
///
/// Files pinned with `?ref=` use that revision; others follow the repository's
/// default branch, looked up once per repository.
pub struct GitHubWorkspace {
    client: Arc<GitHubClient>,
    credentials: Arc<dyn CredentialProvider>,
    default_branches: Mutex<HashMap<(String, String), String>>,
}

impl GitHubWorkspace {
    pub fn new(client: Arc<GitHubClient>, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            client,
            credentials,
            default_branches: Mutex::new(HashMap::new()),
        }
    }

    /// Location of a file, or MetadataUnavailable when it is not a GitHub workspace file.
    pub fn location(&self, file: &FileIdentity) -> Result<ProviderLocation> {
        let path = self
            .provider_path(file)
            .ok_or_else(|| BlameError::MetadataUnavailable(file.to_string()))?;
        ProviderLocation::parse(&path)
    }

    /// Raw file contents at the file's revision.
    pub async fn contents(&self, file: &FileIdentity) -> Result<String> {
        let location = self.location(file)?;
        let revision = self
            .revision(file)
            .await?
            .ok_or_else(|| BlameError::MetadataUnavailable(file.to_string()))?;
        let token = self.credentials.token().await?;
        self.client
            .get_file_contents(
                &token,
                &location.owner,
                &location.repo,
                &location.path,
                &revision.revision,
            )
            .await
    }

    async fn default_branch(&self, owner: &str, repo: &str) -> Result<String> {
        let key = (owner.to_string(), repo.to_string());
        let cached = self.branches().get(&key).cloned();
        if let Some(branch) = cached {
            return Ok(branch);
        }

        let token = self.credentials.token().await?;
        let repository = self.client.get_repo(&token, owner, repo).await?;
        tracing::debug!(owner, repo, branch = %repository.default_branch, "Resolved default branch");
        self.branches()
            .insert(key, repository.default_branch.clone());
        Ok(repository.default_branch)
    }

    fn branches(&self) -> std::sync::MutexGuard<'_, HashMap<(String, String), String>> {
        self.default_branches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl WorkspaceProvider for GitHubWorkspace {
    async fn revision(&self, file: &FileIdentity) -> Result<Option<RevisionInfo>> {
        let Some(uri) = VfsUri::parse(file) else {
            return Ok(None);
        };

        if let Some(revision) = uri.revision {
            return Ok(Some(RevisionInfo {
                kind: classify(revision),
                name: revision.to_string(),
                revision: revision.to_string(),
            }));
        }

        let location = ProviderLocation::parse(uri.provider_path)?;
        let branch = self
            .default_branch(&location.owner, &location.repo)
            .await?;
        Ok(Some(RevisionInfo {
            kind: HeadType::Branch,
            name: branch.clone(),
            revision: branch,
        }))
    }

    fn provider_path(&self, file: &FileIdentity) -> Option<String> {
        VfsUri::parse(file).map(|uri| uri.provider_path.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticToken;
    use crate::config::GitHubConfig;

    fn workspace() -> GitHubWorkspace {
        let client = Arc::new(GitHubClient::new(&GitHubConfig::default()).unwrap());
        GitHubWorkspace::new(client, Arc::new(StaticToken::new("t")))
    }

    #[test]
    fn test_parse_location() {
        let location = ProviderLocation::parse("/microsoft/vscode/src/vs/code.ts").unwrap();
        assert_eq!(location.owner, "microsoft");
        assert_eq!(location.repo, "vscode");
        assert_eq!(location.path, "src/vs/code.ts");
    }

    #[test]
    fn test_parse_location_rejects_short_paths() {
        for path in ["", "/", "/owner", "/owner/repo", "/owner/repo/", "owner/repo/file"] {
            assert!(
                matches!(
                    ProviderLocation::parse(path),
                    Err(BlameError::MetadataUnavailable(_))
                ),
                "{path}"
            );
        }
    }

    #[test]
    fn test_github_identity() {
        assert_eq!(
            FileIdentity::github("o/r/a.rs", None).as_str(),
            "vfs://github/o/r/a.rs"
        );
        assert_eq!(
            FileIdentity::github("/o/r/a.rs", Some("v1")).as_str(),
            "vfs://github/o/r/a.rs?ref=v1"
        );
    }

    #[test]
    fn test_vfs_uri_parse() {
        let file = FileIdentity::github("o/r/dir/a.rs", Some("dev"));
        let uri = VfsUri::parse(&file).unwrap();
        assert_eq!(uri.provider_path, "/o/r/dir/a.rs");
        assert_eq!(uri.revision, Some("dev"));

        assert!(VfsUri::parse(&FileIdentity::new("file:///tmp/a.rs")).is_none());
        assert!(VfsUri::parse(&FileIdentity::new("vfs://githubx/o/r/a")).is_none());
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            classify("0123456789abcdef0123456789abcdef01234567"),
            HeadType::Commit
        );
        assert_eq!(classify("refs/tags/v1.0"), HeadType::Tag);
        assert_eq!(classify("main"), HeadType::Branch);
    }

    #[tokio::test]
    async fn test_pinned_revision_needs_no_lookup() {
        let workspace = workspace();
        let file = FileIdentity::github("o/r/a.rs", Some("v2"));
        let revision = workspace.revision(&file).await.unwrap().unwrap();
        assert_eq!(revision.revision, "v2");
        assert_eq!(revision.kind, HeadType::Branch);
    }

    #[tokio::test]
    async fn test_foreign_file_has_no_metadata() {
        let workspace = workspace();
        let file = FileIdentity::new("file:///tmp/a.rs");
        assert!(workspace.revision(&file).await.unwrap().is_none());
        assert!(workspace.provider_path(&file).is_none());
        assert!(matches!(
            workspace.location(&file),
            Err(BlameError::MetadataUnavailable(_))
        ));
    }
}
