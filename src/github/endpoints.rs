// GitHub REST endpoint functions.
// Typed methods for the repository lookups the remote workspace needs.

use crate::error::Result;

use super::client::GitHubClient;
use super::types::Repository;

const RAW_CONTENT: &str = "application/vnd.github.raw+json";

impl GitHubClient {
    /// Get a specific repository.
    pub async fn get_repo(&self, token: &str, owner: &str, repo: &str) -> Result<Repository> {
        let url = self.rest_url(["repos", owner, repo])?;
        let response = self.get(token, url).await?;
        let repository: Repository = response.json().await?;
        Ok(repository)
    }

    /// Get the raw contents of a file at a revision.
    pub async fn get_file_contents(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        path: &str,
        revision: &str,
    ) -> Result<String> {
        let segments = ["repos", owner, repo, "contents"].into_iter();
        let url = self.rest_url(segments.chain(path.split('/')))?;
        let params = [("ref", revision)];
        let response = self
            .get_with_params(token, url, &params, RAW_CONTENT)
            .await?;
        let contents = response.text().await?;
        Ok(contents)
    }
}
