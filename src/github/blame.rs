// GitHub GraphQL blame query.
// One request per fetch, parameterized by repository, owner, revision, and path.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{BlameError, Result};

use super::client::GitHubClient;
use super::types::BlameRange;

const BLAME_QUERY: &str = r#"
query Blame($name: String!, $owner: String!, $expression: String!, $path: String!) {
  repository(name: $name, owner: $owner) {
    object(expression: $expression) {
      ... on Commit {
        blame(path: $path) {
          ranges {
            startingLine
            endingLine
            age
            commit {
              oid
              message
              authoredDate
              url
              author {
                name
                user {
                  url
                  avatarUrl
                }
              }
            }
          }
        }
      }
    }
  }
}"#;

/// Parameters of a single blame request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlameQuery {
    #[serde(rename = "name")]
    pub repository: String,
    pub owner: String,
    #[serde(rename = "expression")]
    pub revision: String,
    pub path: String,
}

/// Remote source of blame ranges.
#[async_trait]
pub trait BlameSource: Send + Sync {
    async fn blame(&self, token: &str, query: &BlameQuery) -> Result<Vec<BlameRange>>;
}

#[derive(Debug, Deserialize)]
struct BlameData {
    repository: Option<RepositoryNode>,
}

#[derive(Debug, Deserialize)]
struct RepositoryNode {
    object: Option<CommitNode>,
}

#[derive(Debug, Deserialize)]
struct CommitNode {
    blame: Option<BlameNode>,
}

#[derive(Debug, Deserialize)]
struct BlameNode {
    ranges: Option<Vec<BlameRange>>,
}

impl BlameData {
    fn into_ranges(self) -> Result<Vec<BlameRange>> {
        let repository = self
            .repository
            .ok_or_else(|| BlameError::MalformedResponse("repository missing".to_string()))?;
        let object = repository
            .object
            .ok_or_else(|| BlameError::MalformedResponse("revision not found".to_string()))?;
        object
            .blame
            .and_then(|blame| blame.ranges)
            .ok_or_else(|| BlameError::MalformedResponse("blame ranges missing".to_string()))
    }
}

#[async_trait]
impl BlameSource for GitHubClient {
    async fn blame(&self, token: &str, query: &BlameQuery) -> Result<Vec<BlameRange>> {
        let data: BlameData = self.graphql(token, BLAME_QUERY, query).await?;
        data.into_ranges()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_variables() {
        let query = BlameQuery {
            repository: "vscode".to_string(),
            owner: "microsoft".to_string(),
            revision: "main".to_string(),
            path: "src/main.ts".to_string(),
        };
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json["name"], "vscode");
        assert_eq!(json["owner"], "microsoft");
        assert_eq!(json["expression"], "main");
        assert_eq!(json["path"], "src/main.ts");
    }

    #[test]
    fn test_ranges_extracted() {
        let data: BlameData = serde_json::from_str(
            r#"{"repository": {"object": {"blame": {"ranges": [{
                "startingLine": 1, "endingLine": 2, "age": 0,
                "commit": {
                    "oid": "abc", "message": "m", "authoredDate": "2020-01-01T00:00:00Z",
                    "url": "u", "author": {"name": "n", "user": null}
                }
            }]}}}}"#,
        )
        .unwrap();
        let ranges = data.into_ranges().unwrap();
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].ending_line, 2);
    }

    #[test]
    fn test_missing_object_is_malformed() {
        let data: BlameData =
            serde_json::from_str(r#"{"repository": {"object": null}}"#).unwrap();
        assert!(matches!(
            data.into_ranges(),
            Err(BlameError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_non_commit_object_is_malformed() {
        // A tree or blob matches no fragment and comes back as an empty object.
        let data: BlameData = serde_json::from_str(r#"{"repository": {"object": {}}}"#).unwrap();
        assert!(matches!(
            data.into_ranges(),
            Err(BlameError::MalformedResponse(_))
        ));
    }
}
