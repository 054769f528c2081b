// GitHub API HTTP client.
// Handles authentication, rate limiting, GraphQL envelopes, and response status mapping.

use std::sync::{Mutex, MutexGuard};

use reqwest::{
    Client, RequestBuilder, Response, StatusCode, Url,
    header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT},
};
use serde::{Serialize, de::DeserializeOwned};

use crate::config::GitHubConfig;
use crate::error::{BlameError, Result};

use super::types::{GraphqlResponse, RateLimit};

const GITHUB_API_VERSION: &str = "2022-11-28";

/// GitHub API client with rate limit tracking.
///
/// The credential is supplied per request: the host may hand out a fresh token
/// for every fetch attempt.
pub struct GitHubClient {
    client: Client,
    api_url: Url,
    graphql_url: String,
    rate_limit: Mutex<RateLimit>,
}

#[derive(Serialize)]
struct GraphqlRequest<'a, V> {
    query: &'a str,
    variables: V,
}

impl GitHubClient {
    /// Create a new client for the configured endpoints.
    pub fn new(config: &GitHubConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static(GITHUB_API_VERSION),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("remote-blame"));

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        let api_url = Url::parse(&config.api_url)
            .map_err(|e| BlameError::Config(format!("github.api_url: {}", e)))?;

        Ok(Self {
            client,
            api_url,
            graphql_url: config.graphql_url.clone(),
            rate_limit: Mutex::new(RateLimit::default()),
        })
    }

    /// Snapshot of the most recent rate limit headers.
    pub fn rate_limit(&self) -> RateLimit {
        self.rate_limit_guard().clone()
    }

    /// REST URL for a path below the API base. Each segment is percent-encoded.
    pub fn rest_url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url> {
        let mut url = self.api_url.clone();
        let not_a_base = |_: ()| {
            BlameError::Config(format!("github.api_url: {} is not a base URL", self.api_url))
        };
        url.path_segments_mut()
            .map_err(not_a_base)?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Make an authenticated GET request to the REST API.
    pub async fn get(&self, token: &str, url: Url) -> Result<Response> {
        self.send(authorize(self.client.get(url), token)?).await
    }

    /// Make an authenticated GET request with query parameters and an explicit Accept type.
    pub async fn get_with_params<T: Serialize + ?Sized>(
        &self,
        token: &str,
        url: Url,
        params: &T,
        accept: &'static str,
    ) -> Result<Response> {
        let request = self
            .client
            .get(url)
            .query(params)
            .header(ACCEPT, HeaderValue::from_static(accept));
        self.send(authorize(request, token)?).await
    }

    /// Run a GraphQL query and return its `data` object.
    pub async fn graphql<V: Serialize, T: DeserializeOwned>(
        &self,
        token: &str,
        query: &str,
        variables: V,
    ) -> Result<T> {
        let request = self
            .client
            .post(&self.graphql_url)
            .json(&GraphqlRequest { query, variables });
        let response = self.send(authorize(request, token)?).await?;
        let envelope: GraphqlResponse<T> = response.json().await?;
        into_data(envelope)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        self.update_rate_limit(&response);
        self.check_response(response).await
    }

    fn rate_limit_guard(&self) -> MutexGuard<'_, RateLimit> {
        self.rate_limit
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Update rate limit from response headers.
    fn update_rate_limit(&self, response: &Response) {
        let header = |name: &str| -> Option<u64> {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
        };

        let mut rate_limit = self.rate_limit_guard();
        if let Some(limit) = header("x-ratelimit-limit") {
            rate_limit.limit = limit;
        }
        if let Some(remaining) = header("x-ratelimit-remaining") {
            rate_limit.remaining = Some(remaining);
        }
        if let Some(reset) = header("x-ratelimit-reset") {
            rate_limit.reset = reset;
        }
    }

    /// Check response status and convert errors.
    async fn check_response(&self, response: Response) -> Result<Response> {
        match response.status() {
            StatusCode::OK | StatusCode::CREATED | StatusCode::ACCEPTED => Ok(response),
            StatusCode::UNAUTHORIZED => Err(BlameError::AuthFailed(
                "invalid or expired token".to_string(),
            )),
            StatusCode::NOT_FOUND => Err(BlameError::NotFound(response.url().to_string())),
            StatusCode::FORBIDDEN => {
                let rate_limit = self.rate_limit();
                if rate_limit.is_exhausted() {
                    Err(BlameError::RateLimited {
                        reset_at: rate_limit.reset_at(),
                    })
                } else {
                    Err(BlameError::RemoteRequestFailed(format!(
                        "Forbidden: {}",
                        response.text().await.unwrap_or_default()
                    )))
                }
            }
            status => Err(BlameError::RemoteRequestFailed(format!(
                "HTTP {}: {}",
                status,
                response.text().await.unwrap_or_default()
            ))),
        }
    }
}

fn authorize(request: RequestBuilder, token: &str) -> Result<RequestBuilder> {
    let value = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|e| BlameError::AuthFailed(e.to_string()))?;
    Ok(request.header(AUTHORIZATION, value))
}

/// Unwrap a GraphQL envelope, surfacing query-level errors.
fn into_data<T>(envelope: GraphqlResponse<T>) -> Result<T> {
    if !envelope.errors.is_empty() {
        let messages: Vec<&str> = envelope.errors.iter().map(|e| e.message.as_str()).collect();
        return Err(BlameError::RemoteRequestFailed(messages.join("; ")));
    }
    envelope
        .data
        .ok_or_else(|| BlameError::MalformedResponse("response has no data".to_string()))
}
