//! GitHub API client implementation.

use crate::auth::{AuthManager, AuthMethod};
use crate::config::{GitHubConfig, GitHubConfigBuilder};
use crate::errors::{GitHubError, GitHubErrorKind, GitHubResult};
use crate::observability::TracingHooks;
use crate::services::HooksService;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::{Duration, Instant};

const GITHUB_JSON: &str = "application/vnd.github+json";
const API_VERSION_HEADER: &str = "x-github-api-version";
const REQUEST_ID_HEADER: &str = "x-github-request-id";

/// GitHub error response format.
#[derive(Debug, serde::Deserialize)]
struct GitHubErrorResponse {
    message: String,
    documentation_url: Option<String>,
}

/// A response from the GitHub API, whatever its status.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: String,
    /// Value of the `x-github-request-id` header.
    pub request_id: Option<String>,
}

impl ApiResponse {
    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Fails unless the status is exactly `expected`.
    ///
    /// The error carries the status, GitHub's message when the body has one,
    /// and the full body.
    pub fn expect_status(self, expected: u16) -> GitHubResult<Self> {
        if self.status == expected {
            return Ok(self);
        }
        Err(self.into_error(format!("expected HTTP {}", expected)))
    }

    /// Fails on any non-2xx status.
    pub fn expect_success(self) -> GitHubResult<Self> {
        if self.is_success() {
            return Ok(self);
        }
        Err(self.into_error("expected a success status".to_string()))
    }

    /// Deserializes the body.
    pub fn json<T: DeserializeOwned>(&self) -> GitHubResult<T> {
        serde_json::from_str(&self.body).map_err(|e| {
            GitHubError::deserialization(format!("Failed to deserialize response: {}", e))
                .with_status(self.status)
                .with_response_body(self.body.clone())
        })
    }

    fn into_error(self, fallback: String) -> GitHubError {
        let parsed = serde_json::from_str::<GitHubErrorResponse>(&self.body).ok();
        let message = parsed
            .as_ref()
            .map(|e| e.message.clone())
            .unwrap_or_else(|| format!("HTTP {} ({})", self.status, fallback));
        let documentation_url = parsed.and_then(|e| e.documentation_url);

        GitHubError::from_response(self.status, message, documentation_url, self.request_id)
            .with_response_body(self.body)
    }
}

/// Minimal transport over the GitHub REST API.
///
/// Implementations return every response, including error statuses; callers
/// decide which status counts as success.
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// Sends a request with an optional JSON body.
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> GitHubResult<ApiResponse>;
}

/// reqwest-backed [`GitHubApi`].
///
/// Auth, `Accept`, `User-Agent` and API version headers are fixed when the
/// client is built and sent with every request.
pub struct GitHubClient {
    http: Client,
    base_url: String,
    token: &'static str,
}

impl GitHubClient {
    /// Builds a client from validated settings. Fails with `MissingAuth`
    /// when no token is configured.
    pub fn new(config: GitHubConfig) -> GitHubResult<Self> {
        config.validate()?;
        let method = config.auth.clone().ok_or_else(|| {
            GitHubError::new(GitHubErrorKind::MissingAuth, "a GitHub token is required")
        })?;
        let auth = AuthManager::new(method)?;

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth.auth_header().clone());
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_JSON));
        headers.insert(USER_AGENT, header_value(&config.user_agent)?);
        headers.insert(API_VERSION_HEADER, header_value(&config.api_version)?);

        let http = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| GitHubError::configuration("HTTP client setup failed").with_cause(e))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: auth.method().redacted(),
        })
    }

    /// Starts a builder.
    pub fn builder() -> GitHubClientBuilder {
        GitHubClientBuilder::new()
    }

    /// API endpoint, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Hook operations over this client.
    pub fn hooks(&self) -> HooksService<'_> {
        HooksService::new(self)
    }

    fn build_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubClient")
            .field("base_url", &self.base_url)
            .field("token", &self.token)
            .finish()
    }
}

fn header_value(value: &str) -> GitHubResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| {
        GitHubError::configuration(format!("{:?} is not a valid header value", value))
            .with_cause(e)
    })
}

fn transport_error(e: reqwest::Error) -> GitHubError {
    let error = if e.is_timeout() {
        GitHubError::timeout("request timed out")
    } else if e.is_connect() {
        GitHubError::new(GitHubErrorKind::ConnectionFailed, "could not connect")
    } else {
        GitHubError::new(GitHubErrorKind::Unknown, "request failed")
    };
    error.with_cause(e)
}

#[async_trait]
impl GitHubApi for GitHubClient {
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> GitHubResult<ApiResponse> {
        let url = self.build_url(path);
        let started = Instant::now();
        TracingHooks::on_request_start(method.as_str(), &url);

        let mut request = self.http.request(method.clone(), &url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|e| {
            TracingHooks::on_request_error(method.as_str(), &url, &e.to_string());
            transport_error(e)
        })?;

        let status = response.status().as_u16();
        let request_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response.text().await.map_err(|e| {
            GitHubError::deserialization("response body could not be read")
                .with_status(status)
                .with_cause(e)
        })?;

        TracingHooks::on_request_complete(method.as_str(), &url, status, started.elapsed());
        Ok(ApiResponse {
            status,
            body,
            request_id,
        })
    }
}

/// Builds a [`GitHubClient`] through [`GitHubConfigBuilder`].
#[derive(Debug, Default)]
pub struct GitHubClientBuilder {
    config: GitHubConfigBuilder,
}

impl GitHubClientBuilder {
    /// Starts from the default settings.
    pub fn new() -> Self {
        Self::default()
    }

    fn map(self, f: impl FnOnce(GitHubConfigBuilder) -> GitHubConfigBuilder) -> Self {
        Self {
            config: f(self.config),
        }
    }

    /// API endpoint.
    pub fn base_url(self, url: impl Into<String>) -> Self {
        self.map(|c| c.base_url(url))
    }

    /// Token for every call.
    pub fn auth(self, auth: AuthMethod) -> Self {
        self.map(|c| c.auth(auth))
    }

    /// Shorthand for a personal access token.
    pub fn pat(self, token: impl Into<String>) -> Self {
        self.auth(AuthMethod::pat(token))
    }

    /// Whole-request timeout.
    pub fn timeout(self, timeout: Duration) -> Self {
        self.map(|c| c.timeout(timeout))
    }

    /// `User-Agent` value.
    pub fn user_agent(self, user_agent: impl Into<String>) -> Self {
        self.map(|c| c.user_agent(user_agent))
    }

    /// Validates the settings and builds the client.
    pub fn build(self) -> GitHubResult<GitHubClient> {
        GitHubClient::new(self.config.build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url() {
        let client = GitHubClient::builder()
            .base_url("https://api.github.com/")
            .pat("test")
            .build()
            .unwrap();

        assert_eq!(
            client.build_url("/repos/owner/repo/hooks"),
            "https://api.github.com/repos/owner/repo/hooks"
        );
        assert_eq!(
            client.build_url("orgs/acme/hooks"),
            "https://api.github.com/orgs/acme/hooks"
        );
    }

    #[test]
    fn test_debug_hides_token() {
        let client = GitHubClient::builder().pat("ghp_hunter2").build().unwrap();
        let debug = format!("{:?}", client);
        assert!(debug.contains("ghp_***"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_client_requires_auth() {
        let result = GitHubClient::builder().build();
        assert_eq!(*result.err().unwrap().kind(), GitHubErrorKind::MissingAuth);
    }

    #[test]
    fn test_expect_status_carries_response() {
        let response = ApiResponse {
            status: 404,
            body: r#"{"message":"Not Found","documentation_url":"https://docs.github.com/rest"}"#
                .to_string(),
            request_id: Some("ABCD:1234".to_string()),
        };

        let err = response.expect_status(204).unwrap_err();
        assert_eq!(*err.kind(), GitHubErrorKind::NotFound);
        assert_eq!(err.message(), "Not Found");
        assert_eq!(err.request_id(), Some("ABCD:1234"));
        assert_eq!(err.documentation_url(), Some("https://docs.github.com/rest"));
        assert!(err.response_body().unwrap().contains("Not Found"));
    }

    #[test]
    fn test_expect_status_rejects_other_success() {
        let response = ApiResponse {
            status: 200,
            body: String::new(),
            request_id: None,
        };

        let err = response.expect_status(204).unwrap_err();
        assert_eq!(*err.kind(), GitHubErrorKind::UnexpectedStatus);
        assert_eq!(err.status_code(), Some(200));
    }
}
