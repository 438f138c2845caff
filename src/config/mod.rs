//! Settings for talking to the GitHub hooks API.

use crate::auth::{AuthMethod, EnvCredentialProvider};
use crate::errors::{GitHubError, GitHubResult};
use std::time::Duration;
use url::Url;

/// Public GitHub API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Value sent in `X-GitHub-Api-Version`.
pub const DEFAULT_API_VERSION: &str = "2022-11-28";

/// Whole-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection establishment timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// GitHub rejects calls without a User-Agent.
pub const DEFAULT_USER_AGENT: &str = concat!("integrations-github-webhooks/", env!("CARGO_PKG_VERSION"));

/// Overrides the API endpoint, e.g. for GitHub Enterprise Server.
pub const GITHUB_API_URL_VAR: &str = "GITHUB_API_URL";

/// Client settings. Build with [`GitHubConfig::builder`] or [`GitHubConfig::from_env`].
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    /// API endpoint, `http` or `https`.
    pub base_url: String,
    /// `X-GitHub-Api-Version` value.
    pub api_version: String,
    /// Token used for every call. Required by the client.
    pub auth: Option<AuthMethod>,
    /// Whole-request timeout.
    pub timeout: Duration,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// `User-Agent` value.
    pub user_agent: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            auth: None,
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl GitHubConfig {
    /// Starts from the defaults.
    pub fn builder() -> GitHubConfigBuilder {
        GitHubConfigBuilder::default()
    }

    /// Reads `GITHUB_TOKEN` (required) and `GITHUB_API_URL` (optional).
    pub fn from_env() -> GitHubResult<Self> {
        let auth = EnvCredentialProvider::from_github_token().read()?;
        let builder = Self::builder().auth(auth);
        match non_empty_env(GITHUB_API_URL_VAR) {
            Some(url) => builder.base_url(url).build(),
            None => builder.build(),
        }
    }

    /// Checks the endpoint and User-Agent.
    pub fn validate(&self) -> GitHubResult<()> {
        check_base_url(&self.base_url)?;
        if self.user_agent.trim().is_empty() {
            return Err(GitHubError::configuration("a User-Agent is required"));
        }
        Ok(())
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn check_base_url(raw: &str) -> GitHubResult<()> {
    let url = Url::parse(raw).map_err(|e| {
        GitHubError::configuration(format!("base URL {:?} does not parse: {}", raw, e))
            .with_cause(e)
    })?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(GitHubError::configuration(format!(
            "base URL scheme {:?} is not http or https",
            other
        ))),
    }
}

/// Fluent construction of a [`GitHubConfig`]; validated on [`build`](Self::build).
#[derive(Debug, Default)]
pub struct GitHubConfigBuilder {
    config: GitHubConfig,
}

impl GitHubConfigBuilder {
    /// Same as [`GitHubConfig::builder`].
    pub fn new() -> Self {
        Self::default()
    }

    /// API endpoint.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// `X-GitHub-Api-Version` value.
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.config.api_version = version.into();
        self
    }

    /// Token for every call.
    pub fn auth(mut self, auth: AuthMethod) -> Self {
        self.config.auth = Some(auth);
        self
    }

    /// Shorthand for a personal access token.
    pub fn pat(self, token: impl Into<String>) -> Self {
        self.auth(AuthMethod::pat(token))
    }

    /// Whole-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// `User-Agent` value.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Validates and returns the configuration.
    pub fn build(self) -> GitHubResult<GitHubConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::GitHubErrorKind;
    use test_case::test_case;

    #[test]
    fn test_defaults_target_public_api() {
        let config = GitHubConfig::builder().build().unwrap();
        assert_eq!(config.base_url, "https://api.github.com");
        assert_eq!(config.api_version, "2022-11-28");
        assert!(config.user_agent.starts_with("integrations-github-webhooks/"));
        assert!(config.auth.is_none());
    }

    #[test]
    fn test_enterprise_endpoint() {
        let config = GitHubConfig::builder()
            .base_url("https://github.example.com/api/v3")
            .pat("ghp_test")
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap();

        assert_eq!(config.base_url, "https://github.example.com/api/v3");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
        assert!(config.auth.is_some());
    }

    #[test_case("" ; "empty")]
    #[test_case("api.github.com" ; "no scheme")]
    #[test_case("ftp://github.com" ; "wrong scheme")]
    fn test_rejected_base_url(url: &str) {
        let err = GitHubConfig::builder().base_url(url).build().unwrap_err();
        assert_eq!(*err.kind(), GitHubErrorKind::InvalidConfiguration);
        assert!(err.message().contains("base URL"));
    }

    #[test]
    fn test_blank_user_agent() {
        let err = GitHubConfig::builder().user_agent("  ").build().unwrap_err();
        assert_eq!(*err.kind(), GitHubErrorKind::InvalidConfiguration);
    }
}
