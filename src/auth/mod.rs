//! Token handling for the hooks API.
//!
//! Managing repository and organization hooks needs a token with
//! `admin:repo_hook` or `admin:org_hook`. All three token kinds are sent
//! as a bearer token.

use crate::errors::{GitHubError, GitHubErrorKind, GitHubResult};
use reqwest::header::HeaderValue;
use secrecy::{ExposeSecret, SecretString};

/// Environment variable holding the API token.
pub const GITHUB_TOKEN_VAR: &str = "GITHUB_TOKEN";

/// A GitHub API token, by issuer.
#[derive(Debug, Clone)]
pub enum AuthMethod {
    /// Personal access token, classic (`ghp_`) or fine-grained (`github_pat_`).
    Pat(SecretString),
    /// OAuth app token (`gho_`).
    OAuth(SecretString),
    /// Installation or Actions token (`ghs_`).
    Actions(SecretString),
}

impl AuthMethod {
    /// Wraps a personal access token.
    pub fn pat(token: impl Into<String>) -> Self {
        Self::Pat(SecretString::new(token.into()))
    }

    /// Wraps an OAuth token.
    pub fn oauth(token: impl Into<String>) -> Self {
        Self::OAuth(SecretString::new(token.into()))
    }

    /// Wraps an Actions token.
    pub fn actions(token: impl Into<String>) -> Self {
        Self::Actions(SecretString::new(token.into()))
    }

    /// Picks the variant from GitHub's token prefix. Unknown prefixes are
    /// treated as personal access tokens.
    pub fn detect(token: impl Into<String>) -> Self {
        let token = token.into();
        if token.starts_with("gho_") {
            Self::oauth(token)
        } else if token.starts_with("ghs_") {
            Self::actions(token)
        } else {
            Self::pat(token)
        }
    }

    /// A loggable stand-in for the token.
    pub fn redacted(&self) -> &'static str {
        match self {
            Self::Pat(t) if t.expose_secret().starts_with("github_pat_") => "github_pat_***",
            Self::Pat(t) if t.expose_secret().starts_with("ghp_") => "ghp_***",
            Self::Pat(_) => "***",
            Self::OAuth(_) => "gho_***",
            Self::Actions(_) => "ghs_***",
        }
    }

    fn secret(&self) -> &SecretString {
        match self {
            Self::Pat(t) | Self::OAuth(t) | Self::Actions(t) => t,
        }
    }
}

/// Holds the prepared `Authorization` header.
#[derive(Debug)]
pub struct AuthManager {
    method: AuthMethod,
    header: HeaderValue,
}

impl AuthManager {
    /// Prepares the bearer header; fails if the token is not a valid header value.
    pub fn new(method: AuthMethod) -> GitHubResult<Self> {
        let bearer = format!("Bearer {}", method.secret().expose_secret());
        let mut header = HeaderValue::from_str(&bearer).map_err(|e| {
            GitHubError::configuration(format!(
                "token {} is not a valid header value",
                method.redacted()
            ))
            .with_cause(e)
        })?;
        header.set_sensitive(true);
        Ok(Self { method, header })
    }

    /// The token in use.
    pub fn method(&self) -> &AuthMethod {
        &self.method
    }

    /// `Authorization` header value, marked sensitive.
    pub fn auth_header(&self) -> &HeaderValue {
        &self.header
    }
}

/// Reads a token from an environment variable.
#[derive(Debug, Clone)]
pub struct EnvCredentialProvider {
    var: String,
}

impl EnvCredentialProvider {
    /// Reads `GITHUB_TOKEN`.
    pub fn from_github_token() -> Self {
        Self::from_env_var(GITHUB_TOKEN_VAR)
    }

    /// Reads the named variable.
    pub fn from_env_var(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    /// Returns the token, or `MissingAuth` when the variable is unset or empty.
    pub fn read(&self) -> GitHubResult<AuthMethod> {
        std::env::var(&self.var)
            .ok()
            .filter(|token| !token.is_empty())
            .map(AuthMethod::detect)
            .ok_or_else(|| {
                GitHubError::new(
                    GitHubErrorKind::MissingAuth,
                    format!("environment variable {} is not set", self.var),
                )
            })
    }
}
