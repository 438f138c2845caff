//! Core types for GitHub webhooks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The target a webhook subscription is registered against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Organization-level hook.
    Organization {
        /// Organization login.
        org: String,
    },
    /// Repository-level hook.
    Repository {
        /// Repository owner.
        owner: String,
        /// Repository name.
        repo: String,
    },
}

impl Scope {
    /// Creates an organization scope.
    pub fn organization(org: impl Into<String>) -> Self {
        Self::Organization { org: org.into() }
    }

    /// Creates a repository scope.
    pub fn repository(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self::Repository {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// Organization login, if organization-scoped.
    pub fn org(&self) -> Option<&str> {
        match self {
            Self::Organization { org } => Some(org),
            Self::Repository { .. } => None,
        }
    }

    /// Repository owner, if repository-scoped.
    pub fn owner(&self) -> Option<&str> {
        match self {
            Self::Repository { owner, .. } => Some(owner),
            Self::Organization { .. } => None,
        }
    }

    /// Repository name, if repository-scoped.
    pub fn repo(&self) -> Option<&str> {
        match self {
            Self::Repository { repo, .. } => Some(repo),
            Self::Organization { .. } => None,
        }
    }

    /// Path of the hooks collection for this scope.
    pub fn hooks_path(&self) -> String {
        match self {
            Self::Organization { org } => format!("/orgs/{}/hooks", org),
            Self::Repository { owner, repo } => format!("/repos/{}/{}/hooks", owner, repo),
        }
    }

    /// Path of a single hook for this scope.
    pub fn hook_path(&self, hook_id: u64) -> String {
        format!("{}/{}", self.hooks_path(), hook_id)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Organization { org } => write!(f, "org:{}", org),
            Self::Repository { owner, repo } => write!(f, "repo:{}/{}", owner, repo),
        }
    }
}

/// Webhook configuration as returned by GitHub.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookConfig {
    /// Webhook URL.
    pub url: Option<String>,
    /// Content type.
    pub content_type: Option<String>,
    /// Secret (GitHub returns it masked).
    pub secret: Option<String>,
    /// Whether to allow insecure SSL.
    pub insecure_ssl: Option<String>,
}

/// Webhook as returned by GitHub's create and edit endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hook {
    /// Webhook ID.
    pub id: u64,
    /// Webhook type.
    #[serde(rename = "type", default)]
    pub hook_type: Option<String>,
    /// Webhook name.
    #[serde(default)]
    pub name: Option<String>,
    /// Whether the webhook is active.
    #[serde(default)]
    pub active: bool,
    /// Events that trigger the webhook.
    #[serde(default)]
    pub events: Vec<String>,
    /// Webhook configuration.
    pub config: Option<HookConfig>,
    /// Last response.
    pub last_response: Option<HookLastResponse>,
    /// Creation time.
    pub created_at: Option<DateTime<Utc>>,
    /// Last update time.
    pub updated_at: Option<DateTime<Utc>>,
}

/// Webhook last response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookLastResponse {
    /// Response code.
    pub code: Option<i32>,
    /// Response status.
    pub status: Option<String>,
    /// Response message.
    pub message: Option<String>,
}
