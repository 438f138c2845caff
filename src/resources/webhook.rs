//! Webhook registration against an organization or a repository.

use super::{CheckFailure, CheckResult, CreateResult, DiffResult, Resource};
use crate::client::GitHubApi;
use crate::errors::{GitHubError, GitHubErrorKind, GitHubResult};
use crate::observability::TracingHooks;
use crate::secret::SecretHandle;
use crate::services::{CreateHookRequest, HooksService, UpdateHookRequest};
use crate::types::Scope;
use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

/// Declared properties of a webhook registration.
#[derive(Debug, Clone, Default)]
pub struct WebhookArgs {
    /// Callback URL (the gateway's public URL).
    pub url: Option<String>,
    /// Repository owner, paired with `repo`.
    pub owner: Option<String>,
    /// Repository name, paired with `owner`.
    pub repo: Option<String>,
    /// Organization login, exclusive with `owner`/`repo`.
    pub org: Option<String>,
    /// Events to subscribe to.
    pub events: Vec<String>,
    /// Shared HMAC key.
    pub secret: SecretHandle,
}

impl WebhookArgs {
    /// Declares a repository-scoped hook.
    pub fn repository(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: Some(owner.into()),
            repo: Some(repo.into()),
            ..Default::default()
        }
    }

    /// Declares an organization-scoped hook.
    pub fn organization(org: impl Into<String>) -> Self {
        Self {
            org: Some(org.into()),
            ..Default::default()
        }
    }

    /// Sets the callback URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the subscribed events.
    pub fn events<I, S>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.events = events.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the secret handle.
    pub fn secret(mut self, secret: SecretHandle) -> Self {
        self.secret = secret;
        self
    }
}

/// Validated webhook properties.
#[derive(Debug, Clone)]
pub struct WebhookInputs {
    /// Registration target.
    pub scope: Scope,
    /// Callback URL.
    pub url: String,
    /// Events to subscribe to.
    pub events: Vec<String>,
    /// Shared HMAC key.
    pub secret: SecretHandle,
}

/// Recorded state of a webhook registration. The secret is not recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookOutputs {
    /// Registration target.
    pub scope: Scope,
    /// Callback URL.
    pub url: String,
    /// Subscribed events.
    pub events: Vec<String>,
}

/// Webhook registration resource backed by the GitHub hooks API.
pub struct WebhookResource {
    api: Arc<dyn GitHubApi>,
}

impl WebhookResource {
    /// Creates the resource over an API client.
    pub fn new(api: Arc<dyn GitHubApi>) -> Self {
        Self { api }
    }

    fn hooks(&self) -> HooksService<'_> {
        HooksService::new(self.api.as_ref())
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Whether `value` can stand alone as one segment of an API path.
fn is_path_segment(value: &str) -> bool {
    value != "."
        && value != ".."
        && !value
            .chars()
            .any(|c| matches!(c, '/' | '?' | '#' | '%' | '\\') || c.is_whitespace())
}

fn parse_hook_id(id: &str) -> GitHubResult<u64> {
    id.parse().map_err(|_| {
        GitHubError::new(
            GitHubErrorKind::InvalidParameter,
            format!("Hook id {:?} is not numeric", id),
        )
    })
}

#[async_trait]
impl Resource for WebhookResource {
    type Args = WebhookArgs;
    type Inputs = WebhookInputs;
    type Outputs = WebhookOutputs;

    fn kind(&self) -> &'static str {
        "github:webhook"
    }

    fn validate(&self, proposed: &WebhookArgs) -> CheckResult<WebhookInputs> {
        let url = present(&proposed.url);
        let org = present(&proposed.org);
        let owner = present(&proposed.owner);
        let repo = present(&proposed.repo);
        let mut failures = Vec::new();

        match url {
            None => failures.push(CheckFailure::new("url", "A callback URL is required")),
            Some(url) => {
                if let Err(e) = Url::parse(url) {
                    failures.push(CheckFailure::new(
                        "url",
                        format!("{:?} is not an absolute URL: {}", url, e),
                    ));
                }
            }
        }

        if org.is_some() && (owner.is_some() || repo.is_some()) {
            failures.push(CheckFailure::new(
                "org",
                "org cannot be combined with owner or repo",
            ));
        }

        match (owner, repo) {
            (Some(_), None) => {
                failures.push(CheckFailure::new("repo", "repo is required when owner is set"))
            }
            (None, Some(_)) => {
                failures.push(CheckFailure::new("owner", "owner is required when repo is set"))
            }
            (None, None) if org.is_none() => failures.push(CheckFailure::new(
                "org",
                "Either org or owner and repo must be set",
            )),
            _ => {}
        }

        for (property, value) in [("org", org), ("owner", owner), ("repo", repo)] {
            if let Some(value) = value.filter(|v| !is_path_segment(v)) {
                failures.push(CheckFailure::new(
                    property,
                    format!("{:?} is not a valid {} name", value, property),
                ));
            }
        }

        let scope = match (org, owner, repo) {
            (Some(org), None, None) => Some(Scope::organization(org)),
            (None, Some(owner), Some(repo)) => Some(Scope::repository(owner, repo)),
            _ => None,
        };

        let inputs = match (scope, url) {
            (Some(scope), Some(url)) if failures.is_empty() => Some(WebhookInputs {
                scope,
                url: url.to_string(),
                events: proposed.events.clone(),
                secret: proposed.secret.clone(),
            }),
            _ => None,
        };

        CheckResult { inputs, failures }
    }

    fn diff(&self, _id: &str, current: &WebhookOutputs, proposed: &WebhookInputs) -> DiffResult {
        let mut diff = DiffResult::default();

        if current.scope.owner() != proposed.scope.owner() {
            diff.record("owner", true);
        }
        if current.scope.repo() != proposed.scope.repo() {
            diff.record("repo", true);
        }
        if current.scope.org() != proposed.scope.org() {
            diff.record("org", true);
        }
        if current.events != proposed.events {
            diff.record("events", false);
        }
        if current.url != proposed.url {
            diff.record("url", false);
        }

        diff
    }

    async fn create(&self, proposed: &WebhookInputs) -> GitHubResult<CreateResult<WebhookOutputs>> {
        let secret = proposed.secret.get()?;
        let request = CreateHookRequest::web(
            &proposed.url,
            secret.expose_secret(),
            proposed.events.clone(),
        );

        let hook = self
            .hooks()
            .create(&proposed.scope, &request)
            .await
            .map_err(|e| {
                TracingHooks::on_resource_error(self.kind(), "create", &e);
                e
            })?;

        let id = hook.id.to_string();
        TracingHooks::on_resource_operation(self.kind(), "create", &id);

        Ok(CreateResult {
            id,
            outputs: WebhookOutputs {
                scope: proposed.scope.clone(),
                url: proposed.url.clone(),
                events: proposed.events.clone(),
            },
        })
    }

    async fn update(
        &self,
        id: &str,
        _current: &WebhookOutputs,
        proposed: &WebhookInputs,
    ) -> GitHubResult<WebhookOutputs> {
        let hook_id = parse_hook_id(id)?;
        let request = UpdateHookRequest::new(&proposed.url, proposed.events.clone());

        self.hooks()
            .update(&proposed.scope, hook_id, &request)
            .await
            .map_err(|e| {
                TracingHooks::on_resource_error(self.kind(), "update", &e);
                e
            })?;
        TracingHooks::on_resource_operation(self.kind(), "update", id);

        Ok(WebhookOutputs {
            scope: proposed.scope.clone(),
            url: proposed.url.clone(),
            events: proposed.events.clone(),
        })
    }

    async fn delete(&self, id: &str, current: &WebhookOutputs) -> GitHubResult<()> {
        let hook_id = parse_hook_id(id)?;

        self.hooks()
            .delete(&current.scope, hook_id)
            .await
            .map_err(|e| {
                TracingHooks::on_resource_error(self.kind(), "delete", &e);
                e
            })?;
        TracingHooks::on_resource_operation(self.kind(), "delete", id);
        Ok(())
    }
}
