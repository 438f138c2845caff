//! Organization and repository hook operations.

use crate::client::GitHubApi;
use crate::errors::{GitHubError, GitHubErrorKind, GitHubResult};
use crate::types::{Hook, Scope};
use reqwest::Method;
use serde::Serialize;
use tracing::debug;

/// Hook name GitHub requires for repository and organization webhooks.
pub const WEB_HOOK_NAME: &str = "web";

/// Payload format requested for every delivery.
pub const JSON_CONTENT_TYPE: &str = "json";

/// Service for hook operations on either scope.
pub struct HooksService<'a> {
    api: &'a dyn GitHubApi,
}

impl<'a> HooksService<'a> {
    /// Creates a new hooks service.
    pub fn new(api: &'a dyn GitHubApi) -> Self {
        Self { api }
    }

    /// Creates a hook. Any non-2xx response is an error.
    pub async fn create(&self, scope: &Scope, request: &CreateHookRequest) -> GitHubResult<Hook> {
        debug!(scope = %scope, events = ?request.events, "Creating hook");
        let response = self
            .api
            .send(Method::POST, &scope.hooks_path(), Some(to_value(request)?))
            .await?
            .expect_success()?;
        response.json()
    }

    /// Edits an existing hook. Any non-2xx response is an error.
    pub async fn update(
        &self,
        scope: &Scope,
        hook_id: u64,
        request: &UpdateHookRequest,
    ) -> GitHubResult<Hook> {
        debug!(scope = %scope, hook_id, "Updating hook");
        let response = self
            .api
            .send(Method::PATCH, &scope.hook_path(hook_id), Some(to_value(request)?))
            .await?
            .expect_success()?;
        response.json()
    }

    /// Deletes a hook. Only `204 No Content` counts as success.
    pub async fn delete(&self, scope: &Scope, hook_id: u64) -> GitHubResult<()> {
        debug!(scope = %scope, hook_id, "Deleting hook");
        self.api
            .send(Method::DELETE, &scope.hook_path(hook_id), None)
            .await?
            .expect_status(204)?;
        Ok(())
    }
}

fn to_value<T: Serialize>(request: &T) -> GitHubResult<serde_json::Value> {
    serde_json::to_value(request).map_err(|e| {
        GitHubError::new(
            GitHubErrorKind::InvalidParameter,
            format!("Failed to serialize request body: {}", e),
        )
    })
}

/// Transport configuration sent with a hook.
#[derive(Clone, Serialize)]
pub struct HookConfigRequest {
    /// Delivery URL.
    pub url: String,
    /// Payload format.
    pub content_type: String,
    /// HMAC key for `X-Hub-Signature`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

impl std::fmt::Debug for HookConfigRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookConfigRequest")
            .field("url", &self.url)
            .field("content_type", &self.content_type)
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Request to create a hook.
#[derive(Debug, Clone, Serialize)]
pub struct CreateHookRequest {
    /// Always `web`.
    pub name: String,
    /// Whether deliveries are sent.
    pub active: bool,
    /// Subscribed events.
    pub events: Vec<String>,
    /// Transport configuration.
    pub config: HookConfigRequest,
}

impl CreateHookRequest {
    /// Builds a JSON web hook request.
    pub fn web(url: impl Into<String>, secret: impl Into<String>, events: Vec<String>) -> Self {
        Self {
            name: WEB_HOOK_NAME.to_string(),
            active: true,
            events,
            config: HookConfigRequest {
                url: url.into(),
                content_type: JSON_CONTENT_TYPE.to_string(),
                secret: Some(secret.into()),
            },
        }
    }
}

/// Request to edit a hook. The secret is left untouched.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateHookRequest {
    /// Subscribed events.
    pub events: Vec<String>,
    /// Transport configuration.
    pub config: HookConfigRequest,
}

impl UpdateHookRequest {
    /// Builds an edit request for the given URL and events.
    pub fn new(url: impl Into<String>, events: Vec<String>) -> Self {
        Self {
            events,
            config: HookConfigRequest {
                url: url.into(),
                content_type: JSON_CONTENT_TYPE.to_string(),
                secret: None,
            },
        }
    }
}
