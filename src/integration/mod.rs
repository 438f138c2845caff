//! One-call assembly of a secret, a gateway and its webhook registrations.
//!
//! [`WebhookIntegration::provision`] sequences the resources the way an
//! orchestrator would: validate everything up front, generate the shared
//! secret, then register one hook per target, all pointing at the same
//! callback URL and signed with the same secret.

use crate::client::GitHubApi;
use crate::errors::{GitHubError, GitHubResult};
use crate::gateway::{EventHandler, WebhookGateway};
use crate::resources::{
    CreateResult, RandomArgs, RandomOutputs, RandomSecretResource, Resource, WebhookArgs,
    WebhookOutputs, WebhookResource, DEFAULT_SECRET_BYTES,
};
use crate::secret::SecretHandle;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{info, warn};

/// Where to register one hook. Either `org`, or `owner` and `repo`.
#[derive(Debug, Clone, Default)]
pub struct TargetArgs {
    /// Repository owner.
    pub owner: Option<String>,
    /// Repository name.
    pub repo: Option<String>,
    /// Organization login.
    pub org: Option<String>,
}

impl TargetArgs {
    /// Targets a repository.
    pub fn repository(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: Some(owner.into()),
            repo: Some(repo.into()),
            org: None,
        }
    }

    /// Targets an organization.
    pub fn organization(org: impl Into<String>) -> Self {
        Self {
            org: Some(org.into()),
            ..Default::default()
        }
    }

    fn declare(&self, url: &str, events: &[String], secret: &SecretHandle) -> WebhookArgs {
        WebhookArgs {
            url: Some(url.to_string()),
            owner: self.owner.clone(),
            repo: self.repo.clone(),
            org: self.org.clone(),
            events: events.to_vec(),
            secret: secret.clone(),
        }
    }
}

/// Declared shape of an integration.
#[derive(Debug, Clone)]
pub struct WebhookIntegrationArgs {
    /// Public URL of the gateway.
    pub callback_url: String,
    /// Events every hook subscribes to.
    pub events: Vec<String>,
    /// Hook targets.
    pub targets: Vec<TargetArgs>,
    /// Entropy of the shared secret.
    pub secret_byte_count: usize,
}

impl WebhookIntegrationArgs {
    /// Starts a declaration for a callback URL.
    pub fn new(callback_url: impl Into<String>) -> Self {
        Self {
            callback_url: callback_url.into(),
            events: Vec::new(),
            targets: Vec::new(),
            secret_byte_count: DEFAULT_SECRET_BYTES,
        }
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

    /// Adds a target.
    pub fn target(mut self, target: TargetArgs) -> Self {
        self.targets.push(target);
        self
    }

    /// Sets the secret size in bytes.
    pub fn secret_byte_count(mut self, byte_count: usize) -> Self {
        self.secret_byte_count = byte_count;
        self
    }
}

/// A provisioned secret, gateway and set of hook registrations.
pub struct WebhookIntegration<H> {
    gateway: WebhookGateway<H>,
    callback_url: String,
    secret: CreateResult<RandomOutputs>,
    registrations: Vec<CreateResult<WebhookOutputs>>,
    webhooks: WebhookResource,
    random: RandomSecretResource,
}

impl<H: EventHandler> WebhookIntegration<H> {
    /// Provisions the integration.
    ///
    /// Nothing is created unless every declaration validates. If any
    /// registration fails, the hooks that were created are deleted again and
    /// the first failure is returned. The gateway is
    /// bound to the secret before it exists and verifies deliveries once the
    /// secret has been generated.
    pub async fn provision(
        api: Arc<dyn GitHubApi>,
        args: WebhookIntegrationArgs,
        handler: H,
    ) -> GitHubResult<Self> {
        let webhooks = WebhookResource::new(api);
        let random = RandomSecretResource::new();
        let secret = SecretHandle::pending();

        let mut failures = Vec::new();
        let secret_check = random.validate(&RandomArgs::new(
            i64::try_from(args.secret_byte_count).unwrap_or(i64::MAX),
        ));
        failures.extend(secret_check.failures.iter().map(|f| format!("secret.{}", f)));

        if args.targets.is_empty() {
            failures.push("targets: at least one target is required".to_string());
        }

        let mut declared = Vec::with_capacity(args.targets.len());
        for (index, target) in args.targets.iter().enumerate() {
            let declaration = target.declare(&args.callback_url, &args.events, &secret);
            let check = webhooks.validate(&declaration);
            failures.extend(
                check
                    .failures
                    .iter()
                    .map(|f| format!("targets[{}].{}", index, f)),
            );
            declared.extend(check.inputs);
        }

        let secret_inputs = match secret_check.inputs {
            Some(inputs) if failures.is_empty() => inputs,
            _ => {
                return Err(GitHubError::invalid_inputs(format!(
                    "Invalid webhook integration: {}",
                    failures.join("; ")
                )))
            }
        };

        let gateway = WebhookGateway::new(secret.clone(), handler);

        let created_secret = random.create(&secret_inputs).await?;
        secret.resolve(created_secret.outputs.value.clone())?;

        let outcomes = join_all(declared.iter().map(|inputs| webhooks.create(inputs))).await;
        let mut registrations = Vec::with_capacity(outcomes.len());
        let mut first_error = None;
        for outcome in outcomes {
            match outcome {
                Ok(created) => registrations.push(created),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Some(error) = first_error {
            return Err(roll_back(&webhooks, &registrations, error).await);
        }

        info!(
            callback_url = %args.callback_url,
            registrations = registrations.len(),
            "Webhook integration provisioned"
        );

        Ok(Self {
            gateway,
            callback_url: args.callback_url,
            secret: created_secret,
            registrations,
            webhooks,
            random,
        })
    }

    /// Gets the gateway bound to the shared secret.
    pub fn gateway(&self) -> &WebhookGateway<H> {
        &self.gateway
    }

    /// Gets the URL every hook delivers to.
    pub fn callback_url(&self) -> &str {
        &self.callback_url
    }

    /// Gets the recorded registrations.
    pub fn registrations(&self) -> &[CreateResult<WebhookOutputs>] {
        &self.registrations
    }

    /// Gets the shared secret handle.
    pub fn secret(&self) -> &SecretHandle {
        self.gateway.secret()
    }

    /// Deletes every registration, then the secret.
    ///
    /// Each registration is deleted once, using its own recorded scope and
    /// id. All deletions are attempted; the first failure is returned.
    pub async fn teardown(self) -> GitHubResult<()> {
        let (first_error, _) = delete_all(&self.webhooks, &self.registrations).await;
        if let Some(e) = first_error {
            return Err(e);
        }

        self.random.delete(&self.secret.id, &self.secret.outputs).await
    }
}

/// Deletes every registration. Returns the first failure and the
/// registrations that are still in place.
async fn delete_all<'a>(
    webhooks: &WebhookResource,
    registrations: &'a [CreateResult<WebhookOutputs>],
) -> (Option<GitHubError>, Vec<&'a CreateResult<WebhookOutputs>>) {
    let results = join_all(
        registrations
            .iter()
            .map(|registration| webhooks.delete(&registration.id, &registration.outputs)),
    )
    .await;

    let mut first_error = None;
    let mut remaining = Vec::new();
    for (registration, result) in registrations.iter().zip(results) {
        if let Err(e) = result {
            warn!(
                id = %registration.id,
                scope = %registration.outputs.scope,
                error = %e,
                "Hook was not deleted"
            );
            first_error.get_or_insert(e);
            remaining.push(registration);
        }
    }
    (first_error, remaining)
}

/// Deletes the hooks a failed provisioning did create. The returned error is
/// `cause`, annotated with any hook that could not be deleted.
async fn roll_back(
    webhooks: &WebhookResource,
    created: &[CreateResult<WebhookOutputs>],
    cause: GitHubError,
) -> GitHubError {
    if created.is_empty() {
        return cause;
    }
    warn!(created = created.len(), error = %cause, "Rolling back webhook registrations");

    let (_, remaining) = delete_all(webhooks, created).await;
    if remaining.is_empty() {
        return cause;
    }
    let left: Vec<String> = remaining
        .iter()
        .map(|r| format!("{} hook {}", r.outputs.scope, r.id))
        .collect();
    cause.annotate(format!("still registered: {}", left.join(", ")))
}
