//! # GitHub Webhooks Integration Library
//!
//! Provisions GitHub webhooks and authenticates their deliveries:
//! - Reconciliation lifecycle (`validate`, `diff`, `create`, `update`, `delete`)
//!   for organization and repository hooks
//! - A random shared secret modeled as a resource
//! - An ingestion gateway verifying `X-Hub-Signature` (HMAC-SHA1) before
//!   dispatching to application code
//! - A composite that wires secret, gateway and registrations together
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use integrations_github_webhooks::{
//!     EventHandler, GitHubClient, GitHubConfig, TargetArgs, WebhookEvent, WebhookIntegration,
//!     WebhookIntegrationArgs,
//! };
//! use std::sync::Arc;
//!
//! struct LogHandler;
//!
//! #[async_trait::async_trait]
//! impl EventHandler for LogHandler {
//!     async fn handle(&self, event: WebhookEvent) -> anyhow::Result<()> {
//!         println!("{} {}", event.event_type, event.delivery_id);
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = GitHubClient::new(GitHubConfig::from_env()?)?;
//!
//!     let args = WebhookIntegrationArgs::new("https://hooks.example.com/github")
//!         .events(["push", "pull_request"])
//!         .target(TargetArgs::repository("octocat", "hello-world"))
//!         .target(TargetArgs::organization("acme"));
//!
//!     let integration = WebhookIntegration::provision(Arc::new(client), args, LogHandler).await?;
//!     // Hand inbound requests to `integration.gateway().handle(..)`.
//!
//!     integration.teardown().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod config;
pub mod errors;
pub mod types;

// Authentication
pub mod auth;

// HTTP client and transport
pub mod client;

// API Services
pub mod services;

// Reconciliation resources
pub mod resources;
pub mod secret;

// Webhook ingestion
pub mod gateway;
pub mod webhooks;

// Composite assembly
pub mod integration;

// Observability
pub mod observability;

// Mocks for testing
pub mod mocks;

// Re-exports for convenience
pub use auth::{AuthManager, AuthMethod};
pub use client::{ApiResponse, GitHubApi, GitHubClient, GitHubClientBuilder};
pub use config::{GitHubConfig, GitHubConfigBuilder};
pub use errors::{GitHubError, GitHubErrorKind, GitHubResult};
pub use gateway::{EventHandler, GatewayResponse, InboundRequest, WebhookEvent, WebhookGateway};
pub use integration::{TargetArgs, WebhookIntegration, WebhookIntegrationArgs};
pub use resources::{
    CheckFailure, CheckResult, CreateResult, DiffResult, RandomSecretResource, Resource,
    WebhookResource,
};
pub use secret::SecretHandle;
pub use types::*;
