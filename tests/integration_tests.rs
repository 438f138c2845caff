//! End-to-end tests of the composite assembly against the mock API.

use async_trait::async_trait;
use integrations_github_webhooks::mocks::{fixtures, MockGitHubClient, MockResponse};
use integrations_github_webhooks::{
    EventHandler, GitHubErrorKind, Scope, TargetArgs, WebhookEvent, WebhookIntegration,
    WebhookIntegrationArgs,
};
use mockall::mock;
use pretty_assertions::assert_eq;
use secrecy::ExposeSecret;
use std::sync::Arc;

mock! {
    pub Handler {}

    #[async_trait]
    impl EventHandler for Handler {
        async fn handle(&self, event: WebhookEvent) -> anyhow::Result<()>;
    }
}

const CALLBACK_URL: &str = "https://hooks.example.com/github";
const REPO_HOOKS: &str = "/repos/octocat/hello-world/hooks";
const ORG_HOOKS: &str = "/orgs/acme/hooks";

fn args() -> WebhookIntegrationArgs {
    WebhookIntegrationArgs::new(CALLBACK_URL)
        .events(["push", "pull_request"])
        .target(TargetArgs::repository("octocat", "hello-world"))
        .target(TargetArgs::organization("acme"))
}

fn mock_api() -> Arc<MockGitHubClient> {
    let mock = Arc::new(MockGitHubClient::new());
    mock.on_post(
        REPO_HOOKS,
        MockResponse::created(&fixtures::hook(101, CALLBACK_URL, &["push", "pull_request"])),
    );
    mock.on_post(
        ORG_HOOKS,
        MockResponse::created(&fixtures::hook(202, CALLBACK_URL, &["push", "pull_request"])),
    );
    mock
}

#[tokio::test]
async fn test_provision_and_teardown() {
    let mock = mock_api();
    let mut handler = MockHandler::new();
    handler
        .expect_handle()
        .withf(|event| event.event_type == "pull_request")
        .times(1)
        .returning(|_| Ok(()));

    let integration = WebhookIntegration::provision(mock.clone(), args(), handler)
        .await
        .unwrap();

    let registrations = integration.registrations();
    assert_eq!(registrations.len(), 2);
    assert_eq!(registrations[0].id, "101");
    assert_eq!(registrations[0].outputs.scope, Scope::repository("octocat", "hello-world"));
    assert_eq!(registrations[1].id, "202");
    assert_eq!(registrations[1].outputs.scope, Scope::organization("acme"));
    assert_eq!(integration.callback_url(), CALLBACK_URL);

    let secret = integration.secret().get().unwrap().expose_secret().clone();
    let posts = mock.requests_matching("POST", "/");
    assert_eq!(posts.len(), 2);
    for post in &posts {
        let body = post.body.as_ref().unwrap();
        assert_eq!(body["config"]["secret"], secret.as_str());
        assert_eq!(body["config"]["url"], CALLBACK_URL);
        assert_eq!(body["events"], serde_json::json!(["push", "pull_request"]));
    }

    let delivery = fixtures::signed_request(&secret, r#"{"action":"opened"}"#, "pull_request");
    let response = integration.gateway().handle(delivery).await.unwrap();
    assert!(response.is_success());

    mock.on_delete("/repos/octocat/hello-world/hooks/101", MockResponse::no_content());
    mock.on_delete("/orgs/acme/hooks/202", MockResponse::no_content());
    integration.teardown().await.unwrap();

    let deletes = mock.requests_matching("DELETE", "/");
    assert_eq!(deletes.len(), 2);
    assert!(mock.verify_request("DELETE", "/repos/octocat/hello-world/hooks/101"));
    assert!(mock.verify_request("DELETE", "/orgs/acme/hooks/202"));
    assert_eq!(mock.request_count(), 4);
}

#[tokio::test]
async fn test_each_provision_generates_a_new_secret() {
    let first_api = mock_api();
    let second_api = mock_api();
    let mut handler = MockHandler::new();
    handler.expect_handle().never();
    let mut other = MockHandler::new();
    other.expect_handle().never();

    let first = WebhookIntegration::provision(first_api, args(), handler)
        .await
        .unwrap();
    let second = WebhookIntegration::provision(second_api, args(), other)
        .await
        .unwrap();

    assert_ne!(
        first.secret().get().unwrap().expose_secret(),
        second.secret().get().unwrap().expose_secret()
    );
}

#[tokio::test]
async fn test_registration_failure_rolls_back_created_hooks() {
    let mock = Arc::new(MockGitHubClient::new());
    mock.on_post(
        REPO_HOOKS,
        MockResponse::created(&fixtures::hook(101, CALLBACK_URL, &["push"])),
    );
    mock.on_post(ORG_HOOKS, MockResponse::forbidden("Must have admin rights to Repository."));
    mock.on_delete("/repos/octocat/hello-world/hooks/101", MockResponse::no_content());
    let mut handler = MockHandler::new();
    handler.expect_handle().never();

    let err = match WebhookIntegration::provision(mock.clone(), args(), handler).await {
        Ok(_) => panic!("provisioning should fail"),
        Err(e) => e,
    };

    assert_eq!(*err.kind(), GitHubErrorKind::Forbidden);
    assert_eq!(err.status_code(), Some(403));
    assert_eq!(mock.requests_matching("POST", "/").len(), 2);
    assert!(mock.verify_request("DELETE", "/repos/octocat/hello-world/hooks/101"));
    assert_eq!(mock.requests_matching("DELETE", "/").len(), 1);
    assert!(!err.message().contains("still registered"));
}

#[tokio::test]
async fn test_failed_rollback_names_remaining_hooks() {
    let mock = Arc::new(MockGitHubClient::new());
    mock.on_post(
        REPO_HOOKS,
        MockResponse::created(&fixtures::hook(101, CALLBACK_URL, &["push"])),
    );
    mock.on_post(ORG_HOOKS, MockResponse::forbidden("Must have admin rights to Repository."));
    mock.on_delete(
        "/repos/octocat/hello-world/hooks/101",
        MockResponse::error(502, "Bad Gateway"),
    );
    let mut handler = MockHandler::new();
    handler.expect_handle().never();

    let err = match WebhookIntegration::provision(mock.clone(), args(), handler).await {
        Ok(_) => panic!("provisioning should fail"),
        Err(e) => e,
    };

    assert_eq!(*err.kind(), GitHubErrorKind::Forbidden);
    assert!(err.message().contains("still registered"));
    assert!(err.message().contains("repo:octocat/hello-world hook 101"));
}

#[tokio::test]
async fn test_teardown_attempts_every_registration() {
    let mock = mock_api();
    let mut handler = MockHandler::new();
    handler.expect_handle().never();

    let integration = WebhookIntegration::provision(mock.clone(), args(), handler)
        .await
        .unwrap();

    mock.on_delete(
        "/repos/octocat/hello-world/hooks/101",
        MockResponse::not_found("Not Found"),
    );
    mock.on_delete("/orgs/acme/hooks/202", MockResponse::no_content());

    let err = integration.teardown().await.unwrap_err();
    assert_eq!(*err.kind(), GitHubErrorKind::NotFound);
    assert_eq!(mock.requests_matching("DELETE", "/").len(), 2);
}
