//! In-memory stand-in for the GitHub API, plus test fixtures.

use crate::client::{ApiResponse, GitHubApi};
use crate::errors::GitHubResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

type Route = (Method, String);

/// Scripted [`GitHubApi`] for tests.
///
/// Responses queue per method and path and are consumed in order. A request
/// with nothing queued gets a 404, as GitHub answers for an unknown hook.
/// Every request is recorded.
#[derive(Debug, Clone, Default)]
pub struct MockGitHubClient {
    routes: Arc<Mutex<HashMap<Route, VecDeque<MockResponse>>>>,
    log: Arc<Mutex<Vec<MockRequest>>>,
}

/// A scripted response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// Status code.
    pub status: u16,
    /// Body text.
    pub body: String,
    /// Sent back as `x-github-request-id`.
    pub request_id: Option<String>,
    /// Wait before answering.
    pub delay: Option<Duration>,
}

impl MockResponse {
    /// Any status with a raw body.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            request_id: None,
            delay: None,
        }
    }

    /// 200 with a JSON body.
    pub fn ok<T: Serialize>(body: &T) -> Self {
        Self::json(200, body)
    }

    /// 201 with a JSON body.
    pub fn created<T: Serialize>(body: &T) -> Self {
        Self::json(201, body)
    }

    /// 204, empty body.
    pub fn no_content() -> Self {
        Self::new(204, "")
    }

    /// GitHub's error body: `message` and `documentation_url`.
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(
            status,
            &json!({
                "message": message,
                "documentation_url": "https://docs.github.com/rest/webhooks"
            }),
        )
    }

    /// 403 error body.
    pub fn forbidden(message: &str) -> Self {
        Self::error(403, message)
    }

    /// 404 error body.
    pub fn not_found(message: &str) -> Self {
        Self::error(404, message)
    }

    /// Attaches a request id.
    pub fn with_request_id(mut self, id: &str) -> Self {
        self.request_id = Some(id.to_string());
        self
    }

    /// Delays the answer.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn json<T: Serialize>(status: u16, body: &T) -> Self {
        Self::new(status, serde_json::to_string(body).unwrap_or_default())
    }
}

/// A request the mock received.
#[derive(Debug, Clone)]
pub struct MockRequest {
    /// Method.
    pub method: Method,
    /// Path as passed to [`GitHubApi::send`].
    pub path: String,
    /// JSON body, if any.
    pub body: Option<Value>,
    /// Arrival time.
    pub received_at: DateTime<Utc>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn parse_method(method: &str) -> Method {
    Method::from_bytes(method.to_ascii_uppercase().as_bytes()).unwrap_or(Method::GET)
}

impl MockGitHubClient {
    /// Empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `response` for `method path`.
    pub fn register(&self, method: &str, path: &str, response: MockResponse) {
        lock(&self.routes)
            .entry((parse_method(method), path.to_string()))
            .or_default()
            .push_back(response);
    }

    /// Queues a POST response.
    pub fn on_post(&self, path: &str, response: MockResponse) {
        self.register("POST", path, response);
    }

    /// Queues a PATCH response.
    pub fn on_patch(&self, path: &str, response: MockResponse) {
        self.register("PATCH", path, response);
    }

    /// Queues a DELETE response.
    pub fn on_delete(&self, path: &str, response: MockResponse) {
        self.register("DELETE", path, response);
    }

    /// Everything received so far.
    pub fn requests(&self) -> Vec<MockRequest> {
        lock(&self.log).clone()
    }

    /// Requests with this method whose path starts with `path_prefix`.
    pub fn requests_matching(&self, method: &str, path_prefix: &str) -> Vec<MockRequest> {
        let method = parse_method(method);
        lock(&self.log)
            .iter()
            .filter(|r| r.method == method && r.path.starts_with(path_prefix))
            .cloned()
            .collect()
    }

    /// Whether `method path` was requested at least once.
    pub fn verify_request(&self, method: &str, path: &str) -> bool {
        let method = parse_method(method);
        lock(&self.log)
            .iter()
            .any(|r| r.method == method && r.path == path)
    }

    /// Number of requests received.
    pub fn request_count(&self) -> usize {
        lock(&self.log).len()
    }

    fn next_response(&self, route: &Route) -> Option<MockResponse> {
        lock(&self.routes).get_mut(route).and_then(VecDeque::pop_front)
    }
}

#[async_trait]
impl GitHubApi for MockGitHubClient {
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> GitHubResult<ApiResponse> {
        lock(&self.log).push(MockRequest {
            method: method.clone(),
            path: path.to_string(),
            body,
            received_at: Utc::now(),
        });

        let route = (method, path.to_string());
        let response = self.next_response(&route).unwrap_or_else(|| {
            MockResponse::not_found(&format!("nothing queued for {} {}", route.0, route.1))
        });

        if let Some(delay) = response.delay {
            tokio::time::sleep(delay).await;
        }

        Ok(ApiResponse {
            status: response.status,
            body: response.body,
            request_id: response.request_id,
        })
    }
}

/// Test fixtures for hooks and deliveries.
pub mod fixtures {
    use crate::gateway::InboundRequest;
    use crate::types::{Hook, HookConfig};
    use crate::webhooks::{compute_signature, DELIVERY_HEADER, EVENT_HEADER, SIGNATURE_HEADER};
    use chrono::Utc;

    /// Creates a hook as GitHub returns it from the create endpoint.
    pub fn hook(id: u64, url: &str, events: &[&str]) -> Hook {
        Hook {
            id,
            hook_type: Some("Repository".to_string()),
            name: Some("web".to_string()),
            active: true,
            events: events.iter().map(|e| e.to_string()).collect(),
            config: Some(HookConfig {
                url: Some(url.to_string()),
                content_type: Some("json".to_string()),
                secret: Some("********".to_string()),
                insecure_ssl: Some("0".to_string()),
            }),
            last_response: None,
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
        }
    }

    /// Creates a delivery signed with `secret`, as GitHub would send it.
    pub fn signed_request(secret: &str, body: &str, event: &str) -> InboundRequest {
        // HMAC accepts keys of any length, so signing cannot fail here.
        let signature = compute_signature(secret, body.as_bytes()).unwrap_or_default();
        InboundRequest::new()
            .header(EVENT_HEADER, event)
            .header(DELIVERY_HEADER, &uuid::Uuid::new_v4().to_string())
            .header(SIGNATURE_HEADER, &signature)
            .body(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Hook;

    #[tokio::test]
    async fn test_mock_client_basic() {
        let mock = MockGitHubClient::new();
        let hook = fixtures::hook(1, "https://example.com/hook", &["push"]);
        mock.on_post(
            "/repos/octocat/hello-world/hooks",
            MockResponse::created(&hook).with_request_id("ABCD:1"),
        );

        let response = mock
            .send(Method::POST, "/repos/octocat/hello-world/hooks", None)
            .await
            .unwrap();

        assert_eq!(response.status, 201);
        assert_eq!(response.request_id.as_deref(), Some("ABCD:1"));
        assert_eq!(response.json::<Hook>().unwrap().id, 1);
        assert!(mock.verify_request("POST", "/repos/octocat/hello-world/hooks"));
    }

    #[tokio::test]
    async fn test_unmatched_request_is_not_found() {
        let mock = MockGitHubClient::new();
        let response = mock.send(Method::DELETE, "/orgs/acme/hooks/1", None).await.unwrap();

        assert_eq!(response.status, 404);
        assert!(response.body.contains("DELETE /orgs/acme/hooks/1"));
        assert_eq!(mock.requests()[0].method, Method::DELETE);
    }

    #[tokio::test]
    async fn test_delayed_response() {
        let mock = MockGitHubClient::new();
        mock.on_patch(
            "/orgs/acme/hooks/1",
            MockResponse::ok(&serde_json::json!({})).with_delay(Duration::from_millis(20)),
        );

        let started = std::time::Instant::now();
        let response = mock.send(Method::PATCH, "/orgs/acme/hooks/1", None).await.unwrap();

        assert_eq!(response.status, 200);
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_responses_are_consumed_in_order() {
        let mock = MockGitHubClient::new();
        mock.on_delete("/orgs/acme/hooks/1", MockResponse::no_content());
        mock.on_delete("/orgs/acme/hooks/1", MockResponse::not_found("Not Found"));

        let first = mock.send(Method::DELETE, "/orgs/acme/hooks/1", None).await.unwrap();
        let second = mock.send(Method::DELETE, "/orgs/acme/hooks/1", None).await.unwrap();

        assert_eq!(first.status, 204);
        assert_eq!(second.status, 404);
        assert_eq!(mock.requests_matching("DELETE", "/orgs/acme").len(), 2);
    }

    #[test]
    fn test_signed_request_fixture() {
        let request = fixtures::signed_request("secret", "{}", "ping");
        assert_eq!(request.headers.len(), 3);
        assert_eq!(request.body.as_deref(), Some("{}"));
        assert!(!request.is_base64_encoded);
    }
}
