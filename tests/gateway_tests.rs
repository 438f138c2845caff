//! Integration tests for delivery authentication and dispatch.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use integrations_github_webhooks::mocks::fixtures;
use integrations_github_webhooks::webhooks::{
    compute_signature, DELIVERY_HEADER, EVENT_HEADER, SIGNATURE_HEADER,
};
use integrations_github_webhooks::{
    EventHandler, GatewayResponse, GitHubErrorKind, InboundRequest, SecretHandle, WebhookEvent,
    WebhookGateway,
};
use mockall::mock;
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use test_case::test_case;

mock! {
    pub Handler {}

    #[async_trait]
    impl EventHandler for Handler {
        async fn handle(&self, event: WebhookEvent) -> anyhow::Result<()>;
    }
}

const SECRET: &str = "It's a Secret to Everybody";
const BODY: &str = r#"{"ref":"refs/heads/main","after":"6dcb09b5b57875f334f61aebed695e2e4193db5e"}"#;

fn gateway(handler: MockHandler) -> WebhookGateway<MockHandler> {
    WebhookGateway::new(
        SecretHandle::resolved(SecretString::new(SECRET.to_string())),
        handler,
    )
}

fn rejecting_handler() -> MockHandler {
    let mut handler = MockHandler::new();
    handler.expect_handle().never();
    handler
}

#[tokio::test]
async fn test_authentic_delivery_reaches_handler() {
    let mut handler = MockHandler::new();
    handler
        .expect_handle()
        .withf(|event| {
            event.event_type == "push"
                && event.payload["ref"] == "refs/heads/main"
                && event.request.headers.contains_key(SIGNATURE_HEADER)
        })
        .times(1)
        .returning(|_| Ok(()));

    let gateway = gateway(handler);
    let response = gateway
        .handle(fixtures::signed_request(SECRET, BODY, "push"))
        .await
        .unwrap();

    assert_eq!(response, GatewayResponse::ok());
    assert_eq!(response.body, "");
}

#[tokio::test]
async fn test_delivery_id_is_passed_through() {
    let mut handler = MockHandler::new();
    handler
        .expect_handle()
        .withf(|event| event.delivery_id == "72d3162e-cc78-11e3-81ab-4c9367dc0958")
        .times(1)
        .returning(|_| Ok(()));

    let signature = compute_signature(SECRET, BODY.as_bytes()).unwrap();
    let request = InboundRequest::new()
        .header(EVENT_HEADER, "push")
        .header(DELIVERY_HEADER, "72d3162e-cc78-11e3-81ab-4c9367dc0958")
        .header(SIGNATURE_HEADER, &signature)
        .body(BODY);

    let response = gateway(handler).handle(request).await.unwrap();
    assert!(response.is_success());
}

#[test_case(EVENT_HEADER ; "event header")]
#[test_case(DELIVERY_HEADER ; "delivery header")]
#[test_case(SIGNATURE_HEADER ; "signature header")]
#[tokio::test]
async fn test_missing_header_is_rejected(name: &str) {
    let mut request = fixtures::signed_request(SECRET, BODY, "push");
    request.headers.remove(name);

    let gateway = gateway(rejecting_handler());
    let response = gateway.handle(request).await.unwrap();

    assert_eq!(response.status_code, 400);
    assert!(response.body.contains(name));
    assert_eq!(gateway.metrics().dispatched, 0);
}

#[tokio::test]
async fn test_missing_body_is_rejected() {
    let mut request = fixtures::signed_request(SECRET, BODY, "push");
    request.body = None;

    let response = gateway(rejecting_handler()).handle(request).await.unwrap();
    assert_eq!(response.status_code, 400);
    assert!(response.body.contains("body"));
}

#[test_case(0 ; "first byte")]
#[test_case(17 ; "middle byte")]
#[test_case(BODY.len() - 1 ; "last byte")]
#[tokio::test]
async fn test_body_bit_flip_is_rejected(index: usize) {
    let mut request = fixtures::signed_request(SECRET, BODY, "push");
    let mut bytes = BODY.as_bytes().to_vec();
    bytes[index] ^= 0x01;
    request.body = Some(String::from_utf8(bytes).unwrap());

    let response = gateway(rejecting_handler()).handle(request).await.unwrap();
    assert_eq!(response.status_code, 400);
}

#[tokio::test]
async fn test_signature_bit_flip_is_rejected() {
    let mut signature = compute_signature(SECRET, BODY.as_bytes()).unwrap().into_bytes();
    signature[10] ^= 0x01;
    let signature = String::from_utf8(signature).unwrap();

    let request = fixtures::signed_request(SECRET, BODY, "push")
        .header(SIGNATURE_HEADER, &signature);

    let gateway = gateway(rejecting_handler());
    let response = gateway.handle(request).await.unwrap();

    assert_eq!(response.status_code, 400);
    assert!(!response.body.contains(&signature));
    assert_eq!(gateway.metrics().rejected, 1);
}

#[tokio::test]
async fn test_base64_body_is_verified_on_decoded_bytes() {
    let mut handler = MockHandler::new();
    handler.expect_handle().times(1).returning(|_| Ok(()));

    let signature = compute_signature(SECRET, BODY.as_bytes()).unwrap();
    let request = InboundRequest::new()
        .header(EVENT_HEADER, "push")
        .header(DELIVERY_HEADER, "delivery-1")
        .header(SIGNATURE_HEADER, &signature)
        .body(STANDARD.encode(BODY))
        .base64_encoded(true);

    let response = gateway(handler).handle(request).await.unwrap();
    assert!(response.is_success());
}

#[tokio::test]
async fn test_malformed_payload_is_an_error() {
    let request = fixtures::signed_request(SECRET, "{not json", "push");

    let err = gateway(rejecting_handler()).handle(request).await.unwrap_err();
    assert_eq!(*err.kind(), GitHubErrorKind::PayloadParseError);
}

#[tokio::test]
async fn test_handler_failure_propagates() {
    let mut handler = MockHandler::new();
    handler
        .expect_handle()
        .times(1)
        .returning(|_| Err(anyhow::anyhow!("downstream unavailable")));

    let gateway = gateway(handler);
    let err = gateway
        .handle(fixtures::signed_request(SECRET, BODY, "push"))
        .await
        .unwrap_err();

    assert_eq!(*err.kind(), GitHubErrorKind::HandlerFailed);
    let source = std::error::Error::source(&err).expect("handler error is the source");
    assert!(source.to_string().contains("downstream unavailable"));
    assert_eq!(gateway.metrics().failed, 1);
}
