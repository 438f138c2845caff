//! Inbound webhook delivery gateway.
//!
//! [`WebhookGateway::handle`] takes one delivery as handed over by the HTTP
//! substrate and walks it through
//! `Received → HeadersChecked → SignatureVerified → PayloadParsed → Dispatched → Responded`.
//! Deliveries missing an input or failing signature verification are answered
//! with a `400` and never reach the handler. Failures after verification are
//! returned as errors so the substrate can answer with a `5xx`.

use crate::errors::{GitHubError, GitHubErrorKind, GitHubResult};
use crate::observability::{DeliveryMetrics, DeliveryMetricsSnapshot, TracingHooks};
use crate::secret::SecretHandle;
use crate::webhooks::{WebhookVerifier, DELIVERY_HEADER, EVENT_HEADER, SIGNATURE_HEADER};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::debug;

/// One inbound HTTP request as delivered by the substrate.
#[derive(Debug, Clone, Default)]
pub struct InboundRequest {
    /// Request headers.
    pub headers: HeaderMap,
    /// Raw body, possibly base64 encoded.
    pub body: Option<String>,
    /// Whether `body` is base64 encoded.
    pub is_base64_encoded: bool,
}

impl InboundRequest {
    /// Creates an empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header, failing with `InvalidParameter` when the name or value
    /// is not valid HTTP.
    pub fn try_header(mut self, name: &str, value: &str) -> GitHubResult<Self> {
        let (name, value) = parse_header(name, value)?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Adds a header.
    ///
    /// A name or value that is not valid HTTP is dropped, so the delivery is
    /// later rejected as missing that header. Use [`try_header`](Self::try_header)
    /// to surface the problem instead.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match parse_header(name, value) {
            Ok((name, value)) => {
                self.headers.insert(name, value);
            }
            Err(e) => debug!(error = %e, "Dropping invalid header"),
        }
        self
    }

    /// Sets the body.
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Marks the body as base64 encoded.
    pub fn base64_encoded(mut self, encoded: bool) -> Self {
        self.is_base64_encoded = encoded;
        self
    }

    fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
    }
}

fn parse_header(name: &str, value: &str) -> GitHubResult<(HeaderName, HeaderValue)> {
    let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
        GitHubError::new(
            GitHubErrorKind::InvalidParameter,
            format!("{:?} is not a valid header name", name),
        )
        .with_cause(e)
    })?;
    let header_value = HeaderValue::from_str(value).map_err(|e| {
        GitHubError::new(
            GitHubErrorKind::InvalidParameter,
            format!("value of header {} is not valid HTTP", header_name),
        )
        .with_cause(e)
    })?;
    Ok((header_name, header_value))
}

/// Result handed back to the substrate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayResponse {
    /// HTTP status code.
    pub status_code: u16,
    /// Response body.
    pub body: String,
}

impl GatewayResponse {
    /// `200` with an empty body.
    pub fn ok() -> Self {
        Self {
            status_code: 200,
            body: String::new(),
        }
    }

    /// `400` with a diagnostic body.
    pub fn bad_request(body: impl Into<String>) -> Self {
        Self {
            status_code: 400,
            body: body.into(),
        }
    }

    /// Returns true for `200`.
    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }
}

/// An authenticated delivery.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    /// Value of `X-GitHub-Event`.
    pub event_type: String,
    /// Value of `X-GitHub-Delivery`.
    pub delivery_id: String,
    /// Parsed JSON body.
    pub payload: serde_json::Value,
    /// The request as received.
    pub request: InboundRequest,
}

/// Application code invoked for every authenticated delivery.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handles one event. An error fails the delivery.
    async fn handle(&self, event: WebhookEvent) -> anyhow::Result<()>;
}

#[async_trait]
impl<H: EventHandler + ?Sized> EventHandler for Arc<H> {
    async fn handle(&self, event: WebhookEvent) -> anyhow::Result<()> {
        (**self).handle(event).await
    }
}

/// Required inputs of a delivery, borrowed from the request.
struct InboundDelivery<'r> {
    event_type: &'r str,
    delivery_id: &'r str,
    signature: &'r str,
    body: &'r str,
}

/// A delivery that passed both gates.
struct VerifiedDelivery {
    event_type: String,
    delivery_id: String,
    payload: serde_json::Value,
}

/// Reasons a delivery is answered with `400`.
#[derive(Debug)]
enum Rejection {
    MissingInputs(Vec<&'static str>),
    UndecodableBody,
    SignatureMismatch,
}

impl Rejection {
    fn reason(&self) -> String {
        match self {
            Self::MissingInputs(missing) => {
                format!("Missing required inputs: {}", missing.join(", "))
            }
            Self::UndecodableBody => "Request body is not valid base64".to_string(),
            Self::SignatureMismatch => {
                format!("{} does not match the request body", SIGNATURE_HEADER)
            }
        }
    }
}

impl<'r> InboundDelivery<'r> {
    fn extract(request: &'r InboundRequest) -> Result<Self, Rejection> {
        let event_type = request.header_value(EVENT_HEADER);
        let delivery_id = request.header_value(DELIVERY_HEADER);
        let signature = request.header_value(SIGNATURE_HEADER);
        let body = request.body.as_deref().filter(|b| !b.is_empty());

        match (event_type, delivery_id, signature, body) {
            (Some(event_type), Some(delivery_id), Some(signature), Some(body)) => Ok(Self {
                event_type,
                delivery_id,
                signature,
                body,
            }),
            _ => {
                let missing = [
                    (EVENT_HEADER, event_type.is_none()),
                    (DELIVERY_HEADER, delivery_id.is_none()),
                    (SIGNATURE_HEADER, signature.is_none()),
                    ("body", body.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, absent)| absent.then_some(name))
                .collect();
                Err(Rejection::MissingInputs(missing))
            }
        }
    }

    fn raw_body(&self, is_base64_encoded: bool) -> Result<Cow<'r, [u8]>, Rejection> {
        if is_base64_encoded {
            STANDARD
                .decode(self.body)
                .map(Cow::Owned)
                .map_err(|_| Rejection::UndecodableBody)
        } else {
            Ok(Cow::Borrowed(self.body.as_bytes()))
        }
    }
}

/// Authenticates deliveries and dispatches them to an [`EventHandler`].
pub struct WebhookGateway<H> {
    secret: SecretHandle,
    handler: H,
    metrics: DeliveryMetrics,
}

impl<H: EventHandler> WebhookGateway<H> {
    /// Binds a gateway to the shared secret and a handler.
    pub fn new(secret: SecretHandle, handler: H) -> Self {
        Self {
            secret,
            handler,
            metrics: DeliveryMetrics::new(),
        }
    }

    /// Gets the secret handle deliveries are verified against.
    pub fn secret(&self) -> &SecretHandle {
        &self.secret
    }

    /// Gets the delivery counters.
    pub fn metrics(&self) -> DeliveryMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Processes one delivery.
    ///
    /// Returns `Ok` with a `400` for unauthenticated deliveries and a `200`
    /// once the handler has completed. Returns `Err` if the secret has not
    /// been generated, the verified body is not JSON, or the handler fails.
    pub async fn handle(&self, request: InboundRequest) -> GitHubResult<GatewayResponse> {
        self.metrics.record_received();
        debug!(stage = "received", "Webhook delivery received");

        let verified = match self.authenticate(&request)? {
            Ok(verified) => verified,
            Err(rejection) => return Ok(self.reject(&request, rejection)),
        };

        let delivery_id = verified.delivery_id.clone();
        let event = WebhookEvent {
            event_type: verified.event_type,
            delivery_id: verified.delivery_id,
            payload: verified.payload,
            request,
        };

        self.metrics.record_dispatched();
        debug!(stage = "dispatched", delivery_id = %delivery_id, "Webhook event dispatched");
        self.handler.handle(event).await.map_err(|e| {
            self.metrics.record_failed();
            GitHubError::new(
                GitHubErrorKind::HandlerFailed,
                format!("Event handler failed for delivery {}", delivery_id),
            )
            .with_boxed_cause(e.into())
        })?;

        debug!(stage = "responded", delivery_id = %delivery_id, "Webhook delivery handled");
        Ok(GatewayResponse::ok())
    }

    /// Runs the header and signature gates, then parses the payload.
    fn authenticate(
        &self,
        request: &InboundRequest,
    ) -> GitHubResult<Result<VerifiedDelivery, Rejection>> {
        let delivery = match InboundDelivery::extract(request) {
            Ok(delivery) => delivery,
            Err(rejection) => return Ok(Err(rejection)),
        };
        debug!(
            stage = "headers_checked",
            event_type = delivery.event_type,
            delivery_id = delivery.delivery_id,
            "Webhook delivery headers checked"
        );

        let raw = match delivery.raw_body(request.is_base64_encoded) {
            Ok(raw) => raw,
            Err(rejection) => return Ok(Err(rejection)),
        };

        let secret = self.secret.get().map_err(|e| {
            self.metrics.record_failed();
            e
        })?;
        let verified = WebhookVerifier::new(secret).verify(delivery.signature, &raw)?;
        TracingHooks::on_webhook_verified(delivery.event_type, verified);
        if !verified {
            return Ok(Err(Rejection::SignatureMismatch));
        }
        debug!(
            stage = "signature_verified",
            delivery_id = delivery.delivery_id,
            "Webhook signature verified"
        );

        let payload = serde_json::from_slice(&raw).map_err(|e| {
            self.metrics.record_failed();
            GitHubError::new(
                GitHubErrorKind::PayloadParseError,
                format!("Delivery {} carries a malformed payload", delivery.delivery_id),
            )
            .with_cause(e)
        })?;
        debug!(
            stage = "payload_parsed",
            delivery_id = delivery.delivery_id,
            "Webhook payload parsed"
        );

        Ok(Ok(VerifiedDelivery {
            event_type: delivery.event_type.to_string(),
            delivery_id: delivery.delivery_id.to_string(),
            payload,
        }))
    }

    fn reject(&self, request: &InboundRequest, rejection: Rejection) -> GatewayResponse {
        let reason = rejection.reason();
        self.metrics.record_rejected();
        TracingHooks::on_delivery_rejected(&reason, &request.headers);
        GatewayResponse::bad_request(reason)
    }
}
