//! Observability module providing logging and delivery metrics.

use crate::errors::GitHubError;
use reqwest::header::HeaderMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Counters for inbound webhook deliveries.
#[derive(Debug, Default)]
pub struct DeliveryMetrics {
    /// Deliveries received by the gateway.
    received: AtomicU64,
    /// Deliveries rejected with a 400.
    rejected: AtomicU64,
    /// Deliveries handed to the handler.
    dispatched: AtomicU64,
    /// Deliveries that failed after verification.
    failed: AtomicU64,
}

impl DeliveryMetrics {
    /// Creates a new metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a received delivery.
    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a rejected delivery.
    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a dispatched delivery.
    pub fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a failed delivery.
    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Gets a snapshot of all counters.
    pub fn snapshot(&self) -> DeliveryMetricsSnapshot {
        DeliveryMetricsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Delivery counters at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryMetricsSnapshot {
    /// Deliveries received.
    pub received: u64,
    /// Deliveries rejected with a 400.
    pub rejected: u64,
    /// Deliveries handed to the handler.
    pub dispatched: u64,
    /// Deliveries that failed after verification.
    pub failed: u64,
}

/// Tracing hooks for API calls, resource operations and deliveries.
pub struct TracingHooks;

impl TracingHooks {
    /// Logs the start of an API request.
    #[instrument(skip(method, url))]
    pub fn on_request_start(method: &str, url: &str) {
        debug!(method = %method, url = %url, "GitHub API request started");
    }

    /// Logs the completion of an API request.
    #[instrument(skip(method, url, status, duration))]
    pub fn on_request_complete(method: &str, url: &str, status: u16, duration: Duration) {
        info!(
            method = %method,
            url = %url,
            status = status,
            duration_ms = duration.as_millis() as u64,
            "GitHub API request completed"
        );
    }

    /// Logs a transport error.
    #[instrument(skip(method, url, error))]
    pub fn on_request_error(method: &str, url: &str, error: &str) {
        error!(method = %method, url = %url, error = %error, "GitHub API request failed");
    }

    /// Logs a completed resource operation.
    pub fn on_resource_operation(kind: &str, operation: &str, id: &str) {
        info!(kind = %kind, operation = %operation, id = %id, "Resource operation completed");
    }

    /// Logs a failed resource operation.
    pub fn on_resource_error(kind: &str, operation: &str, error: &GitHubError) {
        error!(
            kind = %kind,
            operation = %operation,
            error_kind = %error.kind(),
            status = error.status_code(),
            error = %error,
            "Resource operation failed"
        );
    }

    /// Logs the outcome of signature verification.
    #[instrument(skip(event_type, success))]
    pub fn on_webhook_verified(event_type: &str, success: bool) {
        if success {
            debug!(event_type = %event_type, "Webhook signature verified successfully");
        } else {
            warn!(event_type = %event_type, "Webhook signature verification failed");
        }
    }

    /// Logs a delivery answered with a 400, with its headers redacted.
    pub fn on_delivery_rejected(reason: &str, headers: &HeaderMap) {
        warn!(
            reason = %reason,
            headers = ?redacted_headers(headers),
            "Webhook delivery rejected"
        );
    }
}

/// Headers whose values never reach the logs.
pub const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "x-github-token",
    "x-hub-signature",
    "x-hub-signature-256",
    "cookie",
    "set-cookie",
];

/// Redacts sensitive values in headers.
pub fn redact_header(name: &str, value: &str) -> String {
    if SENSITIVE_HEADERS.contains(&name.to_lowercase().as_str()) {
        "[REDACTED]".to_string()
    } else {
        value.to_string()
    }
}

/// Header names and values, ready for logging. Sensitive values are
/// redacted; values that are not text are shown as `[BINARY]`.
pub fn redacted_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let value = value.to_str().unwrap_or("[BINARY]");
            (name.to_string(), redact_header(name.as_str(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_metrics_snapshot() {
        let metrics = DeliveryMetrics::new();

        metrics.record_received();
        metrics.record_received();
        metrics.record_rejected();
        metrics.record_dispatched();

        assert_eq!(
            metrics.snapshot(),
            DeliveryMetricsSnapshot {
                received: 2,
                rejected: 1,
                dispatched: 1,
                failed: 0,
            }
        );
    }

    #[test]
    fn test_redact_header() {
        assert_eq!(redact_header("Authorization", "Bearer token"), "[REDACTED]");
        assert_eq!(redact_header("X-Hub-Signature", "sha1=abc"), "[REDACTED]");
        assert_eq!(redact_header("X-GitHub-Event", "push"), "push");
    }

    #[test]
    fn test_redacted_headers_hide_signature() {
        let mut headers = HeaderMap::new();
        headers.insert("x-github-event", "push".parse().unwrap());
        headers.insert("x-hub-signature", "sha1=0123abcd".parse().unwrap());

        let mut logged = redacted_headers(&headers);
        logged.sort();

        assert_eq!(
            logged,
            vec![
                ("x-github-event".to_string(), "push".to_string()),
                ("x-hub-signature".to_string(), "[REDACTED]".to_string()),
            ]
        );
    }
}
