//! Webhook delivery signatures.
//!
//! GitHub signs each delivery with the hook's secret and sends the digest in
//! `X-Hub-Signature` as `sha1=<lowercase hex>`.

use crate::errors::{GitHubError, GitHubErrorKind, GitHubResult};
use constant_time_eq::constant_time_eq;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Header carrying the delivery signature.
pub const SIGNATURE_HEADER: &str = "X-Hub-Signature";

/// Header carrying the event name.
pub const EVENT_HEADER: &str = "X-GitHub-Event";

/// Header carrying the delivery id.
pub const DELIVERY_HEADER: &str = "X-GitHub-Delivery";

/// Prefix of the signature header value.
pub const SIGNATURE_PREFIX: &str = "sha1=";

/// Computes the `sha1=<hex>` signature for a payload.
pub fn compute_signature(secret: &str, payload: &[u8]) -> GitHubResult<String> {
    let mut mac = HmacSha1::new_from_slice(secret.as_bytes()).map_err(|e| {
        GitHubError::new(
            GitHubErrorKind::Unknown,
            format!("Failed to create HMAC: {}", e),
        )
    })?;

    mac.update(payload);
    let digest = mac.finalize().into_bytes();
    Ok(format!("{}{}", SIGNATURE_PREFIX, hex::encode(digest)))
}

/// Webhook signature verification.
pub struct WebhookVerifier<'a> {
    secret: &'a SecretString,
}

impl<'a> WebhookVerifier<'a> {
    /// Creates a verifier over the shared secret.
    pub fn new(secret: &'a SecretString) -> Self {
        Self { secret }
    }

    /// Returns true if `signature` matches the payload.
    ///
    /// The whole header value is compared in constant time, so a malformed
    /// prefix is just another mismatch.
    pub fn verify(&self, signature: &str, payload: &[u8]) -> GitHubResult<bool> {
        let expected = compute_signature(self.secret.expose_secret(), payload)?;
        Ok(constant_time_eq(expected.as_bytes(), signature.as_bytes()))
    }
}
