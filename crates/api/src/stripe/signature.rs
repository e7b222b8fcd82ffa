//! Stripe webhook signature verification.
//!
//! Stripe signs each delivery with a `Stripe-Signature` header of the form
//! `t=<unix-ts>,v1=<hex hmac>[,v1=...]`. The signed payload is
//! `"{t}.{raw body}"` under HMAC-SHA256 with the endpoint's signing secret.

use chrono::Utc;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;

/// Maximum accepted clock skew between Stripe and us (replay protection).
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Errors that can occur when verifying a webhook signature.
#[derive(Debug, Error)]
pub enum SignatureError {
    /// The header has no `t=` element.
    #[error("missing timestamp in signature header")]
    MissingTimestamp,

    /// The header has no `v1=` element.
    #[error("missing v1 signature in signature header")]
    MissingSignature,

    /// The `t=` element is not a unix timestamp.
    #[error("invalid timestamp in signature header")]
    InvalidTimestamp,

    /// The timestamp is outside the accepted tolerance.
    #[error("request timestamp too old")]
    StaleTimestamp,

    /// The signing key could not be loaded.
    #[error("invalid signing key")]
    InvalidKey,

    /// No `v1=` element matched the computed signature.
    #[error("signature mismatch")]
    Mismatch,
}

/// Verifies Stripe webhook deliveries against the shared signing secret.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: SecretString,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl WebhookVerifier {
    /// Create a verifier from the endpoint's signing secret.
    #[must_use]
    pub const fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Verify `header` against the raw request `payload`.
    ///
    /// # Errors
    ///
    /// Returns a `SignatureError` describing the first check that failed.
    /// Any error means the delivery must be rejected with HTTP 400.
    pub fn verify(&self, payload: &[u8], header: &str) -> Result<(), SignatureError> {
        self.verify_at(payload, header, Utc::now().timestamp())
    }

    fn verify_at(&self, payload: &[u8], header: &str, now: i64) -> Result<(), SignatureError> {
        let mut timestamp: Option<&str> = None;
        let mut signatures: Vec<&str> = Vec::new();

        for element in header.split(',') {
            match element.trim().split_once('=') {
                Some(("t", value)) => timestamp = Some(value),
                Some(("v1", value)) => signatures.push(value),
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(SignatureError::MissingTimestamp)?;
        if signatures.is_empty() {
            return Err(SignatureError::MissingSignature);
        }

        let ts: i64 = timestamp
            .parse()
            .map_err(|_| SignatureError::InvalidTimestamp)?;

        if (now - ts).abs() > SIGNATURE_TOLERANCE_SECS {
            return Err(SignatureError::StaleTimestamp);
        }

        // Compute the expected signature over "{t}.{payload}"
        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| SignatureError::InvalidKey)?;

        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);

        let expected = hex::encode(mac.finalize().into_bytes());

        if signatures
            .iter()
            .any(|candidate| constant_time_compare(candidate, &expected))
        {
            Ok(())
        } else {
            Err(SignatureError::Mismatch)
        }
    }
}

/// Compare strings without early exit to avoid timing side channels.
pub(crate) fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test123secret456";

    fn sign(payload: &[u8], secret: &str, timestamp: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    fn verifier() -> WebhookVerifier {
        WebhookVerifier::new(SecretString::from(SECRET))
    }

    #[test]
    fn test_valid_signature_passes() {
        let payload = br#"{"type":"invoice.payment_succeeded"}"#;
        let timestamp = Utc::now().timestamp().to_string();
        let header = format!("t={},v1={}", timestamp, sign(payload, SECRET, &timestamp));

        assert!(verifier().verify(payload, &header).is_ok());
    }

    #[test]
    fn test_wrong_secret_fails() {
        let payload = br#"{"type":"invoice.payment_succeeded"}"#;
        let timestamp = Utc::now().timestamp().to_string();
        let header = format!(
            "t={},v1={}",
            timestamp,
            sign(payload, "whsec_other_secret", &timestamp)
        );

        assert!(matches!(
            verifier().verify(payload, &header),
            Err(SignatureError::Mismatch)
        ));
    }

    #[test]
    fn test_tampered_payload_fails() {
        let payload = br#"{"amount":100}"#;
        let timestamp = Utc::now().timestamp().to_string();
        let header = format!("t={},v1={}", timestamp, sign(payload, SECRET, &timestamp));

        assert!(matches!(
            verifier().verify(br#"{"amount":999}"#, &header),
            Err(SignatureError::Mismatch)
        ));
    }

    #[test]
    fn test_stale_timestamp_fails() {
        let payload = b"{}";
        let timestamp = "1000000";
        let header = format!("t={timestamp},v1={}", sign(payload, SECRET, timestamp));

        let result = verifier().verify_at(payload, &header, 1_000_000 + 301);
        assert!(matches!(result, Err(SignatureError::StaleTimestamp)));
    }

    #[test]
    fn test_timestamp_within_tolerance_passes() {
        let payload = b"{}";
        let timestamp = "1000000";
        let header = format!("t={timestamp},v1={}", sign(payload, SECRET, timestamp));

        assert!(verifier().verify_at(payload, &header, 1_000_000 + 299).is_ok());
    }

    #[test]
    fn test_missing_timestamp_fails() {
        let result = verifier().verify(b"{}", "v1=deadbeef");
        assert!(matches!(result, Err(SignatureError::MissingTimestamp)));
    }

    #[test]
    fn test_missing_signature_fails() {
        let timestamp = Utc::now().timestamp().to_string();
        let result = verifier().verify(b"{}", &format!("t={timestamp}"));
        assert!(matches!(result, Err(SignatureError::MissingSignature)));
    }

    #[test]
    fn test_garbled_timestamp_fails() {
        let result = verifier().verify(b"{}", "t=not-a-number,v1=deadbeef");
        assert!(matches!(result, Err(SignatureError::InvalidTimestamp)));
    }

    #[test]
    fn test_any_matching_v1_passes() {
        // Stripe sends multiple v1 elements during secret rollover.
        let payload = b"{}";
        let timestamp = Utc::now().timestamp().to_string();
        let good = sign(payload, SECRET, &timestamp);
        let header = format!("t={timestamp},v1=deadbeef,v1={good}");

        assert!(verifier().verify(payload, &header).is_ok());
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
        assert!(!constant_time_compare("", "a"));
        assert!(constant_time_compare("", ""));
    }
}
