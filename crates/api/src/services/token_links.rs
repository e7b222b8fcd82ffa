//! Client for the internal token-link route.
//!
//! The reset-email dispatch handler and the Stripe webhook both obtain
//! tokenized URLs the same way: an internal HTTP call to
//! `/internal/token-links` carrying the service key. The response is parsed
//! defensively - a JSON body with a URL-bearing field or a raw-text URL are
//! both accepted, and anything that does not parse as an http/https URL is
//! rejected before it can be mailed out.

use std::time::Duration;

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

use crate::redact::{mask_email, safe_url};

/// Outbound call timeout. The caller owns retry semantics; we never retry.
const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// How much of an upstream error body to keep in logs.
const BODY_PREVIEW_LEN: usize = 300;

/// Errors that can occur when fetching a tokenized link.
#[derive(Debug, Error)]
pub enum LinkError {
    /// HTTP request failed at the network level.
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),

    /// The token-link route returned a non-success status.
    #[error("token-link route returned {status}")]
    Upstream {
        /// HTTP status the route responded with.
        status: u16,
        /// Truncated response body, for logs only.
        preview: String,
    },

    /// The response did not contain a syntactically valid http/https URL.
    #[error("token-link route returned an invalid URL")]
    InvalidUrl {
        /// Truncated response body, for logs only.
        preview: String,
    },
}

/// Client for the internal token-link route.
#[derive(Clone)]
pub struct TokenLinkClient {
    client: Client,
    base_url: String,
    service_key: SecretString,
}

impl std::fmt::Debug for TokenLinkClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenLinkClient")
            .field("base_url", &self.base_url)
            .field("service_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl TokenLinkClient {
    /// Create a new token-link client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(base_url: &str, service_key: SecretString) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(FETCH_TIMEOUT).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            service_key,
        })
    }

    /// Ask the token-link route for a tokenized URL for `email`.
    ///
    /// # Errors
    ///
    /// Returns `LinkError::Request` on network failure, `LinkError::Upstream`
    /// on a non-success status, and `LinkError::InvalidUrl` when the body
    /// does not yield an http/https URL.
    pub async fn fetch_reset_url(&self, email: &str) -> Result<String, LinkError> {
        let response = self
            .client
            .post(format!("{}/internal/token-links", self.base_url))
            .bearer_auth(self.service_key.expose_secret())
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let preview: String = body.chars().take(BODY_PREVIEW_LEN).collect();
            tracing::error!(
                email = %mask_email(email),
                status = status.as_u16(),
                preview = %preview,
                "token-link route returned non-OK"
            );
            return Err(LinkError::Upstream {
                status: status.as_u16(),
                preview,
            });
        }

        let reset_url = extract_reset_url(&body);
        if reset_url.is_empty() || !is_http_url(&reset_url) {
            let preview: String = body.chars().take(BODY_PREVIEW_LEN).collect();
            tracing::error!(
                email = %mask_email(email),
                url_preview = %safe_url(&reset_url),
                body_preview = %preview,
                "token-link route returned an invalid URL"
            );
            return Err(LinkError::InvalidUrl { preview });
        }

        tracing::info!(
            email = %mask_email(email),
            url = %safe_url(&reset_url),
            "Tokenized URL fetched"
        );

        Ok(reset_url)
    }
}

/// Pull a URL out of the token-link response body.
///
/// The route may answer with JSON (`tokenizedUrl`, `resetUrl`, or `url`
/// fields) or with a raw-text URL. JSON of an unexpected shape yields an
/// empty string, which the caller rejects.
#[must_use]
pub fn extract_reset_url(raw: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(parsed) => ["tokenizedUrl", "resetUrl", "url"]
            .iter()
            .find_map(|key| parsed.get(key).and_then(serde_json::Value::as_str))
            .map(str::trim)
            .unwrap_or_default()
            .to_owned(),
        // Not JSON (plain text URL)
        Err(_) => raw.trim().to_owned(),
    }
}

/// Returns true if `value` parses as an absolute http/https URL.
#[must_use]
pub fn is_http_url(value: &str) -> bool {
    Url::parse(value).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
}

/// Append `mode=activation` to a tokenized URL so the set-password page can
/// distinguish first-time activation from a later reset. Backend logic does
/// not read the parameter.
#[must_use]
pub fn with_activation_mode(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed
                .query_pairs_mut()
                .append_pair("mode", "activation");
            parsed.to_string()
        }
        // Unparseable input falls back to a plain string append; check for
        // an existing '?' to avoid malforming the URL.
        Err(_) => {
            if url.contains('?') {
                format!("{url}&mode=activation")
            } else {
                format!("{url}?mode=activation")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_reset_url_json_shapes() {
        // The same URL must come back whichever shape the route answers with.
        let expected = "https://x/y?token=abc";

        assert_eq!(
            extract_reset_url(r#"{"tokenizedUrl": "https://x/y?token=abc"}"#),
            expected
        );
        assert_eq!(
            extract_reset_url(r#"{"resetUrl": "https://x/y?token=abc"}"#),
            expected
        );
        assert_eq!(
            extract_reset_url(r#"{"url": "https://x/y?token=abc"}"#),
            expected
        );
        assert_eq!(extract_reset_url("https://x/y?token=abc"), expected);
    }

    #[test]
    fn test_extract_reset_url_prefers_tokenized_url() {
        let raw = r#"{"tokenizedUrl": "https://a/b", "url": "https://c/d"}"#;
        assert_eq!(extract_reset_url(raw), "https://a/b");
    }

    #[test]
    fn test_extract_reset_url_unexpected_json_shape() {
        assert_eq!(extract_reset_url(r#"{"success": true}"#), "");
        assert_eq!(extract_reset_url(r#"{"tokenizedUrl": 42}"#), "");
    }

    #[test]
    fn test_extract_reset_url_trims_raw_text() {
        assert_eq!(
            extract_reset_url("  https://x/y?token=abc\n"),
            "https://x/y?token=abc"
        );
    }

    #[test]
    fn test_is_http_url() {
        assert!(is_http_url("https://www.stockownerreport.com/set-password"));
        assert!(is_http_url("http://localhost:3000/set-password?token=a"));

        assert!(!is_http_url("ftp://example.com/file"));
        assert!(!is_http_url("javascript:alert(1)"));
        assert!(!is_http_url("/set-password?token=a"));
        assert!(!is_http_url(""));
    }

    #[test]
    fn test_with_activation_mode_appends_to_query() {
        let url = "https://x/y?token=abc";
        assert_eq!(
            with_activation_mode(url),
            "https://x/y?token=abc&mode=activation"
        );
    }

    #[test]
    fn test_with_activation_mode_creates_query() {
        assert_eq!(
            with_activation_mode("https://x/y"),
            "https://x/y?mode=activation"
        );
    }

    #[test]
    fn test_with_activation_mode_fallback_append() {
        assert_eq!(
            with_activation_mode("not-a-url?x=1"),
            "not-a-url?x=1&mode=activation"
        );
        assert_eq!(
            with_activation_mode("not-a-url"),
            "not-a-url?mode=activation"
        );
    }
}
