//! Redaction helpers for log output.
//!
//! Reset links are bearer credentials and emails are PII; log lines keep
//! enough of each to correlate but never the full value.

use url::Url;

/// Mask an email address for logging (`ab***@domain`).
#[must_use]
pub fn mask_email(email: &str) -> String {
    let Some(at) = email.find('@') else {
        return "***".to_owned();
    };
    if at <= 1 {
        return "***".to_owned();
    }

    let prefix: String = email.chars().take(2).collect();
    let domain = email.get(at..).unwrap_or("");
    format!("{prefix}***{domain}")
}

/// Reduce a URL to origin + path for logging, dropping the query string
/// (which carries the token).
#[must_use]
pub fn safe_url(url: &str) -> String {
    Url::parse(url).map_or_else(
        |_| "(invalid-url)".to_owned(),
        |u| format!("{}{}", u.origin().ascii_serialization(), u.path()),
    )
}
