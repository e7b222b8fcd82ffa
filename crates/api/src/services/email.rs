//! Email service for sending reset and activation messages.
//!
//! Uses the Postmark HTTP API for delivery with Askama HTML templates.

use std::time::Duration;

use askama::Template;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use owner_report_core::BillingInterval;

use crate::config::PostmarkConfig;
use crate::redact::mask_email;

/// Postmark API base URL.
const POSTMARK_API_BASE: &str = "https://api.postmarkapp.com";

/// Outbound call timeout. The caller owns retry semantics; we never retry.
const SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// How much of a provider error body to keep in logs.
const BODY_PREVIEW_LEN: usize = 300;

/// HTML template for the password reset email.
#[derive(Template)]
#[template(path = "email/reset_link.html")]
struct ResetLinkEmailHtml<'a> {
    reset_url: &'a str,
}

/// Plain text template for the password reset email.
#[derive(Template)]
#[template(path = "email/reset_link.txt")]
struct ResetLinkEmailText<'a> {
    reset_url: &'a str,
}

/// HTML template for the subscription activation email.
#[derive(Template)]
#[template(path = "email/activation.html")]
struct ActivationEmailHtml<'a> {
    activation_url: &'a str,
    plan: &'a str,
}

/// Plain text template for the subscription activation email.
#[derive(Template)]
#[template(path = "email/activation.txt")]
struct ActivationEmailText<'a> {
    activation_url: &'a str,
    plan: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// HTTP request failed at the network level.
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),

    /// Postmark returned a non-success status.
    #[error("Postmark error: {status} - {preview}")]
    Api {
        /// HTTP status Postmark responded with.
        status: u16,
        /// Truncated response body, for logs only.
        preview: String,
    },
}

/// Email service for sending transactional emails via Postmark.
#[derive(Clone)]
pub struct EmailService {
    client: Client,
    server_token: SecretString,
    from_address: String,
}

impl std::fmt::Debug for EmailService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailService")
            .field("server_token", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish_non_exhaustive()
    }
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &PostmarkConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(SEND_TIMEOUT).build()?;

        Ok(Self {
            client,
            server_token: config.server_token.clone(),
            from_address: config.from_address.clone(),
        })
    }

    /// Send the password setup/reset email with the tokenized link.
    ///
    /// # Errors
    ///
    /// Returns error if the email fails to send or a template fails to render.
    pub async fn send_reset_link(&self, to: &str, reset_url: &str) -> Result<(), EmailError> {
        let html = ResetLinkEmailHtml { reset_url }.render()?;
        let text = ResetLinkEmailText { reset_url }.render()?;

        self.send(
            to,
            "Action required: Set your Stock Owner Report password",
            &html,
            &text,
        )
        .await
    }

    /// Send the first-time activation email after a successful payment.
    ///
    /// The plan wording falls back to "selected" when no billing interval
    /// could be derived from the invoice.
    ///
    /// # Errors
    ///
    /// Returns error if the email fails to send or a template fails to render.
    pub async fn send_activation(
        &self,
        to: &str,
        activation_url: &str,
        interval: Option<BillingInterval>,
    ) -> Result<(), EmailError> {
        let plan = interval.map_or("selected", BillingInterval::as_str);

        let html = ActivationEmailHtml {
            activation_url,
            plan,
        }
        .render()?;
        let text = ActivationEmailText {
            activation_url,
            plan,
        }
        .render()?;

        self.send(
            to,
            "Activate your subscription — The Stock Owner Report",
            &html,
            &text,
        )
        .await
    }

    /// Send a multipart email through Postmark.
    async fn send(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
        text_body: &str,
    ) -> Result<(), EmailError> {
        let body = serde_json::json!({
            "From": self.from_address,
            "To": to,
            "Subject": subject,
            "HtmlBody": html_body,
            "TextBody": text_body,
            "MessageStream": "outbound",
        });

        let response = self
            .client
            .post(format!("{POSTMARK_API_BASE}/email"))
            .header("Accept", "application/json")
            .header("X-Postmark-Server-Token", self.server_token.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let preview: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(BODY_PREVIEW_LEN)
                .collect();

            tracing::error!(
                to = %mask_email(to),
                status = status.as_u16(),
                preview = %preview,
                "Postmark returned non-OK"
            );

            return Err(EmailError::Api {
                status: status.as_u16(),
                preview,
            });
        }

        tracing::info!(to = %mask_email(to), subject = %subject, "Email sent");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_templates_embed_url() {
        let url = "https://www.stockownerreport.com/set-password?token=abc";
        let html = ResetLinkEmailHtml { reset_url: url }.render().unwrap();
        let text = ResetLinkEmailText { reset_url: url }.render().unwrap();

        assert!(html.contains(url));
        assert!(text.contains(url));
    }

    #[test]
    fn test_activation_templates_embed_url_and_plan() {
        let url = "https://www.stockownerreport.com/set-password?token=abc&mode=activation";
        let html = ActivationEmailHtml {
            activation_url: url,
            plan: "month",
        }
        .render()
        .unwrap();
        let text = ActivationEmailText {
            activation_url: url,
            plan: "month",
        }
        .render()
        .unwrap();

        assert!(html.contains("month"));
        assert!(text.contains(url));
    }
}
