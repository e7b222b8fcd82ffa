//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::services::{EmailService, TokenLinkClient};
use crate::stripe::WebhookVerifier;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the database pool, configuration, and outbound
/// clients.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    email: EmailService,
    token_links: TokenLinkClient,
    webhook_verifier: WebhookVerifier,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if an outbound HTTP client fails to build.
    pub fn new(config: ApiConfig, pool: PgPool) -> Result<Self, reqwest::Error> {
        let email = EmailService::new(&config.postmark)?;
        let token_links =
            TokenLinkClient::new(&config.functions_base_url, config.service_key.clone())?;
        let webhook_verifier = WebhookVerifier::new(config.stripe.webhook_secret.clone());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                email,
                token_links,
                webhook_verifier,
            }),
        })
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the email service.
    #[must_use]
    pub fn email(&self) -> &EmailService {
        &self.inner.email
    }

    /// Get a reference to the token-link client.
    #[must_use]
    pub fn token_links(&self) -> &TokenLinkClient {
        &self.inner.token_links
    }

    /// Get a reference to the webhook signature verifier.
    #[must_use]
    pub fn webhook_verifier(&self) -> &WebhookVerifier {
        &self.inner.webhook_verifier
    }
}
