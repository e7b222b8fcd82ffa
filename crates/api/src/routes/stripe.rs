//! Stripe webhook handler.
//!
//! Responds with plain text, matching what the provider expects: `"ok"` on
//! acknowledgement, `"Webhook Error: ..."` with 400 when the delivery must
//! be retried or rejected. A 400 is the provider's retry signal, so it is
//! reserved for failures a retry can fix (and for bad signatures); data
//! problems inside an authentic event are logged and acknowledged.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use thiserror::Error;
use tracing::instrument;

use crate::db::{RepositoryError, UserRepository};
use crate::redact::mask_email;
use crate::services::email::EmailError;
use crate::services::token_links::{self, LinkError};
use crate::state::AppState;
use crate::stripe::{Event, classify_interval};

/// The only event type that triggers business logic.
const INVOICE_PAYMENT_SUCCEEDED: &str = "invoice.payment_succeeded";

/// Failures while producing the activation email. Never fatal to the
/// webhook response: the user row is already durable and the provider
/// must not redeliver just to retry an email.
#[derive(Debug, Error)]
enum ActivationError {
    #[error("link generation failed: {0}")]
    Link(#[from] LinkError),
    #[error("email send failed: {0}")]
    Email(#[from] EmailError),
}

/// Handle a signed Stripe event delivery.
///
/// `POST /api/stripe/webhook` with the raw event JSON and a
/// `Stripe-Signature` header.
#[instrument(skip(state, headers, body))]
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(signature) = headers.get("stripe-signature").and_then(|v| v.to_str().ok()) else {
        return (StatusCode::BAD_REQUEST, "Missing stripe-signature header").into_response();
    };

    // Fails closed: nothing is processed unless the signature checks out.
    if let Err(e) = state.webhook_verifier().verify(&body, signature) {
        tracing::error!(error = %e, "Webhook signature verification failed");
        return (StatusCode::BAD_REQUEST, format!("Webhook Error: {e}")).into_response();
    }

    let event: Event = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            tracing::error!(error = %e, "Webhook payload is not valid JSON");
            return (
                StatusCode::BAD_REQUEST,
                "Webhook Error: malformed event payload".to_string(),
            )
                .into_response();
        }
    };

    match process_event(&state, &event).await {
        Ok(()) => (StatusCode::OK, "ok").into_response(),
        Err(e) => {
            tracing::error!(
                event_id = %event.id,
                event_type = %event.event_type,
                error = %e,
                "Webhook processing failed"
            );
            // Short generic text only; provider/database detail stays in logs.
            (
                StatusCode::BAD_REQUEST,
                "Webhook Error: could not persist user record".to_string(),
            )
                .into_response()
        }
    }
}

/// Run the business logic for one verified event.
///
/// Errors out only on upsert failure, which the provider should retry.
async fn process_event(state: &AppState, event: &Event) -> Result<(), RepositoryError> {
    // Only act on successful invoice payments
    if event.event_type != INVOICE_PAYMENT_SUCCEEDED {
        tracing::debug!(event_type = %event.event_type, "Ignoring event type");
        return Ok(());
    }

    let invoice = &event.data.object;

    let email = invoice
        .customer_email
        .as_deref()
        .unwrap_or("")
        .trim()
        .to_lowercase();

    if email.is_empty() {
        // Unrecoverable data problem: acknowledge so the provider does not
        // retry indefinitely.
        tracing::error!(
            event_id = %event.id,
            invoice = ?invoice.id,
            "No customer email on invoice"
        );
        return Ok(());
    }

    let phone = invoice
        .customer_phone
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty());

    let description = invoice.first_line_description();
    let interval = description.and_then(classify_interval);

    if interval.is_none() {
        // Best-effort derivation: proceed with a NULL interval.
        tracing::error!(
            event_id = %event.id,
            email = %mask_email(&email),
            description = ?description,
            invoice = ?invoice.id,
            subscription = ?invoice.subscription,
            "Could not derive billing interval from line description"
        );
    }

    UserRepository::new(state.pool())
        .upsert_payment(&email, phone, interval, Utc::now())
        .await?;

    tracing::info!(
        email = %mask_email(&email),
        interval = ?interval,
        "User record upserted from payment"
    );

    // Send activation email (non-fatal if it fails)
    if let Err(e) = send_activation_email(state, &email, interval).await {
        tracing::error!(
            event_id = %event.id,
            email = %mask_email(&email),
            error = %e,
            "Activation email failed"
        );
    }

    Ok(())
}

/// Fetch a tokenized link, tag it as an activation, and mail it.
async fn send_activation_email(
    state: &AppState,
    email: &str,
    interval: Option<owner_report_core::BillingInterval>,
) -> Result<(), ActivationError> {
    let url = state.token_links().fetch_reset_url(email).await?;
    let activation_url = token_links::with_activation_mode(&url);

    state
        .email()
        .send_activation(email, &activation_url, interval)
        .await?;

    Ok(())
}
