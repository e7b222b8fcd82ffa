//! User repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use owner_report_core::BillingInterval;

use super::RepositoryError;

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert or refresh a user row after a successful payment.
    ///
    /// Keyed by email: a first payment creates the row, a renewal updates
    /// phone, interval, and the payment timestamp in place. The password
    /// hash is never touched here; it is attached later when the user
    /// redeems their activation link.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn upsert_payment(
        &self,
        email: &str,
        phone: Option<&str>,
        interval: Option<BillingInterval>,
        last_payment_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO app_user (email, phone, subscription_interval, last_payment_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO UPDATE
                SET phone = EXCLUDED.phone,
                    subscription_interval = EXCLUDED.subscription_interval,
                    last_payment_at = EXCLUDED.last_payment_at,
                    updated_at = NOW()
            ",
        )
        .bind(email)
        .bind(phone)
        .bind(interval)
        .bind(last_payment_at)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
