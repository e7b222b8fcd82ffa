//! Reset-token repository for database operations.
//!
//! Manages the one-row-per-email token table behind the activation and
//! password-reset flows. Tokens are bearer credentials: the row is keyed by
//! email for issuance (each new request overwrites the previous token) and
//! looked up by token value for redemption.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use owner_report_core::Email;

use super::RepositoryError;

/// Outcome of a redemption attempt.
#[derive(Debug)]
pub enum Redemption {
    /// No row matched the token. Either it never existed or a newer token
    /// has already overwritten it.
    NotFound,
    /// The row existed but had expired; it has been deleted.
    Expired,
    /// The token was valid: the password hash is stored and the token row
    /// is gone.
    Applied {
        /// Email the consumed token belonged to.
        email: Email,
    },
}

/// Repository for reset-token database operations.
pub struct ResetTokenRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ResetTokenRepository<'a> {
    /// Create a new reset-token repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a token for `email`, unconditionally replacing any existing
    /// token for that address. The previous token, redeemed or not, stops
    /// working the moment this commits.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn upsert(
        &self,
        email: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO password_reset_token (email, token, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO UPDATE
                SET token = EXCLUDED.token,
                    expires_at = EXCLUDED.expires_at,
                    created_at = NOW()
            ",
        )
        .bind(email)
        .bind(token)
        .bind(expires_at)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Redeem `token`, storing `password_hash` on the matching user.
    ///
    /// The valid-to-consumed transition must be a single conditional
    /// statement: two near-simultaneous redemptions of the same token must
    /// not both reach the user update. The whole attempt runs in one
    /// transaction whose first statement is a `DELETE ... RETURNING`, so a
    /// concurrent loser blocks on the row lock and then observes zero rows.
    ///
    /// - No row: [`Redemption::NotFound`].
    /// - Expired row: the delete is committed (cleanup) and the result is
    ///   [`Redemption::Expired`].
    /// - Live row: the user's password hash is updated and the delete
    ///   commits with it. If the update fails the transaction rolls back,
    ///   so the token survives and the same link can be retried.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a statement fails, and
    /// `RepositoryError::DataCorruption` if the stored email is invalid.
    pub async fn redeem(
        &self,
        token: &str,
        password_hash: &str,
    ) -> Result<Redemption, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row: Option<(String, DateTime<Utc>)> = sqlx::query_as(
            r"
            DELETE FROM password_reset_token
            WHERE token = $1
            RETURNING email, expires_at
            ",
        )
        .bind(token)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((email, expires_at)) = row else {
            tx.rollback().await?;
            return Ok(Redemption::NotFound);
        };

        if expires_at < Utc::now() {
            // Keep the cleanup delete.
            tx.commit().await?;
            return Ok(Redemption::Expired);
        }

        sqlx::query(
            r"
            UPDATE app_user
            SET password_hash = $1, updated_at = NOW()
            WHERE email = $2
            ",
        )
        .bind(password_hash)
        .bind(&email)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let email = Email::parse(&email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Redemption::Applied { email })
    }
}
