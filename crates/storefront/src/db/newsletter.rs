//! Newsletter signups and unsubscribes.

use atelier_core::Email;
use sqlx::PgPool;
use uuid::Uuid;

use super::RepositoryError;

/// What a subscribe request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    /// A new subscriber row was created.
    Subscribed,
    /// A previously unsubscribed address was re-activated.
    Resubscribed,
    /// The address was already subscribed; nothing changed.
    AlreadySubscribed,
}

/// Newsletter subscriber writes.
pub struct NewsletterRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> NewsletterRepository<'a> {
    /// Create a new newsletter repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Subscribe an address.
    ///
    /// The unique index on `email` decides duplicates, so two concurrent
    /// signups for the same address produce one row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn subscribe(
        &self,
        email: &Email,
        name: Option<&str>,
        source: Option<&str>,
    ) -> Result<SubscribeOutcome, RepositoryError> {
        let inserted = sqlx::query_scalar::<_, i32>(
            r"
            INSERT INTO shop.newsletter_subscribers (email, name, source)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO NOTHING
            RETURNING id
            ",
        )
        .bind(email)
        .bind(name)
        .bind(source)
        .fetch_optional(self.pool)
        .await?;

        if inserted.is_some() {
            return Ok(SubscribeOutcome::Subscribed);
        }

        let reactivated = sqlx::query(
            r"
            UPDATE shop.newsletter_subscribers
            SET status = 'subscribed',
                subscribed_at = NOW(),
                unsubscribed_at = NULL,
                name = COALESCE($2, name),
                source = COALESCE($3, source)
            WHERE email = $1 AND status = 'unsubscribed'
            ",
        )
        .bind(email)
        .bind(name)
        .bind(source)
        .execute(self.pool)
        .await?;

        if reactivated.rows_affected() > 0 {
            Ok(SubscribeOutcome::Resubscribed)
        } else {
            Ok(SubscribeOutcome::AlreadySubscribed)
        }
    }

    /// Unsubscribe the address owning `token`. Returns the email, or `None`
    /// for an unknown token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn unsubscribe(&self, token: Uuid) -> Result<Option<String>, RepositoryError> {
        let email = sqlx::query_scalar::<_, String>(
            r"
            UPDATE shop.newsletter_subscribers
            SET status = 'unsubscribed',
                unsubscribed_at = COALESCE(unsubscribed_at, NOW())
            WHERE unsubscribe_token = $1
            RETURNING email
            ",
        )
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        Ok(email)
    }
}
