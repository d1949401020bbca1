//! Newsletter subscriber administration.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use atelier_core::{Email, SubscriberId, SubscriptionStatus};

use super::{RepositoryError, like_pattern};
use crate::models::{NewsletterStats, Subscriber, SubscriberQuery};

const COLUMNS: &str =
    "id, email, name, status, source, unsubscribe_token, subscribed_at, unsubscribed_at";

#[derive(Debug, sqlx::FromRow)]
struct SubscriberRow {
    id: i32,
    email: String,
    name: Option<String>,
    status: SubscriptionStatus,
    source: Option<String>,
    unsubscribe_token: Uuid,
    subscribed_at: DateTime<Utc>,
    unsubscribed_at: Option<DateTime<Utc>>,
}

impl TryFrom<SubscriberRow> for Subscriber {
    type Error = RepositoryError;

    fn try_from(row: SubscriberRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: SubscriberId::new(row.id),
            email,
            name: row.name,
            status: row.status,
            source: row.source,
            unsubscribe_token: row.unsubscribe_token,
            subscribed_at: row.subscribed_at,
            unsubscribed_at: row.unsubscribed_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StatsRow {
    total: i64,
    subscribed: i64,
    unsubscribed: i64,
    new_this_month: i64,
}

/// Repository for `shop.newsletter_subscribers`.
pub struct NewsletterRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> NewsletterRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Subscribers, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored email is invalid.
    pub async fn list(&self, query: &SubscriberQuery) -> Result<Vec<Subscriber>, RepositoryError> {
        let pattern = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(like_pattern);

        let rows = sqlx::query_as::<_, SubscriberRow>(&format!(
            "SELECT {COLUMNS} FROM shop.newsletter_subscribers \
             WHERE ($1::shop.subscription_status IS NULL OR status = $1) \
               AND ($2::TEXT IS NULL OR email ILIKE $2 OR COALESCE(name, '') ILIKE $2) \
             ORDER BY subscribed_at DESC, id DESC"
        ))
        .bind(query.status)
        .bind(pattern)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Subscribers who can currently receive campaigns.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn active(&self) -> Result<Vec<Subscriber>, RepositoryError> {
        self.list(&SubscriberQuery {
            status: Some(SubscriptionStatus::Subscribed),
            search: None,
        })
        .await
    }

    /// Headline counts. "This month" starts at midnight UTC on the 1st.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stats(&self) -> Result<NewsletterStats, RepositoryError> {
        let row = sqlx::query_as::<_, StatsRow>(
            r"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'subscribed') AS subscribed,
                COUNT(*) FILTER (WHERE status = 'unsubscribed') AS unsubscribed,
                COUNT(*) FILTER (
                    WHERE subscribed_at >= date_trunc('month', NOW() AT TIME ZONE 'UTC') AT TIME ZONE 'UTC'
                ) AS new_this_month
            FROM shop.newsletter_subscribers
            ",
        )
        .fetch_one(self.pool)
        .await?;

        Ok(NewsletterStats {
            total: row.total,
            subscribed: row.subscribed,
            unsubscribed: row.unsubscribed,
            new_this_month: row.new_this_month,
        })
    }

    /// Change a subscriber's status, stamping `unsubscribed_at` on the way
    /// out and clearing it on the way back in.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the subscriber does not exist.
    pub async fn set_status(
        &self,
        id: SubscriberId,
        status: SubscriptionStatus,
    ) -> Result<Subscriber, RepositoryError> {
        let row = sqlx::query_as::<_, SubscriberRow>(&format!(
            "UPDATE shop.newsletter_subscribers SET \
                 status = $2, \
                 unsubscribed_at = CASE WHEN $2 = 'unsubscribed' THEN COALESCE(unsubscribed_at, NOW()) END \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        ))
        .bind(id.as_i32())
        .bind(status)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the subscriber does not exist.
    pub async fn delete(&self, id: SubscriberId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.newsletter_subscribers WHERE id = $1")
            .bind(id.as_i32())
            .execute(self.pool)
            .await?;
        super::require_affected(result.rows_affected())
    }
}
