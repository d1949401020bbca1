//! Contact form inbox.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use atelier_core::ContactMessageId;

use super::{RepositoryError, require_affected};

/// A message sent through the storefront contact form.
#[derive(Debug, Clone, Serialize)]
pub struct ContactMessage {
    pub id: ContactMessageId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct ContactMessageRow {
    id: i32,
    name: String,
    email: String,
    phone: Option<String>,
    subject: Option<String>,
    message: String,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl From<ContactMessageRow> for ContactMessage {
    fn from(row: ContactMessageRow) -> Self {
        Self {
            id: ContactMessageId::new(row.id),
            name: row.name,
            email: row.email,
            phone: row.phone,
            subject: row.subject,
            message: row.message,
            is_read: row.is_read,
            created_at: row.created_at,
        }
    }
}

/// Repository for `shop.contact_messages`.
pub struct ContactRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ContactRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Messages, newest first. `unread_only` hides read ones.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, unread_only: bool) -> Result<Vec<ContactMessage>, RepositoryError> {
        let rows = sqlx::query_as::<_, ContactMessageRow>(
            r"
            SELECT id, name, email, phone, subject, message, is_read, created_at
            FROM shop.contact_messages
            WHERE NOT ($1 AND is_read)
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(unread_only)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the message does not exist.
    pub async fn mark_read(&self, id: ContactMessageId) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE shop.contact_messages SET is_read = TRUE WHERE id = $1")
            .bind(id.as_i32())
            .execute(self.pool)
            .await?;
        require_affected(result.rows_affected())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the message does not exist.
    pub async fn delete(&self, id: ContactMessageId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.contact_messages WHERE id = $1")
            .bind(id.as_i32())
            .execute(self.pool)
            .await?;
        require_affected(result.rows_affected())
    }
}
