//! Contact form submissions.

use atelier_core::{ContactMessageId, Email};
use sqlx::PgPool;

use super::RepositoryError;

/// A validated contact message.
#[derive(Debug, Clone)]
pub struct NewContactMessage {
    pub name: String,
    pub email: Email,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: String,
}

/// Contact message writes.
pub struct ContactRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ContactRepository<'a> {
    /// Create a new contact repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a message for the admin inbox.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        message: &NewContactMessage,
    ) -> Result<ContactMessageId, RepositoryError> {
        let id = sqlx::query_scalar::<_, i32>(
            r"
            INSERT INTO shop.contact_messages (name, email, phone, subject, message)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            ",
        )
        .bind(&message.name)
        .bind(&message.email)
        .bind(message.phone.as_deref())
        .bind(message.subject.as_deref())
        .bind(&message.message)
        .fetch_one(self.pool)
        .await?;

        Ok(ContactMessageId::new(id))
    }
}
