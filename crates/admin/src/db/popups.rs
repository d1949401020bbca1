//! Popup management.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use atelier_core::{LocalizedText, PopupId, PopupKind};

use super::{RepositoryError, require_affected};
use crate::models::{Popup, PopupInput};

const COLUMNS: &str = "id, title, body, cta_label, image_url, link_url, kind, is_active, \
     delay_seconds, show_once, starts_at, ends_at, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct PopupRow {
    id: i32,
    title: Json<LocalizedText>,
    body: Json<LocalizedText>,
    cta_label: Json<LocalizedText>,
    image_url: Option<String>,
    link_url: Option<String>,
    kind: PopupKind,
    is_active: bool,
    delay_seconds: i32,
    show_once: bool,
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PopupRow> for Popup {
    fn from(row: PopupRow) -> Self {
        Self {
            id: PopupId::new(row.id),
            title: row.title.0,
            body: row.body.0,
            cta_label: row.cta_label.0,
            image_url: row.image_url,
            link_url: row.link_url,
            kind: row.kind,
            is_active: row.is_active,
            delay_seconds: row.delay_seconds,
            show_once: row.show_once,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for `shop.popups`.
pub struct PopupRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PopupRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Popup>, RepositoryError> {
        let rows = sqlx::query_as::<_, PopupRow>(&format!(
            "SELECT {COLUMNS} FROM shop.popups ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(&self, input: &PopupInput) -> Result<Popup, RepositoryError> {
        let row = sqlx::query_as::<_, PopupRow>(&format!(
            "INSERT INTO shop.popups \
                 (title, body, cta_label, image_url, link_url, kind, is_active, delay_seconds, \
                  show_once, starts_at, ends_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {COLUMNS}"
        ))
        .bind(Json(&input.title))
        .bind(Json(&input.body))
        .bind(Json(&input.cta_label))
        .bind(&input.image_url)
        .bind(&input.link_url)
        .bind(input.kind)
        .bind(input.is_active)
        .bind(input.delay_seconds)
        .bind(input.show_once)
        .bind(input.starts_at)
        .bind(input.ends_at)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "popup"))?;
        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the popup does not exist.
    pub async fn update(&self, id: PopupId, input: &PopupInput) -> Result<Popup, RepositoryError> {
        let row = sqlx::query_as::<_, PopupRow>(&format!(
            "UPDATE shop.popups SET \
                 title = $2, body = $3, cta_label = $4, image_url = $5, link_url = $6, kind = $7, \
                 is_active = $8, delay_seconds = $9, show_once = $10, starts_at = $11, \
                 ends_at = $12, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        ))
        .bind(id.as_i32())
        .bind(Json(&input.title))
        .bind(Json(&input.body))
        .bind(Json(&input.cta_label))
        .bind(&input.image_url)
        .bind(&input.link_url)
        .bind(input.kind)
        .bind(input.is_active)
        .bind(input.delay_seconds)
        .bind(input.show_once)
        .bind(input.starts_at)
        .bind(input.ends_at)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "popup"))?
        .ok_or(RepositoryError::NotFound)?;
        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the popup does not exist.
    pub async fn delete(&self, id: PopupId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.popups WHERE id = $1")
            .bind(id.as_i32())
            .execute(self.pool)
            .await?;
        require_affected(result.rows_affected())
    }

    /// Flip the active flag and return the new value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the popup does not exist.
    pub async fn toggle_active(&self, id: PopupId) -> Result<bool, RepositoryError> {
        sqlx::query_scalar::<_, bool>(
            "UPDATE shop.popups SET is_active = NOT is_active, updated_at = NOW() \
             WHERE id = $1 RETURNING is_active",
        )
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}
