//! Banners, popups and site settings as seen by shoppers.

use atelier_core::{BannerId, BannerPosition, LocalizedText, PopupId, PopupKind};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use sqlx::types::Json;

use super::RepositoryError;
use crate::models::{Banner, Popup};

/// `WHERE` fragment selecting rows whose flag is set and whose optional
/// display window contains the current time.
const ACTIVE_WINDOW: &str = "is_active \
     AND (starts_at IS NULL OR starts_at <= NOW()) \
     AND (ends_at IS NULL OR ends_at > NOW())";

#[derive(Debug, sqlx::FromRow)]
struct BannerRow {
    id: i32,
    title: Json<LocalizedText>,
    subtitle: Json<LocalizedText>,
    cta_label: Json<LocalizedText>,
    image_url: String,
    link_url: Option<String>,
    position: BannerPosition,
    sort_order: i32,
}

impl From<BannerRow> for Banner {
    fn from(row: BannerRow) -> Self {
        Self {
            id: BannerId::new(row.id),
            title: row.title.0,
            subtitle: row.subtitle.0,
            cta_label: row.cta_label.0,
            image_url: row.image_url,
            link_url: row.link_url,
            position: row.position,
            sort_order: row.sort_order,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PopupRow {
    id: i32,
    title: Json<LocalizedText>,
    body: Json<LocalizedText>,
    cta_label: Json<LocalizedText>,
    image_url: Option<String>,
    link_url: Option<String>,
    kind: PopupKind,
    delay_seconds: i32,
    show_once: bool,
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
            delay_seconds: row.delay_seconds,
            show_once: row.show_once,
        }
    }
}

/// Read access to storefront content.
pub struct ContentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ContentRepository<'a> {
    /// Create a new content repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Active banners, optionally restricted to one position.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn active_banners(
        &self,
        position: Option<BannerPosition>,
    ) -> Result<Vec<Banner>, RepositoryError> {
        let rows = sqlx::query_as::<_, BannerRow>(&format!(
            "SELECT id, title, subtitle, cta_label, image_url, link_url, position, sort_order \
             FROM shop.banners \
             WHERE {ACTIVE_WINDOW} AND ($1::shop.banner_position IS NULL OR position = $1) \
             ORDER BY position, sort_order, id"
        ))
        .bind(position)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Active popups, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn active_popups(&self) -> Result<Vec<Popup>, RepositoryError> {
        let rows = sqlx::query_as::<_, PopupRow>(&format!(
            "SELECT id, title, body, cta_label, image_url, link_url, kind, delay_seconds, show_once \
             FROM shop.popups \
             WHERE {ACTIVE_WINDOW} \
             ORDER BY created_at, id"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// A site setting value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn setting(&self, key: &str) -> Result<Option<JsonValue>, RepositoryError> {
        let value = sqlx::query_scalar::<_, JsonValue>(
            "SELECT value FROM shop.site_settings WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(self.pool)
        .await?;

        Ok(value)
    }
}
