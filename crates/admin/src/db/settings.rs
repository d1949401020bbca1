//! Site settings: one JSON document per well-known key.
//!
//! Writes are plain upserts, so concurrent editors get last-write-wins.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use sqlx::PgPool;

use super::RepositoryError;

/// Key of the marketing templates array.
pub const MARKETING_TEMPLATES: &str = "marketing_templates";
/// Key of the `WooCommerce` connection settings.
pub const WOOCOMMERCE: &str = "woocommerce";

/// A stored setting.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SiteSetting {
    pub key: String,
    pub value: JsonValue,
    pub updated_at: DateTime<Utc>,
}

/// Repository for `shop.site_settings`.
pub struct SettingsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SettingsRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every setting, ordered by key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<SiteSetting>, RepositoryError> {
        let rows = sqlx::query_as::<_, SiteSetting>(
            "SELECT key, value, updated_at FROM shop.site_settings ORDER BY key",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// One setting by key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, key: &str) -> Result<Option<SiteSetting>, RepositoryError> {
        let row = sqlx::query_as::<_, SiteSetting>(
            "SELECT key, value, updated_at FROM shop.site_settings WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Insert or replace a setting.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(&self, key: &str, value: &JsonValue) -> Result<SiteSetting, RepositoryError> {
        let row = sqlx::query_as::<_, SiteSetting>(
            "INSERT INTO shop.site_settings (key, value) VALUES ($1, $2) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW() \
             RETURNING key, value, updated_at",
        )
        .bind(key)
        .bind(value)
        .fetch_one(self.pool)
        .await?;
        Ok(row)
    }

    /// Delete a setting.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the key does not exist.
    pub async fn delete(&self, key: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.site_settings WHERE key = $1")
            .bind(key)
            .execute(self.pool)
            .await?;
        super::require_affected(result.rows_affected())
    }

    /// Read a setting as `T`. Missing keys yield `None`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the stored JSON does not
    /// have the expected shape.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, RepositoryError> {
        let Some(setting) = self.get(key).await? else {
            return Ok(None);
        };
        serde_json::from_value(setting.value)
            .map(Some)
            .map_err(|e| RepositoryError::DataCorruption(format!("setting {key}: {e}")))
    }

    /// Store `value` as JSON under `key`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), RepositoryError> {
        let json = serde_json::to_value(value)
            .map_err(|e| RepositoryError::Validation(format!("setting {key}: {e}")))?;
        self.upsert(key, &json).await?;
        Ok(())
    }
}
