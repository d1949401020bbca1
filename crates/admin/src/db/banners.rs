//! Banner management.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use atelier_core::{BannerId, BannerPosition, LocalizedText};

use super::{RepositoryError, require_affected};
use crate::models::{Banner, BannerInput};

const COLUMNS: &str = "id, title, subtitle, cta_label, image_url, link_url, position, is_active, \
     sort_order, starts_at, ends_at, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct BannerRow {
    id: i32,
    title: Json<LocalizedText>,
    subtitle: Json<LocalizedText>,
    cta_label: Json<LocalizedText>,
    image_url: String,
    link_url: Option<String>,
    position: BannerPosition,
    is_active: bool,
    sort_order: i32,
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
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
            is_active: row.is_active,
            sort_order: row.sort_order,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for `shop.banners`.
pub struct BannerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BannerRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All banners grouped by position, in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Banner>, RepositoryError> {
        let rows = sqlx::query_as::<_, BannerRow>(&format!(
            "SELECT {COLUMNS} FROM shop.banners ORDER BY position, sort_order, id"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(&self, input: &BannerInput) -> Result<Banner, RepositoryError> {
        let row = sqlx::query_as::<_, BannerRow>(&format!(
            "INSERT INTO shop.banners \
                 (title, subtitle, cta_label, image_url, link_url, position, is_active, \
                  sort_order, starts_at, ends_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {COLUMNS}"
        ))
        .bind(Json(&input.title))
        .bind(Json(&input.subtitle))
        .bind(Json(&input.cta_label))
        .bind(&input.image_url)
        .bind(&input.link_url)
        .bind(input.position)
        .bind(input.is_active)
        .bind(input.sort_order)
        .bind(input.starts_at)
        .bind(input.ends_at)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "banner"))?;
        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the banner does not exist.
    pub async fn update(&self, id: BannerId, input: &BannerInput) -> Result<Banner, RepositoryError> {
        let row = sqlx::query_as::<_, BannerRow>(&format!(
            "UPDATE shop.banners SET \
                 title = $2, subtitle = $3, cta_label = $4, image_url = $5, link_url = $6, \
                 position = $7, is_active = $8, sort_order = $9, starts_at = $10, ends_at = $11, \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        ))
        .bind(id.as_i32())
        .bind(Json(&input.title))
        .bind(Json(&input.subtitle))
        .bind(Json(&input.cta_label))
        .bind(&input.image_url)
        .bind(&input.link_url)
        .bind(input.position)
        .bind(input.is_active)
        .bind(input.sort_order)
        .bind(input.starts_at)
        .bind(input.ends_at)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "banner"))?
        .ok_or(RepositoryError::NotFound)?;
        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the banner does not exist.
    pub async fn delete(&self, id: BannerId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.banners WHERE id = $1")
            .bind(id.as_i32())
            .execute(self.pool)
            .await?;
        require_affected(result.rows_affected())
    }

    /// Flip the stored active flag in a single statement and return the new
    /// value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the banner does not exist.
    pub async fn toggle_active(&self, id: BannerId) -> Result<bool, RepositoryError> {
        sqlx::query_scalar::<_, bool>(
            "UPDATE shop.banners SET is_active = NOT is_active, updated_at = NOW() \
             WHERE id = $1 RETURNING is_active",
        )
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Set `sort_order` to each id's index in `ids`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if any id does not exist; nothing
    /// is changed in that case.
    pub async fn reorder(&self, ids: &[BannerId]) -> Result<(), RepositoryError> {
        let ids: Vec<i32> = ids.iter().map(BannerId::as_i32).collect();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE shop.banners b SET sort_order = (o.ord - 1)::INTEGER, updated_at = NOW() \
             FROM UNNEST($1::INTEGER[]) WITH ORDINALITY AS o(id, ord) \
             WHERE b.id = o.id",
        )
        .bind(&ids)
        .execute(&mut *tx)
        .await?;

        if usize::try_from(result.rows_affected()).ok() != Some(ids.len()) {
            return Err(RepositoryError::NotFound);
        }
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn input(title: &str, is_active: bool) -> BannerInput {
        serde_json::from_value(json!({
            "title": { "en": title },
            "image_url": "https://cdn.test/banner.jpg",
            "is_active": is_active,
        }))
        .unwrap()
    }

    async fn stored_flag(pool: &PgPool, id: BannerId) -> bool {
        sqlx::query_scalar("SELECT is_active FROM shop.banners WHERE id = $1")
            .bind(id.as_i32())
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_toggle_flips_the_stored_flag(pool: PgPool) {
        let repo = BannerRepository::new(&pool);
        let banner = repo.create(&input("Spring edit", true)).await.unwrap();
        let other = repo.create(&input("Sale", true)).await.unwrap();

        assert!(!repo.toggle_active(banner.id).await.unwrap());
        assert!(!stored_flag(&pool, banner.id).await);

        assert!(repo.toggle_active(banner.id).await.unwrap());
        assert!(stored_flag(&pool, banner.id).await);

        // Only the targeted row moves
        assert!(stored_flag(&pool, other.id).await);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_toggle_unknown_banner(pool: PgPool) {
        let err = BannerRepository::new(&pool)
            .toggle_active(BannerId::new(999))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_reorder_is_all_or_nothing(pool: PgPool) {
        let repo = BannerRepository::new(&pool);
        let a = repo.create(&input("A", true)).await.unwrap();
        let b = repo.create(&input("B", true)).await.unwrap();

        repo.reorder(&[b.id, a.id]).await.unwrap();
        let by_id: Vec<(BannerId, i32)> = repo
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|x| (x.id, x.sort_order))
            .collect();
        assert!(by_id.contains(&(b.id, 0)));
        assert!(by_id.contains(&(a.id, 1)));

        let err = repo.reorder(&[a.id, BannerId::new(999)]).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
        let after: Vec<(BannerId, i32)> = repo
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|x| (x.id, x.sort_order))
            .collect();
        assert!(after.contains(&(a.id, 1)));
    }
}
