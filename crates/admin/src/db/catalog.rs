//! Category and subcategory management.

use std::collections::BTreeMap;

use sqlx::PgPool;
use sqlx::types::Json;

use atelier_core::{CategoryId, LocalizedText, SubcategoryId};

use super::{RepositoryError, require_affected};
use crate::models::{Category, CategoryInput, Subcategory, SubcategoryInput};

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: i32,
    slug: String,
    name: Json<LocalizedText>,
    sort_order: i32,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: CategoryId::new(row.id),
            slug: row.slug,
            name: row.name.0,
            sort_order: row.sort_order,
            subcategories: Vec::new(),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SubcategoryRow {
    id: i32,
    category_id: i32,
    slug: String,
    name: Json<LocalizedText>,
    sort_order: i32,
}

impl From<SubcategoryRow> for Subcategory {
    fn from(row: SubcategoryRow) -> Self {
        Self {
            id: SubcategoryId::new(row.id),
            category_id: CategoryId::new(row.category_id),
            slug: row.slug,
            name: row.name.0,
            sort_order: row.sort_order,
        }
    }
}

/// Repository for the category tree.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All categories with their subcategories nested, in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let categories = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, slug, name, sort_order FROM shop.categories ORDER BY sort_order, id",
        )
        .fetch_all(self.pool)
        .await?;

        let subcategories = sqlx::query_as::<_, SubcategoryRow>(
            "SELECT id, category_id, slug, name, sort_order \
             FROM shop.subcategories ORDER BY sort_order, id",
        )
        .fetch_all(self.pool)
        .await?;

        let mut by_category: BTreeMap<i32, Vec<Subcategory>> = BTreeMap::new();
        for row in subcategories {
            by_category.entry(row.category_id).or_default().push(row.into());
        }

        Ok(categories
            .into_iter()
            .map(|row| {
                let subs = by_category.remove(&row.id).unwrap_or_default();
                let mut category = Category::from(row);
                category.subcategories = subs;
                category
            })
            .collect())
    }

    /// Create a category from a validated form.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn create_category(&self, input: &CategoryInput) -> Result<Category, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "INSERT INTO shop.categories (slug, name, sort_order) VALUES ($1, $2, $3) \
             RETURNING id, slug, name, sort_order",
        )
        .bind(&input.slug)
        .bind(Json(&input.name))
        .bind(input.sort_order)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "category"))?;
        Ok(row.into())
    }

    /// Update a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn update_category(
        &self,
        id: CategoryId,
        input: &CategoryInput,
    ) -> Result<Category, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "UPDATE shop.categories SET slug = $2, name = $3, sort_order = $4 WHERE id = $1 \
             RETURNING id, slug, name, sort_order",
        )
        .bind(id.as_i32())
        .bind(&input.slug)
        .bind(Json(&input.name))
        .bind(input.sort_order)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "category"))?
        .ok_or(RepositoryError::NotFound)?;
        Ok(row.into())
    }

    /// Delete a category. Its subcategories go with it; products keep
    /// existing without a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    pub async fn delete_category(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.categories WHERE id = $1")
            .bind(id.as_i32())
            .execute(self.pool)
            .await?;
        require_affected(result.rows_affected())
    }

    /// Create a subcategory.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken within the
    /// category or the category does not exist.
    pub async fn create_subcategory(
        &self,
        input: &SubcategoryInput,
    ) -> Result<Subcategory, RepositoryError> {
        let row = sqlx::query_as::<_, SubcategoryRow>(
            "INSERT INTO shop.subcategories (category_id, slug, name, sort_order) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, category_id, slug, name, sort_order",
        )
        .bind(input.category_id.as_i32())
        .bind(&input.slug)
        .bind(Json(&input.name))
        .bind(input.sort_order)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "subcategory"))?;
        Ok(row.into())
    }

    /// Update a subcategory.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the subcategory does not exist.
    pub async fn update_subcategory(
        &self,
        id: SubcategoryId,
        input: &SubcategoryInput,
    ) -> Result<Subcategory, RepositoryError> {
        let row = sqlx::query_as::<_, SubcategoryRow>(
            "UPDATE shop.subcategories SET category_id = $2, slug = $3, name = $4, sort_order = $5 \
             WHERE id = $1 \
             RETURNING id, category_id, slug, name, sort_order",
        )
        .bind(id.as_i32())
        .bind(input.category_id.as_i32())
        .bind(&input.slug)
        .bind(Json(&input.name))
        .bind(input.sort_order)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "subcategory"))?
        .ok_or(RepositoryError::NotFound)?;
        Ok(row.into())
    }

    /// Delete a subcategory.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the subcategory does not exist.
    pub async fn delete_subcategory(&self, id: SubcategoryId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.subcategories WHERE id = $1")
            .bind(id.as_i32())
            .execute(self.pool)
            .await?;
        require_affected(result.rows_affected())
    }
}
