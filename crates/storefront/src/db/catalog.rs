//! Catalog queries: categories and active products.

use atelier_core::{CategoryId, LocalizedText, ProductId, SubcategoryId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::{RepositoryError, like_pattern};
use crate::models::{Category, Product, ProductFilter, ProductPage, Subcategory};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: i32,
    slug: String,
    name: Json<LocalizedText>,
    sort_order: i32,
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

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    slug: String,
    name: Json<LocalizedText>,
    description: Json<LocalizedText>,
    price: Decimal,
    sale_price: Option<Decimal>,
    stock: i32,
    images: Vec<String>,
    colors: Vec<String>,
    sizes: Vec<String>,
    category_id: Option<i32>,
    subcategory_id: Option<i32>,
    is_featured: bool,
    created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            slug: row.slug,
            name: row.name.0,
            description: row.description.0,
            price: row.price,
            sale_price: row.sale_price,
            stock: row.stock,
            images: row.images,
            colors: row.colors,
            sizes: row.sizes,
            category_id: row.category_id.map(CategoryId::new),
            subcategory_id: row.subcategory_id.map(SubcategoryId::new),
            is_featured: row.is_featured,
            created_at: row.created_at,
        }
    }
}

const PRODUCT_COLUMNS: &str = "p.id, p.slug, p.name, p.description, p.price, p.sale_price, \
     p.stock, p.images, p.colors, p.sizes, p.category_id, p.subcategory_id, \
     p.is_featured, p.created_at";

// =============================================================================
// Repository
// =============================================================================

/// Read-only access to the catalog.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    /// Create a new catalog repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All categories with their subcategories, in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let categories = sqlx::query_as::<_, CategoryRow>(
            r"
            SELECT id, slug, name, sort_order
            FROM shop.categories
            ORDER BY sort_order, id
            ",
        )
        .fetch_all(self.pool)
        .await?;

        let subcategories = sqlx::query_as::<_, SubcategoryRow>(
            r"
            SELECT id, category_id, slug, name, sort_order
            FROM shop.subcategories
            ORDER BY sort_order, id
            ",
        )
        .fetch_all(self.pool)
        .await?;

        let mut subcategories: Vec<Subcategory> =
            subcategories.into_iter().map(Into::into).collect();

        Ok(categories
            .into_iter()
            .map(|row| {
                let id = CategoryId::new(row.id);
                let (own, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut subcategories)
                    .into_iter()
                    .partition(|s| s.category_id == id);
                subcategories = rest;
                Category {
                    id,
                    slug: row.slug,
                    name: row.name.0,
                    sort_order: row.sort_order,
                    subcategories: own,
                }
            })
            .collect())
    }

    /// A page of active products matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_products(&self, filter: &ProductFilter) -> Result<ProductPage, RepositoryError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM shop.products p");
        push_product_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.products p"
        ));
        push_product_filters(&mut query, filter);
        query
            .push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ")
            .push_bind(i64::from(filter.per_page()))
            .push(" OFFSET ")
            .push_bind(filter.offset());

        let rows = query.build_query_as::<ProductRow>().fetch_all(self.pool).await?;

        Ok(ProductPage {
            items: rows.into_iter().map(Into::into).collect(),
            page: filter.page(),
            per_page: filter.per_page(),
            total,
        })
    }

    /// An active product by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn product_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.products p WHERE p.slug = $1 AND p.is_active"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Active products with the given ids, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();

        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.products p WHERE p.id = ANY($1) AND p.is_active"
        ))
        .bind(ids)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Featured active products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn featured_products(&self, limit: i64) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.products p \
             WHERE p.is_active AND p.is_featured \
             ORDER BY p.created_at DESC, p.id DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Append the `WHERE` clause shared by the listing and count queries.
fn push_product_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    query.push(" WHERE p.is_active");

    if let Some(category) = filter.category.as_deref().filter(|c| !c.is_empty()) {
        query
            .push(" AND p.category_id = (SELECT id FROM shop.categories WHERE slug = ")
            .push_bind(category.to_owned())
            .push(")");
    }
    if let Some(subcategory) = filter.subcategory.as_deref().filter(|s| !s.is_empty()) {
        query
            .push(" AND p.subcategory_id IN (SELECT id FROM shop.subcategories WHERE slug = ")
            .push_bind(subcategory.to_owned())
            .push(")");
    }
    if filter.on_sale {
        query.push(" AND p.sale_price IS NOT NULL");
    }
    if let Some(q) = filter.search() {
        query
            .push(" AND EXISTS (SELECT 1 FROM jsonb_each_text(p.name) t WHERE t.value ILIKE ")
            .push_bind(like_pattern(q))
            .push(")");
    }
}
