//! Product management, including the `WooCommerce` import upsert.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};

use atelier_core::pricing::{self, Discount};
use atelier_core::{CategoryId, LocalizedText, ProductId, SubcategoryId};

use super::{RepositoryError, like_pattern, require_affected};
use crate::models::{NewProduct, Product, ProductQuery};

const COLUMNS: &str = "id, slug, name, description, price, sale_price, stock, images, colors, \
     sizes, category_id, subcategory_id, is_featured, is_active, woo_id, created_at, updated_at";

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
    is_active: bool,
    woo_id: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        let discount_percent = row
            .sale_price
            .and_then(|sale| pricing::percent_from_sale_price(row.price, sale).ok());
        Self {
            id: ProductId::new(row.id),
            slug: row.slug,
            name: row.name.0,
            description: row.description.0,
            price: row.price,
            sale_price: row.sale_price,
            discount_percent,
            stock: row.stock,
            images: row.images,
            colors: row.colors,
            sizes: row.sizes,
            category_id: row.category_id.map(CategoryId::new),
            subcategory_id: row.subcategory_id.map(SubcategoryId::new),
            is_featured: row.is_featured,
            is_active: row.is_active,
            woo_id: row.woo_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// What the import did with one `WooCommerce` product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    Inserted,
    Updated,
    /// The slug belongs to a product from another source.
    Skipped,
}

/// Repository for product administration.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Products matching `query`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, query: &ProductQuery) -> Result<Vec<Product>, RepositoryError> {
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("SELECT {COLUMNS} FROM shop.products WHERE TRUE"));

        if let Some(category) = query.category {
            qb.push(" AND category_id = ").push_bind(category.as_i32());
        }
        if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = like_pattern(search);
            qb.push(" AND (slug ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR EXISTS (SELECT 1 FROM jsonb_each_text(name) n WHERE n.value ILIKE ")
                .push_bind(pattern)
                .push("))");
        }
        if let Some(on_sale) = query.on_sale {
            qb.push(if on_sale {
                " AND sale_price IS NOT NULL"
            } else {
                " AND sale_price IS NULL"
            });
        }
        if let Some(active) = query.active {
            qb.push(" AND is_active = ").push_bind(active);
        }
        qb.push(" ORDER BY created_at DESC, id DESC");

        let rows = qb.build_query_as::<ProductRow>().fetch_all(self.pool).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Every product, for dashboard aggregation.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn all(&self) -> Result<Vec<Product>, RepositoryError> {
        self.list(&ProductQuery::default()).await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {COLUMNS} FROM shop.products WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    /// Insert a validated product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken or a category
    /// does not exist.
    pub async fn create(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "INSERT INTO shop.products \
                 (slug, name, description, price, sale_price, stock, images, colors, sizes, \
                  category_id, subcategory_id, is_featured, is_active, woo_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING {COLUMNS}"
        ))
        .bind(&product.slug)
        .bind(Json(&product.name))
        .bind(Json(&product.description))
        .bind(product.price)
        .bind(product.sale_price)
        .bind(product.stock)
        .bind(&product.images)
        .bind(&product.colors)
        .bind(&product.sizes)
        .bind(product.category_id.map(|id| id.as_i32()))
        .bind(product.subcategory_id.map(|id| id.as_i32()))
        .bind(product.is_featured)
        .bind(product.is_active)
        .bind(product.woo_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "product"))?;
        Ok(row.into())
    }

    /// Replace the editable fields of a product. The `WooCommerce` link is
    /// left untouched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn update(&self, id: ProductId, product: &NewProduct) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "UPDATE shop.products SET \
                 slug = $2, name = $3, description = $4, price = $5, sale_price = $6, stock = $7, \
                 images = $8, colors = $9, sizes = $10, category_id = $11, subcategory_id = $12, \
                 is_featured = $13, is_active = $14, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        ))
        .bind(id.as_i32())
        .bind(&product.slug)
        .bind(Json(&product.name))
        .bind(Json(&product.description))
        .bind(product.price)
        .bind(product.sale_price)
        .bind(product.stock)
        .bind(&product.images)
        .bind(&product.colors)
        .bind(&product.sizes)
        .bind(product.category_id.map(|id| id.as_i32()))
        .bind(product.subcategory_id.map(|id| id.as_i32()))
        .bind(product.is_featured)
        .bind(product.is_active)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "product"))?
        .ok_or(RepositoryError::NotFound)?;
        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.products WHERE id = $1")
            .bind(id.as_i32())
            .execute(self.pool)
            .await?;
        require_affected(result.rows_affected())
    }

    /// Flip `is_active` and return the new value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn toggle_active(&self, id: ProductId) -> Result<bool, RepositoryError> {
        sqlx::query_scalar::<_, bool>(
            "UPDATE shop.products SET is_active = NOT is_active, updated_at = NOW() \
             WHERE id = $1 RETURNING is_active",
        )
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Apply a discount against the stored price.
    ///
    /// The row is locked while the sale price is computed so a concurrent
    /// price edit cannot leave a sale price above the price.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Validation` if the discount is out of range.
    pub async fn set_discount(&self, id: ProductId, discount: Discount) -> Result<Product, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let price = sqlx::query_scalar::<_, Decimal>(
            "SELECT price FROM shop.products WHERE id = $1 FOR UPDATE",
        )
        .bind(id.as_i32())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let sale_price = pricing::resolve_sale_price(price, discount)
            .map_err(|e| RepositoryError::Validation(e.to_string()))?;

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "UPDATE shop.products SET sale_price = $2, updated_at = NOW() WHERE id = $1 \
             RETURNING {COLUMNS}"
        ))
        .bind(id.as_i32())
        .bind(sale_price)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    /// Set stock to an absolute value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Validation` for a negative value.
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn set_stock(&self, id: ProductId, stock: i32) -> Result<(), RepositoryError> {
        if stock < 0 {
            return Err(RepositoryError::Validation("stock cannot be negative".to_owned()));
        }
        let result = sqlx::query(
            "UPDATE shop.products SET stock = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id.as_i32())
        .bind(stock)
        .execute(self.pool)
        .await?;
        require_affected(result.rows_affected())
    }

    /// Insert or refresh a product keyed on its `WooCommerce` id.
    ///
    /// An existing product keeps its slug, category and flags; imported
    /// fields are overwritten. Imported text is merged per locale so
    /// translations added in the admin survive a re-import.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_imported(&self, product: &NewProduct) -> Result<ImportOutcome, RepositoryError> {
        let result = sqlx::query_scalar::<_, bool>(
            "INSERT INTO shop.products \
                 (slug, name, description, price, sale_price, stock, images, colors, sizes, \
                  is_active, woo_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             ON CONFLICT (woo_id) DO UPDATE SET \
                 name = shop.products.name || EXCLUDED.name, \
                 description = shop.products.description || EXCLUDED.description, \
                 price = EXCLUDED.price, sale_price = EXCLUDED.sale_price, \
                 stock = EXCLUDED.stock, images = EXCLUDED.images, \
                 colors = EXCLUDED.colors, sizes = EXCLUDED.sizes, updated_at = NOW() \
             RETURNING (xmax = 0) AS inserted",
        )
        .bind(&product.slug)
        .bind(Json(&product.name))
        .bind(Json(&product.description))
        .bind(product.price)
        .bind(product.sale_price)
        .bind(product.stock)
        .bind(&product.images)
        .bind(&product.colors)
        .bind(&product.sizes)
        .bind(product.is_active)
        .bind(product.woo_id)
        .fetch_one(self.pool)
        .await;

        match result {
            Ok(true) => Ok(ImportOutcome::Inserted),
            Ok(false) => Ok(ImportOutcome::Updated),
            Err(e) => match RepositoryError::from_write(e, "product") {
                RepositoryError::Conflict(_) => Ok(ImportOutcome::Skipped),
                other => Err(other),
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use atelier_core::Locale;

    use super::*;

    fn imported(name: &str, price: i64, stock: i32) -> NewProduct {
        NewProduct {
            slug: "wrap-skirt".to_owned(),
            name: LocalizedText::english(name),
            description: LocalizedText::english("Midi length"),
            price: Decimal::new(price, 2),
            sale_price: None,
            stock,
            images: vec!["https://shop.test/wp-content/skirt.jpg".to_owned()],
            colors: vec!["Sand".to_owned()],
            sizes: vec!["S".to_owned(), "M".to_owned()],
            category_id: None,
            subcategory_id: None,
            is_featured: false,
            is_active: true,
            woo_id: Some(311),
        }
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_reimport_keeps_translations(pool: PgPool) {
        let repo = ProductRepository::new(&pool);
        let first = repo.upsert_imported(&imported("Wrap Skirt", 5900, 4)).await.unwrap();
        assert_eq!(first, ImportOutcome::Inserted);

        sqlx::query(
            "UPDATE shop.products SET name = name || '{\"fr\": \"Jupe portefeuille\"}' \
             WHERE woo_id = 311",
        )
        .execute(&pool)
        .await
        .unwrap();

        let second = repo
            .upsert_imported(&imported("Wrap Skirt II", 6400, 7))
            .await
            .unwrap();
        assert_eq!(second, ImportOutcome::Updated);

        let id: i32 = sqlx::query_scalar("SELECT id FROM shop.products WHERE woo_id = 311")
            .fetch_one(&pool)
            .await
            .unwrap();
        let product = repo.get(ProductId::new(id)).await.unwrap().unwrap();
        assert_eq!(product.name.get(Locale::En), "Wrap Skirt II");
        assert_eq!(product.name.get(Locale::Fr), "Jupe portefeuille");
        assert_eq!(product.price, Decimal::new(6400, 2));
        assert_eq!(product.stock, 7);
    }
}
