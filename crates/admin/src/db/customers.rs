//! Customer lookups.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use atelier_core::{CustomerId, Email};

use super::{RepositoryError, like_pattern};
use crate::models::Customer;

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: i32,
    email: String,
    full_name: String,
    phone: Option<String>,
    city: Option<String>,
    address: Option<String>,
    order_count: i32,
    total_spent: Decimal,
    last_order_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<CustomerRow> for Customer {
    type Error = RepositoryError;

    fn try_from(row: CustomerRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: CustomerId::new(row.id),
            email,
            full_name: row.full_name,
            phone: row.phone,
            city: row.city,
            address: row.address,
            order_count: row.order_count,
            total_spent: row.total_spent,
            last_order_at: row.last_order_at,
            created_at: row.created_at,
        })
    }
}

const COLUMNS: &str = "id, email, full_name, phone, city, address, order_count, total_spent, \
     last_order_at, created_at";

/// Repository for `shop.customers`.
pub struct CustomerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CustomerRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Customers, newest first, optionally filtered by name, email or phone.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored email is invalid.
    pub async fn list(&self, search: Option<&str>) -> Result<Vec<Customer>, RepositoryError> {
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(like_pattern);

        let rows = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {COLUMNS} FROM shop.customers \
             WHERE $1::TEXT IS NULL \
                OR email ILIKE $1 OR full_name ILIKE $1 OR COALESCE(phone, '') ILIKE $1 \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(pattern)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {COLUMNS} FROM shop.customers WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }
}
