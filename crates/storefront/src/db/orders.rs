//! Order creation and payment state transitions.
//!
//! Stock is reserved when the order is created and returned when an unpaid
//! order is cancelled. Every transition is a conditional `UPDATE` so repeated
//! or concurrent calls cannot apply twice.

use atelier_core::{OrderId, OrderStatus, PaymentStatus};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use super::RepositoryError;
use crate::models::{NewOrder, OrderSummary};

/// Result of applying a payment status from the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// The order changed state.
    Applied,
    /// The order was already past this point; nothing changed.
    Unchanged,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderSummaryRow {
    order_number: String,
    email: String,
    status: OrderStatus,
    payment_status: PaymentStatus,
    currency: String,
    total: Decimal,
}

impl From<OrderSummaryRow> for OrderSummary {
    fn from(row: OrderSummaryRow) -> Self {
        Self {
            order_number: row.order_number,
            email: row.email,
            status: row.status,
            payment_status: row.payment_status,
            currency: row.currency,
            total: row.total,
        }
    }
}

/// Order writes for checkout.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Reserve stock, upsert the customer and insert the order with its
    /// items, all in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if any line no longer has enough
    /// stock (nothing is written), or `RepositoryError::Database` on failure.
    pub async fn create(&self, order: &NewOrder) -> Result<OrderId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        for reservation in order.stock_reservations() {
            let reserved = sqlx::query(
                r"
                UPDATE shop.products
                SET stock = stock - $2, updated_at = NOW()
                WHERE id = $1 AND is_active AND stock >= $2
                ",
            )
            .bind(reservation.product_id)
            .bind(reservation.quantity)
            .execute(&mut *tx)
            .await
            .map_err(lock_conflict)?;

            if reserved.rows_affected() == 0 {
                return Err(RepositoryError::Conflict(format!(
                    "{} is out of stock",
                    reservation.product_name
                )));
            }
        }

        let customer_id = sqlx::query_scalar::<_, i32>(
            r"
            INSERT INTO shop.customers (email, full_name, phone, city, address)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO UPDATE
            SET full_name = EXCLUDED.full_name,
                phone = EXCLUDED.phone,
                city = EXCLUDED.city,
                address = EXCLUDED.address,
                updated_at = NOW()
            RETURNING id
            ",
        )
        .bind(&order.email)
        .bind(&order.full_name)
        .bind(&order.phone)
        .bind(&order.city)
        .bind(&order.shipping_address)
        .fetch_one(&mut *tx)
        .await?;

        let order_id = sqlx::query_scalar::<_, i32>(
            r"
            INSERT INTO shop.orders (
                order_number, customer_id, email, full_name, phone,
                shipping_address, city, notes, currency,
                subtotal, shipping_fee, total
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id
            ",
        )
        .bind(&order.order_number)
        .bind(customer_id)
        .bind(&order.email)
        .bind(&order.full_name)
        .bind(&order.phone)
        .bind(&order.shipping_address)
        .bind(&order.city)
        .bind(order.notes.as_deref())
        .bind(&order.currency)
        .bind(order.subtotal)
        .bind(order.shipping_fee)
        .bind(order.total)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("order number already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        for item in &order.items {
            sqlx::query(
                r"
                INSERT INTO shop.order_items (
                    order_id, product_id, product_name, size, color, unit_price, quantity
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ",
            )
            .bind(order_id)
            .bind(item.product_id)
            .bind(&item.product_name)
            .bind(item.size.as_deref())
            .bind(item.color.as_deref())
            .bind(item.unit_price)
            .bind(item.quantity)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(OrderId::new(order_id))
    }

    /// Remember the processor's reference for a pending order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn set_payment_reference(
        &self,
        order_id: OrderId,
        reference: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE shop.orders SET payment_reference = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(order_id)
        .bind(reference)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Mark a pending order paid and add it to the customer's aggregates.
    ///
    /// `reference` must match the stored processor reference when one was
    /// recorded at checkout.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown order number, or
    /// `RepositoryError::Database` on failure.
    pub async fn mark_paid(
        &self,
        order_number: &str,
        reference: &str,
    ) -> Result<PaymentOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let paid = sqlx::query_as::<_, (Option<i32>, Decimal)>(
            r"
            UPDATE shop.orders
            SET status = 'paid',
                payment_status = 'paid',
                payment_reference = $2,
                paid_at = NOW(),
                updated_at = NOW()
            WHERE order_number = $1
              AND status = 'pending'
              AND payment_status = 'pending'
              AND (payment_reference IS NULL OR payment_reference = $2)
            RETURNING customer_id, total
            ",
        )
        .bind(order_number)
        .bind(reference)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((customer_id, total)) = paid else {
            tx.rollback().await?;
            return self.unchanged_or_missing(order_number).await;
        };

        if let Some(customer_id) = customer_id {
            sqlx::query(
                r"
                UPDATE shop.customers
                SET order_count = order_count + 1,
                    total_spent = total_spent + $2,
                    last_order_at = NOW(),
                    updated_at = NOW()
                WHERE id = $1
                ",
            )
            .bind(customer_id)
            .bind(total)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(PaymentOutcome::Applied)
    }

    /// Cancel a pending, unpaid order and return its reserved stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown order number, or
    /// `RepositoryError::Database` on failure.
    pub async fn release(
        &self,
        order_number: &str,
        payment_status: PaymentStatus,
    ) -> Result<PaymentOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let cancelled = sqlx::query_scalar::<_, i32>(
            r"
            UPDATE shop.orders
            SET status = 'cancelled', payment_status = $2, updated_at = NOW()
            WHERE order_number = $1 AND status = 'pending' AND payment_status = 'pending'
            RETURNING id
            ",
        )
        .bind(order_number)
        .bind(payment_status)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(order_id) = cancelled else {
            tx.rollback().await?;
            return self.unchanged_or_missing(order_number).await;
        };

        return_stock(&mut tx, order_id).await?;
        tx.commit().await?;
        Ok(PaymentOutcome::Applied)
    }

    /// Public summary of an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn summary(&self, order_number: &str) -> Result<Option<OrderSummary>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderSummaryRow>(
            r"
            SELECT order_number, email, status, payment_status, currency, total
            FROM shop.orders
            WHERE order_number = $1
            ",
        )
        .bind(order_number)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn unchanged_or_missing(
        &self,
        order_number: &str,
    ) -> Result<PaymentOutcome, RepositoryError> {
        match self.summary(order_number).await? {
            Some(_) => Ok(PaymentOutcome::Unchanged),
            None => Err(RepositoryError::NotFound),
        }
    }
}

/// Add each item's quantity back to its product, locking products in
/// ascending id order like checkout does.
async fn return_stock(
    tx: &mut Transaction<'_, Postgres>,
    order_id: i32,
) -> Result<(), RepositoryError> {
    let quantities = sqlx::query_as::<_, (i32, i32)>(
        r"
        SELECT product_id, SUM(quantity)::INTEGER
        FROM shop.order_items
        WHERE order_id = $1 AND product_id IS NOT NULL
        GROUP BY product_id
        ORDER BY product_id
        ",
    )
    .bind(order_id)
    .fetch_all(&mut **tx)
    .await?;

    for (product_id, quantity) in quantities {
        sqlx::query("UPDATE shop.products SET stock = stock + $2, updated_at = NOW() WHERE id = $1")
            .bind(product_id)
            .bind(quantity)
            .execute(&mut **tx)
            .await
            .map_err(lock_conflict)?;
    }
    Ok(())
}

/// A deadlock or serialization failure means another checkout won the
/// race; report it as a conflict the shopper can retry.
fn lock_conflict(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && matches!(db_err.code().as_deref(), Some("40P01" | "40001"))
    {
        return RepositoryError::Conflict("stock is being updated, please retry".to_owned());
    }
    RepositoryError::Database(e)
}
