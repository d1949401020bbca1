//! Order administration.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use atelier_core::{
    CustomerId, OrderId, OrderItemId, OrderStatus, PaymentStatus, ProductId,
};

use super::RepositoryError;
use crate::models::{Order, OrderDetail, OrderItem, OrderSummary, SoldItem};

const COLUMNS: &str = "id, order_number, customer_id, email, full_name, phone, shipping_address, \
     city, notes, currency, subtotal, shipping_fee, total, status, payment_status, \
     payment_reference, paid_at, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    order_number: String,
    customer_id: Option<i32>,
    email: String,
    full_name: String,
    phone: String,
    shipping_address: String,
    city: String,
    notes: Option<String>,
    currency: String,
    subtotal: Decimal,
    shipping_fee: Decimal,
    total: Decimal,
    status: OrderStatus,
    payment_status: PaymentStatus,
    payment_reference: Option<String>,
    paid_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: OrderId::new(row.id),
            order_number: row.order_number,
            customer_id: row.customer_id.map(CustomerId::new),
            email: row.email,
            full_name: row.full_name,
            phone: row.phone,
            shipping_address: row.shipping_address,
            city: row.city,
            notes: row.notes,
            currency: row.currency,
            subtotal: row.subtotal,
            shipping_fee: row.shipping_fee,
            total: row.total,
            status: row.status,
            payment_status: row.payment_status,
            payment_reference: row.payment_reference,
            paid_at: row.paid_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: i32,
    order_id: i32,
    product_id: Option<i32>,
    product_name: String,
    size: Option<String>,
    color: Option<String>,
    unit_price: Decimal,
    quantity: i32,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            id: OrderItemId::new(row.id),
            order_id: OrderId::new(row.order_id),
            product_id: row.product_id.map(ProductId::new),
            product_name: row.product_name,
            size: row.size,
            color: row.color,
            unit_price: row.unit_price,
            quantity: row.quantity,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SoldItemRow {
    product_id: Option<i32>,
    product_name: String,
    quantity: i32,
    status: OrderStatus,
}

/// Repository for orders and their lines.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Orders, newest first, optionally restricted to one status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {COLUMNS} FROM shop.orders \
             WHERE ($1::shop.order_status IS NULL OR status = $1) \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(status)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// An order with its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<OrderDetail>, RepositoryError> {
        let Some(row) = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {COLUMNS} FROM shop.orders WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?
        else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT id, order_id, product_id, product_name, size, color, unit_price, quantity
            FROM shop.order_items
            WHERE order_id = $1
            ORDER BY id
            ",
        )
        .bind(id.as_i32())
        .fetch_all(self.pool)
        .await?;

        Ok(Some(OrderDetail {
            order: row.into(),
            items: items.into_iter().map(Into::into).collect(),
        }))
    }

    /// A customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn for_customer(&self, customer_id: CustomerId) -> Result<Vec<OrderSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {COLUMNS} FROM shop.orders WHERE customer_id = $1 \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(customer_id.as_i32())
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(|row| Order::from(row).summary()).collect())
    }

    /// Every order line with its order's status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn sold_items(&self) -> Result<Vec<SoldItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, SoldItemRow>(
            r"
            SELECT i.product_id, i.product_name, i.quantity, o.status
            FROM shop.order_items i
            JOIN shop.orders o ON o.id = i.order_id
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| SoldItem {
                product_id: row.product_id.map(ProductId::new),
                product_name: row.product_name,
                quantity: row.quantity,
                status: row.status,
            })
            .collect())
    }

    /// Move an order to `status`.
    ///
    /// Entering `cancelled` or `refunded` from a status that holds stock
    /// returns the order's items to their products. Leaving `cancelled` or
    /// `refunded` for a holding status takes them again, and fails with a
    /// conflict when a product no longer has enough.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist, or
    /// `RepositoryError::Conflict` if stock cannot be reserved again.
    pub async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let previous = sqlx::query_scalar::<_, OrderStatus>(
            "SELECT status FROM shop.orders WHERE id = $1 FOR UPDATE",
        )
        .bind(id.as_i32())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        match (previous.releases_stock(), status.releases_stock()) {
            (false, true) => {
                return_stock(&mut tx, id.as_i32()).await?;
                tracing::info!(order_id = %id, from = %previous, to = %status, "Returned order stock");
            }
            (true, false) => {
                reserve_stock(&mut tx, id.as_i32()).await?;
                tracing::info!(order_id = %id, from = %previous, to = %status, "Reserved order stock again");
            }
            _ => {}
        }

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "UPDATE shop.orders SET status = $2, updated_at = NOW() WHERE id = $1 \
             RETURNING {COLUMNS}"
        ))
        .bind(id.as_i32())
        .bind(status)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }
}

/// Quantity per product for an order, in ascending product id order so
/// stock rows are always locked in the same order as checkout.
async fn item_quantities(
    tx: &mut Transaction<'_, Postgres>,
    order_id: i32,
) -> Result<Vec<(i32, i32, String)>, RepositoryError> {
    let rows = sqlx::query_as::<_, (i32, i32, String)>(
        r"
        SELECT product_id, SUM(quantity)::INTEGER, MIN(product_name)
        FROM shop.order_items
        WHERE order_id = $1 AND product_id IS NOT NULL
        GROUP BY product_id
        ORDER BY product_id
        ",
    )
    .bind(order_id)
    .fetch_all(&mut **tx)
    .await?;
    Ok(rows)
}

/// Add each item's quantity back to its product.
async fn return_stock(
    tx: &mut Transaction<'_, Postgres>,
    order_id: i32,
) -> Result<(), RepositoryError> {
    for (product_id, quantity, _) in item_quantities(tx, order_id).await? {
        sqlx::query("UPDATE shop.products SET stock = stock + $2, updated_at = NOW() WHERE id = $1")
            .bind(product_id)
            .bind(quantity)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

/// Take each item's quantity from its product again.
async fn reserve_stock(
    tx: &mut Transaction<'_, Postgres>,
    order_id: i32,
) -> Result<(), RepositoryError> {
    for (product_id, quantity, name) in item_quantities(tx, order_id).await? {
        let reserved = sqlx::query(
            r"
            UPDATE shop.products
            SET stock = stock - $2, updated_at = NOW()
            WHERE id = $1 AND stock >= $2
            ",
        )
        .bind(product_id)
        .bind(quantity)
        .execute(&mut **tx)
        .await?;

        if reserved.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(format!(
                "not enough stock left for {name}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn insert_product(pool: &PgPool, slug: &str, stock: i32) -> i32 {
        sqlx::query_scalar(
            r"
            INSERT INTO shop.products (slug, name, price, stock, images)
            VALUES ($1, jsonb_build_object('en', $1::TEXT), 20.00, $2, ARRAY['https://cdn.test/p.jpg'])
            RETURNING id
            ",
        )
        .bind(slug)
        .bind(stock)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    /// A pending order for `quantity` of `product_id`, with that stock
    /// already taken the way checkout takes it.
    async fn insert_order(pool: &PgPool, product_id: i32, quantity: i32) -> OrderId {
        let id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO shop.orders (
                order_number, email, full_name, phone, shipping_address, city,
                currency, subtotal, shipping_fee, total
            )
            VALUES ('AT-260301-TEST01', 'yasmine@example.com', 'Yasmine B', '+33600000000',
                    '3 Rue Oberkampf', 'Paris', 'EUR', 40.00, 0, 40.00)
            RETURNING id
            ",
        )
        .fetch_one(pool)
        .await
        .unwrap();
        sqlx::query(
            r"
            INSERT INTO shop.order_items (order_id, product_id, product_name, unit_price, quantity)
            VALUES ($1, $2, 'Linen Dress', 20.00, $3)
            ",
        )
        .bind(id)
        .bind(product_id)
        .bind(quantity)
        .execute(pool)
        .await
        .unwrap();
        sqlx::query("UPDATE shop.products SET stock = stock - $2 WHERE id = $1")
            .bind(product_id)
            .bind(quantity)
            .execute(pool)
            .await
            .unwrap();
        OrderId::new(id)
    }

    async fn stock_of(pool: &PgPool, product_id: i32) -> i32 {
        sqlx::query_scalar("SELECT stock FROM shop.products WHERE id = $1")
            .bind(product_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_status_cycles_keep_stock_balanced(pool: PgPool) {
        let dress = insert_product(&pool, "linen-dress", 10).await;
        let order = insert_order(&pool, dress, 2).await;
        let repo = OrderRepository::new(&pool);
        assert_eq!(stock_of(&pool, dress).await, 8);

        for (status, expected) in [
            (OrderStatus::Cancelled, 10),
            (OrderStatus::Pending, 8),
            (OrderStatus::Cancelled, 10),
            (OrderStatus::Shipped, 8),
            (OrderStatus::Refunded, 10),
            (OrderStatus::Cancelled, 10),
            (OrderStatus::Paid, 8),
            (OrderStatus::Delivered, 8),
        ] {
            let updated = repo.update_status(order, status).await.unwrap();
            assert_eq!(updated.status, status);
            assert_eq!(stock_of(&pool, dress).await, expected, "after {status}");
        }
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_reopening_without_stock_is_a_conflict(pool: PgPool) {
        let dress = insert_product(&pool, "linen-dress", 2).await;
        let order = insert_order(&pool, dress, 2).await;
        let repo = OrderRepository::new(&pool);

        repo.update_status(order, OrderStatus::Cancelled).await.unwrap();
        sqlx::query("UPDATE shop.products SET stock = 1 WHERE id = $1")
            .bind(dress)
            .execute(&pool)
            .await
            .unwrap();

        let err = repo.update_status(order, OrderStatus::Paid).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        // Nothing changed
        assert_eq!(stock_of(&pool, dress).await, 1);
        let detail = repo.get(order).await.unwrap().unwrap();
        assert_eq!(detail.order.status, OrderStatus::Cancelled);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_unknown_order(pool: PgPool) {
        let err = OrderRepository::new(&pool)
            .update_status(OrderId::new(4242), OrderStatus::Paid)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }
}
