//! Orders and order lines.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use atelier_core::{CustomerId, OrderId, OrderItemId, OrderStatus, PaymentStatus, ProductId};

/// A full order row.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub customer_id: Option<CustomerId>,
    pub email: String,
    pub full_name: String,
    pub phone: String,
    pub shipping_address: String,
    pub city: String,
    pub notes: Option<String>,
    pub currency: String,
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub total: Decimal,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_reference: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// The list-row view of this order.
    #[must_use]
    pub fn summary(&self) -> OrderSummary {
        OrderSummary {
            id: self.id,
            order_number: self.order_number.clone(),
            full_name: self.full_name.clone(),
            email: self.email.clone(),
            total: self.total,
            currency: self.currency.clone(),
            status: self.status,
            payment_status: self.payment_status,
            created_at: self.created_at,
        }
    }
}

/// One line of an order. Product name and price are captured at checkout.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub size: Option<String>,
    pub color: Option<String>,
    pub unit_price: Decimal,
    pub quantity: i32,
}

/// Order detail page: the order plus its lines.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Compact order row for lists and the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct OrderSummary {
    pub id: OrderId,
    pub order_number: String,
    pub full_name: String,
    pub email: String,
    pub total: Decimal,
    pub currency: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

/// An order line joined with its order's status, for sales aggregation.
#[derive(Debug, Clone)]
pub struct SoldItem {
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub quantity: i32,
    pub status: OrderStatus,
}
