//! Customers as seen from the admin panel.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use atelier_core::{CustomerId, Email};

use super::order::OrderSummary;

/// A customer with the spend aggregates maintained on payment.
#[derive(Debug, Clone, Serialize)]
pub struct Customer {
    pub id: CustomerId,
    pub email: Email,
    pub full_name: String,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub order_count: i32,
    pub total_spent: Decimal,
    pub last_order_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Customer detail page: the customer plus their orders, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerDetail {
    #[serde(flatten)]
    pub customer: Customer,
    pub orders: Vec<OrderSummary>,
}
