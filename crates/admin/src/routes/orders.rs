//! Order list, detail, status changes and export.

use axum::{
    Json,
    extract::{Path, Query, State},
    response::Response,
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use atelier_core::csv::CsvWriter;
use atelier_core::{OrderId, OrderStatus};

use super::{audit, csv_response};
use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdminAuth, RequireWriteAccess};
use crate::models::{Order, OrderDetail};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
}

/// Body of `PUT /api/orders/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: OrderStatus,
}

/// `GET /api/orders`
#[instrument(skip(state, _admin))]
pub async fn list(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Query(filter): Query<OrderFilter>,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderRepository::new(state.pool()).list(filter.status).await?;
    Ok(Json(orders))
}

/// `GET /api/orders/{id}`
pub async fn show(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderDetail>> {
    OrderRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))
}

/// `PUT /api/orders/{id}/status`
///
/// Moving an order into a status that releases stock puts its items back
/// on the shelf.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Path(id): Path<OrderId>,
    Json(body): Json<StatusBody>,
) -> Result<Json<Order>> {
    let order = OrderRepository::new(state.pool())
        .update_status(id, body.status)
        .await?;
    audit(
        &state,
        &admin,
        "update_status",
        "order",
        Some(id.to_string()),
        json!({ "order_number": order.order_number, "status": body.status }),
    )
    .await;
    Ok(Json(order))
}

/// `GET /api/orders/export.csv`
#[instrument(skip(state, _admin))]
pub async fn export(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Query(filter): Query<OrderFilter>,
) -> Result<Response> {
    let orders = OrderRepository::new(state.pool()).list(filter.status).await?;
    Ok(csv_response("orders", orders_csv(&orders)))
}

fn orders_csv(orders: &[Order]) -> String {
    let mut csv = CsvWriter::new([
        "order_number",
        "created_at",
        "full_name",
        "email",
        "phone",
        "city",
        "shipping_address",
        "subtotal",
        "shipping_fee",
        "total",
        "currency",
        "status",
        "payment_status",
    ]);
    for o in orders {
        csv.push([
            o.order_number.clone(),
            o.created_at.to_rfc3339(),
            o.full_name.clone(),
            o.email.clone(),
            o.phone.clone(),
            o.city.clone(),
            o.shipping_address.clone(),
            o.subtotal.to_string(),
            o.shipping_fee.to_string(),
            o.total.to_string(),
            o.currency.clone(),
            o.status.as_str().to_owned(),
            o.payment_status.as_str().to_owned(),
        ]);
    }
    csv.finish()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use atelier_core::PaymentStatus;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_orders_csv_row() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let order = Order {
            id: OrderId::new(9),
            order_number: "AT-260301-ABC123".to_owned(),
            customer_id: None,
            email: "lina@example.com".to_owned(),
            full_name: "Lina".to_owned(),
            phone: "0612345678".to_owned(),
            shipping_address: "12 rue de la Paix".to_owned(),
            city: "Paris".to_owned(),
            notes: None,
            currency: "EUR".to_owned(),
            subtotal: Decimal::new(9000, 2),
            shipping_fee: Decimal::new(700, 2),
            total: Decimal::new(9700, 2),
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_reference: None,
            paid_at: None,
            created_at: at,
            updated_at: at,
        };
        let csv = orders_csv(&[order]);
        assert_eq!(
            csv.split("\r\n").nth(1).unwrap(),
            "AT-260301-ABC123,2026-03-01T12:00:00+00:00,Lina,lina@example.com,0612345678,\
             Paris,12 rue de la Paix,90.00,7.00,97.00,EUR,pending,pending"
        );
    }
}
