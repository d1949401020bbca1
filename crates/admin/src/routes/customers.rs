//! Customer list, detail and export.

use axum::{
    Json,
    extract::{Path, Query, State},
    response::Response,
};
use serde::Deserialize;
use tracing::instrument;

use atelier_core::CustomerId;
use atelier_core::csv::CsvWriter;

use super::csv_response;
use crate::db::{CustomerRepository, OrderRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdminAuth;
use crate::models::{Customer, CustomerDetail};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CustomerSearch {
    pub search: Option<String>,
}

/// `GET /api/customers`
#[instrument(skip(state, _admin))]
pub async fn list(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Query(query): Query<CustomerSearch>,
) -> Result<Json<Vec<Customer>>> {
    let customers = CustomerRepository::new(state.pool())
        .list(query.search.as_deref())
        .await?;
    Ok(Json(customers))
}

/// `GET /api/customers/{id}`
pub async fn show(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Path(id): Path<CustomerId>,
) -> Result<Json<CustomerDetail>> {
    let customer = CustomerRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("customer {id}")))?;
    let orders = OrderRepository::new(state.pool()).for_customer(id).await?;
    Ok(Json(CustomerDetail { customer, orders }))
}

/// `GET /api/customers/export.csv`
#[instrument(skip(state, _admin))]
pub async fn export(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Query(query): Query<CustomerSearch>,
) -> Result<Response> {
    let customers = CustomerRepository::new(state.pool())
        .list(query.search.as_deref())
        .await?;
    Ok(csv_response("customers", customers_csv(&customers)))
}

fn customers_csv(customers: &[Customer]) -> String {
    let mut csv = CsvWriter::new([
        "email",
        "full_name",
        "phone",
        "city",
        "address",
        "order_count",
        "total_spent",
        "last_order_at",
        "created_at",
    ]);
    for c in customers {
        csv.push([
            c.email.as_str().to_owned(),
            c.full_name.clone(),
            c.phone.clone().unwrap_or_default(),
            c.city.clone().unwrap_or_default(),
            c.address.clone().unwrap_or_default(),
            c.order_count.to_string(),
            c.total_spent.to_string(),
            c.last_order_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
            c.created_at.to_rfc3339(),
        ]);
    }
    csv.finish()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use atelier_core::Email;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_phone_numbers_are_not_formulas() {
        let customer = Customer {
            id: CustomerId::new(3),
            email: Email::parse("sam@example.com").unwrap(),
            full_name: "Sam".to_owned(),
            phone: Some("+33612345678".to_owned()),
            city: Some("Lyon".to_owned()),
            address: None,
            order_count: 2,
            total_spent: Decimal::new(15990, 2),
            last_order_at: None,
            created_at: Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
        };
        let csv = customers_csv(&[customer]);
        let row = csv.split("\r\n").nth(1).unwrap();
        assert!(row.starts_with("sam@example.com,Sam,+33612345678,Lyon,,2,159.90,,"));
    }
}
