//! Product management.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use atelier_core::ProductId;

use super::audit;
use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdminAuth, RequireWriteAccess};
use crate::models::{DiscountBody, Product, ProductInput, ProductQuery};
use crate::state::AppState;

const ENTITY: &str = "product";

/// Body of `POST /api/products/{id}/stock`.
#[derive(Debug, Deserialize)]
pub struct StockBody {
    pub stock: i32,
}

/// Response of the toggle endpoint.
#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub is_active: bool,
}

/// `GET /api/products`
#[instrument(skip(state, _admin))]
pub async fn list(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<Product>>> {
    let products = ProductRepository::new(state.pool()).list(&query).await?;
    Ok(Json(products))
}

/// `GET /api/products/{id}`
pub async fn show(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    ProductRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))
}

/// `POST /api/products`
///
/// Validation runs before any query, so a product without images never
/// reaches the database.
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Json(input): Json<ProductInput>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = input.validate()?;
    let created = ProductRepository::new(state.pool()).create(&product).await?;

    audit(
        &state,
        &admin,
        "create",
        ENTITY,
        Some(created.id.to_string()),
        json!({ "slug": created.slug }),
    )
    .await;

    Ok((StatusCode::CREATED, Json(created)))
}

/// `PUT /api/products/{id}`
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Path(id): Path<ProductId>,
    Json(input): Json<ProductInput>,
) -> Result<Json<Product>> {
    let product = input.validate()?;
    let updated = ProductRepository::new(state.pool()).update(id, &product).await?;

    audit(
        &state,
        &admin,
        "update",
        ENTITY,
        Some(id.to_string()),
        json!({ "slug": updated.slug }),
    )
    .await;

    Ok(Json(updated))
}

/// `DELETE /api/products/{id}`
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    ProductRepository::new(state.pool()).delete(id).await?;
    audit(&state, &admin, "delete", ENTITY, Some(id.to_string()), json!({})).await;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/products/{id}/toggle-active`
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn toggle_active(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Path(id): Path<ProductId>,
) -> Result<Json<ToggleResponse>> {
    let is_active = ProductRepository::new(state.pool()).toggle_active(id).await?;
    audit(
        &state,
        &admin,
        "toggle_active",
        ENTITY,
        Some(id.to_string()),
        json!({ "is_active": is_active }),
    )
    .await;
    Ok(Json(ToggleResponse { is_active }))
}

/// `POST /api/products/{id}/discount`
///
/// `{"percent": 20}` or `{"sale_price": "79.90"}`; an empty body clears the
/// discount.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn set_discount(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Path(id): Path<ProductId>,
    Json(body): Json<DiscountBody>,
) -> Result<Json<Product>> {
    let discount = body.discount()?;
    let product = ProductRepository::new(state.pool())
        .set_discount(id, discount)
        .await?;

    audit(
        &state,
        &admin,
        "set_discount",
        ENTITY,
        Some(id.to_string()),
        json!({ "sale_price": product.sale_price, "discount_percent": product.discount_percent }),
    )
    .await;

    Ok(Json(product))
}

/// `POST /api/products/{id}/stock`
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn set_stock(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Path(id): Path<ProductId>,
    Json(body): Json<StockBody>,
) -> Result<StatusCode> {
    ProductRepository::new(state.pool())
        .set_stock(id, body.stock)
        .await?;
    audit(
        &state,
        &admin,
        "set_stock",
        ENTITY,
        Some(id.to_string()),
        json!({ "stock": body.stock }),
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}
