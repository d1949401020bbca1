//! Categories and subcategories.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde_json::json;
use tracing::instrument;

use atelier_core::{CategoryId, SubcategoryId};

use super::audit;
use crate::db::CatalogRepository;
use crate::error::Result;
use crate::middleware::{RequireAdminAuth, RequireWriteAccess};
use crate::models::{Category, CategoryInput, Subcategory, SubcategoryInput};
use crate::state::AppState;

/// `GET /api/categories`
pub async fn list_categories(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
) -> Result<Json<Vec<Category>>> {
    let categories = CatalogRepository::new(state.pool()).list_categories().await?;
    Ok(Json(categories))
}

/// `POST /api/categories`
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn create_category(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Json(input): Json<CategoryInput>,
) -> Result<(StatusCode, Json<Category>)> {
    let input = input.validate()?;
    let category = CatalogRepository::new(state.pool())
        .create_category(&input)
        .await?;
    audit(
        &state,
        &admin,
        "create",
        "category",
        Some(category.id.to_string()),
        json!({ "slug": category.slug }),
    )
    .await;
    Ok((StatusCode::CREATED, Json(category)))
}

/// `PUT /api/categories/{id}`
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn update_category(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Path(id): Path<CategoryId>,
    Json(input): Json<CategoryInput>,
) -> Result<Json<Category>> {
    let input = input.validate()?;
    let category = CatalogRepository::new(state.pool())
        .update_category(id, &input)
        .await?;
    audit(
        &state,
        &admin,
        "update",
        "category",
        Some(id.to_string()),
        json!({ "slug": category.slug }),
    )
    .await;
    Ok(Json(category))
}

/// `DELETE /api/categories/{id}`
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete_category(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Path(id): Path<CategoryId>,
) -> Result<StatusCode> {
    CatalogRepository::new(state.pool()).delete_category(id).await?;
    audit(&state, &admin, "delete", "category", Some(id.to_string()), json!({})).await;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/subcategories`
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn create_subcategory(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Json(input): Json<SubcategoryInput>,
) -> Result<(StatusCode, Json<Subcategory>)> {
    let input = input.validate()?;
    let subcategory = CatalogRepository::new(state.pool())
        .create_subcategory(&input)
        .await?;
    audit(
        &state,
        &admin,
        "create",
        "subcategory",
        Some(subcategory.id.to_string()),
        json!({ "category_id": subcategory.category_id, "slug": subcategory.slug }),
    )
    .await;
    Ok((StatusCode::CREATED, Json(subcategory)))
}

/// `PUT /api/subcategories/{id}`
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn update_subcategory(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Path(id): Path<SubcategoryId>,
    Json(input): Json<SubcategoryInput>,
) -> Result<Json<Subcategory>> {
    let input = input.validate()?;
    let subcategory = CatalogRepository::new(state.pool())
        .update_subcategory(id, &input)
        .await?;
    audit(
        &state,
        &admin,
        "update",
        "subcategory",
        Some(id.to_string()),
        json!({ "category_id": subcategory.category_id, "slug": subcategory.slug }),
    )
    .await;
    Ok(Json(subcategory))
}

/// `DELETE /api/subcategories/{id}`
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete_subcategory(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Path(id): Path<SubcategoryId>,
) -> Result<StatusCode> {
    CatalogRepository::new(state.pool())
        .delete_subcategory(id)
        .await?;
    audit(&state, &admin, "delete", "subcategory", Some(id.to_string()), json!({})).await;
    Ok(StatusCode::NO_CONTENT)
}
