//! Catalog and content JSON endpoints.

use atelier_core::BannerPosition;
use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::LocaleQuery;
use crate::db::{CatalogRepository, ContentRepository};
use crate::error::{AppError, Result};
use crate::models::ProductFilter;
use crate::models::catalog::{CategoryView, ProductView};
use crate::models::content::{BannerView, PopupView};
use crate::state::AppState;

/// A page of products.
#[derive(Debug, Serialize)]
pub struct ProductListResponse {
    pub items: Vec<ProductView>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
    pub total_pages: i64,
}

/// `GET /api/categories`
#[instrument(skip(state))]
pub async fn categories(
    State(state): State<AppState>,
    Query(query): Query<LocaleQuery>,
) -> Result<Json<Vec<CategoryView>>> {
    let categories = CatalogRepository::new(state.pool()).categories().await?;
    Ok(Json(
        categories
            .iter()
            .map(|c| CategoryView::new(c, query.locale))
            .collect(),
    ))
}

/// `GET /api/products`
#[instrument(skip(state))]
pub async fn products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<ProductListResponse>> {
    let page = CatalogRepository::new(state.pool())
        .list_products(&filter)
        .await?;

    let per_page = i64::from(page.per_page);
    Ok(Json(ProductListResponse {
        items: page
            .items
            .iter()
            .map(|p| ProductView::new(p, filter.locale))
            .collect(),
        page: page.page,
        per_page: page.per_page,
        total: page.total,
        total_pages: (page.total + per_page - 1) / per_page,
    }))
}

/// `GET /api/products/{slug}`
#[instrument(skip(state))]
pub async fn product(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<LocaleQuery>,
) -> Result<Json<ProductView>> {
    let product = CatalogRepository::new(state.pool())
        .product_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {slug}")))?;

    Ok(Json(ProductView::new(&product, query.locale)))
}

/// Query for `GET /api/banners`.
#[derive(Debug, Deserialize)]
pub struct BannerQuery {
    pub position: Option<BannerPosition>,
    #[serde(default)]
    pub locale: atelier_core::Locale,
}

/// `GET /api/banners`
#[instrument(skip(state))]
pub async fn banners(
    State(state): State<AppState>,
    Query(query): Query<BannerQuery>,
) -> Result<Json<Vec<BannerView>>> {
    let banners = ContentRepository::new(state.pool())
        .active_banners(query.position)
        .await?;
    Ok(Json(
        banners
            .iter()
            .map(|b| BannerView::new(b, query.locale))
            .collect(),
    ))
}

/// `GET /api/popups`
#[instrument(skip(state))]
pub async fn popups(
    State(state): State<AppState>,
    Query(query): Query<LocaleQuery>,
) -> Result<Json<Vec<PopupView>>> {
    let popups = ContentRepository::new(state.pool()).active_popups().await?;
    Ok(Json(
        popups
            .iter()
            .map(|p| PopupView::new(p, query.locale))
            .collect(),
    ))
}
