//! Homepage payload.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
};
use tracing::instrument;

use super::LocaleQuery;
use crate::db::{CatalogRepository, ContentRepository};
use crate::error::Result;
use crate::models::{HomeResponse, HomepageSettings};
use crate::state::AppState;

/// `site_settings` key holding the homepage copy.
const HOMEPAGE_SETTING: &str = "homepage";

/// `GET /api/home`
///
/// Served from a per-locale cache; a cache miss reads settings, banners,
/// featured products and popups.
#[instrument(skip(state))]
pub async fn home(
    State(state): State<AppState>,
    Query(query): Query<LocaleQuery>,
) -> Result<Json<Arc<HomeResponse>>> {
    let locale = query.locale;

    if let Some(cached) = state.home_cache().get(&locale).await {
        return Ok(Json(cached));
    }

    let content = ContentRepository::new(state.pool());
    let settings = HomepageSettings::from_json(content.setting(HOMEPAGE_SETTING).await?);
    let banners = content.active_banners(None).await?;
    let popups = content.active_popups().await?;
    let featured = CatalogRepository::new(state.pool())
        .featured_products(settings.featured_limit())
        .await?;

    let response = Arc::new(HomeResponse::new(
        &settings, &banners, &featured, &popups, locale,
    ));
    state.home_cache().insert(locale, Arc::clone(&response)).await;

    Ok(Json(response))
}
