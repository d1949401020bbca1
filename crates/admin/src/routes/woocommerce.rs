//! `WooCommerce` connection settings and product import.

use axum::{Json, extract::State};
use serde_json::json;
use tracing::instrument;

use super::audit;
use crate::db::settings::WOOCOMMERCE;
use crate::db::{ProductRepository, SettingsRepository};
use crate::error::Result;
use crate::middleware::{RequireAdminAuth, RequireWriteAccess};
use crate::services::woocommerce::{ImportReport, SystemStatus, WooSettingsInput, WooSettingsView};
use crate::services::{WooClient, WooCommerceError, WooSettings};
use crate::state::AppState;

async fn stored_settings(state: &AppState) -> Result<Option<WooSettings>> {
    Ok(SettingsRepository::new(state.pool())
        .get_json::<WooSettings>(WOOCOMMERCE)
        .await?)
}

async fn client(state: &AppState) -> Result<WooClient> {
    let settings = stored_settings(state)
        .await?
        .ok_or(WooCommerceError::NotConfigured)?;
    Ok(WooClient::new(settings)?)
}

/// `GET /api/woocommerce/config`
///
/// `null` until settings are saved.
pub async fn config(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
) -> Result<Json<Option<WooSettingsView>>> {
    let settings = stored_settings(&state).await?;
    Ok(Json(settings.as_ref().map(WooSettingsView::from)))
}

/// `PUT /api/woocommerce/config`
///
/// A blank `consumer_secret` keeps the stored one.
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn save_config(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Json(input): Json<WooSettingsInput>,
) -> Result<Json<WooSettingsView>> {
    let settings = input.merge(stored_settings(&state).await?)?;
    SettingsRepository::new(state.pool())
        .put_json(WOOCOMMERCE, &settings)
        .await?;
    audit(
        &state,
        &admin,
        "update",
        "woocommerce_settings",
        None,
        json!({ "url": settings.url }),
    )
    .await;
    Ok(Json(WooSettingsView::from(&settings)))
}

/// `POST /api/woocommerce/test`
#[instrument(skip(state, _admin))]
pub async fn test(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
) -> Result<Json<SystemStatus>> {
    let status = client(&state).await?.test_connection().await?;
    Ok(Json(status))
}

/// `POST /api/woocommerce/import`
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn import(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
) -> Result<Json<ImportReport>> {
    let report = client(&state)
        .await?
        .import(&ProductRepository::new(state.pool()))
        .await?;
    audit(
        &state,
        &admin,
        "import",
        "product",
        None,
        json!({ "imported": report.imported, "updated": report.updated, "skipped": report.skipped }),
    )
    .await;
    Ok(Json(report))
}
