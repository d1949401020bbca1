//! Homepage banners and marketing popups.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde_json::json;
use tracing::instrument;

use atelier_core::{BannerId, PopupId};

use super::audit;
use super::products::ToggleResponse;
use crate::db::{BannerRepository, PopupRepository};
use crate::error::Result;
use crate::middleware::{RequireAdminAuth, RequireWriteAccess};
use crate::models::{Banner, BannerInput, Popup, PopupInput, ReorderBody};
use crate::state::AppState;

// =============================================================================
// Banners
// =============================================================================

/// `GET /api/banners`
pub async fn list_banners(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
) -> Result<Json<Vec<Banner>>> {
    Ok(Json(BannerRepository::new(state.pool()).list().await?))
}

/// `POST /api/banners`
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn create_banner(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Json(input): Json<BannerInput>,
) -> Result<(StatusCode, Json<Banner>)> {
    let input = input.validate()?;
    let banner = BannerRepository::new(state.pool()).create(&input).await?;
    audit(
        &state,
        &admin,
        "create",
        "banner",
        Some(banner.id.to_string()),
        json!({ "position": banner.position }),
    )
    .await;
    Ok((StatusCode::CREATED, Json(banner)))
}

/// `PUT /api/banners/{id}`
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn update_banner(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Path(id): Path<BannerId>,
    Json(input): Json<BannerInput>,
) -> Result<Json<Banner>> {
    let input = input.validate()?;
    let banner = BannerRepository::new(state.pool()).update(id, &input).await?;
    audit(&state, &admin, "update", "banner", Some(id.to_string()), json!({})).await;
    Ok(Json(banner))
}

/// `DELETE /api/banners/{id}`
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete_banner(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Path(id): Path<BannerId>,
) -> Result<StatusCode> {
    BannerRepository::new(state.pool()).delete(id).await?;
    audit(&state, &admin, "delete", "banner", Some(id.to_string()), json!({})).await;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/banners/{id}/toggle-active`
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn toggle_banner(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Path(id): Path<BannerId>,
) -> Result<Json<ToggleResponse>> {
    let is_active = BannerRepository::new(state.pool()).toggle_active(id).await?;
    audit(
        &state,
        &admin,
        "toggle_active",
        "banner",
        Some(id.to_string()),
        json!({ "is_active": is_active }),
    )
    .await;
    Ok(Json(ToggleResponse { is_active }))
}

/// `POST /api/banners/reorder`
///
/// The listed banners get `sort_order` 0, 1, 2... in list order.
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id, count = body.ids.len()))]
pub async fn reorder_banners(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Json(body): Json<ReorderBody>,
) -> Result<StatusCode> {
    body.validate()?;
    BannerRepository::new(state.pool()).reorder(&body.ids).await?;
    audit(&state, &admin, "reorder", "banner", None, json!({ "ids": body.ids })).await;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Popups
// =============================================================================

/// `GET /api/popups`
pub async fn list_popups(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
) -> Result<Json<Vec<Popup>>> {
    Ok(Json(PopupRepository::new(state.pool()).list().await?))
}

/// `POST /api/popups`
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn create_popup(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Json(input): Json<PopupInput>,
) -> Result<(StatusCode, Json<Popup>)> {
    let input = input.validate()?;
    let popup = PopupRepository::new(state.pool()).create(&input).await?;
    audit(
        &state,
        &admin,
        "create",
        "popup",
        Some(popup.id.to_string()),
        json!({ "kind": popup.kind }),
    )
    .await;
    Ok((StatusCode::CREATED, Json(popup)))
}

/// `PUT /api/popups/{id}`
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn update_popup(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Path(id): Path<PopupId>,
    Json(input): Json<PopupInput>,
) -> Result<Json<Popup>> {
    let input = input.validate()?;
    let popup = PopupRepository::new(state.pool()).update(id, &input).await?;
    audit(&state, &admin, "update", "popup", Some(id.to_string()), json!({})).await;
    Ok(Json(popup))
}

/// `DELETE /api/popups/{id}`
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete_popup(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Path(id): Path<PopupId>,
) -> Result<StatusCode> {
    PopupRepository::new(state.pool()).delete(id).await?;
    audit(&state, &admin, "delete", "popup", Some(id.to_string()), json!({})).await;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/popups/{id}/toggle-active`
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn toggle_popup(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Path(id): Path<PopupId>,
) -> Result<Json<ToggleResponse>> {
    let is_active = PopupRepository::new(state.pool()).toggle_active(id).await?;
    audit(
        &state,
        &admin,
        "toggle_active",
        "popup",
        Some(id.to_string()),
        json!({ "is_active": is_active }),
    )
    .await;
    Ok(Json(ToggleResponse { is_active }))
}
