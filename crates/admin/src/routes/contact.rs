//! Contact form inbox.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use atelier_core::ContactMessageId;

use super::audit;
use crate::db::ContactRepository;
use crate::db::contact::ContactMessage;
use crate::error::Result;
use crate::middleware::{RequireAdminAuth, RequireWriteAccess};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct InboxFilter {
    #[serde(default)]
    pub unread: bool,
}

/// `GET /api/contact?unread=true`
pub async fn list(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Query(filter): Query<InboxFilter>,
) -> Result<Json<Vec<ContactMessage>>> {
    let messages = ContactRepository::new(state.pool()).list(filter.unread).await?;
    Ok(Json(messages))
}

/// `POST /api/contact/{id}/read`
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn mark_read(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Path(id): Path<ContactMessageId>,
) -> Result<StatusCode> {
    ContactRepository::new(state.pool()).mark_read(id).await?;
    audit(&state, &admin, "mark_read", "contact_message", Some(id.to_string()), json!({})).await;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /api/contact/{id}`
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Path(id): Path<ContactMessageId>,
) -> Result<StatusCode> {
    ContactRepository::new(state.pool()).delete(id).await?;
    audit(&state, &admin, "delete", "contact_message", Some(id.to_string()), json!({})).await;
    Ok(StatusCode::NO_CONTENT)
}
