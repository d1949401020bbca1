//! Audit log.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use crate::db::AdminLogRepository;
use crate::error::Result;
use crate::middleware::RequireAdminAuth;
use crate::models::AdminLog;
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    pub limit: Option<i64>,
}

/// `GET /api/logs?limit=`
pub async fn list(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Query(query): Query<LogQuery>,
) -> Result<Json<Vec<AdminLog>>> {
    let logs = AdminLogRepository::new(state.pool())
        .recent(query.limit.unwrap_or(DEFAULT_LIMIT))
        .await?;
    Ok(Json(logs))
}
