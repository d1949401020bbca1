//! Audit trail of admin mutations.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::PgPool;

use atelier_core::{AdminLogId, AdminUserId};

use super::RepositoryError;
use crate::models::AdminLog;

/// Largest page the log endpoint returns.
pub const MAX_LOG_LIMIT: i64 = 500;

#[derive(Debug, sqlx::FromRow)]
struct AdminLogRow {
    id: i32,
    admin_user_id: Option<i32>,
    admin_name: Option<String>,
    action: String,
    entity: String,
    entity_id: Option<String>,
    details: JsonValue,
    created_at: DateTime<Utc>,
}

impl From<AdminLogRow> for AdminLog {
    fn from(row: AdminLogRow) -> Self {
        Self {
            id: AdminLogId::new(row.id),
            admin_user_id: row.admin_user_id.map(AdminUserId::new),
            admin_name: row.admin_name,
            action: row.action,
            entity: row.entity,
            entity_id: row.entity_id,
            details: row.details,
            created_at: row.created_at,
        }
    }
}

/// Repository for the admin audit log.
pub struct AdminLogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AdminLogRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Append an entry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn record(
        &self,
        admin_user_id: AdminUserId,
        action: &str,
        entity: &str,
        entity_id: Option<&str>,
        details: &JsonValue,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO shop.admin_logs (admin_user_id, action, entity, entity_id, details) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(admin_user_id.as_i32())
        .bind(action)
        .bind(entity)
        .bind(entity_id)
        .bind(details)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// The most recent entries, newest first. `limit` is clamped to
    /// `1..=MAX_LOG_LIMIT`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent(&self, limit: i64) -> Result<Vec<AdminLog>, RepositoryError> {
        let rows = sqlx::query_as::<_, AdminLogRow>(
            "SELECT l.id, l.admin_user_id, u.name AS admin_name, l.action, l.entity, \
                    l.entity_id, l.details, l.created_at \
             FROM shop.admin_logs l \
             LEFT JOIN shop.admin_users u ON u.id = l.admin_user_id \
             ORDER BY l.created_at DESC, l.id DESC \
             LIMIT $1",
        )
        .bind(limit.clamp(1, MAX_LOG_LIMIT))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
