//! Admin users and the audit log.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;

use atelier_core::{AdminLogId, AdminRole, AdminUserId, Email};

/// An admin user.
///
/// The password hash never leaves the server.
#[derive(Debug, Clone, Serialize)]
pub struct AdminUser {
    pub id: AdminUserId,
    pub email: Email,
    pub name: String,
    pub role: AdminRole,
    #[serde(skip)]
    pub password_hash: String,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// One audit log entry.
#[derive(Debug, Clone, Serialize)]
pub struct AdminLog {
    pub id: AdminLogId,
    pub admin_user_id: Option<AdminUserId>,
    /// Name of the admin at read time; `None` once the admin is deleted.
    pub admin_name: Option<String>,
    pub action: String,
    pub entity: String,
    pub entity_id: Option<String>,
    pub details: JsonValue,
    pub created_at: DateTime<Utc>,
}
