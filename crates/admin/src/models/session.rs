//! Session-stored admin identity.

use serde::{Deserialize, Serialize};

use atelier_core::{AdminRole, AdminUserId, Email};

use super::AdminUser;

/// The logged-in admin, as stored in the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentAdmin {
    pub id: AdminUserId,
    pub email: Email,
    pub name: String,
    pub role: AdminRole,
}

impl CurrentAdmin {
    /// Whether this admin may change store data.
    #[must_use]
    pub const fn can_write(&self) -> bool {
        self.role.can_write()
    }
}

impl From<&AdminUser> for CurrentAdmin {
    fn from(user: &AdminUser) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
        }
    }
}

/// Session keys for admin authentication data.
pub mod keys {
    /// Key for storing the current logged-in admin.
    pub const CURRENT_ADMIN: &str = "current_admin";
}
