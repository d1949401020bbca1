//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! ATELIER_ADMIN_PASSWORD='...' at-cli admin create -e admin@example.com -n "Admin Name" -r super_admin
//! ```

use atelier_admin::services::{AdminAuthError, AdminAuthService};
use atelier_core::AdminRole;
use thiserror::Error;

use super::migrate::database_url;

/// Environment variable holding the new admin's password.
pub const PASSWORD_ENV: &str = "ATELIER_ADMIN_PASSWORD";

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("Missing environment variable: DATABASE_URL")]
    MissingDatabaseUrl,

    #[error("No password given: pass --password or set {PASSWORD_ENV}")]
    MissingPassword,

    #[error("Invalid role: {0}. Valid roles: super_admin, admin, viewer")]
    InvalidRole(String),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Auth(#[from] AdminAuthError),
}

/// Pick the flag, else the environment.
fn resolve_password(flag: Option<String>, env: Option<String>) -> Result<String, AdminError> {
    flag.or(env)
        .filter(|p| !p.is_empty())
        .ok_or(AdminError::MissingPassword)
}

/// Create a new admin user with an Argon2id password hash.
///
/// # Errors
///
/// Returns an error for an unknown role, a missing or weak password, an
/// invalid or taken email, or a database failure.
pub async fn create_user(
    email: &str,
    name: &str,
    role: &str,
    password: Option<String>,
) -> Result<(), AdminError> {
    let role: AdminRole = role
        .parse()
        .map_err(|_| AdminError::InvalidRole(role.to_owned()))?;
    let password = resolve_password(password, std::env::var(PASSWORD_ENV).ok())?;
    let url = database_url().ok_or(AdminError::MissingDatabaseUrl)?;

    let pool = atelier_admin::db::create_pool(&url).await?;
    let user = AdminAuthService::new(&pool)
        .create_admin(email, name, role, &password)
        .await?;

    tracing::info!(
        "Admin user created. ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_wins_over_env() {
        let password = resolve_password(Some("from-flag".into()), Some("from-env".into()));
        assert_eq!(password.ok().as_deref(), Some("from-flag"));
    }

    #[test]
    fn test_env_fallback_and_missing() {
        let password = resolve_password(None, Some("from-env".into()));
        assert_eq!(password.ok().as_deref(), Some("from-env"));
        assert!(matches!(
            resolve_password(Some(String::new()), None),
            Err(AdminError::MissingPassword)
        ));
    }
}
