//! Database migration command.
//!
//! Storefront and admin share one database (schema `shop`), so there is a
//! single migration set in the workspace `migrations/` directory.
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `ADMIN_DATABASE_URL`, then `STOREFRONT_DATABASE_URL`)

use secrecy::SecretString;
use thiserror::Error;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Missing environment variable: DATABASE_URL")]
    MissingDatabaseUrl,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

const URL_VARS: [&str; 3] = ["DATABASE_URL", "ADMIN_DATABASE_URL", "STOREFRONT_DATABASE_URL"];

/// First database URL found in the environment.
pub fn database_url() -> Option<SecretString> {
    dotenvy::dotenv().ok();
    URL_VARS
        .iter()
        .find_map(|key| std::env::var(key).ok().filter(|v| !v.trim().is_empty()))
        .map(SecretString::from)
}

/// Apply pending migrations.
///
/// # Errors
///
/// Returns an error if no database URL is set, the connection fails or a
/// migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let url = database_url().ok_or(MigrationError::MissingDatabaseUrl)?;

    tracing::info!("Connecting to database...");
    let pool = atelier_admin::db::create_pool(&url).await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../../migrations").run(&pool).await?;

    tracing::info!("Migrations complete");
    Ok(())
}
