//! Database operations for the admin panel.
//!
//! The admin reads and writes every table of the `shop` schema. Repositories
//! borrow the shared pool and run runtime-checked `sqlx` queries against
//! private row structs, converting into the domain types in `models`.
//!
//! # Migrations
//!
//! Migrations live in the workspace `migrations/` directory and run via:
//! ```bash
//! cargo run -p atelier-cli -- migrate
//! ```

pub mod admin_logs;
pub mod admin_users;
pub mod banners;
pub mod catalog;
pub mod contact;
pub mod customers;
pub mod newsletter;
pub mod orders;
pub mod popups;
pub mod products;
pub mod settings;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use admin_logs::AdminLogRepository;
pub use admin_users::AdminUserRepository;
pub use banners::BannerRepository;
pub use catalog::CatalogRepository;
pub use contact::ContactRepository;
pub use customers::CustomerRepository;
pub use newsletter::NewsletterRepository;
pub use orders::OrderRepository;
pub use popups::PopupRepository;
pub use products::{ImportOutcome, ProductRepository};
pub use settings::SettingsRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique slug or email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// Input rejected before reaching the database.
    #[error("{0}")]
    Validation(String),
}

impl RepositoryError {
    /// Map unique and foreign-key violations to `Conflict`, keeping other
    /// errors as `Database`.
    pub(crate) fn from_write(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return Self::Conflict(format!("{what} already exists"));
            }
            if db_err.is_foreign_key_violation() {
                return Self::Conflict(format!("{what} references a missing record"));
            }
            if db_err.is_check_violation() {
                return Self::Validation(format!("{what} violates a constraint"));
            }
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Escape `%`, `_` and `\` so user input matches literally inside `ILIKE`.
#[must_use]
pub fn like_pattern(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len() + 2);
    escaped.push('%');
    for c in input.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Turn a `rows_affected` count into `NotFound` when nothing matched.
pub(crate) const fn require_affected(rows: u64) -> Result<(), RepositoryError> {
    if rows == 0 {
        Err(RepositoryError::NotFound)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" robe "), "%robe%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_require_affected() {
        assert!(matches!(require_affected(0), Err(RepositoryError::NotFound)));
        assert!(require_affected(1).is_ok());
    }
}
