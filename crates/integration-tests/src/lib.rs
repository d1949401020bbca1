//! Integration tests for the Atelier storefront and admin.
//!
//! The tests drive running servers over HTTP and are `#[ignore]`d by
//! default.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the database and apply migrations
//! task db:start
//! cargo run -p atelier-cli -- migrate
//!
//! # Create the test admin
//! cargo run -p atelier-cli -- admin create --email test@atelier.local --name Test
//!
//! # Start both servers, then
//! cargo test -p atelier-integration-tests -- --ignored
//! ```
//!
//! # Environment
//!
//! - `STOREFRONT_BASE_URL` (default `http://localhost:3000`)
//! - `ADMIN_BASE_URL` (default `http://localhost:3001`)
//! - `ADMIN_TEST_EMAIL` / `ADMIN_TEST_PASSWORD` - a `super_admin` or `admin`
//!   account for the admin tests

use reqwest::{Client, StatusCode};
use serde_json::json;

/// Base URL for the storefront.
#[must_use]
pub fn storefront_base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Base URL for the admin API.
#[must_use]
pub fn admin_base_url() -> String {
    std::env::var("ADMIN_BASE_URL").unwrap_or_else(|_| "http://localhost:3001".to_string())
}

/// A client that keeps session cookies between requests.
///
/// # Panics
///
/// Panics if the TLS backend cannot be initialized.
#[must_use]
pub fn session_client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// Test admin credentials from the environment.
///
/// # Panics
///
/// Panics if `ADMIN_TEST_EMAIL` or `ADMIN_TEST_PASSWORD` is unset.
#[must_use]
pub fn admin_credentials() -> (String, String) {
    let email = std::env::var("ADMIN_TEST_EMAIL").expect("ADMIN_TEST_EMAIL must be set");
    let password = std::env::var("ADMIN_TEST_PASSWORD").expect("ADMIN_TEST_PASSWORD must be set");
    (email, password)
}

/// A client logged in to the admin API as the test admin.
///
/// # Panics
///
/// Panics if the admin server is unreachable or rejects the credentials.
pub async fn admin_client() -> Client {
    let client = session_client();
    let (email, password) = admin_credentials();

    let resp = client
        .post(format!("{}/auth/login", admin_base_url()))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to reach admin server");
    assert_eq!(resp.status(), StatusCode::OK, "admin login failed");

    client
}

/// A unique address for records a test creates.
#[must_use]
pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@example.com", uuid::Uuid::new_v4().simple())
}
