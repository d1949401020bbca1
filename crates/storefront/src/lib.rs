//! Atelier Storefront library.
//!
//! This crate provides the storefront functionality as a library,
//! allowing it to be tested and reused.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Router, routing::get};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use state::AppState;

/// Build the storefront application with its middleware stack.
///
/// Sentry layers are added by the binary so tests can build the app
/// without a Sentry client.
pub fn app(state: AppState) -> Router {
    let session_layer = middleware::create_session_layer(state.pool(), state.config());

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes())
        .layer(axum::middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(session_layer)
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity before returning OK.
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::{Path, PathBuf};

    use axum::body::Body;
    use axum::http::Request;
    use rust_decimal::Decimal;
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::config::{PaymentConfig, ShopConfig, StorefrontConfig};
    use crate::content::ContentStore;

    /// App backed by a lazy pool; only routes that never touch the database
    /// can be exercised.
    fn test_app() -> Router {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/atelier_test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            session_secret: SecretString::from("x".repeat(32)),
            content_dir: PathBuf::from("content"),
            payment: PaymentConfig {
                api_url: "https://pay.test".to_string(),
                secret_key: SecretString::from("sk_test_key"),
                signing_secret: SecretString::from("whsig_test_secret"),
            },
            shop: ShopConfig {
                currency: "EUR".to_string(),
                shipping_fee: Decimal::new(700, 2),
                free_shipping_threshold: Decimal::new(10000, 2),
            },
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/atelier_test")
            .unwrap();
        let content =
            ContentStore::load(&Path::new(env!("CARGO_MANIFEST_DIR")).join("content")).unwrap();
        app(AppState::new(config, pool, content).unwrap())
    }

    async fn get(uri: &str) -> axum::response::Response {
        test_app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = get("/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(response.headers()["x-frame-options"], "DENY");
    }

    #[tokio::test]
    async fn test_pages_render_and_404() {
        assert_eq!(get("/pages/terms").await.status(), StatusCode::OK);
        assert_eq!(get("/pages/about?locale=fr").await.status(), StatusCode::OK);
        assert_eq!(get("/pages/nope").await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_checkout_return_rejects_bad_signature() {
        let response = get(
            "/checkout/success?order=AT-260301-ABCDEF&status=paid&reference=cs_1&signature=00ff",
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = get("/checkout/error").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unsubscribe_with_malformed_token() {
        let response = get("/newsletter/unsubscribe?token=not-a-uuid").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
