//! Atelier Admin library.
//!
//! This crate provides the admin API as a library, allowing it to be tested
//! and reused.
//!
//! # Security
//!
//! This crate has write access to every table of the `shop` schema, the
//! `WooCommerce` credentials and the SMTP relay. Bind it to a private
//! interface; the storefront never links against it.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
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

/// Build the admin application with its middleware stack.
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
    use axum::body::Body;
    use axum::http::{Method, Request, header};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::config::tests::test_config;
    use crate::services::NewsletterFeed;

    /// App backed by a lazy pool. Only requests rejected before any query
    /// can be exercised.
    fn test_app() -> Router {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/atelier_test")
            .unwrap();
        app(AppState::new(test_config(), pool, NewsletterFeed::new()).unwrap())
    }

    async fn send(method: Method, uri: &str, body: Body) -> axum::response::Response {
        test_app()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(body)
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = send(Method::GET, "/health", Body::empty()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(response.headers()["cache-control"], "no-store");
    }

    #[tokio::test]
    async fn test_api_requires_login() {
        for (method, uri) in [
            (Method::GET, "/auth/me"),
            (Method::GET, "/api/dashboard"),
            (Method::GET, "/api/products"),
            (Method::GET, "/api/newsletter/events"),
            (Method::GET, "/api/orders/export.csv"),
            (Method::GET, "/api/logs?limit=5"),
            (Method::POST, "/api/banners/reorder"),
            (Method::DELETE, "/api/settings/homepage"),
            (Method::POST, "/api/woocommerce/import"),
        ] {
            let response = send(method.clone(), uri, Body::from("{}")).await;
            assert_eq!(
                response.status(),
                StatusCode::UNAUTHORIZED,
                "{method} {uri}"
            );
        }
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let response = send(Method::GET, "/api/nope", Body::empty()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
