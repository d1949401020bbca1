//! Integration tests for the admin API.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//! - The admin server running (cargo run -p atelier-admin)
//! - `ADMIN_TEST_EMAIL` / `ADMIN_TEST_PASSWORD` for an account with write
//!   access
//!
//! Each test cleans up the records it creates.

use atelier_core::OrderStatus;
use atelier_integration_tests::{admin_base_url, admin_client, session_client};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

fn url(path: &str) -> String {
    format!("{}{path}", admin_base_url())
}

async fn get_json(client: &Client, path: &str) -> Value {
    let resp = client.get(url(path)).send().await.expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK, "GET {path}");
    resp.json().await.expect("invalid json")
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_api_requires_session() {
    let client = session_client();
    for path in ["/auth/me", "/api/dashboard", "/api/products", "/api/logs"] {
        let resp = client.get(url(path)).send().await.expect("request failed");
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{path}");
    }
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_login_rejects_bad_password() {
    let resp = session_client()
        .post(url("/auth/login"))
        .json(&json!({ "email": "nobody@example.com", "password": "wrong-password" }))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running admin server and test admin credentials"]
async fn test_login_me_logout() {
    let client = admin_client().await;

    let me = get_json(&client, "/auth/me").await;
    assert!(me["email"].is_string());
    assert!(me["role"].is_string());

    let resp = client
        .post(url("/auth/logout"))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = client.get(url("/auth/me")).send().await.expect("request failed");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Dashboard and logs
// ============================================================================

#[tokio::test]
#[ignore = "Requires running admin server and test admin credentials"]
async fn test_dashboard_shape() {
    let client = admin_client().await;
    let stats = get_json(&client, "/api/dashboard").await;

    for key in [
        "total_revenue",
        "total_orders",
        "orders_by_status",
        "revenue_this_month",
        "total_customers",
        "active_subscribers",
        "low_stock",
        "top_products",
        "recent_orders",
    ] {
        assert!(stats.get(key).is_some(), "missing {key}");
    }
    assert!(stats["top_products"].as_array().expect("top_products").len() <= 5);
    assert!(stats["recent_orders"].as_array().expect("recent_orders").len() <= 10);
}

#[tokio::test]
#[ignore = "Requires running admin server and test admin credentials"]
async fn test_logs_respect_limit() {
    let client = admin_client().await;
    let logs = get_json(&client, "/api/logs?limit=3").await;
    assert!(logs.as_array().expect("logs").len() <= 3);
}

// ============================================================================
// Catalog and content
// ============================================================================

#[tokio::test]
#[ignore = "Requires running admin server and test admin credentials"]
async fn test_product_without_images_is_rejected() {
    let client = admin_client().await;
    let resp = client
        .post(url("/api/products"))
        .json(&json!({
            "name": { "en": "Imageless Tee" },
            "price": "25.00",
            "images": [],
        }))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running admin server and test admin credentials"]
async fn test_banner_toggle_flips_visibility() {
    let client = admin_client().await;

    let resp = client
        .post(url("/api/banners"))
        .json(&json!({
            "title": { "en": "Integration banner" },
            "image_url": "https://cdn.example.com/banner.jpg",
            "is_active": true,
        }))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let banner: Value = resp.json().await.expect("invalid json");
    let id = banner["id"].as_i64().expect("banner id");

    let toggled: Value = client
        .post(url(&format!("/api/banners/{id}/toggle-active")))
        .send()
        .await
        .expect("request failed")
        .json()
        .await
        .expect("invalid json");
    assert_eq!(toggled["is_active"], false);

    let resp = client
        .delete(url(&format!("/api/banners/{id}")))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

// ============================================================================
// Orders and exports
// ============================================================================

#[tokio::test]
#[ignore = "Requires running admin server and test admin credentials"]
async fn test_order_filter_by_status() {
    let client = admin_client().await;
    let status = OrderStatus::Paid.as_str();
    let orders = get_json(&client, &format!("/api/orders?status={status}")).await;

    for order in orders.as_array().expect("orders") {
        assert_eq!(order["status"], status);
    }
}

#[tokio::test]
#[ignore = "Requires running admin server and test admin credentials"]
async fn test_csv_exports() {
    let client = admin_client().await;
    for (path, header) in [
        ("/api/orders/export.csv", "order_number"),
        ("/api/customers/export.csv", "email"),
        ("/api/newsletter/export.csv", "email"),
    ] {
        let resp = client.get(url(path)).send().await.expect("request failed");
        assert_eq!(resp.status(), StatusCode::OK, "{path}");
        assert_eq!(
            resp.headers()["content-type"],
            "text/csv; charset=utf-8",
            "{path}"
        );
        assert!(
            resp.headers()["content-disposition"]
                .to_str()
                .expect("header")
                .starts_with("attachment;")
        );
        let body = resp.text().await.expect("body");
        assert!(body.starts_with(header), "{path}: {body}");
    }
}

// ============================================================================
// Settings
// ============================================================================

#[tokio::test]
#[ignore = "Requires running admin server and test admin credentials"]
async fn test_settings_round_trip() {
    let client = admin_client().await;
    let key = format!("integration_{}", uuid::Uuid::new_v4().simple());

    let resp = client
        .put(url(&format!("/api/settings/{key}")))
        .json(&json!({ "free_shipping_threshold": "150.00" }))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let setting = get_json(&client, &format!("/api/settings/{key}")).await;
    assert_eq!(setting["value"]["free_shipping_threshold"], "150.00");

    let resp = client
        .delete(url(&format!("/api/settings/{key}")))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = client
        .get(url(&format!("/api/settings/{key}")))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running admin server and test admin credentials"]
async fn test_settings_reject_bad_keys() {
    let client = admin_client().await;

    let resp = client
        .put(url("/api/settings/Not-A-Key"))
        .json(&json!(true))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // The WooCommerce credentials have their own endpoint
    let resp = client
        .put(url("/api/settings/woocommerce"))
        .json(&json!({ "consumer_secret": "cs_leak" }))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running admin server and test admin credentials"]
async fn test_woocommerce_config_hides_secret() {
    let client = admin_client().await;
    let config = get_json(&client, "/api/woocommerce/config").await;

    if config.is_object() {
        assert!(config.get("consumer_secret").is_none());
        assert!(config["has_secret"].is_boolean());
    } else {
        assert!(config.is_null());
    }
}
