//! Integration tests for the public storefront API.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//! - The storefront running (cargo run -p atelier-storefront)
//! - At least one active product for the cart tests

use atelier_integration_tests::{session_client, storefront_base_url, unique_email};
use reqwest::StatusCode;
use serde_json::{Value, json};

fn url(path: &str) -> String {
    format!("{}{path}", storefront_base_url())
}

/// First active product in stock, with the options a cart line needs.
async fn first_product(client: &reqwest::Client) -> Option<Value> {
    let body: Value = client
        .get(url("/api/products?per_page=50"))
        .send()
        .await
        .expect("Failed to list products")
        .json()
        .await
        .expect("Invalid product list");

    body["items"]
        .as_array()?
        .iter()
        .find(|p| p["in_stock"] == true)
        .cloned()
}

fn line_for(product: &Value, quantity: u32) -> Value {
    json!({
        "product_id": product["id"],
        "size": product["sizes"].get(0),
        "color": product["colors"].get(0),
        "quantity": quantity,
    })
}

// ============================================================================
// Health and catalog
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_health_endpoints() {
    let client = session_client();

    let resp = client.get(url("/health")).send().await.expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));

    let resp = client
        .get(url("/health/ready"))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_home_payload() {
    let body: Value = session_client()
        .get(url("/api/home?locale=fr"))
        .send()
        .await
        .expect("request failed")
        .json()
        .await
        .expect("invalid json");

    assert!(body.is_object());
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_product_list_paginates() {
    let body: Value = session_client()
        .get(url("/api/products?page=1&per_page=2"))
        .send()
        .await
        .expect("request failed")
        .json()
        .await
        .expect("invalid json");

    assert_eq!(body["page"], 1);
    assert_eq!(body["per_page"], 2);
    assert!(body["items"].as_array().expect("items").len() <= 2);
    assert!(body["total_pages"].as_i64().expect("total_pages") >= 0);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_unknown_product_is_404() {
    let resp = session_client()
        .get(url("/api/products/no-such-product-slug"))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_categories_and_content_lists() {
    let client = session_client();
    for path in ["/api/categories", "/api/banners", "/api/popups"] {
        let resp = client.get(url(path)).send().await.expect("request failed");
        assert_eq!(resp.status(), StatusCode::OK, "{path}");
        let body: Value = resp.json().await.expect("invalid json");
        assert!(body.is_array(), "{path} should return an array");
    }
}

// ============================================================================
// Cart
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server and an active product"]
async fn test_cart_add_update_remove() {
    let client = session_client();
    let Some(product) = first_product(&client).await else {
        return;
    };

    let cart: Value = client
        .post(url("/api/cart/items"))
        .json(&line_for(&product, 1))
        .send()
        .await
        .expect("add failed")
        .json()
        .await
        .expect("invalid json");
    assert_eq!(cart["item_count"], 1);

    // Same line again merges
    let cart: Value = client
        .post(url("/api/cart/items"))
        .json(&line_for(&product, 1))
        .send()
        .await
        .expect("add failed")
        .json()
        .await
        .expect("invalid json");
    assert_eq!(cart["item_count"], 2);
    assert_eq!(cart["lines"].as_array().expect("lines").len(), 1);

    // The cart survives across requests in the session
    let cart: Value = client
        .get(url("/api/cart"))
        .send()
        .await
        .expect("show failed")
        .json()
        .await
        .expect("invalid json");
    assert_eq!(cart["item_count"], 2);

    // Quantity zero removes the line
    let cart: Value = client
        .patch(url("/api/cart/items"))
        .json(&line_for(&product, 0))
        .send()
        .await
        .expect("update failed")
        .json()
        .await
        .expect("invalid json");
    assert_eq!(cart["item_count"], 0);
    assert!(cart["lines"].as_array().expect("lines").is_empty());
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_cart_rejects_unknown_product() {
    let resp = session_client()
        .post(url("/api/cart/items"))
        .json(&json!({ "product_id": 2_000_000_000, "quantity": 1 }))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_checkout_with_empty_cart_fails() {
    let resp = session_client()
        .post(url("/api/checkout"))
        .json(&json!({
            "email": unique_email("checkout"),
            "name": "Test Buyer",
            "phone": "+33600000000",
            "address": "1 rue de Test",
            "city": "Paris",
            "postal_code": "75001",
            "country": "FR",
        }))
        .send()
        .await
        .expect("request failed");
    assert!(resp.status().is_client_error());
}

// ============================================================================
// Newsletter and contact
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_newsletter_subscribe_twice() {
    let client = session_client();
    let email = unique_email("newsletter");

    let resp = client
        .post(url("/api/newsletter/subscribe"))
        .json(&json!({ "email": email, "source": "integration" }))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = client
        .post(url("/api/newsletter/subscribe"))
        .json(&json!({ "email": email.to_uppercase() }))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("invalid json");
    assert_eq!(body["already_subscribed"], true);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_newsletter_rejects_bad_email() {
    let resp = session_client()
        .post(url("/api/newsletter/subscribe"))
        .json(&json!({ "email": "not-an-email" }))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_unsubscribe_unknown_token_is_404() {
    let resp = session_client()
        .get(url(&format!(
            "/newsletter/unsubscribe?token={}",
            uuid::Uuid::new_v4()
        )))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_contact_form() {
    let client = session_client();

    let resp = client
        .post(url("/api/contact"))
        .json(&json!({
            "name": "Integration Test",
            "email": unique_email("contact"),
            "subject": "Sizing",
            "message": "Does the linen dress run large?",
        }))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.expect("invalid json");
    assert_eq!(body["success"], true);

    let resp = client
        .post(url("/api/contact"))
        .json(&json!({ "name": "", "email": "x@example.com", "message": "" }))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
