//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! # Catalog (JSON)
//! GET    /api/home                  - Homepage payload (cached per locale)
//! GET    /api/categories            - Categories with subcategories
//! GET    /api/products              - Product listing with filters
//! GET    /api/products/{slug}       - Product detail
//! GET    /api/banners               - Active banners
//! GET    /api/popups                - Active popups
//!
//! # Cart (JSON, session-backed)
//! GET    /api/cart                  - Priced cart
//! POST   /api/cart/items            - Add a line
//! PATCH  /api/cart/items            - Set a line's quantity
//! DELETE /api/cart/items            - Remove a line
//!
//! # Checkout
//! POST   /api/checkout              - Create order, open payment session
//! GET    /checkout/success          - Signed processor return (HTML)
//! GET    /checkout/error            - Signed processor return (HTML)
//!
//! # Forms
//! POST   /api/newsletter/subscribe  - Newsletter signup
//! GET    /newsletter/unsubscribe    - One-click unsubscribe (HTML)
//! POST   /api/contact               - Contact form
//!
//! # Pages
//! GET    /pages/{slug}              - Markdown info pages (HTML)
//! ```

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod contact;
pub mod home;
pub mod newsletter;
pub mod pages;

use atelier_core::Locale;
use axum::{
    Router,
    routing::{get, post},
};
use serde::Deserialize;

use crate::middleware::{cart_rate_limiter, checkout_rate_limiter, form_rate_limiter};
use crate::state::AppState;

/// `?locale=` query shared by read endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct LocaleQuery {
    #[serde(default)]
    pub locale: Locale,
}

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/home", get(home::home))
        .route("/categories", get(catalog::categories))
        .route("/products", get(catalog::products))
        .route("/products/{slug}", get(catalog::product))
        .route("/banners", get(catalog::banners))
        .route("/popups", get(catalog::popups))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .merge(
            Router::new()
                .route(
                    "/items",
                    post(cart::add).patch(cart::update).delete(cart::remove),
                )
                .layer(cart_rate_limiter()),
        )
}

/// Create the form routes router (newsletter, contact), rate limited.
pub fn form_routes() -> Router<AppState> {
    Router::new()
        .route("/newsletter/subscribe", post(newsletter::subscribe))
        .route("/contact", post(contact::submit))
        .layer(form_rate_limiter())
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest(
            "/api",
            catalog_routes()
                .nest("/cart", cart_routes())
                .merge(form_routes())
                .merge(
                    Router::new()
                        .route("/checkout", post(checkout::create))
                        .layer(checkout_rate_limiter()),
                ),
        )
        .route("/checkout/success", get(checkout::success))
        .route("/checkout/error", get(checkout::error))
        .route("/newsletter/unsubscribe", get(newsletter::unsubscribe))
        .route("/pages/{slug}", get(pages::show))
}
