//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! # Auth
//! POST   /auth/login                          - Email + password login
//! POST   /auth/logout                         - End the session
//! GET    /auth/me                             - Current admin
//!
//! # Overview
//! GET    /api/dashboard                       - Aggregated store stats
//! GET    /api/logs                            - Audit log (?limit=)
//!
//! # Catalog
//! GET    /api/products                        - List (category, search, on_sale, active)
//! POST   /api/products                        - Create
//! GET    /api/products/{id}                   - Detail
//! PUT    /api/products/{id}                   - Update
//! DELETE /api/products/{id}                   - Delete
//! POST   /api/products/{id}/toggle-active     - Flip visibility
//! POST   /api/products/{id}/discount          - Set or clear a discount
//! POST   /api/products/{id}/stock             - Set absolute stock
//! GET    /api/categories                      - Categories with subcategories
//! POST   /api/categories                      - Create category
//! PUT    /api/categories/{id}                 - Update category
//! DELETE /api/categories/{id}                 - Delete category
//! POST   /api/subcategories                   - Create subcategory
//! PUT    /api/subcategories/{id}              - Update subcategory
//! DELETE /api/subcategories/{id}              - Delete subcategory
//!
//! # Content
//! GET    /api/banners                         - List
//! POST   /api/banners                         - Create
//! POST   /api/banners/reorder                 - Reorder
//! PUT    /api/banners/{id}                    - Update
//! DELETE /api/banners/{id}                    - Delete
//! POST   /api/banners/{id}/toggle-active      - Flip visibility
//! GET    /api/popups                          - List
//! POST   /api/popups                          - Create
//! PUT    /api/popups/{id}                     - Update
//! DELETE /api/popups/{id}                     - Delete
//! POST   /api/popups/{id}/toggle-active       - Flip visibility
//!
//! # Newsletter
//! GET    /api/newsletter                      - List (status, search)
//! GET    /api/newsletter/stats                - Headline counts
//! GET    /api/newsletter/export.csv           - CSV export
//! GET    /api/newsletter/events               - SSE change feed
//! PUT    /api/newsletter/{id}/status          - Subscribe/unsubscribe
//! DELETE /api/newsletter/{id}                 - Delete
//!
//! # Customers and orders
//! GET    /api/customers                       - List (search)
//! GET    /api/customers/export.csv            - CSV export
//! GET    /api/customers/{id}                  - Detail with orders
//! GET    /api/orders                          - List (status)
//! GET    /api/orders/export.csv               - CSV export
//! GET    /api/orders/{id}                     - Detail with items
//! PUT    /api/orders/{id}/status              - Change status
//!
//! # Marketing
//! GET    /api/marketing/templates             - List templates
//! POST   /api/marketing/templates             - Create or update
//! DELETE /api/marketing/templates/{id}        - Delete
//! POST   /api/marketing/preview               - Render for a sample recipient
//! POST   /api/marketing/links                 - mailto / wa.me links
//! POST   /api/marketing/send                  - SMTP campaign
//!
//! # Settings and inbox
//! GET    /api/settings                        - All settings
//! GET    /api/settings/{key}                  - One setting
//! PUT    /api/settings/{key}                  - Upsert
//! DELETE /api/settings/{key}                  - Delete
//! GET    /api/contact                         - Messages (?unread=)
//! POST   /api/contact/{id}/read               - Mark read
//! DELETE /api/contact/{id}                    - Delete
//!
//! # WooCommerce
//! GET    /api/woocommerce/config              - Settings (secret redacted)
//! PUT    /api/woocommerce/config              - Save settings
//! POST   /api/woocommerce/test                - Connection test
//! POST   /api/woocommerce/import              - Product import
//! ```
//!
//! Every route but `/auth/login` takes an auth extractor; mutations take
//! `RequireWriteAccess` and record an audit entry through [`audit`].

pub mod auth;
pub mod catalog;
pub mod contact;
pub mod content;
pub mod customers;
pub mod dashboard;
pub mod logs;
pub mod marketing;
pub mod newsletter;
pub mod orders;
pub mod products;
pub mod settings;
pub mod woocommerce;

use axum::{
    Router,
    http::{
        StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use serde_json::Value as JsonValue;

use crate::db::AdminLogRepository;
use crate::models::CurrentAdmin;
use crate::state::AppState;

/// Record an audit entry for a completed mutation.
///
/// The mutation has already happened, so a failed insert is logged rather
/// than turned into an error response.
pub(crate) async fn audit(
    state: &AppState,
    admin: &CurrentAdmin,
    action: &str,
    entity: &str,
    entity_id: Option<String>,
    details: JsonValue,
) {
    let result = AdminLogRepository::new(state.pool())
        .record(admin.id, action, entity, entity_id.as_deref(), &details)
        .await;
    if let Err(e) = result {
        tracing::warn!(error = %e, action, entity, "Failed to write admin log");
    }
}

/// A downloadable CSV file named `<stem>-<YYYY-MM-DD>.csv`.
pub(crate) fn csv_response(stem: &str, body: String) -> Response {
    let filename = format!("{stem}-{}.csv", chrono::Utc::now().format("%Y-%m-%d"));
    (
        StatusCode::OK,
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8".to_owned()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::list).post(products::create))
        .route(
            "/products/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::delete),
        )
        .route("/products/{id}/toggle-active", post(products::toggle_active))
        .route("/products/{id}/discount", post(products::set_discount))
        .route("/products/{id}/stock", post(products::set_stock))
        .route(
            "/categories",
            get(catalog::list_categories).post(catalog::create_category),
        )
        .route(
            "/categories/{id}",
            put(catalog::update_category).delete(catalog::delete_category),
        )
        .route("/subcategories", post(catalog::create_subcategory))
        .route(
            "/subcategories/{id}",
            put(catalog::update_subcategory).delete(catalog::delete_subcategory),
        )
}

/// Create the banner and popup routes router.
pub fn content_routes() -> Router<AppState> {
    Router::new()
        .route("/banners", get(content::list_banners).post(content::create_banner))
        .route("/banners/reorder", post(content::reorder_banners))
        .route(
            "/banners/{id}",
            put(content::update_banner).delete(content::delete_banner),
        )
        .route("/banners/{id}/toggle-active", post(content::toggle_banner))
        .route("/popups", get(content::list_popups).post(content::create_popup))
        .route(
            "/popups/{id}",
            put(content::update_popup).delete(content::delete_popup),
        )
        .route("/popups/{id}/toggle-active", post(content::toggle_popup))
}

/// Create the newsletter, customer and order routes router.
pub fn audience_routes() -> Router<AppState> {
    Router::new()
        .route("/newsletter", get(newsletter::list))
        .route("/newsletter/stats", get(newsletter::stats))
        .route("/newsletter/export.csv", get(newsletter::export))
        .route("/newsletter/events", get(newsletter::events))
        .route("/newsletter/{id}/status", put(newsletter::set_status))
        .route("/newsletter/{id}", delete(newsletter::delete))
        .route("/customers", get(customers::list))
        .route("/customers/export.csv", get(customers::export))
        .route("/customers/{id}", get(customers::show))
        .route("/orders", get(orders::list))
        .route("/orders/export.csv", get(orders::export))
        .route("/orders/{id}", get(orders::show))
        .route("/orders/{id}/status", put(orders::update_status))
}

/// Create the marketing routes router.
pub fn marketing_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/templates",
            get(marketing::list_templates).post(marketing::upsert_template),
        )
        .route(
            "/templates/{id}",
            delete(marketing::delete_template),
        )
        .route("/preview", post(marketing::preview))
        .route("/links", post(marketing::links))
        .route("/send", post(marketing::send))
}

/// Create the settings, inbox, import and log routes router.
pub fn settings_routes() -> Router<AppState> {
    Router::new()
        .route("/settings", get(settings::list))
        .route(
            "/settings/{key}",
            get(settings::show).put(settings::put).delete(settings::delete),
        )
        .route("/contact", get(contact::list))
        .route("/contact/{id}/read", post(contact::mark_read))
        .route("/contact/{id}", delete(contact::delete))
        .route(
            "/woocommerce/config",
            get(woocommerce::config).put(woocommerce::save_config),
        )
        .route("/woocommerce/test", post(woocommerce::test))
        .route("/woocommerce/import", post(woocommerce::import))
        .route("/logs", get(logs::list))
}

/// Create all routes for admin.
pub fn routes() -> Router<AppState> {
    Router::new().nest("/auth", auth_routes()).nest(
        "/api",
        Router::new()
            .route("/dashboard", get(dashboard::show))
            .merge(catalog_routes())
            .merge(content_routes())
            .merge(audience_routes())
            .nest("/marketing", marketing_routes())
            .merge(settings_routes()),
    )
}
