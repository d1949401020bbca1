//! Overview dashboard.

use axum::{Json, extract::State};
use tracing::instrument;

use crate::db::{CustomerRepository, NewsletterRepository, OrderRepository, ProductRepository};
use crate::error::Result;
use crate::middleware::RequireAdminAuth;
use crate::services::{DashboardInput, DashboardStats};
use crate::state::AppState;

/// `GET /api/dashboard`
///
/// Loads the store wholesale and aggregates in memory.
#[instrument(skip(state, _admin))]
pub async fn show(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
) -> Result<Json<DashboardStats>> {
    let pool = state.pool();
    let orders_repo = OrderRepository::new(pool);
    let products_repo = ProductRepository::new(pool);
    let customers_repo = CustomerRepository::new(pool);
    let newsletter_repo = NewsletterRepository::new(pool);

    let (orders, products, customers, sold_items, newsletter) = tokio::try_join!(
        orders_repo.list(None),
        products_repo.all(),
        customers_repo.list(None),
        orders_repo.sold_items(),
        newsletter_repo.stats(),
    )?;

    let stats = DashboardStats::compute(
        DashboardInput {
            orders: &orders,
            products: &products,
            customers: &customers,
            sold_items: &sold_items,
            active_subscribers: newsletter.subscribed,
            low_stock_threshold: state.config().low_stock_threshold,
        },
        chrono::Utc::now(),
    );

    Ok(Json(stats))
}
