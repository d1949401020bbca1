//! Cart route handlers.
//!
//! The cart lives in the session as a list of `(product, size, color)` lines.
//! Prices are never stored: every response re-prices the lines against the
//! current catalog and drops lines whose product was deactivated.

use atelier_core::{Locale, ProductId};
use axum::{
    Json,
    extract::{Query, State},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use super::LocaleQuery;
use crate::db::CatalogRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::models::{Cart, LineKey, Product, session_keys};
use crate::state::AppState;

// =============================================================================
// Views
// =============================================================================

/// A priced cart line.
#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    pub product_id: ProductId,
    pub slug: String,
    pub name: String,
    pub image: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub available: i32,
}

/// The priced cart.
#[derive(Debug, Clone, Serialize)]
pub struct CartResponse {
    pub lines: Vec<CartLineView>,
    pub item_count: u32,
    pub currency: String,
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub total: Decimal,
}

impl CartResponse {
    /// Price `cart` against `products`. Lines without a product are skipped.
    #[must_use]
    pub fn build(
        cart: &Cart,
        products: &[Product],
        locale: Locale,
        shop: &crate::config::ShopConfig,
    ) -> Self {
        let lines: Vec<CartLineView> = cart
            .lines
            .iter()
            .filter_map(|line| {
                let product = products.iter().find(|p| p.id == line.key.product_id)?;
                let unit_price = product.unit_price();
                Some(CartLineView {
                    product_id: product.id,
                    slug: product.slug.clone(),
                    name: product.name.get(locale).to_owned(),
                    image: product.images.first().cloned(),
                    size: line.key.size.clone(),
                    color: line.key.color.clone(),
                    quantity: line.quantity,
                    unit_price,
                    line_total: unit_price * Decimal::from(line.quantity),
                    available: product.stock,
                })
            })
            .collect();

        let subtotal: Decimal = lines.iter().map(|l| l.line_total).sum();
        let shipping_fee = if lines.is_empty() {
            Decimal::ZERO
        } else {
            shop.shipping_for(subtotal)
        };

        Self {
            item_count: lines.iter().map(|l| l.quantity).sum(),
            lines,
            currency: shop.currency.clone(),
            subtotal,
            shipping_fee,
            total: subtotal + shipping_fee,
        }
    }
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Read the cart from the session; a missing cart is empty.
pub(crate) async fn load_cart(session: &Session) -> Result<Cart> {
    Ok(session
        .get::<Cart>(session_keys::CART)
        .await?
        .unwrap_or_default())
}

/// Write the cart back to the session.
pub(crate) async fn save_cart(session: &Session, cart: &Cart) -> Result<()> {
    session.insert(session_keys::CART, cart).await?;
    Ok(())
}

/// Price the cart, pruning lines for products that are gone.
async fn priced(state: &AppState, session: &Session, mut cart: Cart, locale: Locale) -> Result<CartResponse> {
    let products = CatalogRepository::new(state.pool())
        .products_by_ids(&cart.product_ids())
        .await?;

    let known: Vec<ProductId> = products.iter().map(|p| p.id).collect();
    let before = cart.lines.len();
    cart.retain_products(&known);
    if cart.lines.len() != before {
        tracing::info!(removed = before - cart.lines.len(), "Pruned unavailable cart lines");
        save_cart(session, &cart).await?;
    }

    Ok(CartResponse::build(
        &cart,
        &products,
        locale,
        &state.config().shop,
    ))
}

// =============================================================================
// Handlers
// =============================================================================

/// Body identifying a cart line.
#[derive(Debug, Deserialize)]
pub struct LineBody {
    pub product_id: ProductId,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub locale: Locale,
}

const fn default_quantity() -> u32 {
    1
}

impl LineBody {
    fn key(&self) -> LineKey {
        LineKey::new(self.product_id, self.size.clone(), self.color.clone())
    }
}

/// `GET /api/cart`
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<LocaleQuery>,
) -> Result<Json<CartResponse>> {
    let cart = load_cart(&session).await?;
    Ok(Json(priced(&state, &session, cart, query.locale).await?))
}

/// `POST /api/cart/items`
///
/// Adds a line, merging with an identical one. The product must be active
/// and offer the requested size and color.
#[instrument(skip(state, session), fields(product_id = %body.product_id))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LineBody>,
) -> Result<Json<CartResponse>> {
    let key = body.key();
    let product = CatalogRepository::new(state.pool())
        .products_by_ids(&[key.product_id])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::NotFound(format!("product {}", key.product_id)))?;

    for (allowed, option) in [(&product.sizes, &key.size), (&product.colors, &key.color)] {
        if !Product::accepts_option(allowed, option.as_deref()) {
            return Err(AppError::BadRequest(format!(
                "{} is not available in {}",
                product.name.get(Locale::En),
                option.as_deref().unwrap_or("the default option")
            )));
        }
    }

    let mut cart = load_cart(&session).await?;
    let quantity = cart.add(key, body.quantity)?;
    save_cart(&session, &cart).await?;

    let product_id = product.id.to_string();
    add_breadcrumb("cart", "Added item", Some(&[("product_id", product_id.as_str())]));
    tracing::debug!(quantity, "Cart line updated");

    Ok(Json(priced(&state, &session, cart, body.locale).await?))
}

/// `PATCH /api/cart/items`
///
/// Sets a line's quantity; zero removes it.
#[instrument(skip(state, session), fields(product_id = %body.product_id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LineBody>,
) -> Result<Json<CartResponse>> {
    let mut cart = load_cart(&session).await?;
    cart.set_quantity(&body.key(), body.quantity)?;
    save_cart(&session, &cart).await?;

    Ok(Json(priced(&state, &session, cart, body.locale).await?))
}

/// `DELETE /api/cart/items`
#[instrument(skip(state, session), fields(product_id = %body.product_id))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LineBody>,
) -> Result<Json<CartResponse>> {
    let mut cart = load_cart(&session).await?;
    cart.remove(&body.key())?;
    save_cart(&session, &cart).await?;

    Ok(Json(priced(&state, &session, cart, body.locale).await?))
}
