//! Checkout: order creation and the payment processor's return pages.
//!
//! # Flow
//!
//! 1. `POST /api/checkout` prices the session cart, writes the order and
//!    reserves stock in one transaction, then opens a hosted payment session.
//! 2. The shopper pays on the processor's page.
//! 3. The processor redirects to `/checkout/success` or `/checkout/error`
//!    with a signed `order:status:reference` triple. Only a valid signature
//!    changes the order.

use askama::Template;
use askama_web::WebTemplate;
use atelier_core::{PaymentStatus, pricing};
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use super::cart::{load_cart, save_cart};
use crate::db::{CatalogRepository, OrderRepository, PaymentOutcome};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::models::{Cart, CheckoutDetails, NewOrder, OrderSummary};
use crate::services::{CheckoutSessionRequest, ReturnStatus};
use crate::state::AppState;

/// Response to a successful checkout.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order_number: String,
    pub redirect_url: String,
}

/// `POST /api/checkout`
#[instrument(skip(state, session, details))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    Json(details): Json<CheckoutDetails>,
) -> Result<Json<CheckoutResponse>> {
    let email = details.validate()?;
    let cart = load_cart(&session).await?;

    let products = CatalogRepository::new(state.pool())
        .products_by_ids(&cart.product_ids())
        .await?;
    let order = NewOrder::build(&details, email, &cart, &products, &state.config().shop)?;

    let orders = OrderRepository::new(state.pool());
    let order_id = orders.create(&order).await?;
    tracing::info!(order_number = %order.order_number, total = %order.total, "Order created");
    add_breadcrumb(
        "checkout",
        "Order created",
        Some(&[("order_number", order.order_number.as_str())]),
    );

    let amount_minor = pricing::to_minor_units(order.total)
        .ok_or_else(|| AppError::Internal(format!("order total out of range: {}", order.total)))?;
    let base_url = &state.config().base_url;
    let request = CheckoutSessionRequest {
        amount_minor,
        currency: &order.currency,
        reference: &order.order_number,
        customer_email: order.email.as_str(),
        success_url: format!("{base_url}/checkout/success"),
        cancel_url: format!("{base_url}/checkout/error"),
    };

    let payment_session = match state.payment().create_session(&request).await {
        Ok(payment_session) => payment_session,
        Err(e) => {
            // Nobody can pay for this order; give the stock back.
            if let Err(release_err) = orders
                .release(&order.order_number, PaymentStatus::Failed)
                .await
            {
                tracing::error!(
                    order_number = %order.order_number,
                    error = %release_err,
                    "Failed to release stock after payment error"
                );
            }
            return Err(e.into());
        }
    };

    orders
        .set_payment_reference(order_id, &payment_session.id)
        .await?;
    save_cart(&session, &Cart::default()).await?;

    Ok(Json(CheckoutResponse {
        order_number: order.order_number,
        redirect_url: payment_session.url,
    }))
}

// =============================================================================
// Return Pages
// =============================================================================

/// Query parameters appended by the processor.
#[derive(Debug, Default, Deserialize)]
pub struct ReturnParams {
    pub order: Option<String>,
    pub status: Option<String>,
    pub reference: Option<String>,
    pub signature: Option<String>,
}

/// Checkout result page.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/result.html")]
pub struct CheckoutResultTemplate {
    pub title: String,
    pub heading: String,
    pub message: String,
    pub order: Option<OrderSummary>,
    pub total: Option<String>,
}

impl CheckoutResultTemplate {
    fn invalid() -> Self {
        Self {
            title: "Payment not confirmed".to_owned(),
            heading: "We could not confirm this payment".to_owned(),
            message: "The payment link is invalid or has been altered. If you were charged, \
                      please contact us with your order number."
                .to_owned(),
            order: None,
            total: None,
        }
    }

    fn for_order(order: OrderSummary) -> Self {
        let (title, heading, message) = match order.payment_status {
            PaymentStatus::Paid => (
                "Thank you",
                "Thank you for your order",
                format!("A confirmation will be sent to {}.", order.email),
            ),
            PaymentStatus::Pending => (
                "Payment pending",
                "Your payment is being processed",
                "We will email you once the payment is confirmed.".to_owned(),
            ),
            _ => (
                "Payment not completed",
                "Your payment was not completed",
                "Your order has been cancelled and nothing was charged.".to_owned(),
            ),
        };
        Self {
            title: title.to_owned(),
            heading: heading.to_owned(),
            message,
            total: Some(pricing::format_money(order.total, &order.currency)),
            order: Some(order),
        }
    }
}

/// `GET /checkout/success`
#[instrument(skip(state, params), fields(order = ?params.order))]
pub async fn success(
    State(state): State<AppState>,
    Query(params): Query<ReturnParams>,
) -> Result<impl IntoResponse> {
    handle_return(&state, &params).await
}

/// `GET /checkout/error`
#[instrument(skip(state, params), fields(order = ?params.order))]
pub async fn error(
    State(state): State<AppState>,
    Query(params): Query<ReturnParams>,
) -> Result<impl IntoResponse> {
    handle_return(&state, &params).await
}

/// Verify the signed return and apply it to the order.
///
/// Both return URLs share this: the signed status, not the path, decides
/// what happens.
async fn handle_return(
    state: &AppState,
    params: &ReturnParams,
) -> Result<(StatusCode, CheckoutResultTemplate)> {
    let (Some(order_number), Some(status), Some(reference), Some(signature)) = (
        params.order.as_deref(),
        params.status.as_deref(),
        params.reference.as_deref(),
        params.signature.as_deref(),
    ) else {
        return Ok((StatusCode::BAD_REQUEST, CheckoutResultTemplate::invalid()));
    };

    if !state
        .payment()
        .verify_return(order_number, status, reference, signature)
    {
        tracing::warn!(order_number, status, "Rejected payment return with bad signature");
        return Ok((StatusCode::BAD_REQUEST, CheckoutResultTemplate::invalid()));
    }

    let Some(return_status) = ReturnStatus::parse(status) else {
        tracing::warn!(order_number, status, "Unknown payment return status");
        return Ok((StatusCode::BAD_REQUEST, CheckoutResultTemplate::invalid()));
    };

    let orders = OrderRepository::new(state.pool());
    let outcome = match return_status {
        ReturnStatus::Paid => orders.mark_paid(order_number, reference).await,
        ReturnStatus::Failed => orders.release(order_number, PaymentStatus::Failed).await,
        ReturnStatus::Cancelled => orders.release(order_number, PaymentStatus::Cancelled).await,
    };

    match outcome {
        Ok(PaymentOutcome::Applied) => {
            tracing::info!(order_number, status, "Payment return applied");
        }
        Ok(PaymentOutcome::Unchanged) => {
            tracing::debug!(order_number, status, "Payment return already applied");
        }
        Err(crate::db::RepositoryError::NotFound) => {
            return Err(AppError::NotFound(format!("order {order_number}")));
        }
        Err(e) => return Err(e.into()),
    }

    let summary = orders
        .summary(order_number)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {order_number}")))?;

    Ok((StatusCode::OK, CheckoutResultTemplate::for_order(summary)))
}

#[cfg(test)]
mod tests {
    use atelier_core::OrderStatus;
    use rust_decimal::Decimal;

    use super::*;

    fn summary(payment_status: PaymentStatus) -> OrderSummary {
        OrderSummary {
            order_number: "AT-260301-ABCDEF".to_owned(),
            email: "nour@shop.test".to_owned(),
            status: OrderStatus::Pending,
            payment_status,
            currency: "EUR".to_owned(),
            total: Decimal::new(6790, 2),
        }
    }

    #[test]
    fn test_result_page_reflects_payment_status() {
        let page = CheckoutResultTemplate::for_order(summary(PaymentStatus::Paid));
        assert_eq!(page.heading, "Thank you for your order");
        assert!(page.message.contains("nour@shop.test"));

        let page = CheckoutResultTemplate::for_order(summary(PaymentStatus::Cancelled));
        assert_eq!(page.heading, "Your payment was not completed");
    }

    #[test]
    fn test_result_page_renders() {
        let html = CheckoutResultTemplate::for_order(summary(PaymentStatus::Paid))
            .render()
            .unwrap_or_default();
        assert!(html.contains("AT-260301-ABCDEF"));

        let html = CheckoutResultTemplate::invalid().render().unwrap_or_default();
        assert!(html.contains("could not confirm"));
    }
}
