//! Discount arithmetic.
//!
//! The sale price is the only discount value that is persisted. Admin forms
//! may be edited in either direction (type a percentage, or type a sale
//! price), and both go through [`resolve_sale_price`] so the stored sale price
//! and the displayed percentage can never disagree.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from discount calculations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PricingError {
    /// The regular price must be strictly positive.
    #[error("price must be greater than zero")]
    NonPositivePrice,
    /// Percentages are accepted in the open interval (0, 100).
    #[error("discount percentage must be between 0 and 100 (exclusive), got {0}")]
    PercentOutOfRange(Decimal),
    /// The sale price must be positive and below the regular price.
    #[error("sale price {sale} must be greater than zero and below the price {price}")]
    SalePriceOutOfRange {
        /// Regular price.
        price: Decimal,
        /// Rejected sale price.
        sale: Decimal,
    },
}

/// How an editor expressed a discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Discount {
    /// No discount; clears any sale price.
    #[default]
    None,
    /// Percentage off the regular price.
    Percent(Decimal),
    /// Explicit sale price.
    SalePrice(Decimal),
}

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Round a monetary amount to cents, half away from zero.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Compute the sale price for `percent` off `price`.
///
/// # Errors
///
/// Returns an error if `price <= 0`, if `percent` is outside `(0, 100)`, or
/// if rounding would make the sale price equal to the price or zero.
pub fn sale_price_from_percent(price: Decimal, percent: Decimal) -> Result<Decimal, PricingError> {
    if price <= Decimal::ZERO {
        return Err(PricingError::NonPositivePrice);
    }
    if percent <= Decimal::ZERO || percent >= HUNDRED {
        return Err(PricingError::PercentOutOfRange(percent));
    }

    let sale = round_money(price * (HUNDRED - percent) / HUNDRED);
    check_sale_price(price, sale)?;
    Ok(sale)
}

/// Compute the discount percentage a `sale` price represents.
///
/// Because the sale price is kept in cents, a percentage typed by an editor
/// comes back from this function within [`percent_drift_bound`] of what was
/// typed, not exactly.
///
/// # Errors
///
/// Returns an error if `price <= 0` or `sale` is not in `(0, price)`.
pub fn percent_from_sale_price(price: Decimal, sale: Decimal) -> Result<Decimal, PricingError> {
    if price <= Decimal::ZERO {
        return Err(PricingError::NonPositivePrice);
    }
    check_sale_price(price, sale)?;

    Ok(round_money((price - sale) / price * HUNDRED))
}

/// Turn a [`Discount`] into the sale price to persist.
///
/// # Errors
///
/// Propagates the validation errors of the underlying conversion.
pub fn resolve_sale_price(
    price: Decimal,
    discount: Discount,
) -> Result<Option<Decimal>, PricingError> {
    match discount {
        Discount::None => Ok(None),
        Discount::Percent(percent) => sale_price_from_percent(price, percent).map(Some),
        Discount::SalePrice(sale) => {
            if price <= Decimal::ZERO {
                return Err(PricingError::NonPositivePrice);
            }
            let sale = round_money(sale);
            check_sale_price(price, sale)?;
            Ok(Some(sale))
        }
    }
}

/// The price a shopper pays: the sale price when present.
#[must_use]
pub fn effective_price(price: Decimal, sale_price: Option<Decimal>) -> Decimal {
    sale_price.filter(|s| *s < price).unwrap_or(price)
}

/// Format an amount with its ISO 4217 currency code, e.g. `"49.90 EUR"`.
#[must_use]
pub fn format_money(amount: Decimal, currency: &str) -> String {
    format!("{:.2} {currency}", round_money(amount))
}

/// Convert an amount to minor units (cents) for payment APIs.
///
/// Returns `None` if the amount does not fit in an `i64`.
#[must_use]
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    use rust_decimal::prelude::ToPrimitive;
    (round_money(amount) * HUNDRED).to_i64()
}

/// Largest difference between a typed percentage and the one recomputed
/// from the resulting sale price: half a cent relative to `price`, plus
/// the rounding of the percentage itself.
///
/// This is `0.01` at a price of 100 and grows as the price drops.
#[must_use]
pub fn percent_drift_bound(price: Decimal) -> Decimal {
    if price <= Decimal::ZERO {
        return HUNDRED;
    }
    Decimal::new(5, 1) / price + Decimal::new(5, 3)
}

fn check_sale_price(price: Decimal, sale: Decimal) -> Result<(), PricingError> {
    if sale <= Decimal::ZERO || sale >= price {
        return Err(PricingError::SalePriceOutOfRange { price, sale });
    }
    Ok(())
}
