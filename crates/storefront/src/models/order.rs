//! Checkout and order models.

use std::collections::BTreeMap;

use atelier_core::{Email, Locale, OrderStatus, PaymentStatus, ProductId};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::cart::Cart;
use super::catalog::Product;
use crate::config::ShopConfig;

/// Longest accepted value for a free-text checkout field.
const MAX_FIELD_LENGTH: usize = 500;

/// Characters used in order numbers (no 0/O or 1/I).
const ORDER_NUMBER_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Reasons a checkout is refused before anything is written.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("your cart is empty")]
    EmptyCart,
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("{0} is too long")]
    FieldTooLong(&'static str),
    #[error("invalid email address: {0}")]
    InvalidEmail(String),
    #[error("{0} is no longer available")]
    ProductUnavailable(String),
    #[error("{product} is not available in {option}")]
    OptionUnavailable { product: String, option: String },
    #[error("only {available} left of {product}")]
    InsufficientStock { product: String, available: i32 },
}

impl CheckoutError {
    /// Whether the error comes from catalog state rather than the form.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::ProductUnavailable(_)
                | Self::OptionUnavailable { .. }
                | Self::InsufficientStock { .. }
        )
    }
}

/// Shipping and contact details submitted at checkout.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutDetails {
    pub email: String,
    pub full_name: String,
    pub phone: String,
    pub shipping_address: String,
    pub city: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub locale: Locale,
}

impl CheckoutDetails {
    /// Validate required fields and return the normalized email.
    ///
    /// # Errors
    ///
    /// Returns the first field that is blank, too long, or malformed.
    pub fn validate(&self) -> Result<Email, CheckoutError> {
        let required = [
            ("full name", &self.full_name),
            ("phone", &self.phone),
            ("shipping address", &self.shipping_address),
            ("city", &self.city),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(CheckoutError::MissingField(name));
            }
            if value.len() > MAX_FIELD_LENGTH {
                return Err(CheckoutError::FieldTooLong(name));
            }
        }
        if self.notes.as_ref().is_some_and(|n| n.len() > MAX_FIELD_LENGTH) {
            return Err(CheckoutError::FieldTooLong("notes"));
        }

        Email::parse(&self.email).map_err(|e| CheckoutError::InvalidEmail(e.to_string()))
    }
}

/// An order ready to be inserted.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub email: Email,
    pub full_name: String,
    pub phone: String,
    pub shipping_address: String,
    pub city: String,
    pub notes: Option<String>,
    pub currency: String,
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub total: Decimal,
    pub items: Vec<NewOrderItem>,
}

/// An order line with the price captured at checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub size: Option<String>,
    pub color: Option<String>,
    pub unit_price: Decimal,
    pub quantity: i32,
}

/// Stock to take from one product when an order is placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockReservation<'a> {
    pub product_id: ProductId,
    pub product_name: &'a str,
    pub quantity: i32,
}

impl NewOrder {
    /// One reservation per product, in ascending product id order.
    ///
    /// Concurrent checkouts lock product rows in this order, so two carts
    /// holding the same products can never wait on each other.
    #[must_use]
    pub fn stock_reservations(&self) -> Vec<StockReservation<'_>> {
        let mut by_product: BTreeMap<i32, StockReservation<'_>> = BTreeMap::new();
        for item in &self.items {
            by_product
                .entry(item.product_id.as_i32())
                .and_modify(|r| r.quantity = r.quantity.saturating_add(item.quantity))
                .or_insert(StockReservation {
                    product_id: item.product_id,
                    product_name: &item.product_name,
                    quantity: item.quantity,
                });
        }
        by_product.into_values().collect()
    }

    /// Price the cart against current catalog data.
    ///
    /// `products` must contain the active products referenced by the cart.
    /// Product names are captured in English so order history reads the
    /// same for staff regardless of the shopper's locale.
    ///
    /// # Errors
    ///
    /// Returns a [`CheckoutError`] if the cart is empty or any line cannot be
    /// fulfilled as requested.
    pub fn build(
        details: &CheckoutDetails,
        email: Email,
        cart: &Cart,
        products: &[Product],
        shop: &ShopConfig,
    ) -> Result<Self, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let mut items = Vec::with_capacity(cart.lines.len());
        for line in &cart.lines {
            let key = &line.key;
            let product = products
                .iter()
                .find(|p| p.id == key.product_id)
                .ok_or_else(|| CheckoutError::ProductUnavailable(format!("product {}", key.product_id)))?;
            let name = product.name.get(Locale::En).to_owned();

            for (allowed, option) in [(&product.sizes, &key.size), (&product.colors, &key.color)] {
                if !Product::accepts_option(allowed, option.as_deref()) {
                    return Err(CheckoutError::OptionUnavailable {
                        product: name,
                        option: option.clone().unwrap_or_else(|| "the default option".to_owned()),
                    });
                }
            }

            let quantity = i32::try_from(line.quantity).unwrap_or(i32::MAX);
            let requested: i32 = cart
                .lines
                .iter()
                .filter(|l| l.key.product_id == product.id)
                .map(|l| i32::try_from(l.quantity).unwrap_or(i32::MAX))
                .sum();
            if requested > product.stock {
                return Err(CheckoutError::InsufficientStock {
                    product: name,
                    available: product.stock,
                });
            }

            items.push(NewOrderItem {
                product_id: product.id,
                product_name: name,
                size: key.size.clone(),
                color: key.color.clone(),
                unit_price: product.unit_price(),
                quantity,
            });
        }

        let subtotal: Decimal = items
            .iter()
            .map(|i| i.unit_price * Decimal::from(i.quantity))
            .sum();
        let shipping_fee = shop.shipping_for(subtotal);

        Ok(Self {
            order_number: generate_order_number(),
            email,
            full_name: details.full_name.trim().to_owned(),
            phone: details.phone.trim().to_owned(),
            shipping_address: details.shipping_address.trim().to_owned(),
            city: details.city.trim().to_owned(),
            notes: details
                .notes
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_owned),
            currency: shop.currency.clone(),
            subtotal,
            shipping_fee,
            total: subtotal + shipping_fee,
            items,
        })
    }
}

/// Order state shown on the checkout return pages.
#[derive(Debug, Clone, Serialize)]
pub struct OrderSummary {
    pub order_number: String,
    pub email: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub currency: String,
    pub total: Decimal,
}

/// Generate a human-friendly order number such as `AT-260318-K7M2QX`.
#[must_use]
pub fn generate_order_number() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..6)
        .map(|_| {
            let index = rng.random_range(0..ORDER_NUMBER_ALPHABET.len());
            char::from(ORDER_NUMBER_ALPHABET.get(index).copied().unwrap_or(b'X'))
        })
        .collect();
    format!("AT-{}-{suffix}", chrono::Utc::now().format("%y%m%d"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::cart::LineKey;
    use atelier_core::LocalizedText;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn shop() -> ShopConfig {
        ShopConfig {
            currency: "EUR".to_owned(),
            shipping_fee: dec("7.00"),
            free_shipping_threshold: dec("100.00"),
        }
    }

    fn details() -> CheckoutDetails {
        CheckoutDetails {
            email: " Nour@Shop.test ".to_owned(),
            full_name: "Nour Haddad".to_owned(),
            phone: "+212600000000".to_owned(),
            shipping_address: "12 Rue des Lilas".to_owned(),
            city: "Casablanca".to_owned(),
            notes: Some("  ".to_owned()),
            locale: Locale::Fr,
        }
    }

    fn product(id: i32, price: &str, sale: Option<&str>, stock: i32) -> Product {
        Product {
            id: ProductId::new(id),
            slug: format!("p-{id}"),
            name: LocalizedText::english(format!("Product {id}")).with(Locale::Fr, "Produit"),
            description: LocalizedText::default(),
            price: dec(price),
            sale_price: sale.map(dec),
            stock,
            images: vec!["https://cdn.test/a.jpg".to_owned()],
            colors: vec![],
            sizes: vec!["S".to_owned(), "M".to_owned()],
            category_id: None,
            subcategory_id: None,
            is_featured: false,
            created_at: chrono::Utc::now(),
        }
    }

    fn cart(lines: &[(i32, &str, u32)]) -> Cart {
        let mut cart = Cart::default();
        for (id, size, qty) in lines {
            cart.add(
                LineKey::new(ProductId::new(*id), Some((*size).to_owned()), None),
                *qty,
            )
            .unwrap();
        }
        cart
    }

    #[test]
    fn test_validate_normalizes_email() {
        let email = details().validate().unwrap();
        assert_eq!(email.as_str(), "nour@shop.test");
    }

    #[test]
    fn test_validate_missing_field() {
        let mut d = details();
        d.city = "   ".to_owned();
        assert_eq!(d.validate(), Err(CheckoutError::MissingField("city")));
    }

    #[test]
    fn test_build_prices_with_sale_and_shipping() {
        let d = details();
        let email = d.validate().unwrap();
        let products = [product(1, "40.00", Some("30.00"), 5), product(2, "25.00", None, 5)];
        let order = NewOrder::build(&d, email, &cart(&[(1, "S", 2), (2, "M", 1)]), &products, &shop())
            .unwrap();

        assert_eq!(order.subtotal, dec("85.00"));
        assert_eq!(order.shipping_fee, dec("7.00"));
        assert_eq!(order.total, dec("92.00"));
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.items[0].product_name, "Product 1");
        assert_eq!(order.items[0].unit_price, dec("30.00"));
        assert_eq!(order.notes, None);
    }

    #[test]
    fn test_free_shipping_over_threshold() {
        let d = details();
        let email = d.validate().unwrap();
        let products = [product(1, "50.00", None, 5)];
        let order =
            NewOrder::build(&d, email, &cart(&[(1, "S", 2)]), &products, &shop()).unwrap();
        assert_eq!(order.shipping_fee, Decimal::ZERO);
        assert_eq!(order.total, dec("100.00"));
    }

    #[test]
    fn test_stock_counts_all_lines_of_a_product() {
        let d = details();
        let email = d.validate().unwrap();
        let products = [product(1, "10.00", None, 3)];
        let err = NewOrder::build(&d, email, &cart(&[(1, "S", 2), (1, "M", 2)]), &products, &shop())
            .unwrap_err();
        assert!(matches!(err, CheckoutError::InsufficientStock { available: 3, .. }));
        assert!(err.is_conflict());
    }

    #[test]
    fn test_unknown_product_and_option() {
        let d = details();
        let products = [product(1, "10.00", None, 3)];
        let err = NewOrder::build(&d, d.validate().unwrap(), &cart(&[(9, "S", 1)]), &products, &shop())
            .unwrap_err();
        assert!(matches!(err, CheckoutError::ProductUnavailable(_)));

        let err = NewOrder::build(&d, d.validate().unwrap(), &cart(&[(1, "XXL", 1)]), &products, &shop())
            .unwrap_err();
        assert!(matches!(err, CheckoutError::OptionUnavailable { .. }));
    }

    #[test]
    fn test_reservations_merge_lines_in_product_order() {
        let d = details();
        let products = [product(7, "10.00", None, 9), product(3, "10.00", None, 9)];
        let order = NewOrder::build(
            &d,
            d.validate().unwrap(),
            &cart(&[(7, "S", 1), (3, "M", 2), (7, "M", 3)]),
            &products,
            &shop(),
        )
        .unwrap();

        let reservations = order.stock_reservations();
        let summary: Vec<_> = reservations
            .iter()
            .map(|r| (r.product_id.as_i32(), r.quantity))
            .collect();
        assert_eq!(summary, vec![(3, 2), (7, 4)]);
        assert_eq!(reservations[1].product_name, "Product 7");
    }

    #[test]
    fn test_empty_cart() {
        let d = details();
        let err = NewOrder::build(&d, d.validate().unwrap(), &Cart::default(), &[], &shop())
            .unwrap_err();
        assert_eq!(err, CheckoutError::EmptyCart);
        assert!(!err.is_conflict());
    }

    #[test]
    fn test_order_number_format() {
        let number = generate_order_number();
        assert!(number.starts_with("AT-"));
        assert_eq!(number.len(), "AT-260318-K7M2QX".len());
        assert!(number.rsplit('-').next().unwrap().bytes().all(|b| ORDER_NUMBER_ALPHABET.contains(&b)));
    }
}
