//! Session-stored shopping cart.
//!
//! The cart only remembers what the shopper picked. Prices and stock are
//! looked up again on every read and at checkout.

use atelier_core::ProductId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum quantity of a single cart line.
pub const MAX_LINE_QUANTITY: u32 = 20;

/// Maximum number of distinct lines in a cart.
pub const MAX_LINES: usize = 50;

/// Cart validation errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CartError {
    #[error("quantity must be between 1 and {MAX_LINE_QUANTITY}")]
    InvalidQuantity,
    #[error("cart cannot hold more than {MAX_LINES} different items")]
    TooManyLines,
    #[error("item is not in the cart")]
    LineNotFound,
}

/// Identifies a cart line: the same product in another size or color is a
/// separate line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineKey {
    pub product_id: ProductId,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

impl LineKey {
    /// Build a key, treating blank options as absent.
    #[must_use]
    pub fn new(product_id: ProductId, size: Option<String>, color: Option<String>) -> Self {
        Self {
            product_id,
            size: normalize_option(size),
            color: normalize_option(color),
        }
    }
}

/// A line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    #[serde(flatten)]
    pub key: LineKey,
    pub quantity: u32,
}

/// The shopping cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub lines: Vec<CartLine>,
}

impl Cart {
    /// Add `quantity` of an item, merging with an existing line. Returns the
    /// line's resulting quantity, capped at [`MAX_LINE_QUANTITY`].
    ///
    /// # Errors
    ///
    /// Returns an error if `quantity` is zero or above the per-line maximum,
    /// or if the cart is full.
    pub fn add(&mut self, key: LineKey, quantity: u32) -> Result<u32, CartError> {
        if quantity == 0 || quantity > MAX_LINE_QUANTITY {
            return Err(CartError::InvalidQuantity);
        }

        if let Some(line) = self.line_mut(&key) {
            line.quantity = line.quantity.saturating_add(quantity).min(MAX_LINE_QUANTITY);
            return Ok(line.quantity);
        }

        if self.lines.len() >= MAX_LINES {
            return Err(CartError::TooManyLines);
        }
        self.lines.push(CartLine { key, quantity });
        Ok(quantity)
    }

    /// Set the quantity of a line. Zero removes it; values above the maximum
    /// are capped.
    ///
    /// # Errors
    ///
    /// Returns `CartError::LineNotFound` if the line is not in the cart.
    pub fn set_quantity(&mut self, key: &LineKey, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return self.remove(key);
        }
        let line = self.line_mut(key).ok_or(CartError::LineNotFound)?;
        line.quantity = quantity.min(MAX_LINE_QUANTITY);
        Ok(())
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::LineNotFound` if the line is not in the cart.
    pub fn remove(&mut self, key: &LineKey) -> Result<(), CartError> {
        let index = self.position(key).ok_or(CartError::LineNotFound)?;
        self.lines.remove(index);
        Ok(())
    }

    /// Drop every line for products that no longer exist.
    pub fn retain_products(&mut self, known: &[ProductId]) {
        self.lines.retain(|line| known.contains(&line.key.product_id));
    }

    /// Total number of units.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Distinct product ids in the cart.
    #[must_use]
    pub fn product_ids(&self) -> Vec<ProductId> {
        let mut ids: Vec<ProductId> = Vec::with_capacity(self.lines.len());
        for line in &self.lines {
            if !ids.contains(&line.key.product_id) {
                ids.push(line.key.product_id);
            }
        }
        ids
    }

    fn position(&self, key: &LineKey) -> Option<usize> {
        self.lines.iter().position(|l| &l.key == key)
    }

    fn line_mut(&mut self, key: &LineKey) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|l| &l.key == key)
    }
}

fn normalize_option(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn key(id: i32, size: &str) -> LineKey {
        LineKey::new(ProductId::new(id), Some(size.to_owned()), None)
    }

    #[test]
    fn test_add_merges_same_line() {
        let mut cart = Cart::default();
        cart.add(key(1, "M"), 2).unwrap();
        cart.add(key(1, "M"), 3).unwrap();
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.item_count(), 5);
    }

    #[test]
    fn test_different_size_is_separate_line() {
        let mut cart = Cart::default();
        cart.add(key(1, "M"), 1).unwrap();
        cart.add(key(1, "L"), 1).unwrap();
        assert_eq!(cart.lines.len(), 2);
        assert_eq!(cart.product_ids(), vec![ProductId::new(1)]);
    }

    #[test]
    fn test_merge_is_capped() {
        let mut cart = Cart::default();
        cart.add(key(1, "S"), 15).unwrap();
        assert_eq!(cart.add(key(1, "S"), 10).unwrap(), MAX_LINE_QUANTITY);
    }

    #[test]
    fn test_invalid_quantities_rejected() {
        let mut cart = Cart::default();
        assert_eq!(cart.add(key(1, "S"), 0), Err(CartError::InvalidQuantity));
        assert_eq!(cart.add(key(1, "S"), 21), Err(CartError::InvalidQuantity));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity() {
        let mut cart = Cart::default();
        cart.add(key(1, "S"), 1).unwrap();
        cart.set_quantity(&key(1, "S"), 40).unwrap();
        assert_eq!(cart.item_count(), MAX_LINE_QUANTITY);
        cart.set_quantity(&key(1, "S"), 0).unwrap();
        assert!(cart.is_empty());
        assert_eq!(
            cart.set_quantity(&key(1, "S"), 1),
            Err(CartError::LineNotFound)
        );
    }

    #[test]
    fn test_blank_options_are_absent() {
        let a = LineKey::new(ProductId::new(3), Some("  ".to_owned()), Some(String::new()));
        let b = LineKey::new(ProductId::new(3), None, None);
        assert_eq!(a, b);
    }

    #[test]
    fn test_remove_and_retain() {
        let mut cart = Cart::default();
        cart.add(key(1, "S"), 1).unwrap();
        cart.add(key(2, "S"), 1).unwrap();
        cart.remove(&key(1, "S")).unwrap();
        cart.retain_products(&[ProductId::new(9)]);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_session_json_shape() {
        let mut cart = Cart::default();
        cart.add(LineKey::new(ProductId::new(4), None, Some("Sand".to_owned())), 2)
            .unwrap();
        let json = serde_json::to_value(&cart).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"lines": [{"product_id": 4, "size": null, "color": "Sand", "quantity": 2}]})
        );
        let back: Cart = serde_json::from_value(json).unwrap();
        assert_eq!(back, cart);
    }
}
