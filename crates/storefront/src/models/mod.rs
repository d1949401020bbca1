//! Domain models for storefront.
//!
//! Catalog and content types keep their [`LocalizedText`] fields; routes turn
//! them into locale-resolved views before serializing.
//!
//! [`LocalizedText`]: atelier_core::LocalizedText

pub mod cart;
pub mod catalog;
pub mod content;
pub mod order;
pub mod session;

pub use cart::{Cart, CartError, CartLine, LineKey};
pub use catalog::{Category, Product, ProductFilter, ProductPage, Subcategory};
pub use content::{Banner, HomeResponse, HomepageSettings, Popup};
pub use order::{
    CheckoutDetails, CheckoutError, NewOrder, NewOrderItem, OrderSummary, StockReservation,
};
pub use session::keys as session_keys;
