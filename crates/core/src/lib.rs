//! Atelier Core - Shared types library.
//!
//! This crate provides common types used across all Atelier components:
//! - `storefront` - Public catalog, cart and checkout
//! - `admin` - Internal administration panel
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Database mappings are compiled in behind the
//! `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, locales and status enums
//! - [`pricing`] - Discount percentage / sale price conversion
//! - [`template`] - `{{placeholder}}` substitution for marketing messages
//! - [`csv`] - CSV document builder for exports

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod csv;
pub mod pricing;
pub mod template;
pub mod types;

pub use types::*;
