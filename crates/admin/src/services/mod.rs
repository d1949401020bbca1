//! Business logic services for admin.
//!
//! # Services
//!
//! - `auth` - Email and password login with Argon2id
//! - `dashboard` - Overview aggregation
//! - `email` - Newsletter delivery via SMTP
//! - `marketing` - Template rendering, message links and campaigns
//! - `realtime` - Newsletter change feed from Postgres notifications
//! - `woocommerce` - `WooCommerce` client and product import

pub mod auth;
pub mod dashboard;
pub mod email;
pub mod marketing;
pub mod realtime;
pub mod woocommerce;

pub use auth::{AdminAuthError, AdminAuthService, hash_password};
pub use dashboard::{DashboardInput, DashboardStats};
pub use email::{EmailError, EmailService};
pub use realtime::NewsletterFeed;
pub use woocommerce::{WooClient, WooCommerceError, WooSettings};
