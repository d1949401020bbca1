//! Outbound integrations for the storefront.

pub mod payment;

pub use payment::{CheckoutSession, CheckoutSessionRequest, PaymentClient, PaymentError, ReturnStatus};
