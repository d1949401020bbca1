//! Domain models for admin.
//!
//! Editor inputs arrive as `*Input` structs and are validated into the shape
//! the repositories write. Every check happens before a query is issued, so a
//! rejected form never touches the database.

pub mod admin;
pub mod catalog;
pub mod content;
pub mod customer;
pub mod marketing;
pub mod newsletter;
pub mod order;
pub mod session;

use thiserror::Error;

use atelier_core::EmailError;
use atelier_core::pricing::PricingError;

pub use admin::{AdminLog, AdminUser};
pub use catalog::{
    Category, CategoryInput, DiscountBody, NewProduct, Product, ProductInput, ProductQuery,
    Subcategory, SubcategoryInput, slugify,
};
pub use content::{Banner, BannerInput, Popup, PopupInput, ReorderBody};
pub use customer::{Customer, CustomerDetail};
pub use marketing::{
    Audience, Channel, MarketingTemplate, MessageLink, Recipient, TemplateInput,
};
pub use newsletter::{NewsletterChange, NewsletterStats, Subscriber, SubscriberQuery};
pub use order::{Order, OrderDetail, OrderItem, OrderSummary, SoldItem};
pub use session::{CurrentAdmin, keys as session_keys};

/// Longest accepted value for short free-text fields (names, subjects).
pub const MAX_SHORT_TEXT: usize = 200;

/// Reasons an editor form is rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),
    #[error("{field} is too long (max {max} characters)")]
    TooLong { field: &'static str, max: usize },
    #[error("{0}")]
    Invalid(String),
    #[error("at least one image is required")]
    MissingImages,
    #[error(transparent)]
    Pricing(#[from] PricingError),
    #[error("invalid email address: {0}")]
    Email(#[from] EmailError),
}

/// Trim `value` and require it to be non-empty and short.
pub(crate) fn required_text(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required(field));
    }
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(value.to_owned())
}

/// Trim an optional value; blank becomes `None`.
pub(crate) fn optional_text(
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) if v.chars().count() > max => Err(ValidationError::TooLong { field, max }),
        Some(v) => Ok(Some(v.to_owned())),
        None => Ok(None),
    }
}

/// Require an absolute `http(s)` URL or a site-relative path.
pub(crate) fn link(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.starts_with('/') && !value.starts_with("//") {
        return Ok(value.to_owned());
    }
    match url::Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(value.to_owned()),
        _ => Err(ValidationError::Invalid(format!("{field} must be an http(s) URL or a /path"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_text() {
        assert_eq!(required_text("name", "  Lina ", 10), Ok("Lina".to_owned()));
        assert_eq!(
            required_text("name", "   ", 10),
            Err(ValidationError::Required("name"))
        );
        assert_eq!(
            required_text("name", "abcdefghijk", 10),
            Err(ValidationError::TooLong { field: "name", max: 10 })
        );
    }

    #[test]
    fn test_optional_text_blank_is_none() {
        assert_eq!(optional_text("subject", Some("  "), 10), Ok(None));
        assert_eq!(optional_text("subject", None, 10), Ok(None));
        assert_eq!(optional_text("subject", Some(" Hi "), 10), Ok(Some("Hi".to_owned())));
    }

    #[test]
    fn test_link_accepts_paths_and_http() {
        assert!(link("link", "/collections/summer").is_ok());
        assert!(link("link", "https://atelier.test/sale").is_ok());
        assert!(link("link", "//evil.test").is_err());
        assert!(link("link", "javascript:alert(1)").is_err());
    }
}
