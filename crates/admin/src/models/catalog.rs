//! Catalog editor models: products, categories and subcategories.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use atelier_core::pricing::{self, Discount};
use atelier_core::{CategoryId, Locale, LocalizedText, ProductId, SubcategoryId};

use super::{MAX_SHORT_TEXT, ValidationError, link};

const MAX_SLUG_LENGTH: usize = 120;
const MAX_DESCRIPTION_LENGTH: usize = 10_000;
const MAX_IMAGES: usize = 20;
const MAX_OPTIONS: usize = 30;

// =============================================================================
// Categories
// =============================================================================

/// A top-level category with its subcategories.
#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub slug: String,
    pub name: LocalizedText,
    pub sort_order: i32,
    pub subcategories: Vec<Subcategory>,
}

/// A subcategory.
#[derive(Debug, Clone, Serialize)]
pub struct Subcategory {
    pub id: SubcategoryId,
    pub category_id: CategoryId,
    pub slug: String,
    pub name: LocalizedText,
    pub sort_order: i32,
}

/// Create/update body for a category.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    #[serde(default)]
    pub slug: Option<String>,
    pub name: LocalizedText,
    #[serde(default)]
    pub sort_order: i32,
}

impl CategoryInput {
    /// Validate and fill in the slug from the English name when absent.
    ///
    /// # Errors
    ///
    /// Returns an error for a blank name or an unusable slug.
    pub fn validate(mut self) -> Result<Self, ValidationError> {
        self.slug = Some(resolve_slug(self.slug.as_deref(), &self.name)?);
        Ok(self)
    }
}

/// Create/update body for a subcategory.
#[derive(Debug, Clone, Deserialize)]
pub struct SubcategoryInput {
    pub category_id: CategoryId,
    #[serde(default)]
    pub slug: Option<String>,
    pub name: LocalizedText,
    #[serde(default)]
    pub sort_order: i32,
}

impl SubcategoryInput {
    /// Validate and fill in the slug from the English name when absent.
    ///
    /// # Errors
    ///
    /// Returns an error for a blank name or an unusable slug.
    pub fn validate(mut self) -> Result<Self, ValidationError> {
        self.slug = Some(resolve_slug(self.slug.as_deref(), &self.name)?);
        Ok(self)
    }
}

// =============================================================================
// Products
// =============================================================================

/// A product as the admin sees it, inactive ones included.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub slug: String,
    pub name: LocalizedText,
    pub description: LocalizedText,
    pub price: Decimal,
    pub sale_price: Option<Decimal>,
    /// Derived from `price` and `sale_price`; never stored.
    pub discount_percent: Option<Decimal>,
    pub stock: i32,
    pub images: Vec<String>,
    pub colors: Vec<String>,
    pub sizes: Vec<String>,
    pub category_id: Option<CategoryId>,
    pub subcategory_id: Option<SubcategoryId>,
    pub is_featured: bool,
    pub is_active: bool,
    pub woo_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether a sale price is set.
    #[must_use]
    pub const fn on_sale(&self) -> bool {
        self.sale_price.is_some()
    }
}

/// Filters for the product list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<CategoryId>,
    pub search: Option<String>,
    pub on_sale: Option<bool>,
    pub active: Option<bool>,
}

/// Create/update body for a product.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    #[serde(default)]
    pub slug: Option<String>,
    pub name: LocalizedText,
    #[serde(default)]
    pub description: LocalizedText,
    pub price: Decimal,
    #[serde(default)]
    pub discount: Discount,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub subcategory_id: Option<SubcategoryId>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

const fn default_true() -> bool {
    true
}

/// A validated product, ready to insert or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub slug: String,
    pub name: LocalizedText,
    pub description: LocalizedText,
    pub price: Decimal,
    pub sale_price: Option<Decimal>,
    pub stock: i32,
    pub images: Vec<String>,
    pub colors: Vec<String>,
    pub sizes: Vec<String>,
    pub category_id: Option<CategoryId>,
    pub subcategory_id: Option<SubcategoryId>,
    pub is_featured: bool,
    pub is_active: bool,
    pub woo_id: Option<i64>,
}

impl ProductInput {
    /// Validate the form.
    ///
    /// Images are checked first: a product without images is rejected before
    /// anything else is looked at.
    ///
    /// # Errors
    ///
    /// Returns the first rule the form breaks.
    pub fn validate(self) -> Result<NewProduct, ValidationError> {
        let images = clean_list(&self.images);
        if images.is_empty() {
            return Err(ValidationError::MissingImages);
        }
        if images.len() > MAX_IMAGES {
            return Err(ValidationError::Invalid(format!(
                "at most {MAX_IMAGES} images are allowed"
            )));
        }
        for image in &images {
            link("image", image)?;
        }

        if self.name.is_blank() {
            return Err(ValidationError::Required("name"));
        }
        for locale in Locale::ALL {
            if self.name.exact(locale).is_some_and(|n| n.chars().count() > MAX_SHORT_TEXT) {
                return Err(ValidationError::TooLong {
                    field: "name",
                    max: MAX_SHORT_TEXT,
                });
            }
            if self
                .description
                .exact(locale)
                .is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_LENGTH)
            {
                return Err(ValidationError::TooLong {
                    field: "description",
                    max: MAX_DESCRIPTION_LENGTH,
                });
            }
        }

        if self.stock < 0 {
            return Err(ValidationError::Invalid("stock cannot be negative".to_owned()));
        }
        let sale_price = pricing::resolve_sale_price(self.price, self.discount)?;

        let colors = clean_list(&self.colors);
        let sizes = clean_list(&self.sizes);
        if colors.len() > MAX_OPTIONS || sizes.len() > MAX_OPTIONS {
            return Err(ValidationError::Invalid(format!(
                "at most {MAX_OPTIONS} colors and sizes are allowed"
            )));
        }

        Ok(NewProduct {
            slug: resolve_slug(self.slug.as_deref(), &self.name)?,
            name: self.name,
            description: self.description,
            price: pricing::round_money(self.price),
            sale_price,
            stock: self.stock,
            images,
            colors,
            sizes,
            category_id: self.category_id,
            subcategory_id: self.subcategory_id,
            is_featured: self.is_featured,
            is_active: self.is_active,
            woo_id: None,
        })
    }
}

/// Body of `POST /api/products/{id}/discount`.
///
/// Give `percent` or `sale_price`; neither clears the discount.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct DiscountBody {
    #[serde(default)]
    pub percent: Option<Decimal>,
    #[serde(default)]
    pub sale_price: Option<Decimal>,
}

impl DiscountBody {
    /// The discount the editor asked for.
    ///
    /// # Errors
    ///
    /// Returns an error when both fields are given.
    pub fn discount(self) -> Result<Discount, ValidationError> {
        match (self.percent, self.sale_price) {
            (Some(_), Some(_)) => Err(ValidationError::Invalid(
                "give either percent or sale_price, not both".to_owned(),
            )),
            (Some(percent), None) => Ok(Discount::Percent(percent)),
            (None, Some(sale)) => Ok(Discount::SalePrice(sale)),
            (None, None) => Ok(Discount::None),
        }
    }
}

// =============================================================================
// Slugs
// =============================================================================

/// Turn a display name into a URL slug: lowercase ASCII letters and digits
/// separated by single dashes.
#[must_use]
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    for c in value.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

fn resolve_slug(slug: Option<&str>, name: &LocalizedText) -> Result<String, ValidationError> {
    if name.is_blank() {
        return Err(ValidationError::Required("name"));
    }
    let slug = match slug.map(str::trim).filter(|s| !s.is_empty()) {
        Some(given) => {
            if slugify(given) != given {
                return Err(ValidationError::Invalid(format!(
                    "slug may only contain lowercase letters, digits and single dashes: {given}"
                )));
            }
            given.to_owned()
        }
        None => slugify(name.get(Locale::En)),
    };
    if slug.is_empty() {
        return Err(ValidationError::Required("slug"));
    }
    if slug.len() > MAX_SLUG_LENGTH {
        return Err(ValidationError::TooLong {
            field: "slug",
            max: MAX_SLUG_LENGTH,
        });
    }
    Ok(slug)
}

/// Trim entries, drop blanks and duplicates, keep order.
fn clean_list(values: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let value = value.trim();
        if !value.is_empty() && !out.iter().any(|v| v == value) {
            out.push(value.to_owned());
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn input() -> ProductInput {
        ProductInput {
            slug: None,
            name: LocalizedText::english("Linen Wrap Dress").with(Locale::Fr, "Robe portefeuille"),
            description: LocalizedText::default(),
            price: dec("89.00"),
            discount: Discount::None,
            stock: 4,
            images: vec!["https://cdn.atelier.test/dress.jpg".to_owned()],
            colors: vec!["Sand".to_owned(), " Sand ".to_owned(), String::new()],
            sizes: vec!["S".to_owned(), "M".to_owned()],
            category_id: None,
            subcategory_id: None,
            is_featured: false,
            is_active: true,
        }
    }

    #[test]
    fn test_product_without_images_is_rejected() {
        let mut form = input();
        form.images = vec!["   ".to_owned()];
        assert_eq!(form.validate(), Err(ValidationError::MissingImages));

        let mut form = input();
        form.images.clear();
        form.name = LocalizedText::default();
        // Images are reported before any other problem.
        assert_eq!(form.validate(), Err(ValidationError::MissingImages));
    }

    #[test]
    fn test_product_validation_derives_slug_and_cleans_lists() {
        let product = input().validate().unwrap();
        assert_eq!(product.slug, "linen-wrap-dress");
        assert_eq!(product.colors, vec!["Sand".to_owned()]);
        assert_eq!(product.sale_price, None);
    }

    #[test]
    fn test_product_discount_percent_becomes_sale_price() {
        let mut form = input();
        form.discount = Discount::Percent(dec("25"));
        assert_eq!(form.validate().unwrap().sale_price, Some(dec("66.75")));

        let mut form = input();
        form.discount = Discount::SalePrice(dec("89.00"));
        assert!(matches!(form.validate(), Err(ValidationError::Pricing(_))));
    }

    #[test]
    fn test_product_rejects_negative_stock_and_bad_images() {
        let mut form = input();
        form.stock = -1;
        assert!(form.validate().is_err());

        let mut form = input();
        form.images = vec!["ftp://cdn.test/a.jpg".to_owned()];
        assert!(form.validate().is_err());
    }

    #[test]
    fn test_discount_body() {
        let body = DiscountBody {
            percent: Some(dec("10")),
            sale_price: None,
        };
        assert_eq!(body.discount().unwrap(), Discount::Percent(dec("10")));
        assert_eq!(DiscountBody::default().discount().unwrap(), Discount::None);

        let both = DiscountBody {
            percent: Some(dec("10")),
            sale_price: Some(dec("5")),
        };
        assert!(both.discount().is_err());
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("  Summer -- Sale 2026! "), "summer-sale-2026");
        assert_eq!(slugify("Robe d'été"), "robe-d-t");
        assert_eq!(slugify("***"), "");
    }

    #[test]
    fn test_explicit_slug_must_be_clean() {
        let name = LocalizedText::english("Bags");
        assert_eq!(resolve_slug(Some("bags"), &name).unwrap(), "bags");
        assert!(resolve_slug(Some("Bags!"), &name).is_err());
        assert!(resolve_slug(None, &LocalizedText::english("!!!")).is_err());
    }
}
