//! Catalog models: categories and products.

use atelier_core::pricing::{effective_price, percent_from_sale_price};
use atelier_core::{CategoryId, Locale, LocalizedText, ProductId, SubcategoryId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Default page size for product listings.
pub const DEFAULT_PER_PAGE: u32 = 24;

/// Largest page size a client may request.
pub const MAX_PER_PAGE: u32 = 60;

/// A top-level category.
#[derive(Debug, Clone)]
pub struct Category {
    pub id: CategoryId,
    pub slug: String,
    pub name: LocalizedText,
    pub sort_order: i32,
    pub subcategories: Vec<Subcategory>,
}

/// A subcategory within a category.
#[derive(Debug, Clone)]
pub struct Subcategory {
    pub id: SubcategoryId,
    pub category_id: CategoryId,
    pub slug: String,
    pub name: LocalizedText,
    pub sort_order: i32,
}

/// An active product as shown to shoppers.
#[derive(Debug, Clone)]
pub struct Product {
    pub id: ProductId,
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
    pub created_at: DateTime<Utc>,
}

impl Product {
    #[must_use]
    pub const fn on_sale(&self) -> bool {
        self.sale_price.is_some()
    }

    /// The price charged at checkout.
    #[must_use]
    pub fn unit_price(&self) -> Decimal {
        effective_price(self.price, self.sale_price)
    }

    /// Discount percentage derived from the sale price.
    #[must_use]
    pub fn discount_percent(&self) -> Option<Decimal> {
        self.sale_price
            .and_then(|sale| percent_from_sale_price(self.price, sale).ok())
    }

    /// Whether `option` is one of the allowed values. Products without
    /// configured options accept no value.
    #[must_use]
    pub fn accepts_option(allowed: &[String], option: Option<&str>) -> bool {
        match option {
            None => allowed.is_empty(),
            Some(value) => allowed.iter().any(|a| a.eq_ignore_ascii_case(value)),
        }
    }
}

/// Listing filters, parsed from the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    /// Category slug
    pub category: Option<String>,
    /// Subcategory slug
    pub subcategory: Option<String>,
    /// Only products with a sale price
    #[serde(default)]
    pub on_sale: bool,
    /// Free-text search across all translations of the name
    pub q: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    #[serde(default)]
    pub locale: Locale,
}

impl ProductFilter {
    /// One-based page number.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Page size clamped to `1..=MAX_PER_PAGE`.
    #[must_use]
    pub fn per_page(&self) -> u32 {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }

    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page() - 1) * i64::from(self.per_page())
    }

    /// Trimmed search text, if any.
    #[must_use]
    pub fn search(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}

/// A page of products.
#[derive(Debug, Clone)]
pub struct ProductPage {
    pub items: Vec<Product>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

// =============================================================================
// Locale-resolved views
// =============================================================================

/// Product as returned by the JSON API.
#[derive(Debug, Clone, Serialize)]
pub struct ProductView {
    pub id: ProductId,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub sale_price: Option<Decimal>,
    pub discount_percent: Option<Decimal>,
    pub on_sale: bool,
    pub in_stock: bool,
    pub stock: i32,
    pub images: Vec<String>,
    pub colors: Vec<String>,
    pub sizes: Vec<String>,
    pub category_id: Option<CategoryId>,
    pub subcategory_id: Option<SubcategoryId>,
    pub is_featured: bool,
}

impl ProductView {
    #[must_use]
    pub fn new(product: &Product, locale: Locale) -> Self {
        Self {
            id: product.id,
            slug: product.slug.clone(),
            name: product.name.get(locale).to_owned(),
            description: product.description.get(locale).to_owned(),
            price: product.price,
            sale_price: product.sale_price,
            discount_percent: product.discount_percent(),
            on_sale: product.on_sale(),
            in_stock: product.stock > 0,
            stock: product.stock,
            images: product.images.clone(),
            colors: product.colors.clone(),
            sizes: product.sizes.clone(),
            category_id: product.category_id,
            subcategory_id: product.subcategory_id,
            is_featured: product.is_featured,
        }
    }
}

/// Category with its subcategories, resolved for one locale.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryView {
    pub id: CategoryId,
    pub slug: String,
    pub name: String,
    pub subcategories: Vec<SubcategoryView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubcategoryView {
    pub id: SubcategoryId,
    pub slug: String,
    pub name: String,
}

impl CategoryView {
    #[must_use]
    pub fn new(category: &Category, locale: Locale) -> Self {
        Self {
            id: category.id,
            slug: category.slug.clone(),
            name: category.name.get(locale).to_owned(),
            subcategories: category
                .subcategories
                .iter()
                .map(|s| SubcategoryView {
                    id: s.id,
                    slug: s.slug.clone(),
                    name: s.name.get(locale).to_owned(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(price: &str, sale: Option<&str>) -> Product {
        Product {
            id: ProductId::new(1),
            slug: "linen-dress".to_owned(),
            name: LocalizedText::english("Linen dress").with(Locale::Fr, "Robe en lin"),
            description: LocalizedText::default(),
            price: price.parse().unwrap(),
            sale_price: sale.map(|s| s.parse().unwrap()),
            stock: 3,
            images: vec!["https://cdn.test/dress.jpg".to_owned()],
            colors: vec!["Sand".to_owned()],
            sizes: vec!["S".to_owned(), "M".to_owned()],
            category_id: None,
            subcategory_id: None,
            is_featured: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_discount_is_derived() {
        let p = product("80.00", Some("60.00"));
        assert!(p.on_sale());
        assert_eq!(p.unit_price(), "60.00".parse::<Decimal>().unwrap());
        assert_eq!(p.discount_percent(), Some("25.00".parse().unwrap()));

        let p = product("80.00", None);
        assert_eq!(p.discount_percent(), None);
        assert_eq!(p.unit_price(), "80.00".parse::<Decimal>().unwrap());
    }

    #[test]
    fn test_view_resolves_locale() {
        let view = ProductView::new(&product("80.00", None), Locale::Fr);
        assert_eq!(view.name, "Robe en lin");
        assert!(view.in_stock);
    }

    #[test]
    fn test_accepts_option() {
        let sizes = vec!["S".to_owned(), "M".to_owned()];
        assert!(Product::accepts_option(&sizes, Some("m")));
        assert!(!Product::accepts_option(&sizes, Some("XL")));
        assert!(!Product::accepts_option(&sizes, None));
        assert!(Product::accepts_option(&[], None));
    }

    #[test]
    fn test_pagination_clamps() {
        let filter = ProductFilter {
            page: Some(0),
            per_page: Some(500),
            ..ProductFilter::default()
        };
        assert_eq!(filter.page(), 1);
        assert_eq!(filter.per_page(), MAX_PER_PAGE);
        assert_eq!(filter.offset(), 0);

        let filter = ProductFilter {
            page: Some(3),
            per_page: Some(0),
            ..ProductFilter::default()
        };
        assert_eq!(filter.per_page(), 1);
        assert_eq!(filter.offset(), 2);
    }

    #[test]
    fn test_blank_search_ignored() {
        let filter = ProductFilter {
            q: Some("   ".to_owned()),
            ..ProductFilter::default()
        };
        assert_eq!(filter.search(), None);
    }
}
