//! `WooCommerce` REST v3 client and product import.
//!
//! Connection settings live in the `woocommerce` settings row. Products are
//! pulled 100 per page and upserted keyed on their `WooCommerce` id, so
//! re-running an import refreshes prices and stock without duplicating.

use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use atelier_core::LocalizedText;
use atelier_core::pricing::round_money;

use crate::db::{ImportOutcome, ProductRepository, RepositoryError};
use crate::models::{NewProduct, slugify};

const PER_PAGE: usize = 100;
/// Stop after this many pages even if the store keeps returning full ones.
const MAX_PAGES: u32 = 1_000;

/// Errors talking to `WooCommerce`.
#[derive(Debug, Error)]
pub enum WooCommerceError {
    /// No connection settings saved yet.
    #[error("WooCommerce is not configured")]
    NotConfigured,

    /// Settings are present but unusable.
    #[error("invalid WooCommerce settings: {0}")]
    InvalidSettings(String),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Writing imported products failed.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

// =============================================================================
// Settings
// =============================================================================

/// Stored connection settings.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct WooSettings {
    pub url: String,
    pub consumer_key: String,
    pub consumer_secret: String,
}

impl std::fmt::Debug for WooSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WooSettings")
            .field("url", &self.url)
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"[REDACTED]")
            .finish()
    }
}

/// Settings as returned to the browser: the secret never leaves the server.
#[derive(Debug, Clone, Serialize)]
pub struct WooSettingsView {
    pub url: String,
    pub consumer_key: String,
    pub has_secret: bool,
}

impl From<&WooSettings> for WooSettingsView {
    fn from(settings: &WooSettings) -> Self {
        Self {
            url: settings.url.clone(),
            consumer_key: settings.consumer_key.clone(),
            has_secret: !settings.consumer_secret.is_empty(),
        }
    }
}

/// Body of `PUT /api/woocommerce/config`. A blank secret keeps the stored
/// one.
#[derive(Debug, Clone, Deserialize)]
pub struct WooSettingsInput {
    pub url: String,
    pub consumer_key: String,
    #[serde(default)]
    pub consumer_secret: Option<String>,
}

impl WooSettingsInput {
    /// Merge with the stored settings and validate.
    ///
    /// # Errors
    ///
    /// Returns `WooCommerceError::InvalidSettings` for a bad URL or missing
    /// credentials.
    pub fn merge(self, existing: Option<WooSettings>) -> Result<WooSettings, WooCommerceError> {
        let url = self.url.trim().trim_end_matches('/').to_owned();
        match url::Url::parse(&url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            _ => {
                return Err(WooCommerceError::InvalidSettings(
                    "url must be an http(s) URL".to_owned(),
                ));
            }
        }

        let consumer_key = self.consumer_key.trim().to_owned();
        if consumer_key.is_empty() {
            return Err(WooCommerceError::InvalidSettings(
                "consumer_key is required".to_owned(),
            ));
        }

        let consumer_secret = match self.consumer_secret.map(|s| s.trim().to_owned()) {
            Some(secret) if !secret.is_empty() => secret,
            _ => existing.map(|e| e.consumer_secret).unwrap_or_default(),
        };
        if consumer_secret.is_empty() {
            return Err(WooCommerceError::InvalidSettings(
                "consumer_secret is required".to_owned(),
            ));
        }

        Ok(WooSettings {
            url,
            consumer_key,
            consumer_secret,
        })
    }
}

// =============================================================================
// API types
// =============================================================================

/// A product from `GET /wp-json/wc/v3/products`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WooProduct {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub status: String,
    pub description: String,
    pub short_description: String,
    pub price: String,
    pub regular_price: String,
    pub sale_price: String,
    pub stock_quantity: Option<i64>,
    pub images: Vec<WooImage>,
    pub attributes: Vec<WooAttribute>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WooImage {
    pub src: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WooAttribute {
    pub name: String,
    pub options: Vec<String>,
}

/// The parts of `GET /wp-json/wc/v3/system_status` shown after a
/// connection test.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemStatus {
    pub environment: StoreEnvironment,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreEnvironment {
    pub home_url: Option<String>,
    pub version: Option<String>,
}

/// Counts returned by an import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub updated: usize,
    pub skipped: usize,
}

// =============================================================================
// Client
// =============================================================================

/// Client for one `WooCommerce` store.
#[derive(Clone)]
pub struct WooClient {
    client: reqwest::Client,
    base_url: String,
    settings: WooSettings,
}

impl WooClient {
    /// Create a client for the stored settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(settings: WooSettings) -> Result<Self, WooCommerceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: format!("{}/wp-json/wc/v3", settings.url.trim_end_matches('/')),
            settings,
        })
    }

    /// Check the credentials against the store's status endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable or rejects the keys.
    #[tracing::instrument(skip(self), fields(store = %self.settings.url))]
    pub async fn test_connection(&self) -> Result<SystemStatus, WooCommerceError> {
        self.get("system_status", &[]).await
    }

    /// One page of products, 1-based.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn products_page(&self, page: u32) -> Result<Vec<WooProduct>, WooCommerceError> {
        self.get(
            "products",
            &[("per_page", PER_PAGE.to_string()), ("page", page.to_string())],
        )
        .await
    }

    /// Pull every product and upsert it.
    ///
    /// # Errors
    ///
    /// Returns an error if a page cannot be fetched or a write fails. Rows
    /// written before the failure stay written.
    #[tracing::instrument(skip(self, products), fields(store = %self.settings.url))]
    pub async fn import(&self, products: &ProductRepository<'_>) -> Result<ImportReport, WooCommerceError> {
        let mut report = ImportReport::default();

        for page in 1..=MAX_PAGES {
            let batch = self.products_page(page).await?;
            let fetched = batch.len();

            for woo in batch {
                let Some(product) = map_product(&woo) else {
                    tracing::debug!(woo_id = woo.id, "Skipping product without images or price");
                    report.skipped += 1;
                    continue;
                };
                match products.upsert_imported(&product).await? {
                    ImportOutcome::Inserted => report.imported += 1,
                    ImportOutcome::Updated => report.updated += 1,
                    ImportOutcome::Skipped => {
                        tracing::warn!(woo_id = woo.id, slug = %product.slug, "Slug already used, skipping");
                        report.skipped += 1;
                    }
                }
            }

            if fetched < PER_PAGE {
                break;
            }
        }

        tracing::info!(
            imported = report.imported,
            updated = report.updated,
            skipped = report.skipped,
            "WooCommerce import finished"
        );
        Ok(report)
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, WooCommerceError> {
        let response = self
            .client
            .get(format!("{}/{path}", self.base_url))
            .basic_auth(&self.settings.consumer_key, Some(&self.settings.consumer_secret))
            .query(query)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(WooCommerceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

// =============================================================================
// Mapping
// =============================================================================

/// Map a `WooCommerce` product onto ours.
///
/// Returns `None` for products without images or without a positive price.
/// A sale price is kept only when it is below the regular price.
#[must_use]
pub fn map_product(woo: &WooProduct) -> Option<NewProduct> {
    let images: Vec<String> = woo
        .images
        .iter()
        .map(|i| i.src.trim().to_owned())
        .filter(|src| !src.is_empty())
        .collect();
    if images.is_empty() {
        return None;
    }

    let price = parse_price(&woo.regular_price)
        .or_else(|| parse_price(&woo.price))
        .filter(|p| *p > Decimal::ZERO)?;
    let sale_price = parse_price(&woo.sale_price).filter(|s| *s > Decimal::ZERO && *s < price);

    let name = decode_entities(woo.name.trim());
    if name.is_empty() {
        return None;
    }

    let description = {
        let long = strip_html(&woo.description);
        if long.is_empty() { strip_html(&woo.short_description) } else { long }
    };

    let slug = Some(slugify(&woo.slug))
        .filter(|s| !s.is_empty())
        .or_else(|| Some(slugify(&name)).filter(|s| !s.is_empty()))
        .unwrap_or_else(|| format!("woo-{}", woo.id));

    let stock = woo
        .stock_quantity
        .map_or(0, |q| i32::try_from(q.max(0)).unwrap_or(i32::MAX));

    Some(NewProduct {
        slug,
        name: LocalizedText::english(name),
        description: if description.is_empty() {
            LocalizedText::default()
        } else {
            LocalizedText::english(description)
        },
        price,
        sale_price,
        stock,
        images,
        colors: attribute_options(woo, &["color", "colour"]),
        sizes: attribute_options(woo, &["size"]),
        category_id: None,
        subcategory_id: None,
        is_featured: false,
        is_active: woo.status.is_empty() || woo.status == "publish",
        woo_id: Some(woo.id),
    })
}

fn parse_price(value: &str) -> Option<Decimal> {
    Decimal::from_str(value.trim()).ok().map(round_money)
}

/// Options of the first attribute whose name matches one of `names`
/// (case-insensitive, `pa_` taxonomy prefix ignored).
fn attribute_options(woo: &WooProduct, names: &[&str]) -> Vec<String> {
    woo.attributes
        .iter()
        .find(|a| {
            let name = a.name.trim().to_ascii_lowercase();
            let name = name.strip_prefix("pa_").unwrap_or(&name);
            names.contains(&name)
        })
        .map(|a| {
            a.options
                .iter()
                .map(|o| decode_entities(o.trim()))
                .filter(|o| !o.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Reduce HTML to plain text: tags dropped, block ends become line breaks,
/// common entities decoded, blank lines removed.
#[must_use]
pub fn strip_html(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(start) = rest.find('<') {
        text.push_str(rest.get(..start).unwrap_or_default());
        let after = rest.get(start..).unwrap_or_default();
        let Some(end) = after.find('>') else {
            text.push_str(after);
            rest = "";
            break;
        };
        let tag = after.get(1..end).unwrap_or_default().trim().to_ascii_lowercase();
        if tag.starts_with("br") || tag.starts_with("/p") || tag.starts_with("/li") || tag.starts_with("/h") {
            text.push('\n');
        }
        rest = after.get(end + 1..).unwrap_or_default();
    }
    text.push_str(rest);

    decode_entities(&text)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&#8217;", "\u{2019}")
        .replace("&#8211;", "\u{2013}")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
