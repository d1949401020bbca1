//! Banners and popups.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use atelier_core::{BannerId, BannerPosition, LocalizedText, PopupId, PopupKind};

use super::{ValidationError, link};

/// Longest accepted popup delay.
pub const MAX_POPUP_DELAY_SECONDS: i32 = 600;

/// A banner, including inactive and scheduled ones.
#[derive(Debug, Clone, Serialize)]
pub struct Banner {
    pub id: BannerId,
    pub title: LocalizedText,
    pub subtitle: LocalizedText,
    pub cta_label: LocalizedText,
    pub image_url: String,
    pub link_url: Option<String>,
    pub position: BannerPosition,
    pub is_active: bool,
    pub sort_order: i32,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create/update body for a banner.
#[derive(Debug, Clone, Deserialize)]
pub struct BannerInput {
    #[serde(default)]
    pub title: LocalizedText,
    #[serde(default)]
    pub subtitle: LocalizedText,
    #[serde(default)]
    pub cta_label: LocalizedText,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub link_url: Option<String>,
    #[serde(default)]
    pub position: BannerPosition,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
}

const fn default_true() -> bool {
    true
}

impl BannerInput {
    /// Validate the form, normalizing the URLs.
    ///
    /// # Errors
    ///
    /// Returns an error for a missing image, a bad link or an empty window.
    pub fn validate(mut self) -> Result<Self, ValidationError> {
        if self.image_url.trim().is_empty() {
            return Err(ValidationError::Required("image_url"));
        }
        self.image_url = link("image_url", &self.image_url)?;
        self.link_url = optional_link("link_url", self.link_url.as_deref())?;
        check_window(self.starts_at, self.ends_at)?;
        Ok(self)
    }
}

/// A popup, including inactive ones.
#[derive(Debug, Clone, Serialize)]
pub struct Popup {
    pub id: PopupId,
    pub title: LocalizedText,
    pub body: LocalizedText,
    pub cta_label: LocalizedText,
    pub image_url: Option<String>,
    pub link_url: Option<String>,
    pub kind: PopupKind,
    pub is_active: bool,
    pub delay_seconds: i32,
    pub show_once: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create/update body for a popup.
#[derive(Debug, Clone, Deserialize)]
pub struct PopupInput {
    pub title: LocalizedText,
    #[serde(default)]
    pub body: LocalizedText,
    #[serde(default)]
    pub cta_label: LocalizedText,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub link_url: Option<String>,
    #[serde(default)]
    pub kind: PopupKind,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default = "default_delay")]
    pub delay_seconds: i32,
    #[serde(default = "default_true")]
    pub show_once: bool,
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
}

const fn default_delay() -> i32 {
    5
}

impl PopupInput {
    /// Validate the form, normalizing the URLs.
    ///
    /// # Errors
    ///
    /// Returns an error for a blank title, an out-of-range delay, a bad link
    /// or an empty window.
    pub fn validate(mut self) -> Result<Self, ValidationError> {
        if self.title.is_blank() {
            return Err(ValidationError::Required("title"));
        }
        if !(0..=MAX_POPUP_DELAY_SECONDS).contains(&self.delay_seconds) {
            return Err(ValidationError::Invalid(format!(
                "delay_seconds must be between 0 and {MAX_POPUP_DELAY_SECONDS}"
            )));
        }
        self.image_url = optional_link("image_url", self.image_url.as_deref())?;
        self.link_url = optional_link("link_url", self.link_url.as_deref())?;
        check_window(self.starts_at, self.ends_at)?;
        Ok(self)
    }
}

/// Body of the banner reorder endpoint: ids in their new display order.
#[derive(Debug, Clone, Deserialize)]
pub struct ReorderBody {
    pub ids: Vec<BannerId>,
}

impl ReorderBody {
    /// # Errors
    ///
    /// Returns an error for an empty list or a repeated id.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.ids.is_empty() {
            return Err(ValidationError::Required("ids"));
        }
        for (i, id) in self.ids.iter().enumerate() {
            if self.ids.iter().skip(i + 1).any(|other| other == id) {
                return Err(ValidationError::Invalid(format!("banner {id} is listed twice")));
            }
        }
        Ok(())
    }
}

fn optional_link(field: &'static str, value: Option<&str>) -> Result<Option<String>, ValidationError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => link(field, v).map(Some),
        None => Ok(None),
    }
}

fn check_window(
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
) -> Result<(), ValidationError> {
    match (starts_at, ends_at) {
        (Some(start), Some(end)) if start >= end => Err(ValidationError::Invalid(
            "starts_at must be before ends_at".to_owned(),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn banner() -> BannerInput {
        BannerInput {
            title: LocalizedText::english("Summer edit"),
            subtitle: LocalizedText::default(),
            cta_label: LocalizedText::english("Shop now"),
            image_url: " https://cdn.atelier.test/hero.jpg ".to_owned(),
            link_url: Some("  ".to_owned()),
            position: BannerPosition::Hero,
            is_active: true,
            sort_order: 0,
            starts_at: None,
            ends_at: None,
        }
    }

    #[test]
    fn test_banner_requires_image() {
        let mut form = banner();
        form.image_url = String::new();
        assert_eq!(form.validate().unwrap_err(), ValidationError::Required("image_url"));
    }

    #[test]
    fn test_banner_normalizes_links() {
        let form = banner().validate().unwrap();
        assert_eq!(form.image_url, "https://cdn.atelier.test/hero.jpg");
        assert_eq!(form.link_url, None);
    }

    #[test]
    fn test_banner_window_must_not_be_empty() {
        let now = Utc::now();
        let mut form = banner();
        form.starts_at = Some(now);
        form.ends_at = Some(now - Duration::hours(1));
        assert!(form.validate().is_err());
    }

    #[test]
    fn test_popup_delay_range() {
        let json = serde_json::json!({ "title": { "en": "Join us" }, "delay_seconds": 601 });
        let form: PopupInput = serde_json::from_value(json).unwrap();
        assert!(form.validate().is_err());

        let json = serde_json::json!({ "title": { "en": "Join us" } });
        let form: PopupInput = serde_json::from_value(json).unwrap();
        let form = form.validate().unwrap();
        assert_eq!(form.delay_seconds, 5);
        assert!(form.show_once);
        assert!(!form.is_active);
    }

    #[test]
    fn test_reorder_rejects_duplicates() {
        let body = ReorderBody {
            ids: vec![BannerId::new(3), BannerId::new(1), BannerId::new(3)],
        };
        assert!(body.validate().is_err());
        assert!(ReorderBody { ids: vec![] }.validate().is_err());
        assert!(ReorderBody { ids: vec![BannerId::new(2), BannerId::new(1)] }.validate().is_ok());
    }
}
