//! Banners, popups and homepage settings.

use atelier_core::{BannerId, BannerPosition, Locale, LocalizedText, PopupId, PopupKind};
use serde::{Deserialize, Serialize};

use super::catalog::{Product, ProductView};

/// A banner currently inside its display window.
#[derive(Debug, Clone)]
pub struct Banner {
    pub id: BannerId,
    pub title: LocalizedText,
    pub subtitle: LocalizedText,
    pub cta_label: LocalizedText,
    pub image_url: String,
    pub link_url: Option<String>,
    pub position: BannerPosition,
    pub sort_order: i32,
}

/// A popup currently inside its display window.
#[derive(Debug, Clone)]
pub struct Popup {
    pub id: PopupId,
    pub title: LocalizedText,
    pub body: LocalizedText,
    pub cta_label: LocalizedText,
    pub image_url: Option<String>,
    pub link_url: Option<String>,
    pub kind: PopupKind,
    pub delay_seconds: i32,
    pub show_once: bool,
}

/// The `homepage` settings row.
///
/// Missing fields fall back to defaults so a partially edited row still
/// renders.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HomepageSettings {
    pub hero_title: LocalizedText,
    pub hero_subtitle: LocalizedText,
    pub announcement: LocalizedText,
    pub featured_limit: i64,
    pub show_newsletter: bool,
}

impl Default for HomepageSettings {
    fn default() -> Self {
        Self {
            hero_title: LocalizedText::default(),
            hero_subtitle: LocalizedText::default(),
            announcement: LocalizedText::default(),
            featured_limit: 8,
            show_newsletter: true,
        }
    }
}

impl HomepageSettings {
    /// Parse the stored JSON, falling back to defaults when it is malformed.
    #[must_use]
    pub fn from_json(value: Option<serde_json::Value>) -> Self {
        value
            .and_then(|v| match serde_json::from_value(v) {
                Ok(settings) => Some(settings),
                Err(e) => {
                    tracing::warn!(error = %e, "Invalid homepage settings, using defaults");
                    None
                }
            })
            .unwrap_or_default()
    }

    /// Featured product count clamped to a sane range.
    #[must_use]
    pub fn featured_limit(&self) -> i64 {
        self.featured_limit.clamp(0, 24)
    }
}

// =============================================================================
// Locale-resolved views
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct BannerView {
    pub id: BannerId,
    pub title: String,
    pub subtitle: String,
    pub cta_label: String,
    pub image_url: String,
    pub link_url: Option<String>,
    pub position: BannerPosition,
}

impl BannerView {
    #[must_use]
    pub fn new(banner: &Banner, locale: Locale) -> Self {
        Self {
            id: banner.id,
            title: banner.title.get(locale).to_owned(),
            subtitle: banner.subtitle.get(locale).to_owned(),
            cta_label: banner.cta_label.get(locale).to_owned(),
            image_url: banner.image_url.clone(),
            link_url: banner.link_url.clone(),
            position: banner.position,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PopupView {
    pub id: PopupId,
    pub kind: PopupKind,
    pub title: String,
    pub body: String,
    pub cta_label: String,
    pub image_url: Option<String>,
    pub link_url: Option<String>,
    pub delay_seconds: i32,
    pub show_once: bool,
}

impl PopupView {
    #[must_use]
    pub fn new(popup: &Popup, locale: Locale) -> Self {
        Self {
            id: popup.id,
            kind: popup.kind,
            title: popup.title.get(locale).to_owned(),
            body: popup.body.get(locale).to_owned(),
            cta_label: popup.cta_label.get(locale).to_owned(),
            image_url: popup.image_url.clone(),
            link_url: popup.link_url.clone(),
            delay_seconds: popup.delay_seconds,
            show_once: popup.show_once,
        }
    }
}

/// Homepage copy resolved for one locale.
#[derive(Debug, Clone, Serialize)]
pub struct HomepageView {
    pub hero_title: String,
    pub hero_subtitle: String,
    pub announcement: String,
    pub show_newsletter: bool,
}

impl HomepageView {
    #[must_use]
    pub fn new(settings: &HomepageSettings, locale: Locale) -> Self {
        Self {
            hero_title: settings.hero_title.get(locale).to_owned(),
            hero_subtitle: settings.hero_subtitle.get(locale).to_owned(),
            announcement: settings.announcement.get(locale).to_owned(),
            show_newsletter: settings.show_newsletter,
        }
    }
}

/// Everything the homepage needs in one payload.
#[derive(Debug, Clone, Serialize)]
pub struct HomeResponse {
    pub locale: Locale,
    pub settings: HomepageView,
    pub hero_banners: Vec<BannerView>,
    pub top_bar_banners: Vec<BannerView>,
    pub featured: Vec<ProductView>,
    pub popups: Vec<PopupView>,
}

impl HomeResponse {
    /// Resolve stored content for one locale, splitting banners by position.
    #[must_use]
    pub fn new(
        settings: &HomepageSettings,
        banners: &[Banner],
        featured: &[Product],
        popups: &[Popup],
        locale: Locale,
    ) -> Self {
        let banners_at = |position: BannerPosition| {
            banners
                .iter()
                .filter(|b| b.position == position)
                .map(|b| BannerView::new(b, locale))
                .collect()
        };

        Self {
            locale,
            settings: HomepageView::new(settings, locale),
            hero_banners: banners_at(BannerPosition::Hero),
            top_bar_banners: banners_at(BannerPosition::TopBar),
            featured: featured.iter().map(|p| ProductView::new(p, locale)).collect(),
            popups: popups.iter().map(|p| PopupView::new(p, locale)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_homepage_partial_json_uses_defaults() {
        let settings = HomepageSettings::from_json(Some(serde_json::json!({
            "hero_title": {"en": "Summer edit", "fr": "Collection été"}
        })));
        assert_eq!(settings.featured_limit(), 8);
        assert!(settings.show_newsletter);
        assert_eq!(settings.hero_title.get(Locale::Fr), "Collection été");
    }

    #[test]
    fn test_homepage_malformed_json_falls_back() {
        let settings = HomepageSettings::from_json(Some(serde_json::json!("not an object")));
        assert_eq!(settings.featured_limit, 8);
        let settings = HomepageSettings::from_json(None);
        assert!(settings.hero_title.is_blank());
    }

    #[test]
    fn test_home_response_splits_banners_by_position() {
        let banner = |id, position| Banner {
            id: BannerId::new(id),
            title: LocalizedText::english("New in").with(Locale::Ar, "وصل حديثا"),
            subtitle: LocalizedText::default(),
            cta_label: LocalizedText::default(),
            image_url: "https://cdn.test/b.jpg".to_owned(),
            link_url: None,
            position,
            sort_order: 0,
        };
        let banners = [
            banner(1, BannerPosition::Hero),
            banner(2, BannerPosition::TopBar),
            banner(3, BannerPosition::Hero),
        ];
        let home = HomeResponse::new(&HomepageSettings::default(), &banners, &[], &[], Locale::Ar);
        assert_eq!(home.hero_banners.len(), 2);
        assert_eq!(home.top_bar_banners.len(), 1);
        assert_eq!(home.hero_banners[0].title, "وصل حديثا");
    }

    #[test]
    fn test_featured_limit_is_clamped() {
        let settings = HomepageSettings {
            featured_limit: 1000,
            ..HomepageSettings::default()
        };
        assert_eq!(settings.featured_limit(), 24);
    }
}
