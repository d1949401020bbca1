//! Storefront locales and per-language text.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A language the storefront is published in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Fr,
    Ar,
}

impl Locale {
    /// All supported locales, default first.
    pub const ALL: [Self; 3] = [Self::En, Self::Fr, Self::Ar];

    /// ISO 639-1 code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Fr => "fr",
            Self::Ar => "ar",
        }
    }

    /// Whether the locale is written right-to-left.
    #[must_use]
    pub const fn is_rtl(self) -> bool {
        matches!(self, Self::Ar)
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Self::En),
            "fr" => Ok(Self::Fr),
            "ar" => Ok(Self::Ar),
            other => Err(format!("unsupported locale: {other}")),
        }
    }
}

/// Text translated into zero or more locales.
///
/// Stored as a JSON object keyed by locale code (`{"en": "...", "fr": "..."}`).
/// Lookups fall back to English, then to any non-empty translation, so a
/// product with a single name still renders in every locale.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalizedText(BTreeMap<Locale, String>);

impl LocalizedText {
    /// Text with only an English value.
    #[must_use]
    pub fn english(value: impl Into<String>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(Locale::En, value.into());
        Self(map)
    }

    /// Builder-style setter for one translation.
    #[must_use]
    pub fn with(mut self, locale: Locale, value: impl Into<String>) -> Self {
        self.set(locale, value);
        self
    }

    /// Set (or clear, when blank) the translation for `locale`.
    pub fn set(&mut self, locale: Locale, value: impl Into<String>) {
        let value = value.into();
        if value.trim().is_empty() {
            self.0.remove(&locale);
        } else {
            self.0.insert(locale, value);
        }
    }

    /// The exact translation for `locale`, without fallback.
    #[must_use]
    pub fn exact(&self, locale: Locale) -> Option<&str> {
        self.0
            .get(&locale)
            .map(String::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// Resolve the text for `locale` with fallback.
    ///
    /// Returns an empty string only when no translation exists at all.
    #[must_use]
    pub fn get(&self, locale: Locale) -> &str {
        self.exact(locale)
            .or_else(|| self.exact(Locale::En))
            .or_else(|| Locale::ALL.iter().find_map(|l| self.exact(*l)))
            .unwrap_or("")
    }

    /// True when no locale has a non-blank value.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.values().all(|v| v.trim().is_empty())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_to_english() {
        let text = LocalizedText::english("Linen dress").with(Locale::Fr, "Robe en lin");
        assert_eq!(text.get(Locale::Fr), "Robe en lin");
        assert_eq!(text.get(Locale::Ar), "Linen dress");
    }

    #[test]
    fn test_fallback_to_any_translation() {
        let text = LocalizedText::default().with(Locale::Ar, "فستان");
        assert_eq!(text.get(Locale::En), "فستان");
        assert_eq!(text.get(Locale::Fr), "فستان");
    }

    #[test]
    fn test_blank_values_are_dropped() {
        let mut text = LocalizedText::english("Scarf");
        text.set(Locale::Fr, "   ");
        assert_eq!(text.exact(Locale::Fr), None);
        assert!(!text.is_blank());
        assert!(LocalizedText::default().is_blank());
    }

    #[test]
    fn test_json_shape() {
        let text = LocalizedText::english("Coat").with(Locale::Fr, "Manteau");
        let json = serde_json::to_value(&text).unwrap();
        assert_eq!(json, serde_json::json!({"en": "Coat", "fr": "Manteau"}));

        let parsed: LocalizedText = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, text);
    }

    #[test]
    fn test_locale_from_str() {
        assert_eq!("FR".parse::<Locale>().unwrap(), Locale::Fr);
        assert!("de".parse::<Locale>().is_err());
        assert!(Locale::Ar.is_rtl());
    }
}
