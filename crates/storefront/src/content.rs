//! Markdown info pages (terms, privacy, shipping...).
//!
//! Pages are loaded from `{content_dir}/pages` at startup. Each file carries
//! YAML frontmatter and a markdown body. `terms.md` is the English page;
//! `terms.fr.md` and `terms.ar.md` are its translations. Missing translations
//! fall back to English.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use atelier_core::Locale;
use chrono::NaiveDate;
use comrak::{Options, markdown_to_html};
use gray_matter::{Matter, ParsedEntity, engine::YAML};
use serde::Deserialize;

/// Frontmatter of a page.
#[derive(Debug, Clone, Deserialize)]
pub struct PageMeta {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub updated_at: Option<NaiveDate>,
}

/// A rendered page.
#[derive(Debug, Clone)]
pub struct Page {
    pub slug: String,
    pub locale: Locale,
    pub meta: PageMeta,
    pub content_html: String,
}

/// All pages, held in memory.
#[derive(Debug, Clone, Default)]
pub struct ContentStore {
    pages: Arc<HashMap<(String, Locale), Page>>,
}

impl ContentStore {
    /// Load every page under `{content_dir}/pages`.
    ///
    /// Files that fail to parse are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be read.
    pub fn load(content_dir: &Path) -> Result<Self, ContentError> {
        let dir = content_dir.join("pages");
        let mut pages = HashMap::new();

        if !dir.exists() {
            tracing::warn!("Pages directory does not exist: {:?}", dir);
            return Ok(Self::default());
        }

        let entries = std::fs::read_dir(&dir).map_err(|e| ContentError::Io(e.to_string()))?;

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "md") {
                continue;
            }
            match load_page(&path) {
                Ok(page) => {
                    tracing::info!(slug = %page.slug, locale = %page.locale, "Loaded page");
                    pages.insert((page.slug.clone(), page.locale), page);
                }
                Err(e) => {
                    tracing::error!("Failed to load page {:?}: {}", path, e);
                }
            }
        }

        Ok(Self {
            pages: Arc::new(pages),
        })
    }

    /// A page in `locale`, or its English version.
    #[must_use]
    pub fn page(&self, slug: &str, locale: Locale) -> Option<&Page> {
        self.pages
            .get(&(slug.to_owned(), locale))
            .or_else(|| self.pages.get(&(slug.to_owned(), Locale::En)))
    }

    /// Number of loaded page files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Whether no pages were loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

fn load_page(path: &Path) -> Result<Page, ContentError> {
    let content = std::fs::read_to_string(path).map_err(|e| ContentError::Io(e.to_string()))?;

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| ContentError::Parse("Invalid filename".to_string()))?;

    let (slug, locale) = split_locale(stem)?;
    let (meta, content_html) = parse_page(&content)?;

    Ok(Page {
        slug: slug.to_owned(),
        locale,
        meta,
        content_html,
    })
}

/// `"terms.fr"` → (`"terms"`, `Fr`); `"terms"` → (`"terms"`, `En`).
fn split_locale(stem: &str) -> Result<(&str, Locale), ContentError> {
    match stem.rsplit_once('.') {
        Some((slug, code)) => {
            let locale = code
                .parse::<Locale>()
                .map_err(|e| ContentError::Parse(format!("{stem}: {e}")))?;
            Ok((slug, locale))
        }
        None => Ok((stem, Locale::En)),
    }
}

fn parse_page(content: &str) -> Result<(PageMeta, String), ContentError> {
    let matter = Matter::<YAML>::new();
    let parsed: ParsedEntity<PageMeta> = matter
        .parse(content)
        .map_err(|e| ContentError::Parse(format!("Failed to parse frontmatter: {e}")))?;
    let meta = parsed
        .data
        .ok_or_else(|| ContentError::Parse("Missing frontmatter".to_string()))?;

    Ok((meta, render_markdown(&parsed.content)))
}

/// Render markdown to HTML with GitHub Flavored Markdown extensions.
///
/// Raw HTML in page sources is escaped.
fn render_markdown(content: &str) -> String {
    let mut options = Options::default();

    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.header_ids = Some(String::new());
    options.extension.footnotes = true;

    markdown_to_html(content, &options)
}

/// Content loading errors
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const TERMS: &str = "---\ntitle: Terms of Sale\ndescription: The fine print\nupdated_at: 2026-03-01\n---\n# Terms\n\n| a | b |\n|---|---|\n| 1 | 2 |\n";

    #[test]
    fn test_parse_page_reads_frontmatter_and_renders() {
        let (meta, html) = parse_page(TERMS).unwrap();
        assert_eq!(meta.title, "Terms of Sale");
        assert_eq!(meta.description.as_deref(), Some("The fine print"));
        assert_eq!(meta.updated_at, NaiveDate::from_ymd_opt(2026, 3, 1));
        assert!(html.contains("<h1>"));
        assert!(html.contains("<table>"));
    }

    #[test]
    fn test_parse_page_requires_frontmatter() {
        assert!(parse_page("# Just a heading\n").is_err());
    }

    #[test]
    fn test_raw_html_is_not_passed_through() {
        let html = render_markdown("<script>alert(1)</script>\n");
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_split_locale() {
        assert_eq!(split_locale("terms").unwrap(), ("terms", Locale::En));
        assert_eq!(split_locale("size-guide.fr").unwrap(), ("size-guide", Locale::Fr));
        assert_eq!(split_locale("about.ar").unwrap(), ("about", Locale::Ar));
        assert!(split_locale("about.de").is_err());
    }

    #[test]
    fn test_page_falls_back_to_english() {
        let (meta, content_html) = parse_page(TERMS).unwrap();
        let page = Page {
            slug: "terms".to_owned(),
            locale: Locale::En,
            meta,
            content_html,
        };
        let mut pages = HashMap::new();
        pages.insert(("terms".to_owned(), Locale::En), page);
        let store = ContentStore {
            pages: Arc::new(pages),
        };

        assert_eq!(store.page("terms", Locale::Fr).unwrap().locale, Locale::En);
        assert!(store.page("privacy", Locale::En).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_load_missing_dir_is_empty() {
        let store = ContentStore::load(Path::new("/nonexistent/atelier-content")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_bundled_pages_parse() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("content");
        let store = ContentStore::load(&dir).unwrap();
        for slug in ["terms", "privacy", "shipping", "returns", "about", "size-guide"] {
            assert!(store.page(slug, Locale::En).is_some(), "missing page {slug}");
        }
    }
}
