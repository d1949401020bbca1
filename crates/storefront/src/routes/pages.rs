//! Markdown info pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::NaiveDate;
use tracing::instrument;

use super::LocaleQuery;
use crate::filters;
use crate::state::AppState;

/// Content page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/content.html")]
pub struct ContentPageTemplate {
    pub title: String,
    pub description: String,
    pub lang: &'static str,
    pub rtl: bool,
    pub updated_at: Option<NaiveDate>,
    pub content_html: String,
}

/// `GET /pages/{slug}?locale=`
///
/// # Errors
///
/// Returns 404 if no page has this slug.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<LocaleQuery>,
) -> Result<ContentPageTemplate, StatusCode> {
    let page = state
        .content()
        .page(&slug, query.locale)
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(ContentPageTemplate {
        title: page.meta.title.clone(),
        description: page.meta.description.clone().unwrap_or_default(),
        lang: page.locale.code(),
        rtl: page.locale.is_rtl(),
        updated_at: page.meta.updated_at,
        content_html: page.content_html.clone(),
    })
}
