//! Newsletter signup and one-click unsubscribe.

use askama::Template;
use askama_web::WebTemplate;
use atelier_core::Email;
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::db::{NewsletterRepository, SubscribeOutcome};
use crate::error::{AppError, Result};
use crate::filters;
use crate::state::AppState;

/// Longest accepted subscriber name or source tag.
const MAX_NAME_LENGTH: usize = 200;

/// Signup body.
#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Where the form was shown (`footer`, `popup`...).
    #[serde(default)]
    pub source: Option<String>,
}

/// Signup result.
#[derive(Debug, Serialize)]
pub struct SubscribeResponse {
    pub subscribed: bool,
    pub already_subscribed: bool,
}

fn optional_text(value: Option<&str>, field: &str) -> Result<Option<String>> {
    let value = value.map(str::trim).filter(|v| !v.is_empty());
    if value.is_some_and(|v| v.len() > MAX_NAME_LENGTH) {
        return Err(AppError::BadRequest(format!("{field} is too long")));
    }
    Ok(value.map(str::to_owned))
}

/// `POST /api/newsletter/subscribe`
#[instrument(skip(state, body))]
pub async fn subscribe(
    State(state): State<AppState>,
    Json(body): Json<SubscribeRequest>,
) -> Result<(StatusCode, Json<SubscribeResponse>)> {
    let email = Email::parse(&body.email)
        .map_err(|e| AppError::BadRequest(format!("Invalid email address: {e}")))?;
    let name = optional_text(body.name.as_deref(), "name")?;
    let source = optional_text(body.source.as_deref(), "source")?;

    let outcome = NewsletterRepository::new(state.pool())
        .subscribe(&email, name.as_deref(), source.as_deref())
        .await?;

    tracing::info!(domain = email.domain(), ?outcome, "Newsletter signup");

    let (status, already_subscribed) = match outcome {
        SubscribeOutcome::Subscribed => (StatusCode::CREATED, false),
        SubscribeOutcome::Resubscribed => (StatusCode::OK, false),
        SubscribeOutcome::AlreadySubscribed => (StatusCode::OK, true),
    };

    Ok((
        status,
        Json(SubscribeResponse {
            subscribed: true,
            already_subscribed,
        }),
    ))
}

/// Query for the unsubscribe link.
#[derive(Debug, Deserialize)]
pub struct UnsubscribeQuery {
    pub token: Option<String>,
}

/// Unsubscribe confirmation page.
#[derive(Template, WebTemplate)]
#[template(path = "newsletter/unsubscribed.html")]
pub struct UnsubscribedTemplate {
    pub title: String,
    pub email: Option<String>,
}

/// `GET /newsletter/unsubscribe?token=`
///
/// Unknown or malformed tokens render the same page with a 404 so the link
/// cannot be used to probe for addresses.
#[instrument(skip(state, query))]
pub async fn unsubscribe(
    State(state): State<AppState>,
    Query(query): Query<UnsubscribeQuery>,
) -> Result<(StatusCode, UnsubscribedTemplate)> {
    let Some(token) = query
        .token
        .as_deref()
        .and_then(|t| Uuid::parse_str(t.trim()).ok())
    else {
        return Ok((StatusCode::NOT_FOUND, not_found_page()));
    };

    match NewsletterRepository::new(state.pool())
        .unsubscribe(token)
        .await?
    {
        Some(email) => {
            tracing::info!("Newsletter unsubscribe");
            Ok((
                StatusCode::OK,
                UnsubscribedTemplate {
                    title: "You have been unsubscribed".to_owned(),
                    email: Some(email),
                },
            ))
        }
        None => Ok((StatusCode::NOT_FOUND, not_found_page())),
    }
}

fn not_found_page() -> UnsubscribedTemplate {
    UnsubscribedTemplate {
        title: "Link not recognised".to_owned(),
        email: None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_text_trims_and_drops_blank() {
        assert_eq!(optional_text(Some("  Nour "), "name").unwrap().as_deref(), Some("Nour"));
        assert_eq!(optional_text(Some("   "), "name").unwrap(), None);
        assert_eq!(optional_text(None, "name").unwrap(), None);
        assert!(optional_text(Some(&"x".repeat(201)), "name").is_err());
    }

    #[test]
    fn test_unsubscribe_page_renders() {
        let html = UnsubscribedTemplate {
            title: "You have been unsubscribed".to_owned(),
            email: Some("nour@shop.test".to_owned()),
        }
        .render()
        .unwrap();
        assert!(html.contains("nour@shop.test"));
    }
}
