//! Marketing templates and campaigns.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use super::audit;
use crate::db::settings::MARKETING_TEMPLATES;
use crate::db::{CustomerRepository, NewsletterRepository, SettingsRepository};
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdminAuth, RequireWriteAccess};
use crate::models::{
    Audience, Channel, MarketingTemplate, Recipient, TemplateInput, ValidationError,
};
use crate::services::marketing::{
    self, LinkBatch, RenderedMessage, SendReport, customer_recipients, subscriber_recipients,
};
use crate::state::AppState;

/// Which template to use: a stored one, or an unsaved draft.
#[derive(Debug, Deserialize)]
pub struct TemplateRef {
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub template: Option<TemplateInput>,
}

/// Body of `POST /api/marketing/preview`.
#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    #[serde(flatten)]
    pub template: TemplateRef,
    /// Sample recipient; defaults to the logged-in admin.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Body of `POST /api/marketing/links`.
#[derive(Debug, Deserialize)]
pub struct LinksRequest {
    #[serde(flatten)]
    pub template: TemplateRef,
    #[serde(default)]
    pub audience: Audience,
}

/// Body of `POST /api/marketing/send`.
#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub template_id: String,
}

async fn load_templates(state: &AppState) -> Result<Vec<MarketingTemplate>> {
    Ok(SettingsRepository::new(state.pool())
        .get_json::<Vec<MarketingTemplate>>(MARKETING_TEMPLATES)
        .await?
        .unwrap_or_default())
}

async fn find_template(state: &AppState, id: &str) -> Result<MarketingTemplate> {
    load_templates(state)
        .await?
        .into_iter()
        .find(|t| t.id == id)
        .ok_or_else(|| AppError::NotFound(format!("template {id}")))
}

async fn resolve(state: &AppState, template: TemplateRef) -> Result<MarketingTemplate> {
    match template {
        TemplateRef {
            template: Some(draft),
            ..
        } => Ok(draft.validate()?),
        TemplateRef {
            template_id: Some(id),
            ..
        } => find_template(state, &id).await,
        _ => Err(ValidationError::Required("template_id").into()),
    }
}

async fn recipients(state: &AppState, audience: Audience) -> Result<Vec<Recipient>> {
    let pool = state.pool();
    Ok(match audience {
        Audience::Subscribers => subscriber_recipients(
            &NewsletterRepository::new(pool).active().await?,
            &state.config().storefront_base_url,
        ),
        Audience::Customers => customer_recipients(&CustomerRepository::new(pool).list(None).await?),
    })
}

/// `GET /api/marketing/templates`
pub async fn list_templates(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
) -> Result<Json<Vec<MarketingTemplate>>> {
    Ok(Json(load_templates(&state).await?))
}

/// `POST /api/marketing/templates`
///
/// Replaces the template with the same id, or appends a new one.
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn upsert_template(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Json(input): Json<TemplateInput>,
) -> Result<Json<MarketingTemplate>> {
    let template = input.validate()?;
    let mut templates = load_templates(&state).await?;

    let action = match templates.iter_mut().find(|t| t.id == template.id) {
        Some(existing) => {
            *existing = template.clone();
            "update"
        }
        None => {
            templates.push(template.clone());
            "create"
        }
    };

    SettingsRepository::new(state.pool())
        .put_json(MARKETING_TEMPLATES, &templates)
        .await?;
    audit(
        &state,
        &admin,
        action,
        "marketing_template",
        Some(template.id.clone()),
        json!({ "name": template.name, "channel": template.channel }),
    )
    .await;

    Ok(Json(template))
}

/// `DELETE /api/marketing/templates/{id}`
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete_template(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let mut templates = load_templates(&state).await?;
    let before = templates.len();
    templates.retain(|t| t.id != id);
    if templates.len() == before {
        return Err(AppError::NotFound(format!("template {id}")));
    }

    SettingsRepository::new(state.pool())
        .put_json(MARKETING_TEMPLATES, &templates)
        .await?;
    audit(&state, &admin, "delete", "marketing_template", Some(id), json!({})).await;

    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/marketing/preview`
pub async fn preview(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Json(body): Json<PreviewRequest>,
) -> Result<Json<RenderedMessage>> {
    let template = resolve(&state, body.template).await?;
    let recipient = marketing::sample_recipient(
        body.name.as_deref().unwrap_or(&admin.name),
        body.email.as_deref().unwrap_or(admin.email.as_str()),
        &state.config().storefront_base_url,
    )
    .map_err(ValidationError::from)?;

    Ok(Json(marketing::render(&template, &recipient)))
}

/// `POST /api/marketing/links`
#[instrument(skip(state, _admin, body), fields(audience = ?body.audience))]
pub async fn links(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Json(body): Json<LinksRequest>,
) -> Result<Json<LinkBatch>> {
    let template = resolve(&state, body.template).await?;
    let recipients = recipients(&state, body.audience).await?;
    Ok(Json(marketing::build_links(&template, &recipients)))
}

/// `POST /api/marketing/send`
///
/// Emails a stored template to every active subscriber. 503 when SMTP is
/// not configured.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn send(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Json(body): Json<SendRequest>,
) -> Result<Json<SendReport>> {
    let mailer = state
        .email()
        .ok_or_else(|| AppError::ServiceUnavailable("SMTP is not configured".to_owned()))?;

    let template = find_template(&state, &body.template_id).await?;
    if template.channel != Channel::Email {
        return Err(AppError::BadRequest(
            "only email templates can be sent".to_owned(),
        ));
    }

    let recipients = recipients(&state, Audience::Subscribers).await?;
    let report = marketing::send_campaign(mailer, &template, &recipients).await;

    audit(
        &state,
        &admin,
        "send",
        "marketing_template",
        Some(template.id.clone()),
        json!({ "sent": report.sent, "failed": report.failed }),
    )
    .await;

    Ok(Json(report))
}
