//! Contact form.

use atelier_core::Email;
use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::db::ContactRepository;
use crate::db::contact::NewContactMessage;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Longest accepted message body, in characters.
pub const MAX_MESSAGE_LENGTH: usize = 5000;

/// Longest accepted name, phone or subject.
const MAX_SHORT_FIELD: usize = 200;

/// Contact form body.
#[derive(Debug, Deserialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    pub message: String,
}

/// Response for form submission.
#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub success: bool,
}

impl ContactForm {
    /// Validate and normalize the form.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` naming the first invalid field.
    pub fn validate(self) -> Result<NewContactMessage> {
        let name = self.name.trim();
        let message = self.message.trim();

        if name.is_empty() {
            return Err(AppError::BadRequest("name is required".to_owned()));
        }
        if message.is_empty() {
            return Err(AppError::BadRequest("message is required".to_owned()));
        }
        if message.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(AppError::BadRequest(format!(
                "message must be at most {MAX_MESSAGE_LENGTH} characters"
            )));
        }

        let email = Email::parse(&self.email)
            .map_err(|e| AppError::BadRequest(format!("Invalid email address: {e}")))?;

        let short = |value: Option<String>, field: &str| -> Result<Option<String>> {
            let value = value
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty());
            if value.as_ref().is_some_and(|v| v.chars().count() > MAX_SHORT_FIELD) {
                return Err(AppError::BadRequest(format!("{field} is too long")));
            }
            Ok(value)
        };

        if name.chars().count() > MAX_SHORT_FIELD {
            return Err(AppError::BadRequest("name is too long".to_owned()));
        }

        Ok(NewContactMessage {
            name: name.to_owned(),
            email,
            phone: short(self.phone, "phone")?,
            subject: short(self.subject, "subject")?,
            message: message.to_owned(),
        })
    }
}

/// `POST /api/contact`
#[instrument(skip(state, form))]
pub async fn submit(
    State(state): State<AppState>,
    Json(form): Json<ContactForm>,
) -> Result<(StatusCode, Json<ContactResponse>)> {
    let message = form.validate()?;
    let id = ContactRepository::new(state.pool()).create(&message).await?;

    tracing::info!(message_id = %id, "Contact message received");

    Ok((StatusCode::CREATED, Json(ContactResponse { success: true })))
}
