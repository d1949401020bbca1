//! Unified error handling for admin.
//!
//! Every handler returns `Result<T, AppError>`; errors render as
//! `{"error": "..."}` with a matching status code.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::models::ValidationError;
use crate::services::{AdminAuthError, EmailError, WooCommerceError};

/// Application-level error type for the admin panel.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Editor input was rejected.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// `WooCommerce` call failed.
    #[error("WooCommerce error: {0}")]
    WooCommerce(#[from] WooCommerceError),

    /// SMTP delivery failed.
    #[error("Email error: {0}")]
    Email(#[from] EmailError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request conflicts with current state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A feature that needs configuration that is missing.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AdminAuthError> for AppError {
    fn from(err: AdminAuthError) -> Self {
        match err {
            AdminAuthError::InvalidCredentials | AdminAuthError::InvalidEmail(_) => {
                Self::Unauthorized("invalid email or password".to_string())
            }
            AdminAuthError::UserAlreadyExists => Self::Conflict(err.to_string()),
            AdminAuthError::WeakPassword(msg) => Self::BadRequest(msg),
            AdminAuthError::PasswordHash => Self::Internal(err.to_string()),
            AdminAuthError::Repository(e) => Self::Database(e),
        }
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_)) | Self::Conflict(_) => {
                StatusCode::CONFLICT
            }
            Self::Database(RepositoryError::Validation(_))
            | Self::Validation(_)
            | Self::BadRequest(_)
            | Self::WooCommerce(WooCommerceError::InvalidSettings(_)) => StatusCode::BAD_REQUEST,
            Self::WooCommerce(WooCommerceError::NotConfigured) | Self::ServiceUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::WooCommerce(WooCommerceError::Repository(_))
            | Self::Database(_)
            | Self::Session(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::WooCommerce(_) | Self::Email(_) => StatusCode::BAD_GATEWAY,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }

    /// Message safe to show the client.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Database(RepositoryError::NotFound) => "Not found".to_string(),
            Self::Database(RepositoryError::Conflict(msg) | RepositoryError::Validation(msg))
            | Self::BadRequest(msg)
            | Self::Conflict(msg)
            | Self::ServiceUnavailable(msg) => msg.clone(),
            Self::Validation(err) => err.to_string(),
            Self::WooCommerce(WooCommerceError::Repository(_))
            | Self::Database(_)
            | Self::Session(_)
            | Self::Internal(_) => "Internal server error".to_string(),
            Self::WooCommerce(err) => err.to_string(),
            Self::Email(_) => "Email service error".to_string(),
            Self::NotFound(what) => format!("Not found: {what}"),
            Self::Unauthorized(msg) | Self::Forbidden(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from an admin user ID.
pub fn set_sentry_user(admin_user_id: i32, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(admin_user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("order-123".to_string());
        assert_eq!(err.to_string(), "Not found: order-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(get_status(AppError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(get_status(AppError::Unauthorized("x".into())), StatusCode::UNAUTHORIZED);
        assert_eq!(get_status(AppError::Forbidden("x".into())), StatusCode::FORBIDDEN);
        assert_eq!(get_status(AppError::BadRequest("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(
            get_status(AppError::ServiceUnavailable("x".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            get_status(AppError::Internal("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_repository_errors_map_to_client_statuses() {
        assert_eq!(get_status(RepositoryError::NotFound.into()), StatusCode::NOT_FOUND);
        assert_eq!(
            get_status(RepositoryError::Conflict("slug".into()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(RepositoryError::Validation("bad".into()).into()),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_validation_and_upstream_errors() {
        assert_eq!(
            get_status(ValidationError::MissingImages.into()),
            StatusCode::BAD_REQUEST
        );
        let upstream = WooCommerceError::Api {
            status: 401,
            message: "bad key".into(),
        };
        assert_eq!(get_status(upstream.into()), StatusCode::BAD_GATEWAY);
        assert_eq!(
            get_status(WooCommerceError::NotConfigured.into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_login_failures_are_unauthorized() {
        let err: AppError = AdminAuthError::InvalidCredentials.into();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.public_message(), "invalid email or password");
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = AppError::Internal("pool exhausted at 10.0.0.3".into());
        assert_eq!(err.public_message(), "Internal server error");
    }
}
