//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. Error bodies are JSON. Most
//! carry a single `message`; registration failures carry the status envelope
//! (`status`, `message`, `errors`) clients already expect.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use velvet_core::StatusMessage;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Auth(AuthError::InvalidInput(_)) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Auth(AuthError::InvalidCredentials) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) | Self::Database(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    const fn is_server_fault(&self) -> bool {
        matches!(
            self,
            Self::Database(_)
                | Self::Auth(
                    AuthError::Repository(_) | AuthError::Token(_) | AuthError::PasswordHash
                )
        ) && !matches!(self, Self::Database(RepositoryError::NotFound))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_fault() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();

        // Don't expose internal error details to clients
        let body = match self {
            Self::Auth(AuthError::DuplicateUser) => {
                Json(StatusMessage::error("User already exists!", Vec::new())).into_response()
            }
            Self::Auth(AuthError::Validation(errors)) => Json(StatusMessage::error(
                "User creation failed! Please check user details and try again.",
                errors,
            ))
            .into_response(),
            Self::Auth(AuthError::InvalidInput(message)) | Self::BadRequest(message) => {
                Json(json!({ "message": message })).into_response()
            }
            Self::Auth(AuthError::InvalidCredentials) => {
                Json(json!({ "message": "Invalid username or password." })).into_response()
            }
            Self::NotFound(what) => {
                Json(json!({ "message": format!("{what} not found.") })).into_response()
            }
            Self::Database(RepositoryError::NotFound) => {
                Json(json!({ "message": "Not found." })).into_response()
            }
            Self::Database(_) | Self::Auth(_) => {
                Json(json!({ "message": "Internal server error" })).into_response()
            }
        };

        (status, body).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn body_json(error: AppError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_missing_login_fields_is_bad_request() {
        let (status, body) = body_json(AppError::Auth(AuthError::InvalidInput(
            "Username and password are required.".to_owned(),
        )))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Username and password are required.");
    }

    #[tokio::test]
    async fn test_invalid_credentials_is_unauthorized() {
        let (status, body) = body_json(AppError::Auth(AuthError::InvalidCredentials)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid username or password.");
    }

    #[tokio::test]
    async fn test_duplicate_user_uses_status_envelope() {
        let (status, body) = body_json(AppError::Auth(AuthError::DuplicateUser)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], "Error");
        assert_eq!(body["message"], "User already exists!");
    }

    #[tokio::test]
    async fn test_validation_lists_errors() {
        let (status, body) = body_json(AppError::Auth(AuthError::Validation(vec![
            "too short".to_owned(),
        ])))
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["errors"][0], "too short");
    }

    #[tokio::test]
    async fn test_database_error_hides_details() {
        let (status, body) = body_json(AppError::Database(RepositoryError::DataCorruption(
            "bad email in row 7".to_owned(),
        )))
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal server error");
    }

    #[tokio::test]
    async fn test_not_found() {
        let (status, _) = body_json(AppError::NotFound("Product".to_owned())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
