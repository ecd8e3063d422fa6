use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::auth::identity::{AuthError, RegistrationError};
use crate::content::ContentError;
use crate::domain::ParseEnumError;
use crate::ledger::credits::CreditError;
use crate::ledger::reactions::ReactionError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found")]
    NotFound,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Forbidden")]
    Forbidden,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Taxonomy label sent to clients next to the message.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound => "not_found",
            AppError::Unauthorized | AppError::InvalidCredentials => "unauthenticated",
            AppError::Forbidden => "forbidden",
            AppError::BadRequest(_) => "validation_error",
            AppError::Conflict(_) => "conflict",
            AppError::Database(_) | AppError::Pool(_) | AppError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Authentication required".to_string(),
            ),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "Invalid email or password".to_string(),
            ),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden".to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({ "error": self.kind(), "message": message }));
        (status, body).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => AppError::InvalidCredentials,
            AuthError::Store(e) => AppError::Database(e),
        }
    }
}

impl From<RegistrationError> for AppError {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::InvalidRole(_) | RegistrationError::Validation(_) => {
                AppError::BadRequest(err.to_string())
            }
            RegistrationError::EmailTaken => AppError::Conflict(err.to_string()),
            RegistrationError::Hash(e) => AppError::Internal(format!("password hashing: {}", e)),
            RegistrationError::Store(e) => AppError::Database(e),
        }
    }
}

impl From<ContentError> for AppError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::Validation(msg) => AppError::BadRequest(msg),
            ContentError::NotFound(_) => AppError::NotFound,
            ContentError::Forbidden => AppError::Forbidden,
            ContentError::CapacityExceeded
            | ContentError::AlreadyJoined
            | ContentError::InvalidTransition { .. }
            | ContentError::Conflict(_) => AppError::Conflict(err.to_string()),
            ContentError::Store(e) => AppError::Database(e),
        }
    }
}

impl From<ReactionError> for AppError {
    fn from(err: ReactionError) -> Self {
        match err {
            ReactionError::TargetNotFound => AppError::NotFound,
            ReactionError::AlreadyReacted | ReactionError::NotReacted => {
                AppError::Conflict(err.to_string())
            }
            ReactionError::Store(e) => AppError::Database(e),
        }
    }
}

impl From<CreditError> for AppError {
    fn from(err: CreditError) -> Self {
        match err {
            CreditError::Validation(msg) => AppError::BadRequest(msg),
            CreditError::Overflow(_) => AppError::Internal(err.to_string()),
            CreditError::Store(e) => AppError::Database(e),
        }
    }
}

impl From<ParseEnumError> for AppError {
    fn from(err: ParseEnumError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
