use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{repository::RepositoryError, storage::StorageError};

/// Result alias used by every handler.
pub type ApiResult<T> = Result<T, ApiError>;

/// FieldError
///
/// One per-field validation message, surfaced to the caller inside `details`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// ErrorResponse
///
/// Wire format of every error body.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

/// ApiError
///
/// Unified error type for the HTTP layer. `NotFound` is returned both for unknown
/// IDs and for records outside the caller's visibility scope, so the two cannot
/// be told apart from outside.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unknown email and wrong password collapse into this single variant.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("validation failed: {} errors", .0.len())]
    Validation(Vec<FieldError>),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("authentication required")]
    Unauthorized,

    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidCredentials | ApiError::Validation(_) | ApiError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Repository(_) | ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::InvalidCredentials => ErrorResponse {
                error: "invalid_credentials".to_string(),
                message: "Credenciales inválidas".to_string(),
                details: None,
            },
            ApiError::Validation(details) => ErrorResponse {
                error: "validation_error".to_string(),
                message: "Request validation failed".to_string(),
                details: Some(details),
            },
            ApiError::BadRequest(message) => ErrorResponse {
                error: "bad_request".to_string(),
                message,
                details: None,
            },
            ApiError::Unauthorized => ErrorResponse {
                error: "unauthorized".to_string(),
                message: "Authentication credentials were not provided or are invalid".to_string(),
                details: None,
            },
            ApiError::NotFound => ErrorResponse {
                error: "not_found".to_string(),
                message: "Not found".to_string(),
                details: None,
            },
            ApiError::Repository(e) => {
                // Logged here, never exposed.
                tracing::error!(error = %e, "repository failure");
                internal_error()
            }
            ApiError::Storage(e) => {
                tracing::error!(error = %e, "storage failure");
                internal_error()
            }
        };

        (status, Json(body)).into_response()
    }
}

fn internal_error() -> ErrorResponse {
    ErrorResponse {
        error: "internal_error".to_string(),
        message: "An internal error occurred".to_string(),
        details: None,
    }
}
