// src/error.rs

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Global Application Error Enum.
/// Every engine operation fails with one of these kinds; none of them are retried.
#[derive(Debug)]
pub enum AppError {
    // 401 Unauthorized
    AuthError(String),

    // 404 Not Found (attempt/question/date absent or not owned by the caller)
    NotFound(String),

    // 409 Conflict (mutating a completed attempt)
    StateConflict(String),

    // 400 Bad Request
    Validation(String),

    // 500 Internal Server Error (an upstream invariant was violated)
    DataIntegrity(String),

    // 503 Service Unavailable
    InsufficientCatalog { available: i64, required: usize },

    // 404 Not Found (diagnostics without any completed attempt)
    NoHistory(String),

    // 500 Internal Server Error (store or catalog I/O failure)
    Upstream(String),
}

impl AppError {
    /// Stable, machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::AuthError(_) => "auth_error",
            AppError::NotFound(_) => "not_found",
            AppError::StateConflict(_) => "state_conflict",
            AppError::Validation(_) => "validation_error",
            AppError::DataIntegrity(_) => "data_integrity_error",
            AppError::InsufficientCatalog { .. } => "insufficient_catalog",
            AppError::NoHistory(_) => "no_history",
            AppError::Upstream(_) => "upstream_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) | AppError::NoHistory(_) => StatusCode::NOT_FOUND,
            AppError::StateConflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InsufficientCatalog { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::DataIntegrity(_) | AppError::Upstream(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::AuthError(msg)
            | AppError::NotFound(msg)
            | AppError::StateConflict(msg)
            | AppError::Validation(msg)
            | AppError::DataIntegrity(msg)
            | AppError::NoHistory(msg)
            | AppError::Upstream(msg) => write!(f, "{}: {}", self.kind(), msg),
            AppError::InsufficientCatalog {
                available,
                required,
            } => write!(
                f,
                "{}: catalog holds {} questions, {} required",
                self.kind(),
                available,
                required
            ),
        }
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Upstream(msg) => {
                tracing::error!("Upstream failure: {}", msg);
                "Internal Server Error".to_string()
            }
            AppError::DataIntegrity(msg) => {
                tracing::error!("Data integrity violation: {}", msg);
                msg.clone()
            }
            AppError::InsufficientCatalog {
                available,
                required,
            } => format!(
                "The question catalog holds {} questions but a daily set needs {}",
                available, required
            ),
            AppError::AuthError(msg)
            | AppError::NotFound(msg)
            | AppError::StateConflict(msg)
            | AppError::Validation(msg)
            | AppError::NoHistory(msg) => msg.clone(),
        };
        let body = Json(json!({
            "error": self.kind(),
            "message": message,
        }));

        (status, body).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError::Upstream`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Upstream(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}
