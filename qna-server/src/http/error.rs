//! API error types with IntoResponse
//!
//! Internal error kinds are translated into a stable external taxonomy
//! with one JSON shape (`error` code plus human-readable `message`).
//! Store-native error text never reaches a response body; internal
//! causes are logged server-side instead.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use qna_core::validation::ValidationError;

use crate::db::error::DbError;

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Validation failed (400)
    Validation(ValidationError),

    /// Resource not found (404)
    NotFound { resource: &'static str, id: i32 },

    /// Write references a missing row (422)
    ForeignKey,

    /// Operation would violate a dependent-data policy (409)
    Conflict { reason: String },

    /// No connection available within the deadline (503)
    PoolTimeout,

    /// Store connectivity lost (503)
    Unavailable,

    /// Anything else from the store (500, logged)
    Database(DbError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::Validation(e) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": "validation_error",
                    "message": e.to_string()
                }),
            ),
            Self::NotFound { resource, id } => (
                StatusCode::NOT_FOUND,
                json!({
                    "error": "not_found",
                    "message": format!("{} {} not found", resource, id)
                }),
            ),
            Self::ForeignKey => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({
                    "error": "foreign_key_violation",
                    "message": "referenced question does not exist"
                }),
            ),
            Self::Conflict { reason } => (
                StatusCode::CONFLICT,
                json!({
                    "error": "conflict",
                    "message": reason
                }),
            ),
            Self::PoolTimeout => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({
                    "error": "pool_timeout",
                    "message": "no database connection available, retry later"
                }),
            ),
            Self::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({
                    "error": "store_unavailable",
                    "message": "database unavailable, retry later"
                }),
            ),
            Self::Database(e) => {
                // Log the actual error, return a generic message
                tracing::error!("database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "error": "internal_error",
                        "message": "an internal error occurred"
                    }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound { resource, id } => Self::NotFound { resource, id },
            DbError::ForeignKey { .. } => Self::ForeignKey,
            DbError::Conflict { reason } => Self::Conflict { reason },
            DbError::PoolTimeout => Self::PoolTimeout,
            DbError::Unavailable(err) => {
                tracing::error!("database unavailable: {}", err);
                Self::Unavailable
            }
            other => Self::Database(other),
        }
    }
}
