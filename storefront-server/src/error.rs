//! Unified error handling
//!
//! Provides the application error type and the response envelope:
//! - [`AppError`] - application error enum
//! - [`AppResponse`] - API response structure
//!
//! Error code conventions:
//!
//! | Code  | Meaning                  |
//! |-------|--------------------------|
//! | E0002 | Validation failed (400)  |
//! | E0003 | Not found (404)          |
//! | E0005 | Illegal transition (422) |
//! | E2001 | Scope denied (403)       |
//! | E9001 | Internal error (500)     |
//! | E9002 | Database error (500)     |

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

/// Error response envelope
///
/// ```json
/// {
///   "code": "E0005",
///   "message": "Invalid status transition: Shipped -> Pending"
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct AppResponse<T> {
    /// Error code
    pub code: String,
    /// Human-readable message
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// Application error enum
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Client-correctable input problem (400)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Acting store scope does not cover the target order (403).
    /// Deliberately carries no detail: callers must not be able to tell
    /// "order exists in another store" apart from "order does not exist".
    #[error("Unauthorized")]
    Unauthorized,

    /// Status graph violation (422), surfaced with current and attempted status
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Storage failure (500); detail is logged, never sent to the client
    #[error("Database error: {0}")]
    Database(String),

    /// Internal error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database(message.into())
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "E0002", msg.clone()),

            // 403 with a fixed message: no cross-store existence leakage
            AppError::Unauthorized => (
                StatusCode::FORBIDDEN,
                "E2001",
                "Unauthorized or order not found".to_string(),
            ),

            AppError::InvalidTransition { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "E0005", self.to_string())
            }

            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "E0003", msg.clone()),

            AppError::Database(msg) => {
                error!(target: "database", error = %msg, "Database error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "E9002",
                    "Database error".to_string(),
                )
            }

            AppError::Internal(msg) => {
                error!(target: "internal", error = %msg, "Internal error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "E9001",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(AppResponse::<()> {
            code: code.to_string(),
            message,
            data: None,
        });

        (status, body).into_response()
    }
}

/// Result type for handlers and the engine
pub type AppResult<T> = Result<T, AppError>;
