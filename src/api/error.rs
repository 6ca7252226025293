//! Error taxonomy and response envelope shared by all API endpoints.
//!
//! Every response carries `{success, message, data}` on success or
//! `{success: false, message}` on failure. Operational errors keep their
//! message; unexpected backend failures are logged server-side and surface
//! a generic message (with detail only in debug builds).

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

/// Extension trait for concise error mapping on Results.
pub trait ResultExt<T> {
    fn db_err(self, msg: &str) -> Result<T, ApiError>;
    fn hash_err(self, msg: &str) -> Result<T, ApiError>;
    fn token_err(self, msg: &str) -> Result<T, ApiError>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn db_err(self, msg: &str) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::db_error(msg, e))
    }

    /// Hashing failure is an internal fault, never an authentication failure.
    fn hash_err(self, msg: &str) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::internal_error(msg, "Password hashing failed", e))
    }

    fn token_err(self, msg: &str) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::internal_error(msg, "Failed to generate token", e))
    }
}

/// API error type with automatic response conversion.
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Internal {
        message: String,
        detail: Option<String>,
    },
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            detail: None,
        }
    }

    pub fn db_error(context: &str, e: impl std::fmt::Display) -> Self {
        Self::internal_error(context, "Database error", e)
    }

    fn internal_error(context: &str, message: &str, e: impl std::fmt::Display) -> Self {
        error!("{}: {}", context, e);
        Self::Internal {
            message: message.into(),
            detail: Some(format!("{}: {}", context, e)),
        }
    }
}

/// Map a store insert failure onto the taxonomy: unique-constraint violations
/// become Conflict with the given message, everything else is Internal.
/// This is the single place persistence error shapes are interpreted.
pub fn map_insert_err(context: &str, conflict_msg: &str, e: sqlx::Error) -> ApiError {
    let is_unique = e
        .as_database_error()
        .is_some_and(|d| d.is_unique_violation());
    if is_unique {
        ApiError::conflict(conflict_msg)
    } else {
        ApiError::db_error(context, e)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, detail) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg, None),
            ApiError::Internal { message, detail } => {
                (StatusCode::INTERNAL_SERVER_ERROR, message, detail)
            }
        };

        // Diagnostic detail never leaves a release build
        let detail = if cfg!(debug_assertions) { detail } else { None };

        (
            status,
            Json(ErrorBody {
                success: false,
                message,
                detail,
            }),
        )
            .into_response()
    }
}

/// Build a success response in the standard envelope.
pub fn success(status: StatusCode, message: &str, data: impl Serialize) -> Response {
    (
        status,
        Json(serde_json::json!({
            "success": true,
            "message": message,
            "data": data,
        })),
    )
        .into_response()
}
