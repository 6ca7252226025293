//! Authentication error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Internal auth error kind used by the core authentication logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// Authorization header absent or not a bearer token
    MissingToken,
    /// Signature, shape, or expiry check failed (not distinguished to callers)
    InvalidToken,
    /// Token verified but the account no longer exists
    AccountGone,
    /// Store failure during resolution
    Backend,
}

/// Rejection returned by the authentication extractors.
#[derive(Debug)]
pub struct AuthError(pub AuthErrorKind);

impl AuthError {
    fn status_code(&self) -> StatusCode {
        match self.0 {
            AuthErrorKind::MissingToken
            | AuthErrorKind::InvalidToken
            | AuthErrorKind::AccountGone => StatusCode::UNAUTHORIZED,
            AuthErrorKind::Backend => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &'static str {
        match self.0 {
            AuthErrorKind::MissingToken => "Authentication token is required",
            AuthErrorKind::InvalidToken => "Invalid or expired token",
            AuthErrorKind::AccountGone => "User no longer exists",
            AuthErrorKind::Backend => "Database error",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            Json(serde_json::json!({
                "success": false,
                "message": self.message(),
            })),
        )
            .into_response()
    }
}
