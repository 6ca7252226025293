//! Axum extractors for authentication.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use super::errors::{AuthError, AuthErrorKind};
use super::state::HasAuthBackend;
use super::types::AuthenticatedAccount;
use crate::jwt::JwtError;

/// Pull the bearer token out of the Authorization header.
/// Returns None when the header is absent, not a bearer scheme, or empty.
pub fn bearer_token(headers: &axum::http::HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() { None } else { Some(token) }
}

/// Core authentication logic shared by the required and optional extractors.
async fn authenticate_request<S>(
    parts: &Parts,
    state: &S,
) -> Result<AuthenticatedAccount, AuthErrorKind>
where
    S: HasAuthBackend + Send + Sync,
{
    let token = bearer_token(&parts.headers).ok_or(AuthErrorKind::MissingToken)?;

    // Expired and malformed tokens surface identically to the caller;
    // the distinction only matters for diagnostics.
    let claims = state.jwt().verify_access(token).map_err(|e| {
        match e {
            JwtError::Expired => tracing::debug!("Access token expired"),
            _ => tracing::debug!(error = %e, "Access token rejected"),
        }
        AuthErrorKind::InvalidToken
    })?;

    // Resolve the claimed account; a deleted account loses access here even
    // though its access token is still cryptographically valid.
    let account = state
        .db()
        .accounts()
        .get_profile_by_uuid(&claims.sub)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to load account");
            AuthErrorKind::Backend
        })?
        .ok_or(AuthErrorKind::AccountGone)?;

    Ok(AuthenticatedAccount { claims, account })
}

/// Extractor for endpoints that require authentication.
/// Rejects with a JSON envelope on any failure.
pub struct Auth(pub AuthenticatedAccount);

impl<S> FromRequestParts<S> for Auth
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authenticate_request(parts, state)
            .await
            .map(Auth)
            .map_err(AuthError)
    }
}

/// Optional authentication extractor - never fails, yields None on any
/// failure at any step. For endpoints that behave differently for
/// authenticated callers but never require authentication.
pub struct OptionalAuth(pub Option<AuthenticatedAccount>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalAuth(authenticate_request(parts, state).await.ok()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_present() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));

        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn test_bearer_token_missing_header() {
        let headers = axum::http::HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_bearer_token_wrong_scheme() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));

        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_bearer_token_empty_value() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));

        assert_eq!(bearer_token(&headers), None);
    }
}
