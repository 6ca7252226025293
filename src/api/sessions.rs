//! Session and account API endpoints.
//!
//! - POST `/register` - Create an account and open a session
//! - POST `/login` - Authenticate credentials and open a session
//! - POST `/refresh-token` - Rotate the refresh token, mint a new access token
//! - POST `/logout` - Revoke the stored refresh token
//! - GET `/me` - Current account profile
//! - PATCH `/profile` - Update name/avatar
//! - POST `/change-password` - Re-hash password, revoke session
//! - DELETE `/account` - Delete the account
//!
//! Session state lives entirely in the accounts table: the stored
//! refresh_token is the one live session, overwritten on login/refresh and
//! cleared on logout/password change.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::Response,
    routing::{delete, get, patch, post},
};
use serde::Deserialize;
use std::sync::Arc;

use super::error::{ApiError, ResultExt, map_insert_err, success};
use crate::auth::{
    Auth, REFRESH_COOKIE_NAME, clear_refresh_cookie, get_cookie, refresh_cookie,
};
use crate::db::Database;
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;
use crate::password::PasswordHasher;

#[derive(Clone)]
pub struct SessionsState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub hasher: PasswordHasher,
    pub secure_cookies: bool,
}

impl_has_auth_backend!(SessionsState);

pub fn router(state: SessionsState) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh-token", post(refresh_token))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/profile", patch(update_profile))
        .route("/change-password", post(change_password))
        .route("/account", delete(delete_account))
        .with_state(state)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_full_name(full_name: &str) -> Result<(), ApiError> {
    let len = full_name.chars().count();
    if len < 2 {
        return Err(ApiError::bad_request(
            "Full name must be at least 2 characters",
        ));
    }
    if len > 100 {
        return Err(ApiError::bad_request(
            "Full name cannot exceed 100 characters",
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    let plausible = email.len() <= 254
        && email.split_once('@').is_some_and(|(local, domain)| {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        });
    if !plausible {
        return Err(ApiError::bad_request("Please provide a valid email"));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < 8 {
        return Err(ApiError::bad_request(
            "Password must be at least 8 characters",
        ));
    }
    Ok(())
}

/// Append a Set-Cookie header to an already-built envelope response.
fn with_cookie(mut response: Response, cookie: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(cookie) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    response
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    full_name: String,
    email: String,
    password: String,
    avatar: Option<String>,
}

/// Register a new account. The refresh token goes out only as an http-only
/// cookie; the JSON body carries the public view and the access token.
async fn register(
    State(state): State<SessionsState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Response, ApiError> {
    let full_name = payload.full_name.trim();
    validate_full_name(full_name)?;
    let email = normalize_email(&payload.email);
    validate_email(&email)?;
    validate_password(&payload.password)?;
    let avatar = payload.avatar.unwrap_or_default();

    // Pre-check gives the friendly conflict; the unique index backstops races.
    let existing = state
        .db
        .accounts()
        .get_by_email(&email)
        .await
        .db_err("Failed to check existing email")?;
    if existing.is_some() {
        return Err(ApiError::conflict("Email already registered"));
    }

    let password_hash = state
        .hasher
        .hash(&payload.password)
        .await
        .hash_err("Failed to hash password")?;

    let uuid = uuid::Uuid::new_v4().to_string();
    let id = state
        .db
        .accounts()
        .create(&uuid, &email, full_name, &avatar, &password_hash)
        .await
        .map_err(|e| map_insert_err("Failed to create account", "Email already registered", e))?;

    let pair = state
        .jwt
        .issue_pair(&uuid, &email)
        .token_err("Failed to issue tokens")?;

    state
        .db
        .accounts()
        .set_refresh_token(id, &pair.refresh.token)
        .await
        .db_err("Failed to store refresh token")?;

    let profile = state
        .db
        .accounts()
        .get_profile_by_uuid(&uuid)
        .await
        .db_err("Failed to load account")?
        .ok_or_else(|| ApiError::internal("Account vanished after creation"))?;

    let response = success(
        StatusCode::CREATED,
        "User registered successfully",
        serde_json::json!({
            "user": profile.to_public(),
            "accessToken": pair.access.token,
        }),
    );
    Ok(with_cookie(
        response,
        &refresh_cookie(&pair.refresh.token, pair.refresh.duration, state.secure_cookies),
    ))
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

/// Authenticate credentials and open a fresh session. Unknown email and wrong
/// password fail identically; nothing may reveal which case occurred.
async fn login(
    State(state): State<SessionsState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let email = normalize_email(&payload.email);

    let account = state
        .db
        .accounts()
        .get_by_email(&email)
        .await
        .db_err("Failed to look up account")?
        .ok_or_else(|| ApiError::unauthorized("Invalid email or password"))?;

    if !state
        .hasher
        .verify(&payload.password, &account.password_hash)
        .await
    {
        return Err(ApiError::unauthorized("Invalid email or password"));
    }

    let pair = state
        .jwt
        .issue_pair(&account.uuid, &account.email)
        .token_err("Failed to issue tokens")?;

    // Overwrites any previous refresh token: one live session per account.
    state
        .db
        .accounts()
        .set_refresh_token(account.id, &pair.refresh.token)
        .await
        .db_err("Failed to store refresh token")?;

    let profile = state
        .db
        .accounts()
        .get_profile_by_uuid(&account.uuid)
        .await
        .db_err("Failed to load account")?
        .ok_or_else(|| ApiError::unauthorized("Invalid email or password"))?;

    let response = success(
        StatusCode::OK,
        "Login successful",
        serde_json::json!({
            "user": profile.to_public(),
            "accessToken": pair.access.token,
        }),
    );
    Ok(with_cookie(
        response,
        &refresh_cookie(&pair.refresh.token, pair.refresh.duration, state.secure_cookies),
    ))
}

/// Exchange the refresh cookie for a new token pair.
///
/// The presented token must carry a valid signature AND byte-equal the stored
/// value; the swap is a compare-and-swap so concurrent refreshes cannot both
/// win and a rotated-out token is rejected even though its signature is still
/// good. That mismatch is Forbidden, not Unauthorized: it is the replay signal.
async fn refresh_token(
    State(state): State<SessionsState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let presented = get_cookie(&headers, REFRESH_COOKIE_NAME)
        .ok_or_else(|| ApiError::unauthorized("Refresh token not found"))?
        .to_string();

    let claims = state.jwt.verify_refresh(&presented).map_err(|e| {
        tracing::debug!(error = %e, "Refresh token rejected");
        ApiError::unauthorized("Invalid or expired refresh token")
    })?;

    let profile = state
        .db
        .accounts()
        .get_profile_by_uuid(&claims.sub)
        .await
        .db_err("Failed to load account")?
        .ok_or_else(|| ApiError::unauthorized("User not found"))?;

    let pair = state
        .jwt
        .issue_pair(&profile.uuid, &profile.email)
        .token_err("Failed to issue tokens")?;

    let rotated = state
        .db
        .accounts()
        .rotate_refresh_token(profile.id, &presented, &pair.refresh.token)
        .await
        .db_err("Failed to rotate refresh token")?;

    if !rotated {
        return Err(ApiError::forbidden("Invalid refresh token"));
    }

    let response = success(
        StatusCode::OK,
        "Token refreshed successfully",
        serde_json::json!({
            "accessToken": pair.access.token,
            "user": profile.to_public(),
        }),
    );
    Ok(with_cookie(
        response,
        &refresh_cookie(&pair.refresh.token, pair.refresh.duration, state.secure_cookies),
    ))
}

/// Revoke the stored refresh token and clear the cookie. Idempotent.
async fn logout(
    State(state): State<SessionsState>,
    Auth(identity): Auth,
) -> Result<Response, ApiError> {
    state
        .db
        .accounts()
        .clear_refresh_token(identity.account.id)
        .await
        .db_err("Failed to clear refresh token")?;

    let response = success(StatusCode::OK, "Logout successful", serde_json::Value::Null);
    Ok(with_cookie(
        response,
        &clear_refresh_cookie(state.secure_cookies),
    ))
}

/// Current account profile.
async fn me(Auth(identity): Auth) -> Response {
    success(
        StatusCode::OK,
        "User profile retrieved successfully",
        serde_json::json!({ "user": identity.account.to_public() }),
    )
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProfileRequest {
    full_name: Option<String>,
    avatar: Option<String>,
}

async fn update_profile(
    State(state): State<SessionsState>,
    Auth(identity): Auth,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Response, ApiError> {
    let full_name = match &payload.full_name {
        Some(name) => {
            let name = name.trim();
            validate_full_name(name)?;
            Some(name.to_string())
        }
        None => None,
    };

    let updated = state
        .db
        .accounts()
        .update_profile(
            identity.account.id,
            full_name.as_deref(),
            payload.avatar.as_deref(),
        )
        .await
        .db_err("Failed to update profile")?;

    if !updated {
        return Err(ApiError::not_found("User not found"));
    }

    let profile = state
        .db
        .accounts()
        .get_profile_by_uuid(&identity.account.uuid)
        .await
        .db_err("Failed to load account")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(success(
        StatusCode::OK,
        "Profile updated successfully",
        serde_json::json!({ "user": profile.to_public() }),
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordRequest {
    current_password: String,
    new_password: String,
}

/// Verify the current password, store a new hash, and revoke the refresh
/// token so every session must re-authenticate.
async fn change_password(
    State(state): State<SessionsState>,
    Auth(identity): Auth,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Response, ApiError> {
    validate_password(&payload.new_password)?;

    // Re-read with secret columns; the middleware view has no hash.
    let account = state
        .db
        .accounts()
        .get_by_id(identity.account.id)
        .await
        .db_err("Failed to load account")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if !state
        .hasher
        .verify(&payload.current_password, &account.password_hash)
        .await
    {
        return Err(ApiError::unauthorized("Current password is incorrect"));
    }

    let password_hash = state
        .hasher
        .hash(&payload.new_password)
        .await
        .hash_err("Failed to hash password")?;

    let updated = state
        .db
        .accounts()
        .set_password_hash(account.id, &password_hash)
        .await
        .db_err("Failed to update password")?;

    if !updated {
        return Err(ApiError::not_found("User not found"));
    }

    Ok(success(
        StatusCode::OK,
        "Password changed successfully. Please login again",
        serde_json::Value::Null,
    ))
}

/// Delete the account. Outstanding tokens die with the record: the
/// middleware's existence check fails once the row is gone.
async fn delete_account(
    State(state): State<SessionsState>,
    Auth(identity): Auth,
) -> Result<Response, ApiError> {
    let deleted = state
        .db
        .accounts()
        .delete(identity.account.id)
        .await
        .db_err("Failed to delete account")?;

    if !deleted {
        return Err(ApiError::not_found("User not found"));
    }

    let response = success(
        StatusCode::OK,
        "Account deleted successfully",
        serde_json::Value::Null,
    );
    Ok(with_cookie(
        response,
        &clear_refresh_cookie(state.secure_cookies),
    ))
}
