mod error;
mod health;
mod sessions;

use axum::{Json, Router, http::StatusCode, response::IntoResponse, routing::get};
use std::sync::Arc;
use std::time::Instant;

use crate::auth::OptionalAuth;
use crate::db::Database;
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;
use crate::password::PasswordHasher;

pub use sessions::SessionsState;

#[derive(Clone)]
pub struct IndexState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
}

impl_has_auth_backend!(IndexState);

/// Create the API router.
pub fn create_api_router(
    db: Database,
    jwt: Arc<JwtConfig>,
    hasher: PasswordHasher,
    secure_cookies: bool,
) -> Router {
    let sessions_state = SessionsState {
        db: db.clone(),
        jwt: jwt.clone(),
        hasher,
        secure_cookies,
    };

    let health_state = health::HealthState {
        db: db.clone(),
        started: Instant::now(),
    };

    let index_state = IndexState { db, jwt };

    Router::new()
        .route("/", get(index).with_state(index_state))
        .nest("/auth", sessions::router(sessions_state))
        .nest("/health", health::router(health_state))
}

/// Service index. Anonymous callers get the endpoint map; callers presenting
/// a valid bearer token also see which account they are authenticated as.
async fn index(OptionalAuth(identity): OptionalAuth) -> impl IntoResponse {
    let mut body = serde_json::json!({
        "success": true,
        "message": "Auth Service API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/api/health",
            "auth": "/api/auth",
        },
    });

    if let Some(identity) = identity {
        body["authenticatedAs"] = serde_json::Value::String(identity.account.email);
    }

    (StatusCode::OK, Json(body))
}
