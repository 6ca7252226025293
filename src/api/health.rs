//! Health check endpoint.

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::db::Database;

#[derive(Clone)]
pub struct HealthState {
    pub db: Database,
    pub started: Instant,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/", get(health)).with_state(state)
}

async fn health(State(state): State<HealthState>) -> impl IntoResponse {
    let database = if state.db.ping().await {
        "connected"
    } else {
        "disconnected"
    };

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "uptime": state.started.elapsed().as_secs(),
            "message": "OK",
            "timestamp": timestamp,
            "database": database,
        })),
    )
}
