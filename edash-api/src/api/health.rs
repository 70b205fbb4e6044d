//! Liveness check with a database round-trip

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use tracing::warn;

use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    /// Process is up but SQLite did not answer
    Degraded,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub module: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    /// Database check failure, present only when degraded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_error: Option<String>,
}

/// GET /health (no caller identity required)
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime_seconds = Utc::now()
        .signed_duration_since(state.startup_time)
        .num_seconds()
        .max(0) as u64;

    let database_error = sqlx::query("SELECT 1")
        .execute(&state.db)
        .await
        .err()
        .map(|e| {
            warn!("Health check failed: {}", e);
            e.to_string()
        });

    let status = if database_error.is_none() {
        HealthStatus::Ok
    } else {
        HealthStatus::Degraded
    };

    Json(HealthResponse {
        status,
        module: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds,
        database_error,
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
