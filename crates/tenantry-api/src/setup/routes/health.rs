//! Health check handlers.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
pub(super) struct HealthCheckResponse {
    pub status: &'static str,
    pub store: String,
}

/// Liveness check: the process is running.
pub async fn liveness_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "alive" })),
    )
}

/// Readiness of the backing store. The in-memory store is always ready.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store = match &state.pool {
        None => "memory".to_string(),
        Some(pool) => {
            match tokio::time::timeout(TIMEOUT, sqlx::query("SELECT 1").execute(pool)).await {
                Ok(Ok(_)) => "healthy".to_string(),
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "Database health check failed");
                    format!("unhealthy: {}", e)
                }
                Err(_) => {
                    tracing::error!("Database health check timed out");
                    "timeout".to_string()
                }
            }
        }
    };

    let healthy = store == "healthy" || store == "memory";
    let (status_code, status) = if healthy {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (status_code, Json(HealthCheckResponse { status, store }))
}
