//! Health and status handlers

use super::state::AppState;
use crate::scheduler::StatsSnapshot;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub version: String,
    pub uptime: String,
}

/// Liveness probe; answers as long as the process serves requests
pub async fn liveness(State(state): State<AppState>) -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime: state.uptime(),
    })
}

/// Readiness probe; 503 until the controller is watching
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<HealthCheckResponse>) {
    let (code, status) = if state.is_ready() {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "starting")
    };

    (
        code,
        Json(HealthCheckResponse {
            status: status.to_string(),
            version: state.version.clone(),
            uptime: state.uptime(),
        }),
    )
}

/// Operator status response
#[derive(Debug, Serialize)]
pub struct OperatorStatusResponse {
    pub ready: bool,
    pub version: String,
    pub uptime: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub execution_mode: String,
    pub stats: StatsSnapshot,
}

/// Operator status endpoint
pub async fn operator_status(State(state): State<AppState>) -> Json<OperatorStatusResponse> {
    Json(OperatorStatusResponse {
        ready: state.is_ready(),
        version: state.version.clone(),
        uptime: state.uptime(),
        started_at: state.started_at,
        execution_mode: state.execution_mode.to_string(),
        stats: state.stats.snapshot(),
    })
}
