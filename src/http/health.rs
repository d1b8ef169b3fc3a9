//! Health endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::health::CheckStatus;
use crate::http::server::AppState;

/// `GET /health/live`: the process is up.
pub async fn live(State(state): State<AppState>) -> &'static str {
    state.health.check_liveness().status
}

/// `GET /health/ready`
pub async fn ready(State(state): State<AppState>) -> Response {
    let readiness = state.health.check_readiness().await;
    let status = if readiness.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(readiness)).into_response()
}

/// `GET /health`: per-check detail; 503 only when unhealthy.
pub async fn detailed(State(state): State<AppState>) -> Response {
    let health = state.health.detailed_health().await;
    let status = match health.status {
        CheckStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        CheckStatus::Healthy | CheckStatus::Degraded => StatusCode::OK,
    };
    (status, Json(health)).into_response()
}

/// `GET /health-check`: plain-text readiness for older probes.
pub async fn legacy(State(state): State<AppState>) -> Response {
    if state.health.check_readiness().await.is_ready() {
        (StatusCode::OK, "ok").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ok").into_response()
    }
}
