//! Health Routes
//!
//! - GET /health/live - Process is up
//! - GET /health - Registry, reference clock and connection status

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::HealthResponse;
use crate::api::state::AppState;

/// GET /health/live
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health
///
/// Reads the registry under its lock, so a wedged mutation shows up here
/// as a hang rather than a stale answer.
pub async fn full_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let (clocks, reference_time) = {
        let registry = state.registry.lock().await;
        (registry.len(), registry.reference_time())
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        clocks,
        reference_time,
        follows_system_clock: state.follows_system_clock(),
        connections: state.ws_connection_count().await,
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
