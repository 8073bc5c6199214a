//! State Routes
//!
//! Registry export and import for backup and restore.
//!
//! - GET /api/state - Export reference time and clocks with history
//! - POST /api/state - Replace the registry (admin)

use axum::{extract::State, http::HeaderMap, Json};
use std::sync::Arc;

use super::sync::admin_password;
use crate::api::dto::ClockMutationResponse;
use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::clock::RegistryState;

/// GET /api/state
pub async fn export_state(State(state): State<Arc<AppState>>) -> Json<RegistryState> {
    Json(state.export_state().await)
}

/// POST /api/state
///
/// Nothing changes unless the whole payload is valid.
pub async fn import_state(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<RegistryState>,
) -> ApiResult<Json<ClockMutationResponse>> {
    state.authenticate(admin_password(&headers))?;

    let clocks = payload.clocks.len();
    let analysis = state.import_state(payload).await?;
    tracing::info!(clocks, "Registry state imported over HTTP");

    Ok(Json(ClockMutationResponse::new(analysis)))
}
