//! Sync Routes
//!
//! Endpoints that move the reference time or the clocks themselves.
//!
//! - POST /api/sync - Set the reference to the current time
//! - PUT /api/reference - Set the reference explicitly
//! - POST /api/drift - Shift clocks by minute deltas (admin)

use axum::{extract::State, http::HeaderMap, Json};
use std::sync::Arc;

use crate::api::dto::{ClockMutationResponse, DriftRequest, DriftResponse, ReferenceRequest};
use crate::api::error::ApiResult;
use crate::api::state::AppState;

/// Header carrying the admin password
pub const ADMIN_PASSWORD_HEADER: &str = "x-admin-password";

/// POST /api/sync
pub async fn sync_to_current_time(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<ClockMutationResponse>> {
    let analysis = state.sync_to_current_time().await?;
    Ok(Json(ClockMutationResponse::new(analysis)))
}

/// PUT /api/reference
pub async fn set_reference(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReferenceRequest>,
) -> ApiResult<Json<ClockMutationResponse>> {
    let analysis = state.set_reference_time(&req.time).await?;
    Ok(Json(ClockMutationResponse::new(analysis)))
}

/// POST /api/drift
pub async fn simulate_drift(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<DriftRequest>,
) -> ApiResult<Json<DriftResponse>> {
    state.authenticate(admin_password(&headers))?;

    let (shifted, analysis) = state.simulate_drift(&req.drift).await?;
    Ok(Json(DriftResponse {
        success: true,
        shifted,
        analysis,
    }))
}

/// Admin password from request headers, if present
pub(crate) fn admin_password(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(ADMIN_PASSWORD_HEADER)
        .and_then(|v| v.to_str().ok())
}
