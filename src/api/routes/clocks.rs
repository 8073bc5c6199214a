//! Clock Routes
//!
//! CRUD endpoints for town clocks.
//!
//! - GET /api/clocks - Current analysis report
//! - POST /api/clocks - Register a clock
//! - PUT /api/clocks/:id - Rename a clock and set its time
//! - DELETE /api/clocks/:id - Remove a clock
//! - GET /api/recommendations - Per-clock adjustment advice

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::api::dto::{ClockMutationResponse, RecommendationsResponse, UpdateClockRequest};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::clock::{AnalysisReport, ClockError, NewClock};

/// GET /api/clocks
pub async fn list_clocks(State(state): State<Arc<AppState>>) -> Json<Arc<AnalysisReport>> {
    Json(state.analysis().await)
}

/// POST /api/clocks
///
/// Register a clock. The id defaults to one past the largest existing id.
pub async fn create_clock(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewClock>,
) -> ApiResult<(StatusCode, Json<ClockMutationResponse>)> {
    let (clock, analysis) = state.add_clock(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(ClockMutationResponse::with_clock(clock, analysis)),
    ))
}

/// PUT /api/clocks/:id
pub async fn update_clock(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateClockRequest>,
) -> ApiResult<Json<ClockMutationResponse>> {
    let id = parse_clock_id(&id)?;
    let (clock, analysis) = state.update_clock(id, &req.name, &req.time).await?;
    Ok(Json(ClockMutationResponse::with_clock(clock, analysis)))
}

/// DELETE /api/clocks/:id
pub async fn delete_clock(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ClockMutationResponse>> {
    let id = parse_clock_id(&id)?;
    let analysis = state.remove_clock(id).await?;
    Ok(Json(ClockMutationResponse::new(analysis)))
}

/// GET /api/recommendations
pub async fn recommendations(State(state): State<Arc<AppState>>) -> Json<RecommendationsResponse> {
    let registry = state.registry.lock().await;
    Json(RecommendationsResponse {
        reference_time: registry.reference_time(),
        recommendations: registry.recommendations_per_clock(),
    })
}

/// Parse a path segment as a clock id
pub(crate) fn parse_clock_id(raw: &str) -> ApiResult<u32> {
    let id: i64 = raw
        .trim()
        .parse()
        .map_err(|_| ApiError::Validation(format!("Invalid clock ID: {:?}", raw)))?;
    if id < 1 {
        return Err(ClockError::InvalidClockId(id).into());
    }
    u32::try_from(id).map_err(|_| ClockError::InvalidClockId(id).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clock_id() {
        assert_eq!(parse_clock_id("3").unwrap(), 3);
        assert!(matches!(parse_clock_id("abc"), Err(ApiError::Validation(_))));
        assert!(matches!(
            parse_clock_id("0"),
            Err(ApiError::Clock(ClockError::InvalidClockId(0)))
        ));
        assert!(parse_clock_id("99999999999").is_err());
    }
}
