//! History Routes
//!
//! - GET /api/history - Recent analysis summaries and registry activity

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::dto::HistoryResponse;
use crate::api::state::AppState;

/// GET /api/history
pub async fn history(State(state): State<Arc<AppState>>) -> Json<HistoryResponse> {
    let registry = state.registry.lock().await;
    Json(HistoryResponse {
        analysis: registry.analysis_history().iter().cloned().collect(),
        activity: registry.activity().iter().cloned().collect(),
    })
}
