//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::clock::{ActivityEntry, AnalysisRecord, AnalysisReport, ClockRecord, TimeOfDay};

/// Message used when a clock request lacks a name or a time
pub const NAME_TIME_REQUIRED: &str = "Name and time are required";

// ============================================
// CLOCK DTOs
// ============================================

/// Full clock edit request
#[derive(Debug, Deserialize)]
pub struct UpdateClockRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub time: String,
}

/// Reply to any clock mutation
#[derive(Debug, Serialize)]
pub struct ClockMutationResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clock: Option<ClockRecord>,
    pub analysis: Arc<AnalysisReport>,
}

impl ClockMutationResponse {
    pub fn new(analysis: Arc<AnalysisReport>) -> Self {
        Self {
            success: true,
            clock: None,
            analysis,
        }
    }

    pub fn with_clock(clock: ClockRecord, analysis: Arc<AnalysisReport>) -> Self {
        Self {
            success: true,
            clock: Some(clock),
            analysis,
        }
    }
}

/// Per-clock adjustment advice
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationsResponse {
    pub reference_time: TimeOfDay,
    pub recommendations: Vec<String>,
}

// ============================================
// REFERENCE / DRIFT DTOs
// ============================================

/// Explicit reference time
#[derive(Debug, Deserialize)]
pub struct ReferenceRequest {
    pub time: String,
}

/// Minute deltas keyed by clock id
#[derive(Debug, Deserialize)]
pub struct DriftRequest {
    pub drift: BTreeMap<u32, i64>,
}

/// Reply to a drift simulation
#[derive(Debug, Serialize)]
pub struct DriftResponse {
    pub success: bool,
    /// Ids that actually moved
    pub shifted: Vec<u32>,
    pub analysis: Arc<AnalysisReport>,
}

// ============================================
// HISTORY DTOs
// ============================================

/// Analysis summaries and registry activity, oldest first
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub analysis: Vec<AnalysisRecord>,
    pub activity: Vec<ActivityEntry>,
}

// ============================================
// HEALTH DTOs
// ============================================

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status: "healthy"
    pub status: String,
    /// Registered clock count
    pub clocks: usize,
    /// Grand Clock Tower time
    pub reference_time: TimeOfDay,
    /// Whether the ticker moves the reference with the system clock
    pub follows_system_clock: bool,
    /// Open WebSocket connections
    pub connections: usize,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Server version
    pub version: String,
}

// ============================================
// HELPERS
// ============================================

/// Reject requests with a blank name or time
pub fn require_name_and_time(name: &str, time: &str) -> ApiResult<()> {
    if name.trim().is_empty() || time.trim().is_empty() {
        return Err(ApiError::Validation(NAME_TIME_REQUIRED.to_string()));
    }
    Ok(())
}

/// Append " Clock" to names that do not already mention it
pub fn normalize_clock_name(name: &str) -> String {
    let name = name.trim();
    if name.contains("Clock") {
        name.to_string()
    } else {
        format!("{} Clock", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_clock_name() {
        assert_eq!(normalize_clock_name("Harbour"), "Harbour Clock");
        assert_eq!(normalize_clock_name("Harbour Clock"), "Harbour Clock");
        assert_eq!(normalize_clock_name("  Clocktower "), "Clocktower");
        assert_eq!(normalize_clock_name("Church Bell Tower"), "Church Bell Tower Clock");
    }

    #[test]
    fn test_require_name_and_time() {
        assert!(require_name_and_time("Harbour", "10:00").is_ok());
        assert!(matches!(
            require_name_and_time("", "10:00"),
            Err(ApiError::Validation(msg)) if msg == NAME_TIME_REQUIRED
        ));
        assert!(require_name_and_time("Harbour", " ").is_err());
    }

    #[test]
    fn test_drift_request_string_keys() {
        let req: DriftRequest = serde_json::from_str(r#"{"drift": {"1": 2, "4": -3}}"#).unwrap();
        assert_eq!(req.drift.get(&1), Some(&2));
        assert_eq!(req.drift.get(&4), Some(&-3));
    }

    #[test]
    fn test_mutation_response_embeds_shared_report() {
        let mut registry = crate::clock::ClockRegistry::default();
        let report = registry.analyze(true);

        let response = ClockMutationResponse::new(Arc::clone(&report));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert!(json.get("clock").is_none());
        assert_eq!(json["analysis"]["referenceTime"], "15:00");

        let drift = DriftResponse {
            success: true,
            shifted: vec![1],
            analysis: report,
        };
        let json = serde_json::to_value(&drift).unwrap();
        assert_eq!(json["analysis"]["differences"], serde_json::json!([-15, 5, 0, -20]));
    }
}
