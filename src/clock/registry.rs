//! Clock registry
//!
//! Owns the reference time and the ordered set of clocks, and composes the
//! per-clock facts and the analyzer into one [`AnalysisReport`]. The most
//! recent report is cached until the next mutation.
//!
//! The registry does no internal locking. Callers sharing one across tasks
//! must serialize access (the API layer keeps it behind a mutex).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;

use super::analyzer::{self, Summary};
use super::error::{ClockError, ClockResult};
use super::record::{ClockDetails, ClockRecord, ClockSnapshot, NewClock, DEFAULT_HISTORY_LIMIT};
use super::time::TimeOfDay;

/// Reference time used when none is configured
pub const DEFAULT_REFERENCE_TIME: &str = "15:00";

/// Immutable snapshot of one analysis run
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub timestamp: DateTime<Utc>,
    pub reference_time: TimeOfDay,
    pub tolerance: u32,
    pub clocks: Vec<ClockDetails>,
    pub summary: Summary,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
    /// Signed differences in registry order
    pub differences: Vec<i32>,
}

/// Entry in the analysis history log
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub timestamp: DateTime<Utc>,
    pub summary: Summary,
}

/// A registry mutation, kept in the activity log
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Activity {
    #[serde(rename_all = "camelCase")]
    Add { clock_id: u32 },
    #[serde(rename_all = "camelCase")]
    BulkAdd { clock_ids: Vec<u32> },
    #[serde(rename_all = "camelCase")]
    Remove { clock_id: u32 },
    #[serde(rename_all = "camelCase")]
    Update {
        clock_id: u32,
        old_time: TimeOfDay,
        new_time: TimeOfDay,
    },
    Drift { drift: BTreeMap<u32, i64> },
    Reference { old: TimeOfDay, new: TimeOfDay },
    Tolerance { old: u32, new: u32 },
    Import { clocks: usize },
}

/// Timestamped activity log entry
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ActivityEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub activity: Activity,
}

/// Outcome of a removal request
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RemoveOutcome {
    pub success: bool,
    pub id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Exported registry contents
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegistryState {
    pub reference_time: String,
    #[serde(default)]
    pub clocks: Vec<ClockSnapshot>,
}

/// The four clocks of the default town
pub fn default_clocks() -> Vec<NewClock> {
    vec![
        NewClock::new("14:45", "Town Square Clock").id(1).location("Main Plaza"),
        NewClock::new("15:05", "Railway Station Clock").id(2).location("Central Station"),
        NewClock::new("15:00", "Church Bell Tower").id(3).location("St. Mary's Cathedral"),
        NewClock::new("14:40", "Market Clock").id(4).location("Town Market Square"),
    ]
}

/// Owner of the reference time and all clocks
#[derive(Debug, Clone)]
pub struct ClockRegistry {
    reference: TimeOfDay,
    tolerance: u32,
    clocks: Vec<ClockRecord>,
    history_limit: usize,
    cache: Option<Arc<AnalysisReport>>,
    last_report_at: Option<DateTime<Utc>>,
    analysis_history: VecDeque<AnalysisRecord>,
    activity: VecDeque<ActivityEntry>,
}

impl ClockRegistry {
    /// Create an empty registry
    pub fn new(reference: TimeOfDay, tolerance: u32) -> Self {
        Self {
            reference,
            tolerance,
            clocks: Vec::new(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            cache: None,
            last_report_at: None,
            analysis_history: VecDeque::new(),
            activity: VecDeque::new(),
        }
    }

    /// Create a registry from a reference string and initial clocks
    pub fn with_clocks(reference: &str, clocks: Vec<NewClock>) -> ClockResult<Self> {
        let mut registry = Self::new(TimeOfDay::parse(reference)?, 0);
        registry.clocks = registry.build_clocks(&clocks)?;
        Ok(registry)
    }

    /// The default town: reference 15:00 and four clocks
    pub fn with_default_clocks() -> Self {
        let mut registry = Self::new(TimeOfDay::from_minutes_wrapping(15 * 60), 0);
        registry.clocks = default_clocks()
            .iter()
            .filter_map(|request| {
                let id = request.id.unwrap_or_default();
                ClockRecord::from_request(id, request).ok()
            })
            .collect();
        registry
    }

    /// Builder method: cap every bounded history (clock, analysis, activity)
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        let limit = self.history_limit;
        self.clocks = std::mem::take(&mut self.clocks)
            .into_iter()
            .map(|c| c.with_history_limit(limit))
            .collect();
        self
    }

    /// Builder method: set the synchronization tolerance
    pub fn with_tolerance(mut self, tolerance: u32) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn reference_time(&self) -> TimeOfDay {
        self.reference
    }

    pub fn tolerance(&self) -> u32 {
        self.tolerance
    }

    /// Clocks in insertion order
    pub fn clocks(&self) -> &[ClockRecord] {
        &self.clocks
    }

    pub fn get(&self, id: u32) -> Option<&ClockRecord> {
        self.clocks.iter().find(|c| c.id() == id)
    }

    pub fn len(&self) -> usize {
        self.clocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clocks.is_empty()
    }

    /// Next free id: one past the largest, or 1 for an empty registry
    ///
    /// Fails with `InvalidClockId` once `u32::MAX` is taken.
    pub fn next_id(&self) -> ClockResult<u32> {
        id_after(self.clocks.iter().map(ClockRecord::id).max())
    }

    /// Replace the reference time
    pub fn set_reference_time(&mut self, time: &str) -> ClockResult<()> {
        let new = TimeOfDay::parse(time)?;
        let old = std::mem::replace(&mut self.reference, new);
        if old != new {
            self.record(Activity::Reference { old, new });
        }
        self.invalidate();
        tracing::debug!(reference = %new, "Reference time set");
        Ok(())
    }

    /// Change the synchronization tolerance
    pub fn set_tolerance(&mut self, tolerance: u32) {
        let old = std::mem::replace(&mut self.tolerance, tolerance);
        self.record(Activity::Tolerance { old, new: tolerance });
        self.invalidate();
    }

    /// Register a new clock; the id defaults to [`Self::next_id`]
    pub fn add_clock(&mut self, request: NewClock) -> ClockResult<&ClockRecord> {
        let clock = self.build_clock(&request, &HashSet::new())?;
        let id = clock.id();
        self.clocks.push(clock);
        self.record(Activity::Add { clock_id: id });
        self.invalidate();

        tracing::debug!(clock_id = id, "Clock added");
        Ok(&self.clocks[self.clocks.len() - 1])
    }

    /// Register several clocks; nothing is inserted unless all are valid
    pub fn add_clocks_bulk(&mut self, requests: Vec<NewClock>) -> ClockResult<Vec<u32>> {
        let mut pending: Vec<ClockRecord> = Vec::with_capacity(requests.len());
        let mut taken = HashSet::new();

        for request in &requests {
            let mut request = request.clone();
            if request.id.is_none() {
                let largest = self.clocks.iter().chain(&pending).map(ClockRecord::id).max();
                request.id = Some(i64::from(id_after(largest)?));
            }
            let clock = self.build_clock(&request, &taken)?;
            taken.insert(clock.id());
            pending.push(clock);
        }

        let ids: Vec<u32> = pending.iter().map(ClockRecord::id).collect();
        self.clocks.extend(pending);
        self.record(Activity::BulkAdd {
            clock_ids: ids.clone(),
        });
        self.invalidate();

        tracing::debug!(count = ids.len(), "Clocks added in bulk");
        Ok(ids)
    }

    /// Remove a clock by id
    pub fn remove_clock(&mut self, id: u32) -> RemoveOutcome {
        match self.clocks.iter().position(|c| c.id() == id) {
            Some(index) => {
                self.clocks.remove(index);
                self.record(Activity::Remove { clock_id: id });
                self.invalidate();
                tracing::debug!(clock_id = id, "Clock removed");
                RemoveOutcome {
                    success: true,
                    id,
                    error: None,
                }
            }
            None => RemoveOutcome {
                success: false,
                id,
                error: Some(ClockError::ClockNotFound(id).code().to_string()),
            },
        }
    }

    /// Set a clock's time
    ///
    /// Returns `Ok(false)` when no clock has this id; a malformed time is an
    /// error.
    pub fn update_clock_time(&mut self, id: u32, time: &str) -> ClockResult<bool> {
        let Some(clock) = self.clocks.iter_mut().find(|c| c.id() == id) else {
            return Ok(false);
        };

        let old_time = clock.time();
        clock.update_time(time)?;
        let new_time = clock.time();

        self.record(Activity::Update {
            clock_id: id,
            old_time,
            new_time,
        });
        self.invalidate();
        Ok(true)
    }

    /// Rename a clock and set its time in one step
    pub fn update_clock(&mut self, id: u32, name: &str, time: &str) -> ClockResult<&ClockRecord> {
        let index = self
            .clocks
            .iter()
            .position(|c| c.id() == id)
            .ok_or(ClockError::ClockNotFound(id))?;

        let mut updated = self.clocks[index].clone();
        updated.rename(name)?;
        let old_time = updated.time();
        if old_time != TimeOfDay::parse(time)? {
            updated.update_time(time)?;
        }
        let new_time = updated.time();

        self.clocks[index] = updated;
        self.record(Activity::Update {
            clock_id: id,
            old_time,
            new_time,
        });
        self.invalidate();
        Ok(&self.clocks[index])
    }

    /// Shift clocks by the given minute deltas, wrapping around midnight
    ///
    /// Unknown ids and zero deltas are skipped. Returns the ids that moved.
    pub fn simulate_drift(&mut self, drift: &BTreeMap<u32, i64>) -> Vec<u32> {
        let mut shifted = Vec::new();
        for clock in &mut self.clocks {
            match drift.get(&clock.id()) {
                Some(&delta) if delta != 0 => {
                    clock.shift(delta);
                    shifted.push(clock.id());
                }
                _ => {}
            }
        }

        if !shifted.is_empty() {
            self.record(Activity::Drift {
                drift: drift.clone(),
            });
            self.invalidate();
        }
        shifted
    }

    /// Analyze all clocks against the reference time
    ///
    /// With `use_cache`, the previous report is returned unchanged when no
    /// mutation happened since it was computed.
    pub fn analyze(&mut self, use_cache: bool) -> Arc<AnalysisReport> {
        if use_cache {
            if let Some(cached) = &self.cache {
                return Arc::clone(cached);
            }
        }

        let clocks: Vec<ClockDetails> = self
            .clocks
            .iter()
            .map(|c| c.detailed_info(self.reference, self.tolerance))
            .collect();
        let summary = analyzer::summarize(&clocks);
        let insights = analyzer::insights(&summary);
        let recommendations = analyzer::recommendations(&summary);
        let differences = clocks.iter().map(|c| c.difference).collect();

        let timestamp = self.next_timestamp();
        let report = Arc::new(AnalysisReport {
            timestamp,
            reference_time: self.reference,
            tolerance: self.tolerance,
            clocks,
            summary: summary.clone(),
            insights,
            recommendations,
            differences,
        });

        self.analysis_history.push_back(AnalysisRecord { timestamp, summary });
        while self.analysis_history.len() > self.history_limit {
            self.analysis_history.pop_front();
        }
        self.cache = Some(Arc::clone(&report));

        tracing::debug!(
            clocks = report.summary.total_clocks,
            rate = report.summary.synchronization_rate,
            "Analysis computed"
        );
        report
    }

    /// Per-clock adjustment advice in registry order
    pub fn recommendations_per_clock(&self) -> Vec<String> {
        self.clocks
            .iter()
            .map(|c| c.recommendation(self.reference))
            .collect()
    }

    /// Clocks whose absolute difference exceeds `alert_tolerance`
    pub fn out_of_sync(&self, alert_tolerance: u32) -> Vec<ClockDetails> {
        let late: Vec<ClockDetails> = self
            .clocks
            .iter()
            .map(|c| c.detailed_info(self.reference, self.tolerance))
            .filter(|d| d.absolute_difference > alert_tolerance)
            .collect();

        for clock in &late {
            tracing::warn!(
                clock_id = clock.id,
                clock = %clock.name,
                minutes = clock.absolute_difference,
                "Clock out of sync"
            );
        }
        late
    }

    /// Recent analysis summaries, oldest first
    pub fn analysis_history(&self) -> &VecDeque<AnalysisRecord> {
        &self.analysis_history
    }

    /// Recent registry mutations, oldest first
    pub fn activity(&self) -> &VecDeque<ActivityEntry> {
        &self.activity
    }

    /// Export reference time and clocks, including each clock's history
    pub fn export_state(&self) -> RegistryState {
        RegistryState {
            reference_time: self.reference.to_string(),
            clocks: self.clocks.iter().map(ClockRecord::snapshot).collect(),
        }
    }

    /// Replace the reference time and every clock with imported state
    ///
    /// The registry is left untouched if any part of the state is invalid.
    pub fn import_state(&mut self, state: RegistryState) -> ClockResult<()> {
        let reference = TimeOfDay::parse(&state.reference_time)?;

        let mut seen = HashSet::new();
        let mut clocks = Vec::with_capacity(state.clocks.len());
        for snapshot in state.clocks {
            let clock = ClockRecord::from_snapshot(snapshot, self.history_limit)?;
            if !seen.insert(clock.id()) {
                return Err(ClockError::DuplicateClockId(clock.id()));
            }
            clocks.push(clock);
        }

        self.reference = reference;
        self.clocks = clocks;
        self.record(Activity::Import {
            clocks: self.clocks.len(),
        });
        self.invalidate();

        tracing::info!(clocks = self.clocks.len(), reference = %reference, "Registry state imported");
        Ok(())
    }

    fn build_clocks(&self, requests: &[NewClock]) -> ClockResult<Vec<ClockRecord>> {
        let mut taken = HashSet::new();
        let mut clocks = Vec::with_capacity(requests.len());
        for request in requests {
            let mut request = request.clone();
            if request.id.is_none() {
                request.id = Some(i64::from(id_after(clocks.iter().map(ClockRecord::id).max())?));
            }
            let clock = self.build_clock(&request, &taken)?;
            taken.insert(clock.id());
            clocks.push(clock);
        }
        Ok(clocks)
    }

    /// Validate a request against the registry and `reserved` ids
    fn build_clock(&self, request: &NewClock, reserved: &HashSet<u32>) -> ClockResult<ClockRecord> {
        let id = match request.id {
            Some(id) => id,
            None => i64::from(self.next_id()?),
        };
        let clock = ClockRecord::from_request(id, request)?.with_history_limit(self.history_limit);

        if reserved.contains(&clock.id()) || self.get(clock.id()).is_some() {
            return Err(ClockError::DuplicateClockId(clock.id()));
        }
        Ok(clock)
    }

    fn invalidate(&mut self) {
        self.cache = None;
    }

    fn record(&mut self, activity: Activity) {
        self.activity.push_back(ActivityEntry {
            timestamp: Utc::now(),
            activity,
        });
        while self.activity.len() > self.history_limit {
            self.activity.pop_front();
        }
    }

    /// Report timestamps strictly increase, so a recomputed report never
    /// shares a timestamp with the one it replaces.
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let timestamp = match self.last_report_at {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_report_at = Some(timestamp);
        timestamp
    }
}

impl Default for ClockRegistry {
    fn default() -> Self {
        Self::with_default_clocks()
    }
}

/// One past `largest`, or 1 when there is none
fn id_after(largest: Option<u32>) -> ClockResult<u32> {
    match largest {
        None => Ok(1),
        Some(max) => max
            .checked_add(1)
            .ok_or(ClockError::InvalidClockId(i64::from(max) + 1)),
    }
}
