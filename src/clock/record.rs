//! Clock records
//!
//! A `ClockRecord` is one named town clock. Its time only changes through
//! [`ClockRecord::update_time`], which also appends to a bounded sync history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

use super::error::{ClockError, ClockResult};
use super::time::{minute_word, TimeOfDay};

/// Longest accepted clock name, in characters
pub const MAX_CLOCK_NAME_LENGTH: usize = 50;

/// Display color used when none is given
pub const DEFAULT_CLOCK_COLOR: &str = "#4a5568";

/// Default number of entries kept in each bounded history
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Synchronization status of a clock relative to the reference time
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ClockStatus {
    /// Within tolerance of the reference
    Synchronized,
    /// Running fast
    Ahead,
    /// Running slow
    Behind,
}

impl ClockStatus {
    /// Classify a signed difference against a tolerance (inclusive)
    pub fn classify(difference: i32, tolerance: u32) -> Self {
        if difference.unsigned_abs() <= tolerance {
            ClockStatus::Synchronized
        } else if difference > 0 {
            ClockStatus::Ahead
        } else {
            ClockStatus::Behind
        }
    }

    /// Console icon for this status
    pub fn icon(&self) -> &'static str {
        match self {
            ClockStatus::Synchronized => "✅",
            ClockStatus::Ahead => "⏩",
            ClockStatus::Behind => "⏪",
        }
    }
}

impl fmt::Display for ClockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClockStatus::Synchronized => write!(f, "synchronized"),
            ClockStatus::Ahead => write!(f, "ahead"),
            ClockStatus::Behind => write!(f, "behind"),
        }
    }
}

/// One entry in a clock's sync history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncEvent {
    pub timestamp: DateTime<Utc>,
    pub old_time: TimeOfDay,
    pub new_time: TimeOfDay,
    #[serde(default = "default_sync_action")]
    pub action: String,
}

fn default_sync_action() -> String {
    "time_update".to_string()
}

/// Request to register a clock
///
/// `id` is optional; the registry assigns the next free id when absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewClock {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

impl NewClock {
    pub fn new(time: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: None,
            time: time.into(),
            name: name.into(),
            location: None,
            color: None,
        }
    }

    /// Builder method: set an explicit id
    pub fn id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Builder method: set location
    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Builder method: set display color
    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// Serialized form of a clock, as exported and imported with registry state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClockSnapshot {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub location: String,
    pub time: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub last_sync_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sync_history: Vec<SyncEvent>,
}

fn default_color() -> String {
    DEFAULT_CLOCK_COLOR.to_string()
}

/// Per-clock facts computed against a reference time
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClockDetails {
    pub id: u32,
    pub name: String,
    pub location: String,
    pub time: TimeOfDay,
    pub color: String,
    /// Signed minutes, positive when the clock is ahead
    pub difference: i32,
    pub absolute_difference: u32,
    pub status: ClockStatus,
    pub last_sync_time: Option<DateTime<Utc>>,
    pub sync_count: usize,
}

/// A named town clock
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClockRecord {
    id: u32,
    name: String,
    location: String,
    time: TimeOfDay,
    color: String,
    last_sync_time: Option<DateTime<Utc>>,
    sync_history: VecDeque<SyncEvent>,
    #[serde(skip)]
    history_limit: usize,
}

impl ClockRecord {
    /// Create a clock, validating id, time and name in that order
    pub fn new(id: i64, time: &str, name: &str) -> ClockResult<Self> {
        let id = validate_id(id)?;
        let time = TimeOfDay::parse(time)?;
        validate_name(name)?;

        Ok(Self {
            id,
            name: name.to_string(),
            location: String::new(),
            time,
            color: DEFAULT_CLOCK_COLOR.to_string(),
            last_sync_time: None,
            sync_history: VecDeque::new(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        })
    }

    /// Create a clock from a registration request with a resolved id
    pub fn from_request(id: i64, request: &NewClock) -> ClockResult<Self> {
        let mut clock = Self::new(id, &request.time, &request.name)?;
        if let Some(location) = &request.location {
            clock.location = location.clone();
        }
        if let Some(color) = &request.color {
            clock.color = color.clone();
        }
        Ok(clock)
    }

    /// Rebuild a clock from its serialized form, keeping history
    pub fn from_snapshot(snapshot: ClockSnapshot, history_limit: usize) -> ClockResult<Self> {
        let mut clock = Self::new(snapshot.id, &snapshot.time, &snapshot.name)?
            .with_history_limit(history_limit);
        clock.location = snapshot.location;
        clock.color = snapshot.color;
        clock.last_sync_time = snapshot.last_sync_time;
        clock.sync_history = snapshot.sync_history.into();
        clock.trim_history();
        Ok(clock)
    }

    /// Builder method: set location
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Builder method: set display color
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// Builder method: cap the sync history length
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        self.trim_history();
        self
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn time(&self) -> TimeOfDay {
        self.time
    }

    pub fn last_sync_time(&self) -> Option<DateTime<Utc>> {
        self.last_sync_time
    }

    /// Recent time changes, oldest first
    pub fn sync_history(&self) -> &VecDeque<SyncEvent> {
        &self.sync_history
    }

    /// Set a new time from an "HH:MM" string, recording the change
    pub fn update_time(&mut self, new_time: &str) -> ClockResult<()> {
        let new_time = TimeOfDay::parse(new_time)?;
        self.set_time(new_time, "time_update");
        Ok(())
    }

    /// Shift the clock by `delta` minutes, wrapping around midnight
    pub fn shift(&mut self, delta: i64) {
        let new_time = self.time.add_minutes(delta);
        self.set_time(new_time, "drift");
    }

    fn set_time(&mut self, new_time: TimeOfDay, action: &str) {
        let now = Utc::now();
        self.sync_history.push_back(SyncEvent {
            timestamp: now,
            old_time: self.time,
            new_time,
            action: action.to_string(),
        });
        self.trim_history();
        self.time = new_time;
        self.last_sync_time = Some(now);
    }

    fn trim_history(&mut self) {
        while self.sync_history.len() > self.history_limit {
            self.sync_history.pop_front();
        }
    }

    /// Change the display name
    pub fn rename(&mut self, name: &str) -> ClockResult<()> {
        validate_name(name)?;
        self.name = name.to_string();
        Ok(())
    }

    /// Signed minutes between this clock and an "HH:MM" reference
    pub fn difference_from(&self, reference: &str) -> ClockResult<i32> {
        let reference = TimeOfDay::parse(reference)?;
        Ok(self.offset_from(reference))
    }

    /// Signed minutes between this clock and a parsed reference
    pub fn offset_from(&self, reference: TimeOfDay) -> i32 {
        self.time.minutes_since(reference)
    }

    /// Status relative to an "HH:MM" reference under the given tolerance
    pub fn status_relative_to(&self, reference: &str, tolerance: u32) -> ClockResult<ClockStatus> {
        let difference = self.difference_from(reference)?;
        Ok(ClockStatus::classify(difference, tolerance))
    }

    /// All per-clock facts against a reference
    pub fn detailed_info(&self, reference: TimeOfDay, tolerance: u32) -> ClockDetails {
        let difference = self.offset_from(reference);
        ClockDetails {
            id: self.id,
            name: self.name.clone(),
            location: self.location.clone(),
            time: self.time,
            color: self.color.clone(),
            difference,
            absolute_difference: difference.unsigned_abs(),
            status: ClockStatus::classify(difference, tolerance),
            last_sync_time: self.last_sync_time,
            sync_count: self.sync_history.len(),
        }
    }

    /// Adjustment advice for this clock
    pub fn recommendation(&self, reference: TimeOfDay) -> String {
        let difference = self.offset_from(reference);
        let minutes = difference.unsigned_abs();

        if difference == 0 {
            format!("✅ {}: Perfect synchronization - no adjustment needed", self.name)
        } else if difference > 0 {
            format!("⏰ {}: Move backward by {} {}", self.name, minutes, minute_word(minutes))
        } else {
            format!("⏰ {}: Move forward by {} {}", self.name, minutes, minute_word(minutes))
        }
    }

    /// Serialized form, including full history
    pub fn snapshot(&self) -> ClockSnapshot {
        ClockSnapshot {
            id: i64::from(self.id),
            name: self.name.clone(),
            location: self.location.clone(),
            time: self.time.to_string(),
            color: self.color.clone(),
            last_sync_time: self.last_sync_time,
            sync_history: self.sync_history.iter().cloned().collect(),
        }
    }
}

fn validate_id(id: i64) -> ClockResult<u32> {
    if id < 1 {
        return Err(ClockError::InvalidClockId(id));
    }
    u32::try_from(id).map_err(|_| ClockError::InvalidClockId(id))
}

fn validate_name(name: &str) -> ClockResult<()> {
    if name.trim().is_empty() {
        return Err(ClockError::InvalidClockName(
            "Clock name must be a non-empty string".to_string(),
        ));
    }

    let length = name.chars().count();
    if length > MAX_CLOCK_NAME_LENGTH {
        return Err(ClockError::InvalidClockName(format!(
            "Clock name too long: {} characters. Maximum: {}",
            length, MAX_CLOCK_NAME_LENGTH
        )));
    }

    Ok(())
}
