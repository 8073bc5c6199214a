//! Tempora clock model
//!
//! This module provides the core synchronization model:
//!
//! - **time**: "HH:MM" codec and minute arithmetic
//! - **record**: A single town clock with bounded sync history
//! - **analyzer**: Aggregate statistics, insights and recommendations
//! - **registry**: Owner of the reference time and all clocks
//! - **error**: Error types
//!
//! # Example
//!
//! ```rust
//! use tempora::clock::{ClockRegistry, NewClock};
//!
//! let mut registry = ClockRegistry::with_clocks(
//!     "15:00",
//!     vec![
//!         NewClock::new("14:45", "Town Square Clock"),
//!         NewClock::new("15:05", "Railway Station Clock"),
//!     ],
//! )?;
//!
//! let report = registry.analyze(true);
//! assert_eq!(report.differences, vec![-15, 5]);
//! # Ok::<(), tempora::clock::ClockError>(())
//! ```

pub mod analyzer;
pub mod error;
pub mod record;
pub mod registry;
pub mod time;

pub use analyzer::Summary;
pub use error::{ClockError, ClockResult};
pub use record::{
    ClockDetails, ClockRecord, ClockSnapshot, ClockStatus, NewClock, SyncEvent,
    DEFAULT_CLOCK_COLOR, DEFAULT_HISTORY_LIMIT, MAX_CLOCK_NAME_LENGTH,
};
pub use registry::{
    default_clocks, Activity, ActivityEntry, AnalysisRecord, AnalysisReport, ClockRegistry,
    RegistryState, RemoveOutcome, DEFAULT_REFERENCE_TIME,
};
pub use time::{
    current_time, format_difference, format_time, parse_time, time_difference, TimeOfDay,
};
