//! # Tempora
//!
//! Town clock synchronization - compares a town's clocks against the
//! Grand Clock Tower reference time and reports who is ahead, behind or
//! in sync.
//!
//! ## Features
//!
//! - **Clock model**: "HH:MM" times with minute arithmetic that wraps at midnight
//! - **Analysis**: per-clock differences, summary statistics, insights and advice
//! - **Persistence**: JSON state file written atomically
//! - **Real-time**: WebSocket support for live dashboards
//!
//! ## Modules
//!
//! - [`clock`]: Time arithmetic, clock records and the registry
//! - [`display`]: Text rendering of analysis reports
//! - [`store`]: Registry state file
//! - [`api`]: REST API server with Axum
//! - [`websocket`]: Live report streaming
//!
//! ## Quick Start
//!
//! ```rust
//! use tempora::clock::ClockRegistry;
//! use tempora::display::render_report;
//!
//! let mut registry = ClockRegistry::with_default_clocks();
//! let report = registry.analyze(true);
//!
//! assert_eq!(report.differences, vec![-15, 5, 0, -20]);
//! println!("{}", render_report(&report, &registry.recommendations_per_clock()));
//! ```

pub mod api;
pub mod clock;
pub mod config;
pub mod display;
pub mod store;
pub mod websocket;

// Re-export top-level types for convenience
pub use clock::{
    AnalysisReport, ClockDetails, ClockError, ClockRecord, ClockRegistry, ClockResult,
    ClockStatus, NewClock, RegistryState, Summary, TimeOfDay,
};

pub use api::{build_router, serve, ApiError, AppState};

pub use websocket::{
    websocket_handler, ClientMessage, ConnectionHub, HubConfig, HubError, ServerMessage, WsEvent,
};

pub use config::{Config, ConfigError, LoggingConfig, ServerConfig, SyncConfig};

pub use store::{StoreError, StoreResult};
