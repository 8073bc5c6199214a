//! WebSocket Message Types
//!
//! Defines all message types for WebSocket communication between
//! clients (dashboards) and the Tempora server.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::clock::{AnalysisReport, ClockDetails, ClockRecord, TimeOfDay};

/// Push channel topics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    /// A fresh report after every registry change
    Analysis,
    /// Out-of-sync alerts
    System,
}

/// A topic name as sent by a client; names the server does not know are
/// kept so they can be reported and skipped
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TopicRequest {
    Known(Topic),
    Unknown(String),
}

/// Messages sent from client to server
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Subscribe to topics for real-time updates
    Subscribe {
        /// List of topics to subscribe to ("analysis", "system")
        topics: Vec<TopicRequest>,
    },
    /// Unsubscribe from topics
    Unsubscribe {
        /// List of topics to unsubscribe from
        topics: Vec<TopicRequest>,
    },
    /// Ping for keepalive
    Ping,
    /// Request the current analysis
    GetClockData,
    /// Move the reference time to the server's current time
    SyncToCurrentTime,
    /// Register a clock
    AddClock {
        #[serde(default)]
        name: String,
        #[serde(default)]
        time: String,
    },
    /// Rename a clock and set its time
    UpdateClock {
        id: u32,
        #[serde(default)]
        name: String,
        #[serde(default)]
        time: String,
    },
    /// Remove a clock
    DeleteClock { id: serde_json::Value },
    /// Request the server's current time
    GetCurrentTime,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full analysis report
    ClockData { analysis: Arc<AnalysisReport> },
    /// Reply to `add_clock`
    AddClockResult {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        clock: Option<ClockRecord>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// Reply to `delete_clock`
    DeleteClockResult {
        success: bool,
        id: serde_json::Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// Reply to `get_current_time`
    TimeUpdate {
        /// RFC 3339 timestamp at the configured offset
        time: String,
        /// "HH:MM" at the configured offset
        formatted: TimeOfDay,
    },
    /// Subscription confirmed
    Subscribed {
        /// Topics successfully subscribed to
        topics: Vec<Topic>,
    },
    /// Unsubscription confirmed
    Unsubscribed {
        /// Topics successfully unsubscribed from
        topics: Vec<Topic>,
    },
    /// Pong response to ping
    Pong,
    /// A clock drifted past the alert tolerance
    OutOfSync {
        clock_id: u32,
        name: String,
        minutes: u32,
    },
    /// Error message
    Error {
        /// Error description
        message: String,
    },
    /// Connection established
    Connected {
        /// Unique connection identifier
        connection_id: String,
    },
}

/// Internal event for broadcasting through the hub
#[derive(Debug, Clone)]
pub struct WsEvent {
    /// Topic this event belongs to
    pub topic: Topic,
    /// The message to send to subscribers
    pub message: ServerMessage,
}

impl WsEvent {
    /// Create an analysis event
    pub fn analysis(report: Arc<AnalysisReport>) -> Self {
        Self {
            topic: Topic::Analysis,
            message: ServerMessage::ClockData { analysis: report },
        }
    }

    /// Create an out-of-sync alert on the system topic
    pub fn out_of_sync(clock: &ClockDetails) -> Self {
        Self {
            topic: Topic::System,
            message: ServerMessage::OutOfSync {
                clock_id: clock.id,
                name: clock.name.clone(),
                minutes: clock.absolute_difference,
            },
        }
    }
}
