//! WebSocket Connection Hub
//!
//! Tracks dashboard connections and the topics each one follows. Every
//! broadcast event is also mirrored onto a tokio broadcast channel so
//! in-process listeners (the ticker tests, for one) can observe it.

use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, RwLock};
use uuid::Uuid;

use super::messages::{ServerMessage, Topic, WsEvent};

/// Unique identifier for a WebSocket connection
pub type ConnectionId = String;

/// Hub limits
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Maximum number of concurrent connections
    pub max_connections: usize,
    /// Capacity of the in-process broadcast channel
    pub broadcast_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_connections: 1000,
            broadcast_capacity: 1024,
        }
    }
}

/// One connected dashboard
struct Dashboard {
    outbox: mpsc::UnboundedSender<ServerMessage>,
    topics: HashSet<Topic>,
}

impl Dashboard {
    fn push(&self, message: ServerMessage) -> bool {
        self.outbox.send(message).is_ok()
    }
}

/// Registry of live dashboards and their topics
pub struct ConnectionHub {
    dashboards: RwLock<HashMap<ConnectionId, Dashboard>>,
    mirror: broadcast::Sender<WsEvent>,
    config: HubConfig,
}

impl ConnectionHub {
    pub fn new(config: HubConfig) -> Self {
        let (mirror, _) = broadcast::channel(config.broadcast_capacity.max(1));

        Self {
            dashboards: RwLock::new(HashMap::new()),
            mirror,
            config,
        }
    }

    /// Add a connection; fails once `max_connections` are open
    pub async fn register(
        &self,
        outbox: mpsc::UnboundedSender<ServerMessage>,
    ) -> Result<ConnectionId, HubError> {
        let mut dashboards = self.dashboards.write().await;
        if dashboards.len() >= self.config.max_connections {
            return Err(HubError::TooManyConnections(self.config.max_connections));
        }

        let id = Uuid::new_v4().to_string();
        dashboards.insert(
            id.clone(),
            Dashboard {
                outbox,
                topics: HashSet::new(),
            },
        );

        tracing::info!(connection_id = %id, open = dashboards.len(), "Dashboard connected");
        Ok(id)
    }

    pub async fn unregister(&self, id: &str) {
        if self.dashboards.write().await.remove(id).is_some() {
            tracing::info!(connection_id = %id, "Dashboard disconnected");
        }
    }

    /// Follow topics; returns the ones newly added
    pub async fn subscribe(
        &self,
        id: &str,
        topics: impl IntoIterator<Item = Topic>,
    ) -> Result<Vec<Topic>, HubError> {
        let mut dashboards = self.dashboards.write().await;
        let dashboard = dashboards.get_mut(id).ok_or(HubError::ConnectionNotFound)?;

        let added: Vec<Topic> = topics
            .into_iter()
            .filter(|topic| dashboard.topics.insert(*topic))
            .collect();

        tracing::debug!(connection_id = %id, topics = ?added, "Subscribed");
        Ok(added)
    }

    /// Stop following topics; returns the ones actually dropped
    pub async fn unsubscribe(
        &self,
        id: &str,
        topics: impl IntoIterator<Item = Topic>,
    ) -> Result<Vec<Topic>, HubError> {
        let mut dashboards = self.dashboards.write().await;
        let dashboard = dashboards.get_mut(id).ok_or(HubError::ConnectionNotFound)?;

        let dropped: Vec<Topic> = topics
            .into_iter()
            .filter(|topic| dashboard.topics.remove(topic))
            .collect();

        tracing::debug!(connection_id = %id, topics = ?dropped, "Unsubscribed");
        Ok(dropped)
    }

    /// Deliver to every follower of the event's topic
    ///
    /// Messages are queued on each outbox before this returns, so events
    /// reach a dashboard in the order they were broadcast. Returns the
    /// number of dashboards reached.
    pub async fn broadcast(&self, event: &WsEvent) -> usize {
        // no in-process listeners is the normal case
        let _ = self.mirror.send(event.clone());

        let reached = self
            .dashboards
            .read()
            .await
            .values()
            .filter(|d| d.topics.contains(&event.topic))
            .filter(|d| d.push(event.message.clone()))
            .count();

        tracing::trace!(topic = ?event.topic, reached, "Event delivered");
        reached
    }

    /// Send one message to one dashboard
    pub async fn send_to(&self, id: &str, message: ServerMessage) -> Result<(), HubError> {
        let dashboards = self.dashboards.read().await;
        let dashboard = dashboards.get(id).ok_or(HubError::ConnectionNotFound)?;

        if dashboard.push(message) {
            Ok(())
        } else {
            Err(HubError::SendFailed)
        }
    }

    /// In-process view of everything published
    pub fn subscribe_broadcast(&self) -> broadcast::Receiver<WsEvent> {
        self.mirror.subscribe()
    }

    pub async fn connection_count(&self) -> usize {
        self.dashboards.read().await.len()
    }

    /// Dashboards following `topic`
    pub async fn subscription_count(&self, topic: Topic) -> usize {
        self.dashboards
            .read()
            .await
            .values()
            .filter(|d| d.topics.contains(&topic))
            .count()
    }
}

/// Errors that can occur in the connection hub
#[derive(Debug, Error)]
pub enum HubError {
    #[error("Too many connections (limit: {0})")]
    TooManyConnections(usize),

    #[error("Connection not found")]
    ConnectionNotFound,

    #[error("Failed to send message")]
    SendFailed,
}
