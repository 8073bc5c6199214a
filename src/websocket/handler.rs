//! WebSocket Handler
//!
//! Handles WebSocket upgrade requests and manages the connection lifecycle.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use chrono::{FixedOffset, Utc};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::messages::{ClientMessage, ServerMessage, Topic, TopicRequest};
use crate::api::routes::clocks::parse_clock_id;
use crate::api::AppState;
use crate::clock::NewClock;

/// WebSocket upgrade handler
///
/// This is the entry point for WebSocket connections.
/// It upgrades the HTTP connection to WebSocket and starts message handling.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

fn encode(message: &ServerMessage) -> Option<Message> {
    match serde_json::to_string(message) {
        Ok(text) => Some(Message::Text(text)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize message");
            None
        }
    }
}

/// Handle an established WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let hub = Arc::clone(&state.ws_hub);
    let (mut sender, mut receiver) = socket.split();

    // Create channel for sending messages to this connection
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    let connection_id = match hub.register(tx).await {
        Ok(id) => id,
        Err(e) => {
            tracing::error!(error = %e, "Failed to register WebSocket connection");
            let error_msg = ServerMessage::Error {
                message: e.to_string(),
            };
            if let Some(msg) = encode(&error_msg) {
                let _ = sender.send(msg).await;
            }
            return;
        }
    };

    let connected_msg = ServerMessage::Connected {
        connection_id: connection_id.clone(),
    };
    let sent = match encode(&connected_msg) {
        Some(msg) => sender.send(msg).await.is_ok(),
        None => false,
    };
    if !sent {
        tracing::error!(connection_id = %connection_id, "Failed to send connected message");
        hub.unregister(&connection_id).await;
        return;
    }

    // Every client follows the analysis topic and starts with a fresh report
    let _ = hub.subscribe(&connection_id, [Topic::Analysis]).await;
    let analysis = state.analysis().await;
    let _ = hub
        .send_to(&connection_id, ServerMessage::ClockData { analysis })
        .await;

    let conn_id_for_send = connection_id.clone();

    // Task to forward messages from channel to WebSocket
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let Some(frame) = encode(&msg) else {
                continue;
            };
            if sender.send(frame).await.is_err() {
                tracing::debug!(
                    connection_id = %conn_id_for_send,
                    "WebSocket send failed, closing connection"
                );
                break;
            }
        }
    });

    let state_for_recv = Arc::clone(&state);
    let conn_id_for_recv = connection_id.clone();

    // Task to receive messages from WebSocket and handle them
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(msg) => {
                    if !handle_ws_message(&state_for_recv, &conn_id_for_recv, msg).await {
                        break;
                    }
                }
                Err(e) => {
                    tracing::debug!(
                        connection_id = %conn_id_for_recv,
                        error = %e,
                        "WebSocket receive error"
                    );
                    break;
                }
            }
        }
    });

    // Wait for either task to complete
    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }

    hub.unregister(&connection_id).await;
}

/// Handle a received WebSocket message
///
/// Returns false if the connection should be closed.
async fn handle_ws_message(state: &Arc<AppState>, connection_id: &str, message: Message) -> bool {
    match message {
        Message::Text(text) => {
            match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => {
                    let reply = handle_client_message(state, connection_id, client_msg).await;
                    if let Some(reply) = reply {
                        let _ = state.ws_hub.send_to(connection_id, reply).await;
                    }
                }
                Err(e) => {
                    tracing::debug!(
                        connection_id = %connection_id,
                        error = %e,
                        text = %text,
                        "Invalid client message"
                    );
                    // Send error but keep connection open
                    let error_msg = ServerMessage::Error {
                        message: format!("Invalid message format: {}", e),
                    };
                    let _ = state.ws_hub.send_to(connection_id, error_msg).await;
                }
            }
            true
        }
        Message::Binary(_) => {
            let error_msg = ServerMessage::Error {
                message: "Binary messages not supported".to_string(),
            };
            let _ = state.ws_hub.send_to(connection_id, error_msg).await;
            true
        }
        // Axum answers pings itself
        Message::Ping(_) | Message::Pong(_) => true,
        Message::Close(_) => {
            tracing::debug!(connection_id = %connection_id, "Client requested close");
            false
        }
    }
}

/// Handle a parsed client message, returning the direct reply if any
///
/// Registry changes reach every client (this one included) through the
/// `analysis` topic, so mutations only reply directly with their result.
async fn handle_client_message(
    state: &AppState,
    connection_id: &str,
    message: ClientMessage,
) -> Option<ServerMessage> {
    let hub = &state.ws_hub;

    match message {
        ClientMessage::Subscribe { topics } => {
            Some(match hub.subscribe(connection_id, known_topics(&topics)).await {
                Ok(subscribed) => ServerMessage::Subscribed { topics: subscribed },
                Err(e) => {
                    tracing::error!(connection_id = %connection_id, error = %e, "Subscribe error");
                    ServerMessage::Error {
                        message: e.to_string(),
                    }
                }
            })
        }
        ClientMessage::Unsubscribe { topics } => {
            Some(match hub.unsubscribe(connection_id, known_topics(&topics)).await {
                Ok(unsubscribed) => ServerMessage::Unsubscribed {
                    topics: unsubscribed,
                },
                Err(e) => {
                    tracing::error!(connection_id = %connection_id, error = %e, "Unsubscribe error");
                    ServerMessage::Error {
                        message: e.to_string(),
                    }
                }
            })
        }
        ClientMessage::Ping => Some(ServerMessage::Pong),
        ClientMessage::GetClockData => Some(ServerMessage::ClockData {
            analysis: state.analysis().await,
        }),
        ClientMessage::SyncToCurrentTime => match state.sync_to_current_time().await {
            Ok(_) => None,
            Err(e) => Some(ServerMessage::Error {
                message: e.to_string(),
            }),
        },
        ClientMessage::AddClock { name, time } => {
            Some(match state.add_clock(NewClock::new(time, name)).await {
                Ok((clock, _)) => ServerMessage::AddClockResult {
                    success: true,
                    clock: Some(clock),
                    error: None,
                },
                Err(e) => ServerMessage::AddClockResult {
                    success: false,
                    clock: None,
                    error: Some(e.to_string()),
                },
            })
        }
        ClientMessage::UpdateClock { id, name, time } => {
            match state.update_clock(id, &name, &time).await {
                Ok(_) => None,
                Err(e) => Some(ServerMessage::Error {
                    message: e.to_string(),
                }),
            }
        }
        ClientMessage::DeleteClock { id } => {
            let raw = match &id {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let result = match parse_clock_id(&raw) {
                Ok(clock_id) => state.remove_clock(clock_id).await.map(|_| ()),
                Err(e) => Err(e),
            };
            Some(match result {
                Ok(()) => ServerMessage::DeleteClockResult {
                    success: true,
                    id,
                    error: None,
                },
                Err(e) => ServerMessage::DeleteClockResult {
                    success: false,
                    id,
                    error: Some(e.to_string()),
                },
            })
        }
        ClientMessage::GetCurrentTime => Some(current_time_message(state)),
    }
}

fn current_time_message(state: &AppState) -> ServerMessage {
    let offset_secs = state.config.sync.utc_offset_minutes.saturating_mul(60);
    let time = FixedOffset::east_opt(offset_secs)
        .map(|offset| Utc::now().with_timezone(&offset).to_rfc3339())
        .unwrap_or_else(|| Utc::now().to_rfc3339());

    ServerMessage::TimeUpdate {
        time,
        formatted: state.current_time(),
    }
}

/// Topics a client asked for, minus unknown names
fn known_topics(requests: &[TopicRequest]) -> Vec<Topic> {
    requests
        .iter()
        .filter_map(|request| match request {
            TopicRequest::Known(topic) => Some(*topic),
            TopicRequest::Unknown(name) => {
                tracing::warn!(topic = %name, "Unknown topic ignored");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ClockRegistry;
    use crate::config::Config;

    async fn connected_state() -> (Arc<AppState>, String, mpsc::UnboundedReceiver<ServerMessage>) {
        let mut config = Config::default();
        config.sync.reference_time = Some("15:00".to_string());
        let state = Arc::new(AppState::new(ClockRegistry::default(), config));

        let (tx, rx) = mpsc::unbounded_channel();
        let id = state.ws_hub.register(tx).await.unwrap();
        state
            .ws_hub
            .subscribe(&id, [Topic::Analysis])
            .await
            .unwrap();
        (state, id, rx)
    }

    #[tokio::test]
    async fn test_ping() {
        let (state, id, _rx) = connected_state().await;
        let reply = handle_client_message(&state, &id, ClientMessage::Ping).await;
        assert!(matches!(reply, Some(ServerMessage::Pong)));
    }

    #[tokio::test]
    async fn test_subscribe_skips_unknown_topics() {
        let (state, id, _rx) = connected_state().await;
        let message = ClientMessage::Subscribe {
            topics: vec![
                TopicRequest::Known(Topic::System),
                TopicRequest::Unknown("weather".to_string()),
            ],
        };
        match handle_client_message(&state, &id, message).await {
            Some(ServerMessage::Subscribed { topics }) => assert_eq!(topics, vec![Topic::System]),
            other => panic!("Expected Subscribed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_clock_data() {
        let (state, id, _rx) = connected_state().await;
        match handle_client_message(&state, &id, ClientMessage::GetClockData).await {
            Some(ServerMessage::ClockData { analysis }) => {
                assert_eq!(analysis.summary.total_clocks, 4);
            }
            other => panic!("Expected ClockData, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_add_clock_broadcasts_analysis() {
        let (state, id, mut rx) = connected_state().await;
        let reply = handle_client_message(
            &state,
            &id,
            ClientMessage::AddClock {
                name: "Harbour".to_string(),
                time: "14:55".to_string(),
            },
        )
        .await;

        match reply {
            Some(ServerMessage::AddClockResult {
                success: true,
                clock: Some(clock),
                ..
            }) => assert_eq!(clock.name(), "Harbour Clock"),
            other => panic!("Expected AddClockResult, got {:?}", other),
        }

        match rx.recv().await {
            Some(ServerMessage::ClockData { analysis }) => {
                assert_eq!(analysis.summary.total_clocks, 5);
            }
            other => panic!("Expected ClockData, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_add_clock_missing_fields() {
        let (state, id, _rx) = connected_state().await;
        let reply = handle_client_message(
            &state,
            &id,
            ClientMessage::AddClock {
                name: String::new(),
                time: "10:00".to_string(),
            },
        )
        .await;

        assert!(matches!(
            reply,
            Some(ServerMessage::AddClockResult { success: false, error: Some(_), .. })
        ));
        assert_eq!(state.registry.lock().await.len(), 4);
    }

    #[tokio::test]
    async fn test_update_clock_is_silent_on_success() {
        let (state, id, _rx) = connected_state().await;
        let reply = handle_client_message(
            &state,
            &id,
            ClientMessage::UpdateClock {
                id: 4,
                name: "Market".to_string(),
                time: "15:00".to_string(),
            },
        )
        .await;

        assert!(reply.is_none());
        let registry = state.registry.lock().await;
        assert_eq!(registry.get(4).unwrap().name(), "Market Clock");
    }

    #[tokio::test]
    async fn test_delete_clock_results() {
        let (state, id, _rx) = connected_state().await;

        let reply = handle_client_message(
            &state,
            &id,
            ClientMessage::DeleteClock {
                id: serde_json::json!("2"),
            },
        )
        .await;
        assert!(matches!(
            reply,
            Some(ServerMessage::DeleteClockResult { success: true, .. })
        ));

        let reply = handle_client_message(
            &state,
            &id,
            ClientMessage::DeleteClock {
                id: serde_json::json!("two"),
            },
        )
        .await;
        match reply {
            Some(ServerMessage::DeleteClockResult { success, id, error }) => {
                assert!(!success);
                assert_eq!(id, serde_json::json!("two"));
                assert!(error.is_some());
            }
            other => panic!("Expected DeleteClockResult, got {:?}", other),
        }

        let reply = handle_client_message(
            &state,
            &id,
            ClientMessage::DeleteClock {
                id: serde_json::json!(2),
            },
        )
        .await;
        assert!(matches!(
            reply,
            Some(ServerMessage::DeleteClockResult { success: false, .. })
        ));
    }

    #[tokio::test]
    async fn test_get_current_time() {
        let (state, id, _rx) = connected_state().await;
        match handle_client_message(&state, &id, ClientMessage::GetCurrentTime).await {
            Some(ServerMessage::TimeUpdate { time, .. }) => assert!(time.ends_with("+05:30")),
            other => panic!("Expected TimeUpdate, got {:?}", other),
        }
    }
}
