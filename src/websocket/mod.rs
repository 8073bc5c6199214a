//! WebSocket Real-Time Streaming
//!
//! Pushes clock analysis to dashboard clients via WebSocket and accepts
//! clock edits from them.
//!
//! ## Architecture
//!
//! - **ConnectionHub**: Manages all active connections and subscriptions
//! - **Handler**: Handles WebSocket upgrade and message processing
//! - **Messages**: Defines client and server message formats
//!
//! ## Usage
//!
//! Clients connect to `/ws`. Every new connection is subscribed to
//! `analysis` and immediately receives a `clock_data` message. Topics:
//! - `analysis` - A fresh report after every registry change
//! - `system` - Out-of-sync alerts from the reference ticker
//!
//! ## Example
//!
//! ```javascript
//! // Browser
//! const ws = new WebSocket('ws://localhost:3000/ws');
//!
//! ws.onopen = () => {
//!   ws.send(JSON.stringify({type: 'add_clock', name: 'Harbour', time: '14:55'}));
//! };
//!
//! ws.onmessage = (event) => {
//!   const msg = JSON.parse(event.data);
//!   if (msg.type === 'clock_data') render(msg.analysis);
//! };
//! ```

mod handler;
mod hub;
mod messages;

pub use handler::websocket_handler;
pub use hub::{ConnectionHub, ConnectionId, HubConfig, HubError};
pub use messages::{ClientMessage, ServerMessage, Topic, TopicRequest, WsEvent};
