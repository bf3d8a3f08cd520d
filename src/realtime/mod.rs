//! Realtime notifications.
//!
//! Events are published on named channels: `user-{id}` for one account and
//! `admin` for every administrator. The in-process [`RealtimeHub`] fans them
//! out to WebSocket clients on `GET /ws`; when a relay is configured every
//! event is also forwarded to the hosted pub/sub service.

pub mod connection;
pub mod hub;
pub mod relay;

pub use connection::handle_socket;
pub use hub::RealtimeHub;
pub use relay::{RelayClient, RelayError};

use crate::AppState;
use crate::entities::User;
use axum::{
    Extension,
    extract::{State, ws::WebSocketUpgrade},
    response::Response,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

pub const BROADCAST_CHANNEL_CAPACITY: usize = 64;
pub const TIMEOUT_DURATION_SECONDS: u64 = 300;
pub const RATE_LIMITER_MILLIS: u64 = 100;

pub const ADMIN_CHANNEL: &str = "admin";

pub fn user_channel(user_id: i32) -> String {
    format!("user-{}", user_id)
}

/// Frame pushed to clients: `{"type": .., "data": ..}`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RealtimeEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: serde_json::Value,
}

impl RealtimeEvent {
    pub fn new(kind: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }
}

/// Publishes on the local hub and, when configured, the relay.
/// Never fails: delivery is best effort.
pub fn publish(state: &AppState, channel: &str, event: RealtimeEvent) {
    let event = Arc::new(event);
    state.hub.publish(channel, event.clone());
    if let Some(relay) = &state.relay {
        relay.forward(channel.to_string(), event);
    }
}

/// `GET /ws` - upgrades an authenticated request to a push-only WebSocket.
#[instrument(skip(ws, state, current_user), fields(user_id = current_user.user_id))]
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> Response {
    let mut channels = vec![user_channel(current_user.user_id)];
    if current_user.is_admin() {
        channels.push(ADMIN_CHANNEL.to_string());
    }
    let user_id = current_user.user_id;
    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id, channels))
}
