//! One WebSocket connection: a writer task fed by the hub and a reader task
//! watching the client.

use crate::AppState;
use crate::realtime::{RATE_LIMITER_MILLIS, RealtimeEvent, TIMEOUT_DURATION_SECONDS};
use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::time::{Duration, interval, timeout};
use tokio_stream::StreamMap;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::{error, info, instrument, warn};

/// Signals from the reader task to the writer task
#[derive(Debug)]
pub enum InternalSignal {
    Pong,
    Shutdown,
}

#[instrument(skip(ws, state, channels))]
pub async fn handle_socket(
    ws: WebSocket,
    state: Arc<AppState>,
    user_id: i32,
    channels: Vec<String>,
) {
    info!("WebSocket connection established");
    let (ws_tx, ws_rx) = ws.split();
    let (int_tx, int_rx) = unbounded_channel::<InternalSignal>();

    let mut stream_map = StreamMap::new();
    for channel in channels {
        let rx = state.hub.subscribe(&channel);
        stream_map.insert(channel, BroadcastStream::new(rx));
    }

    tokio::spawn(listen_ws(user_id, ws_rx, int_tx));
    tokio::spawn(write_ws(user_id, ws_tx, int_rx, stream_map));
}

#[instrument(skip(websocket_tx, internal_rx, stream_map))]
async fn write_ws(
    user_id: i32,
    mut websocket_tx: SplitSink<WebSocket, Message>,
    mut internal_rx: UnboundedReceiver<InternalSignal>,
    mut stream_map: StreamMap<String, BroadcastStream<Arc<RealtimeEvent>>>,
) {
    info!(channels = stream_map.len(), "Write task started");

    loop {
        tokio::select! {
            Some((channel, result)) = tokio_stream::StreamExt::next(&mut stream_map) => {
                match result {
                    Ok(event) => {
                        if send_event(&mut websocket_tx, &event).await.is_err() {
                            warn!("Failed to forward event, closing connection");
                            break;
                        }
                    }
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        warn!(channel = %channel, skipped, "Client lagging, events skipped");
                    }
                }
            }

            signal = internal_rx.recv() => {
                match signal {
                    Some(InternalSignal::Pong) => {
                        if let Err(e) = websocket_tx.send(Message::Text(Utf8Bytes::from_static("pong"))).await {
                            error!("Failed to send pong: {:?}", e);
                            break;
                        }
                    }
                    Some(InternalSignal::Shutdown) | None => {
                        info!("Reader gone, stopping writer");
                        break;
                    }
                }
            }
        }
    }

    let _ = websocket_tx.close().await;
    info!("Write task terminated");
}

async fn send_event(
    websocket_tx: &mut SplitSink<WebSocket, Message>,
    event: &RealtimeEvent,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(event).map_err(|e| {
        error!("Failed to serialize event: {:?}", e);
        axum::Error::new(e)
    })?;
    websocket_tx.send(Message::Text(Utf8Bytes::from(json))).await
}

#[instrument(skip(websocket_rx, internal_tx))]
async fn listen_ws(
    user_id: i32,
    mut websocket_rx: SplitStream<WebSocket>,
    internal_tx: UnboundedSender<InternalSignal>,
) {
    let mut rate_limiter = interval(Duration::from_millis(RATE_LIMITER_MILLIS));
    let timeout_duration = Duration::from_secs(TIMEOUT_DURATION_SECONDS);

    loop {
        match timeout(timeout_duration, StreamExt::next(&mut websocket_rx)).await {
            Ok(Some(Ok(msg))) => {
                rate_limiter.tick().await;
                match msg {
                    Message::Text(text) if text.trim().eq_ignore_ascii_case("ping") => {
                        let _ = internal_tx.send(InternalSignal::Pong);
                    }
                    Message::Close(_) => {
                        info!("Close message received");
                        break;
                    }
                    // the socket is push-only, anything else is ignored
                    _ => {}
                }
            }
            Ok(Some(Err(e))) => {
                warn!("WebSocket error: {:?}", e);
                break;
            }
            Ok(None) => {
                info!("WebSocket stream ended");
                break;
            }
            Err(_) => {
                warn!(timeout_secs = TIMEOUT_DURATION_SECONDS, "Connection timeout");
                break;
            }
        }
    }

    let _ = internal_tx.send(InternalSignal::Shutdown);
    info!("Listen task terminated");
}
