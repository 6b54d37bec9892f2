//! WebSocket Endpoint
//!
//! Clients authenticate during the handshake with either an
//! `Authorization: Bearer <token>` header or a `?token=` query parameter.
//! A rejected handshake gets HTTP 401 and is never upgraded.
//!
//! ## Protocol
//!
//! 1. Client connects with a token
//! 2. Server verifies it and registers the connection with the hub
//! 3. Server pushes presence, message, typing and notification events
//! 4. Client sends `message:send`, `message:read`, `typing:start`, `typing:stop`
//! 5. On close the connection is unregistered; the last one marks the user offline
//!
//! ## Example
//!
//! ```text
//! GET /ws?token=<jwt>
//! Upgrade: websocket
//! ```

use crate::auth::AuthConfig;
use crate::events::ServerEvent;
use crate::hub::{DeliveryHub, Session};
use crate::telemetry::metrics::with_metrics;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
};
use futures_util::{stream::SplitSink, SinkExt, Stream, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, warn};

/// WebSocket state shared across the application.
#[derive(Clone)]
pub struct WsState {
    pub hub: DeliveryHub,
    pub auth_config: Arc<AuthConfig>,
}

impl WsState {
    pub fn new(hub: DeliveryHub, auth_config: Arc<AuthConfig>) -> Self {
        Self { hub, auth_config }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

fn handshake_token<'a>(headers: &'a HeaderMap, query: &'a WsQuery) -> Option<&'a str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .or(query.token.as_deref())
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<WsState>>,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
) -> Response {
    let token = handshake_token(&headers, &query);
    let session = match Session::authenticate(&state.auth_config, token) {
        Ok(session) => session,
        Err(err) => return err.into_response(),
    };

    info!(
        user_id = %session.user_id(),
        connection = %session.id(),
        "WebSocket connection request"
    );

    let hub = state.hub.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, hub, session))
}

/// Run one connection until either side closes it.
async fn handle_socket(socket: WebSocket, hub: DeliveryHub, mut session: Session) {
    with_metrics(|m| m.ws_connected());
    let (mut sender, receiver) = socket.split();

    // Subscribe before registering so the client sees its own arrival.
    let mut presence_rx = hub.subscribe_presence();
    let mut outbound = match hub.activate(&mut session) {
        Ok(rx) => rx,
        Err(e) => {
            error!(connection = %session.id(), error = %e, "Failed to activate session");
            with_metrics(|m| m.ws_disconnected());
            return;
        }
    };

    // Client frames are handled in order, one at a time.
    let (stop_tx, stop_rx) = watch::channel(false);
    let mut recv_task = tokio::spawn(read_frames(receiver, hub.clone(), session.clone(), stop_rx));
    let mut recv_finished = false;

    loop {
        tokio::select! {
            Some(event) = outbound.recv() => {
                if let Err(e) = send_event(&mut sender, &event).await {
                    error!(
                        connection = %session.id(),
                        error = %e,
                        "Failed to send event, closing connection"
                    );
                    break;
                }
            }
            result = presence_rx.recv() => {
                match result {
                    Ok(event) => {
                        if let Err(e) = send_event(&mut sender, &event).await {
                            error!(
                                connection = %session.id(),
                                error = %e,
                                "Failed to send presence event"
                            );
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(connection = %session.id(), skipped, "Presence subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!(connection = %session.id(), "Presence channel closed");
                        break;
                    }
                }
            }
            _ = &mut recv_task => {
                recv_finished = true;
                debug!(connection = %session.id(), "Receive task completed");
                break;
            }
        }
    }

    // Stop taking new frames but let the one in flight finish.
    if !recv_finished {
        let _ = stop_tx.send(true);
        if let Err(e) = recv_task.await {
            warn!(connection = %session.id(), error = %e, "Receive task failed");
        }
    }

    hub.disconnect(&mut session);
    let _ = sender.close().await;
    with_metrics(|m| m.ws_disconnected());
    info!(
        user_id = %session.user_id(),
        connection = %session.id(),
        "WebSocket disconnected"
    );
}

/// Hand client frames to the hub in arrival order until the client goes
/// away or `stop` fires. `stop` is only checked between frames.
async fn read_frames<S>(
    mut frames: S,
    hub: DeliveryHub,
    session: Session,
    mut stop: watch::Receiver<bool>,
) where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    loop {
        let msg = tokio::select! {
            biased;
            _ = stop.changed() => {
                debug!(connection = %session.id(), "Stopped reading client frames");
                break;
            }
            next = frames.next() => match next {
                Some(msg) => msg,
                None => break,
            },
        };
        match msg {
            Ok(Message::Text(text)) => hub.handle_frame(&session, &text).await,
            Ok(Message::Close(_)) => {
                debug!(connection = %session.id(), "Client sent close frame");
                break;
            }
            Ok(Message::Binary(data)) => {
                debug!(
                    connection = %session.id(),
                    len = data.len(),
                    "Received binary message (ignored)"
                );
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Err(e) => {
                warn!(connection = %session.id(), error = %e, "WebSocket receive error");
                break;
            }
        }
    }
}

async fn send_event(
    sender: &mut SplitSink<WebSocket, Message>,
    event: &ServerEvent,
) -> Result<(), axum::Error> {
    let json = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(e) => {
            error!(event_type = event.event_type(), error = %e, "Failed to serialize event");
            return Ok(());
        }
    };
    sender.send(Message::Text(json)).await
}
