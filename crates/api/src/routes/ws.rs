//! WebSocket endpoint.
//!
//! Auth happens at the handshake: a bad or missing token is refused with
//! 401 before the upgrade. After the upgrade the connection attaches to
//! its account's timer, mirrors every broadcast, and feeds client
//! commands into the hub. Rejections go back as `error` frames on the
//! issuing connection only and never close the socket.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use sync_hub::AccountHandle;
use sync_protocol::{ClientMessage, ServerMessage};
use telemetry::metrics;
use timer_core::{limits::MAX_MESSAGE_BYTES, AuthErrorCode, BearerToken, Error, PresetKind};

use crate::response::ErrorResponse;
use crate::state::AppState;

/// Query parameters for the WebSocket handshake.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Bearer token identifying the account.
    pub token: Option<String>,
    /// Preset hint applied only when this connection creates the timer.
    pub preset: Option<PresetKind>,
}

/// Messages that can be sent through the WebSocket.
enum OutboundMessage {
    /// JSON-serialized ServerMessage
    Json(ServerMessage),
    /// Raw pong response
    Pong(Vec<u8>),
}

/// GET /ws/pomodoro - WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    let account = match authenticate(&state, query.token.as_deref()).await {
        Ok(account) => account,
        Err(err) => {
            metrics().auth_rejections.inc();
            warn!(error = %err, "Refusing WebSocket handshake");
            return ErrorResponse::from(&err).into_response_with(StatusCode::UNAUTHORIZED);
        }
    };

    ws.max_message_size(MAX_MESSAGE_BYTES)
        .on_upgrade(move |socket| handle_socket(socket, state, account, query.preset))
        .into_response()
}

/// Validate the handshake credential and resolve its account.
async fn authenticate(state: &AppState, token: Option<&str>) -> Result<String, Error> {
    let raw = token
        .ok_or_else(|| Error::auth(AuthErrorCode::MissingToken, "token query parameter required"))?;
    let token = BearerToken::parse(raw)?;
    state.auth_client.verify(&token).await
}

/// Drive one authenticated connection for its lifetime.
async fn handle_socket(
    socket: WebSocket,
    state: AppState,
    account: String,
    preset_hint: Option<PresetKind>,
) {
    let connection_id = Uuid::new_v4();
    info!(%connection_id, account = %account, "WebSocket connection opened");

    let handle = match state.hub.attach(&account, preset_hint).await {
        Ok(handle) => handle,
        Err(err) => {
            warn!(%connection_id, error = %err, "Failed to attach connection");
            return;
        }
    };

    metrics().connections_opened.inc();
    metrics().active_connections.inc();
    metrics().active_accounts.set(state.hub.account_count() as u64);

    // Subscribe before processing any command so this connection sees the
    // broadcasts its own commands produce.
    let broadcast_rx = handle.subscribe();

    let (mut ws_tx, mut ws_rx) = socket.split();

    // Channel for sending messages to this client (JSON and raw frames)
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<OutboundMessage>(100);

    // Forward outbound messages to the socket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            let result = match msg {
                OutboundMessage::Json(server_msg) => match serde_json::to_string(&server_msg) {
                    Ok(json) => ws_tx.send(Message::Text(json)).await,
                    Err(e) => {
                        warn!("Failed to serialize message: {}", e);
                        continue;
                    }
                },
                OutboundMessage::Pong(data) => ws_tx.send(Message::Pong(data)).await,
            };

            if result.is_err() {
                debug!("WebSocket send failed, client disconnected");
                break;
            }
        }
    });

    // Mirror account broadcasts onto this connection
    let forward_tx = outbound_tx.clone();
    let forward_task = tokio::spawn(async move {
        let mut rx = broadcast_rx;
        loop {
            match rx.recv().await {
                Ok(msg) => {
                    if forward_tx.send(OutboundMessage::Json(msg)).await.is_err() {
                        break;
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    // the next timer_sync carries full state, nothing is lost
                    warn!(skipped, "Connection lagged behind broadcasts");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Handle incoming frames
    while let Some(result) = ws_rx.next().await {
        let text = match result {
            Ok(Message::Text(text)) => text,
            Ok(Message::Ping(data)) => {
                let _ = outbound_tx.send(OutboundMessage::Pong(data)).await;
                continue;
            }
            Ok(Message::Close(_)) => {
                debug!(%connection_id, "Client sent close frame");
                break;
            }
            Ok(_) => continue,
            Err(e) => {
                warn!(%connection_id, "WebSocket error: {}", e);
                break;
            }
        };

        let message = match ClientMessage::parse(&text) {
            Ok(message) => message,
            Err(err) => {
                metrics().parse_errors.inc();
                warn!(%connection_id, error = %err, "Dropping malformed frame");
                send_error(&outbound_tx, &err).await;
                continue;
            }
        };

        metrics().commands_received.inc();
        match state.hub.handle_message(&handle, message).await {
            Ok(()) => metrics().commands_applied.inc(),
            Err(err) => {
                metrics().commands_rejected.inc();
                debug!(%connection_id, error = %err, "Command rejected");
                send_error(&outbound_tx, &err).await;
                if err.is_fatal_for_connection() {
                    warn!(%connection_id, error = %err, "Closing connection");
                    break;
                }
            }
        }
    }

    cleanup(&state, &handle, connection_id);
    forward_task.abort();
    send_task.abort();
}

/// Send an error frame to this connection only.
async fn send_error(tx: &mpsc::Sender<OutboundMessage>, err: &Error) {
    let _ = tx
        .send(OutboundMessage::Json(ServerMessage::from_error(err)))
        .await;
}

fn cleanup(state: &AppState, handle: &Arc<AccountHandle>, connection_id: Uuid) {
    state.hub.detach(handle);
    metrics().connections_closed.inc();
    metrics().active_connections.dec();
    info!(%connection_id, account = %handle.account(), "WebSocket connection closed");
}
