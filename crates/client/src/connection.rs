//! Connection lifecycle: connect, sync poll, reconnect, give up.

use futures::{SinkExt, StreamExt};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite};
use tracing::{debug, info, warn};

use sync_protocol::{ClientMessage, ServerMessage};
use timer_core::{AuthErrorCode, Error, Result};

use crate::config::ClientConfig;
use crate::dispatcher::CommandDispatcher;
use crate::local::LocalTimer;

/// Capacity of the outbound command channel.
const COMMAND_BUFFER: usize = 32;

/// Capacity of the event channel surfaced to the caller.
const EVENT_BUFFER: usize = 64;

/// Where the connection currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Attempting the initial connection.
    Connecting,
    /// Connected and synced.
    Connected,
    /// Connection dropped, automatic reconnect in progress.
    Reconnecting { attempt: u32 },
    /// Reconnect budget exhausted or credential rejected. Requires
    /// [`SyncClient::retry`].
    Lost,
}

/// Events surfaced to the embedding application.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// Handshake completed, initial sync requested.
    Connected,
    /// A server frame arrived (syncs already applied to the local timer).
    Message(ServerMessage),
    /// The socket dropped; reconnect is starting.
    Disconnected,
    /// The credential was rejected at the handshake. Not retried
    /// automatically.
    AuthRejected { code: &'static str, message: String },
    /// All reconnect attempts failed. Waiting for a manual retry.
    ConnectionLost { attempts: u32 },
}

/// Handle to a running client connection.
///
/// Dropping the handle tears the connection down.
pub struct SyncClient {
    commands: mpsc::Sender<ClientMessage>,
    status: watch::Receiver<ConnectionStatus>,
    retry: Arc<Notify>,
    local: Arc<RwLock<LocalTimer>>,
    task: JoinHandle<()>,
}

impl SyncClient {
    /// Spawn the connection loop. Events stream out on the returned
    /// receiver; commands go in through [`dispatcher`](Self::dispatcher).
    pub fn connect(config: ClientConfig) -> (Self, mpsc::Receiver<ClientEvent>) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Connecting);
        let retry = Arc::new(Notify::new());
        let local = Arc::new(RwLock::new(LocalTimer::new()));

        let task = tokio::spawn(run(
            config,
            command_rx,
            event_tx,
            status_tx,
            retry.clone(),
            local.clone(),
        ));

        let client = Self {
            commands: command_tx,
            status: status_rx,
            retry,
            local,
            task,
        };
        (client, event_rx)
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    /// A dispatcher that turns user intents into protocol commands.
    pub fn dispatcher(&self) -> CommandDispatcher {
        CommandDispatcher::new(self.commands.clone(), self.status.clone(), self.local.clone())
    }

    /// Restart the reconnect loop after the budget was exhausted.
    pub fn retry(&self) {
        self.retry.notify_one();
    }

    /// Current locally predicted timer state, if any sync has arrived.
    pub fn local_snapshot(&self) -> Option<sync_protocol::TimerSyncData> {
        self.local.read().snapshot()
    }

    /// Wait for the status to change and return the new value.
    pub async fn status_changed(&mut self) -> Result<ConnectionStatus> {
        self.status
            .changed()
            .await
            .map_err(|_| Error::transport("connection task stopped"))?;
        Ok(*self.status.borrow())
    }
}

impl Drop for SyncClient {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// The connection loop. Runs until the command channel closes (client
/// dropped) or the credential is rejected.
async fn run(
    config: ClientConfig,
    mut command_rx: mpsc::Receiver<ClientMessage>,
    event_tx: mpsc::Sender<ClientEvent>,
    status_tx: watch::Sender<ConnectionStatus>,
    retry: Arc<Notify>,
    local: Arc<RwLock<LocalTimer>>,
) {
    let url = match config.ws_url() {
        Ok(url) => url,
        Err(err) => {
            warn!(error = %err, "Refusing to start with an invalid URL");
            status_tx.send_replace(ConnectionStatus::Lost);
            return;
        }
    };

    let mut attempt: u32 = 0;
    loop {
        let ws = match connect_async(url.as_str()).await {
            Ok((ws, _)) => ws,
            Err(err) => {
                if let Some((code, message)) = auth_rejection(&err) {
                    warn!(code, "Credential rejected at handshake");
                    status_tx.send_replace(ConnectionStatus::Lost);
                    let _ = event_tx
                        .send(ClientEvent::AuthRejected { code, message })
                        .await;
                    // a new token means a new client; nothing to retry with
                    return;
                }

                attempt += 1;
                warn!(attempt, error = %err, "Connect attempt failed");
                if attempt >= config.max_reconnect_attempts {
                    status_tx.send_replace(ConnectionStatus::Lost);
                    local.write().clear();
                    let _ = event_tx
                        .send(ClientEvent::ConnectionLost { attempts: attempt })
                        .await;
                    retry.notified().await;
                    info!("Manual retry requested");
                    attempt = 0;
                    status_tx.send_replace(ConnectionStatus::Connecting);
                    continue;
                }

                status_tx.send_replace(ConnectionStatus::Reconnecting { attempt });
                tokio::time::sleep(config.reconnect_interval).await;
                continue;
            }
        };

        attempt = 0;
        status_tx.send_replace(ConnectionStatus::Connected);
        info!("Connected to sync server");
        let _ = event_tx.send(ClientEvent::Connected).await;

        let closed = serve_session(&config, ws, &mut command_rx, &event_tx, &local).await;
        if closed {
            // command channel gone: the client handle was dropped
            return;
        }

        let _ = event_tx.send(ClientEvent::Disconnected).await;
        status_tx.send_replace(ConnectionStatus::Reconnecting { attempt: 0 });
        tokio::time::sleep(config.reconnect_interval).await;
    }
}

/// Drive one connected session. Returns true when the command channel
/// closed and the loop should stop for good.
async fn serve_session(
    config: &ClientConfig,
    mut ws: tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
    command_rx: &mut mpsc::Receiver<ClientMessage>,
    event_tx: &mpsc::Sender<ClientEvent>,
    local: &Arc<RwLock<LocalTimer>>,
) -> bool {
    // ask for authoritative state right away
    if send_command(&mut ws, &sync_request(config)).await.is_err() {
        return false;
    }

    let mut sync_tick = tokio::time::interval(config.sync_interval);
    sync_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    sync_tick.reset();

    loop {
        tokio::select! {
            command = command_rx.recv() => {
                let Some(command) = command else {
                    let _ = ws.close(None).await;
                    return true;
                };
                if send_command(&mut ws, &command).await.is_err() {
                    return false;
                }
            }
            _ = sync_tick.tick() => {
                if send_command(&mut ws, &sync_request(config)).await.is_err() {
                    return false;
                }
            }
            frame = ws.next() => {
                match frame {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        handle_frame(&text, event_tx, local).await;
                    }
                    Some(Ok(tungstenite::Message::Ping(_))) | Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(error = %err, "WebSocket error");
                        return false;
                    }
                    None => {
                        debug!("Server closed the connection");
                        return false;
                    }
                }
            }
        }
    }
}

/// Parse and surface one inbound frame. Malformed frames are dropped; a
/// bad frame never takes the connection down.
async fn handle_frame(
    text: &str,
    event_tx: &mpsc::Sender<ClientEvent>,
    local: &Arc<RwLock<LocalTimer>>,
) {
    let message: ServerMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(err) => {
            warn!(error = %err, "Dropping malformed server frame");
            return;
        }
    };

    if let ServerMessage::TimerSync { data } = &message {
        local.write().apply_sync(data.clone());
    }

    let _ = event_tx.send(ClientEvent::Message(message)).await;
}

async fn send_command(
    ws: &mut tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
    command: &ClientMessage,
) -> Result<()> {
    let json = serde_json::to_string(command)?;
    ws.send(tungstenite::Message::Text(json))
        .await
        .map_err(|e| Error::transport(e.to_string()))
}

fn sync_request(config: &ClientConfig) -> ClientMessage {
    ClientMessage::SyncRequest {
        preset_type: config.preset,
    }
}

/// Distinguish a handshake credential rejection from a transport failure.
fn auth_rejection(err: &tungstenite::Error) -> Option<(&'static str, String)> {
    if let tungstenite::Error::Http(response) = err {
        let status = response.status();
        if status == tungstenite::http::StatusCode::UNAUTHORIZED {
            let message = response
                .body()
                .as_deref()
                .map(|b| String::from_utf8_lossy(b).into_owned())
                .unwrap_or_else(|| "credential rejected".to_string());
            return Some((AuthErrorCode::Rejected.code(), message));
        }
    }
    None
}
