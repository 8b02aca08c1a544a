//! Turns user intents into protocol commands.
//!
//! Commands are refused locally while the connection is down; nothing is
//! queued for replay. Pause and resume flip the local prediction
//! immediately so the UI does not wait a round trip.

use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

use sync_protocol::ClientMessage;
use timer_core::{Error, PresetKind, Result, SessionType, TaskId};

use crate::connection::ConnectionStatus;
use crate::local::LocalTimer;

#[derive(Clone)]
pub struct CommandDispatcher {
    commands: mpsc::Sender<ClientMessage>,
    status: watch::Receiver<ConnectionStatus>,
    local: Arc<RwLock<LocalTimer>>,
}

impl CommandDispatcher {
    pub(crate) fn new(
        commands: mpsc::Sender<ClientMessage>,
        status: watch::Receiver<ConnectionStatus>,
        local: Arc<RwLock<LocalTimer>>,
    ) -> Self {
        Self {
            commands,
            status,
            local,
        }
    }

    /// Start a phase.
    pub async fn start(
        &self,
        task_id: Option<TaskId>,
        session_type: SessionType,
        duration: u64,
        preset_type: PresetKind,
    ) -> Result<()> {
        self.send(ClientMessage::Start {
            task_id,
            session_type,
            duration,
            preset_type,
        })
        .await
    }

    pub async fn pause(&self) -> Result<()> {
        self.send(ClientMessage::Pause).await?;
        self.local.write().set_paused(true);
        Ok(())
    }

    pub async fn resume(&self) -> Result<()> {
        self.send(ClientMessage::Resume).await?;
        self.local.write().set_paused(false);
        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        self.send(ClientMessage::Stop).await
    }

    pub async fn skip_to_next(&self) -> Result<()> {
        self.send(ClientMessage::SkipToNext).await
    }

    pub async fn reset_rounds(&self) -> Result<()> {
        self.send(ClientMessage::ResetRounds).await
    }

    pub async fn change_preset(&self, preset_type: PresetKind) -> Result<()> {
        self.send(ClientMessage::ChangePreset { preset_type }).await
    }

    /// Ask the server for authoritative state out of band.
    pub async fn sync_request(&self, preset_type: Option<PresetKind>) -> Result<()> {
        self.send(ClientMessage::SyncRequest { preset_type }).await
    }

    async fn send(&self, message: ClientMessage) -> Result<()> {
        if *self.status.borrow() != ConnectionStatus::Connected {
            return Err(Error::transport("not connected"));
        }
        self.commands
            .send(message)
            .await
            .map_err(|_| Error::transport("connection task stopped"))
    }
}
