//! Typed message variants for the sync protocol.

use serde::{Deserialize, Serialize};

use timer_core::{
    Error, PresetKind, Result, SessionType, Task, TaskId, TimerSnapshot,
};

/// Message kinds a client may send. One variant per user intent plus the
/// periodic `sync_request` poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Start {
        task_id: Option<TaskId>,
        session_type: SessionType,
        /// Seconds for the phase being started.
        duration: u64,
        #[serde(default)]
        preset_type: PresetKind,
    },
    Pause,
    Resume,
    Stop,
    SkipToNext,
    ResetRounds,
    SyncRequest {
        /// Optional hint that seeds the preset of a lazily created timer.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        preset_type: Option<PresetKind>,
    },
    ChangePreset {
        preset_type: PresetKind,
    },
}

impl ClientMessage {
    /// Wire name of this message kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Stop => "stop",
            Self::SkipToNext => "skip_to_next",
            Self::ResetRounds => "reset_rounds",
            Self::SyncRequest { .. } => "sync_request",
            Self::ChangePreset { .. } => "change_preset",
        }
    }

    const KNOWN_KINDS: [&'static str; 8] = [
        "start",
        "pause",
        "resume",
        "stop",
        "skip_to_next",
        "reset_rounds",
        "sync_request",
        "change_preset",
    ];

    /// Parse an inbound frame.
    ///
    /// Unsupported `type` values are `UnknownCommand`; a known type with a
    /// malformed payload is `InvalidCommand`. Both leave state untouched.
    pub fn parse(text: &str) -> Result<Self> {
        match serde_json::from_str::<Self>(text) {
            Ok(msg) => Ok(msg),
            Err(err) => {
                if let Ok(value) = serde_json::from_str::<serde_json::Value>(text) {
                    if let Some(kind) = value.get("type").and_then(|t| t.as_str()) {
                        if Self::KNOWN_KINDS.contains(&kind) {
                            return Err(Error::invalid_command(format!(
                                "malformed {kind} payload: {err}"
                            )));
                        }
                        return Err(Error::unknown_command(kind));
                    }
                    return Err(Error::unknown_command("frame has no type field"));
                }
                Err(Error::unknown_command(format!("unparseable frame: {err}")))
            }
        }
    }
}

/// Full timer state carried by a `timer_sync` broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerSyncData {
    pub task_id: Option<TaskId>,
    pub session_type: SessionType,
    /// Whole seconds left in the current phase.
    pub remaining_time: u64,
    pub is_paused: bool,
    pub round_number: u32,
    pub active_task: Option<Task>,
    pub preset_type: PresetKind,
}

impl TimerSyncData {
    /// Build sync data from a machine snapshot plus the resolved task.
    pub fn from_snapshot(snapshot: TimerSnapshot, active_task: Option<Task>) -> Self {
        Self {
            task_id: snapshot.task_id,
            session_type: snapshot.session_type,
            remaining_time: snapshot.remaining_time,
            is_paused: snapshot.is_paused,
            round_number: snapshot.round_number,
            active_task,
            preset_type: snapshot.preset_type,
        }
    }
}

/// Message kinds the server broadcasts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Authoritative state snapshot. Overwrites any client prediction.
    TimerSync { data: TimerSyncData },
    SessionStarted,
    SessionPaused,
    SessionEnded,
    RoundsReset,
    TimerStopped,
    /// Command rejection surfaced to the sender.
    Error { code: String, message: String },
}

impl ServerMessage {
    /// Build an error frame from a core error.
    pub fn from_error(err: &Error) -> Self {
        Self::Error {
            code: err.error_code().unwrap_or("INTERNAL").to_string(),
            message: err.to_string(),
        }
    }
}
