//! Client configuration.

use std::time::Duration;
use timer_core::{
    limits::{MAX_RECONNECT_ATTEMPTS, RECONNECT_INTERVAL_MS, SYNC_INTERVAL_SECS},
    Error, PresetKind, Result,
};
use url::Url;

/// Configuration for a [`SyncClient`](crate::SyncClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server base URL (e.g., "ws://localhost:8080").
    pub server_url: String,
    /// Bearer token for the handshake.
    pub token: String,
    /// Preset hint sent with sync requests.
    pub preset: Option<PresetKind>,
    /// Interval between periodic `sync_request` polls.
    pub sync_interval: Duration,
    /// Fixed delay between reconnect attempts.
    pub reconnect_interval: Duration,
    /// Reconnect attempts before giving up and requiring a manual retry.
    pub max_reconnect_attempts: u32,
}

impl ClientConfig {
    pub fn new(server_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            token: token.into(),
            preset: None,
            sync_interval: Duration::from_secs(SYNC_INTERVAL_SECS),
            reconnect_interval: Duration::from_millis(RECONNECT_INTERVAL_MS),
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
        }
    }

    pub fn with_preset(mut self, preset: PresetKind) -> Self {
        self.preset = Some(preset);
        self
    }

    /// The full WebSocket URL including the credential.
    pub fn ws_url(&self) -> Result<Url> {
        let base = format!("{}/ws/pomodoro", self.server_url.trim_end_matches('/'));
        let mut url = Url::parse(&base)
            .map_err(|e| Error::transport(format!("invalid server url: {}", e)))?;
        url.query_pairs_mut().append_pair("token", &self.token);
        if let Some(preset) = self.preset {
            url.query_pairs_mut()
                .append_pair("preset", preset.as_str());
        }
        Ok(url)
    }
}
