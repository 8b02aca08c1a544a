//! Locally predicted timer state.
//!
//! The server is authoritative; between `timer_sync` frames the client
//! counts down from the last received state against its own wall clock.
//! Every arriving sync overwrites the prediction wholesale, so the last
//! arrival always wins.

use std::time::Instant;
use sync_protocol::TimerSyncData;

/// The last authoritative state plus the instant it arrived.
#[derive(Debug, Clone)]
pub struct LocalTimer {
    last: Option<(TimerSyncData, Instant)>,
}

impl LocalTimer {
    pub fn new() -> Self {
        Self { last: None }
    }

    /// Overwrite the prediction with a freshly received sync.
    pub fn apply_sync(&mut self, data: TimerSyncData) {
        self.last = Some((data, Instant::now()));
    }

    /// Mark the timer paused or running without waiting for the next sync.
    /// The server's next `timer_sync` corrects any misprediction.
    pub fn set_paused(&mut self, paused: bool) {
        if let Some((data, received)) = &mut self.last {
            if !paused {
                // restart the countdown from now
                *received = Instant::now();
            } else if !data.is_paused {
                // freeze the countdown at its predicted value
                data.remaining_time = predict(data.remaining_time, received.elapsed().as_secs_f64());
            }
            data.is_paused = paused;
        }
    }

    /// Drop the prediction entirely (e.g., after `connection lost`).
    pub fn clear(&mut self) {
        self.last = None;
    }

    /// Whether any authoritative state has arrived yet.
    pub fn is_synced(&self) -> bool {
        self.last.is_some()
    }

    /// Current predicted state, counting down while running.
    pub fn snapshot(&self) -> Option<TimerSyncData> {
        self.last.as_ref().map(|(data, received)| {
            let mut predicted = data.clone();
            if !predicted.is_paused {
                predicted.remaining_time =
                    predict(predicted.remaining_time, received.elapsed().as_secs_f64());
            }
            predicted
        })
    }
}

impl Default for LocalTimer {
    fn default() -> Self {
        Self::new()
    }
}

fn predict(remaining: u64, elapsed_secs: f64) -> u64 {
    (remaining as f64 - elapsed_secs).max(0.0).round() as u64
}
