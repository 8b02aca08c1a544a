//! Worker scheduler for background tasks.
//!
//! The tick worker is the authoritative clock: it settles every account
//! timer against wall time once a second, so phases complete even when no
//! client is connected or sending commands.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::info;

use sync_hub::Hub;
use telemetry::metrics;
use timer_core::limits::TICK_INTERVAL_SECS;

/// Worker scheduler configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Wall-clock evaluation interval for account timers
    pub tick_interval: Duration,
    /// Metrics log interval
    pub metrics_log_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(TICK_INTERVAL_SECS),
            metrics_log_interval: Duration::from_secs(60), // 1 minute
        }
    }
}

/// Background worker scheduler.
pub struct WorkerScheduler {
    config: WorkerConfig,
    hub: Arc<Hub>,
}

impl WorkerScheduler {
    pub fn new(config: WorkerConfig, hub: Arc<Hub>) -> Self {
        Self { config, hub }
    }

    /// Starts all background workers.
    pub fn start(self: Arc<Self>) -> Vec<tokio::task::JoinHandle<()>> {
        let mut handles = Vec::new();

        // Tick worker (timer completion + sync broadcast)
        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_tick_worker().await;
        }));

        // Metrics log worker
        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_metrics_log().await;
        }));

        info!("Background workers started");
        handles
    }

    async fn run_tick_worker(&self) {
        let mut ticker = interval(self.config.tick_interval);

        loop {
            ticker.tick().await;
            self.hub.tick_all().await;
        }
    }

    async fn run_metrics_log(&self) {
        let mut ticker = interval(self.config.metrics_log_interval);

        loop {
            ticker.tick().await;

            let snapshot = metrics().snapshot();
            info!(
                active_accounts = self.hub.account_count(),
                active_connections = snapshot.active_connections,
                commands_applied = snapshot.commands_applied,
                commands_rejected = snapshot.commands_rejected,
                parse_errors = snapshot.parse_errors,
                syncs_broadcast = snapshot.syncs_broadcast,
                phases_completed = snapshot.phases_completed,
                work_sessions_completed = snapshot.work_sessions_completed,
                "Metrics snapshot"
            );
        }
    }
}
