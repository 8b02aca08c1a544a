//! Internal metrics collection.
//!
//! Collected in-memory and periodically logged by the background scheduler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn reset(&self) -> u64 {
        self.0.swap(0, Ordering::Relaxed)
    }
}

/// A gauge metric (can go up or down).
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Collected metrics for the sync server.
#[derive(Debug, Default)]
pub struct Metrics {
    // Connection lifecycle
    pub connections_opened: Counter,
    pub connections_closed: Counter,
    pub auth_rejections: Counter,

    // Command path
    pub commands_received: Counter,
    pub commands_applied: Counter,
    pub commands_rejected: Counter,
    pub parse_errors: Counter,

    // Timer lifecycle
    pub syncs_broadcast: Counter,
    pub phases_completed: Counter,
    pub work_sessions_completed: Counter,

    // Gauges
    pub active_connections: Gauge,
    pub active_accounts: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub connections_opened: u64,
    pub connections_closed: u64,
    pub auth_rejections: u64,
    pub commands_received: u64,
    pub commands_applied: u64,
    pub commands_rejected: u64,
    pub parse_errors: u64,
    pub syncs_broadcast: u64,
    pub phases_completed: u64,
    pub work_sessions_completed: u64,
    pub active_connections: u64,
    pub active_accounts: u64,
}

impl Metrics {
    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            connections_opened: self.connections_opened.get(),
            connections_closed: self.connections_closed.get(),
            auth_rejections: self.auth_rejections.get(),
            commands_received: self.commands_received.get(),
            commands_applied: self.commands_applied.get(),
            commands_rejected: self.commands_rejected.get(),
            parse_errors: self.parse_errors.get(),
            syncs_broadcast: self.syncs_broadcast.get(),
            phases_completed: self.phases_completed.get(),
            work_sessions_completed: self.work_sessions_completed.get(),
            active_connections: self.active_connections.get(),
            active_accounts: self.active_accounts.get(),
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
