//! Internal telemetry for pomosync.
//!
//! No external metrics system: counters live in-process and are logged
//! periodically by the scheduler.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
