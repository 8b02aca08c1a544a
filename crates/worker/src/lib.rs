//! Background workers for the pomosync server.

pub mod scheduler;

pub use scheduler::{WorkerConfig, WorkerScheduler};
