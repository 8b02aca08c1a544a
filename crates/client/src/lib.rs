//! WebSocket client for pomosync.
//!
//! Connects to the server's `/ws/pomodoro` endpoint, keeps a locally
//! predicted copy of the authoritative timer, and reconnects on a fixed
//! interval until its attempt budget runs out.

pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod local;

pub use config::ClientConfig;
pub use connection::{ClientEvent, ConnectionStatus, SyncClient};
pub use dispatcher::CommandDispatcher;
pub use local::LocalTimer;
