//! Authoritative timer hub: one `SessionTimer` per account, commands
//! serialized per account, state broadcast to every connection.

pub mod hub;
pub mod store;

pub use hub::{AccountHandle, Hub};
pub use store::{MemorySettingsStore, MemoryTaskStore};
