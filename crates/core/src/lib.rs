//! Core types, presets, and the session state machine for pomosync.

pub mod auth;
pub mod error;
pub mod limits;
pub mod preset;
pub mod session;
pub mod settings;
pub mod task;

pub use auth::*;
pub use error::{AuthErrorCode, CommandErrorCode, ConnErrorCode, Error, Result};
pub use preset::*;
pub use session::*;
pub use settings::*;
pub use task::*;
