//! Unified error types for pomosync.
//!
//! Error codes:
//! - CMD_001-002: Command errors
//! - AUTH_001-003: Authentication errors
//! - CONN_001-002: Connection errors

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Command error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandErrorCode {
    /// CMD_001: Semantically illegal transition for the current state
    InvalidTransition,
    /// CMD_002: Unparseable or unsupported command type
    Unknown,
}

impl CommandErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidTransition => "CMD_001",
            Self::Unknown => "CMD_002",
        }
    }
}

/// Authentication error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorCode {
    /// AUTH_001: Credential is required
    MissingToken,
    /// AUTH_002: Invalid credential format
    InvalidFormat,
    /// AUTH_003: Credential rejected at handshake
    Rejected,
}

impl AuthErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingToken => "AUTH_001",
            Self::InvalidFormat => "AUTH_002",
            Self::Rejected => "AUTH_003",
        }
    }
}

/// Connection error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnErrorCode {
    /// CONN_001: Network-level transport failure
    Transport,
    /// CONN_002: Reconnect budget exhausted, manual retry required
    Lost,
}

impl ConnErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Transport => "CONN_001",
            Self::Lost => "CONN_002",
        }
    }
}

/// Unified error type for pomosync.
#[derive(Debug, Error)]
pub enum Error {
    /// Semantically illegal transition. State is left unchanged.
    #[error("[CMD_001] invalid command: {0}")]
    InvalidCommand(String),

    /// Unparseable or unsupported command type. Dropped with a diagnostic.
    #[error("[CMD_002] unknown command: {0}")]
    UnknownCommand(String),

    /// Credential invalid at handshake. Connection refused.
    #[error("[{code}] authentication failed: {message}")]
    Authentication {
        code: &'static str,
        message: String,
    },

    /// Network-level failure. Triggers bounded reconnect.
    #[error("[CONN_001] transport error: {0}")]
    Transport(String),

    /// Reconnect attempts exhausted. Requires explicit user-triggered retry.
    #[error("[CONN_002] connection lost after {attempts} attempts")]
    ConnectionLost { attempts: u32 },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an invalid-command error.
    pub fn invalid_command(msg: impl Into<String>) -> Self {
        Self::InvalidCommand(msg.into())
    }

    /// Create an unknown-command error.
    pub fn unknown_command(msg: impl Into<String>) -> Self {
        Self::UnknownCommand(msg.into())
    }

    /// Create an authentication error.
    pub fn auth(code: AuthErrorCode, msg: impl Into<String>) -> Self {
        Self::Authentication {
            code: code.code(),
            message: msg.into(),
        }
    }

    /// Create a transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the error code if this is a coded error.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::InvalidCommand(_) => Some("CMD_001"),
            Self::UnknownCommand(_) => Some("CMD_002"),
            Self::Authentication { code, .. } => Some(code),
            Self::Transport(_) => Some("CONN_001"),
            Self::ConnectionLost { .. } => Some("CONN_002"),
            _ => None,
        }
    }

    /// Whether this error should tear down the transport.
    ///
    /// State-machine errors never crash the connection; they are reported
    /// back to the sender and the connection keeps serving.
    pub fn is_fatal_for_connection(&self) -> bool {
        matches!(
            self,
            Self::Authentication { .. } | Self::Transport(_) | Self::ConnectionLost { .. }
        )
    }
}
