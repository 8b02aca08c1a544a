//! Protocol constants and bounds for pomosync.
//!
//! The sync and reconnect constants mirror the shipped client behavior:
//! clients bound the staleness of their local prediction with a fixed
//! one-second `sync_request` poll, and recover dropped connections with a
//! fixed-interval, bounded-attempt reconnect (not exponential).

// === Sync cadence ===

/// Interval between periodic `sync_request` polls from a connected client.
pub const SYNC_INTERVAL_SECS: u64 = 1;

/// Interval of the server-side wall-clock evaluation over account timers.
pub const TICK_INTERVAL_SECS: u64 = 1;

// === Reconnect budget ===

/// Fixed delay between reconnect attempts (milliseconds).
pub const RECONNECT_INTERVAL_MS: u64 = 2000;

/// Attempts before the connection is declared lost and manual retry is
/// required.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

// === Message bounds ===

/// Maximum inbound frame size in bytes. Command frames are tiny; anything
/// larger is dropped as malformed.
pub const MAX_MESSAGE_BYTES: usize = 16 * 1024;

// === Credential format ===

/// Bearer token pattern accepted at the handshake. Opaque tokens issued by
/// the auth collaborator: URL-safe, 16 to 512 chars.
pub const TOKEN_PATTERN: &str = r"^[A-Za-z0-9_\-\.]{16,512}$";

// === Preset bounds (minutes) ===

/// Longest phase duration a preset may configure.
pub const MAX_PHASE_MINUTES: u32 = 240;
