//! Authentication types and bearer-token validation.
//!
//! Credentials are issued by the external auth collaborator and passed as a
//! connection query parameter at the WebSocket handshake. This module only
//! validates format and carries the verify request/response types; actual
//! verification happens against the auth service.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::error::{AuthErrorCode, Error, Result};
use crate::limits::TOKEN_PATTERN;

/// Compiled token regex (lazy initialization).
static TOKEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(TOKEN_PATTERN).expect("invalid token pattern"));

/// Account identifier issued by the auth service.
pub type AccountId = String;

/// Format-validated bearer token from a handshake.
#[derive(Debug, Clone)]
pub struct BearerToken {
    raw: String,
}

impl BearerToken {
    /// Parse and format-validate a bearer token.
    pub fn parse(token: &str) -> Result<Self> {
        if token.is_empty() {
            return Err(Error::auth(
                AuthErrorCode::MissingToken,
                "credential is required",
            ));
        }
        if !TOKEN_REGEX.is_match(token) {
            return Err(Error::auth(
                AuthErrorCode::InvalidFormat,
                "invalid credential format",
            ));
        }
        Ok(Self {
            raw: token.to_string(),
        })
    }

    /// Get the raw token string.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Request to the auth service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyRequest {
    /// The credential to verify.
    pub token: String,
}

impl VerifyRequest {
    pub fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
        }
    }
}

/// Verification response from the auth service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResponse {
    /// Whether the credential is valid.
    pub valid: bool,
    /// Account the credential belongs to.
    pub account_id: Option<AccountId>,
    /// Error details if invalid.
    pub error: Option<String>,
}

impl VerifyResponse {
    /// Check verification succeeded and extract the account id.
    pub fn account_id(&self) -> Result<&str> {
        if !self.valid {
            let msg = self.error.as_deref().unwrap_or("credential rejected");
            return Err(Error::auth(AuthErrorCode::Rejected, msg));
        }
        self.account_id
            .as_deref()
            .ok_or_else(|| Error::auth(AuthErrorCode::Rejected, "missing account id in response"))
    }
}
