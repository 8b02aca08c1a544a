//! Standardized HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub auth_healthy: bool,
    pub hub_healthy: bool,
    pub active_accounts: u64,
    pub active_connections: u64,
}

/// Error response for handshake refusals.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }

    /// Render as a response with the given status.
    pub fn into_response_with(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

impl From<&timer_core::Error> for ErrorResponse {
    fn from(err: &timer_core::Error) -> Self {
        Self {
            error: err.to_string(),
            code: err.error_code().unwrap_or("INTERNAL").to_string(),
        }
    }
}
