//! Application state shared across handlers.

use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use sync_hub::Hub;
use timer_core::{AccountId, AuthErrorCode, BearerToken, Error, VerifyRequest, VerifyResponse};
use tracing::{debug, warn};

/// Cache TTL for auth responses (30 seconds).
const AUTH_CACHE_TTL: Duration = Duration::from_secs(30);

/// Maximum cache entries.
const AUTH_CACHE_MAX_CAPACITY: u64 = 10_000;

/// Auth service client.
///
/// Calls the account service's `/internal/auth/verify` endpoint.
/// Caches responses for 30 seconds to reduce load on the auth service.
#[derive(Clone)]
pub struct AuthClient {
    /// Auth service URL (e.g., "http://auth-service:8080")
    base_url: String,
    /// HTTP client
    http_client: reqwest::Client,
    /// Auth response cache (token -> VerifyResponse)
    cache: Cache<String, VerifyResponse>,
    /// Whether to use mock mode (for testing)
    mock_mode: bool,
}

impl AuthClient {
    /// Creates a new auth client.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let mock_mode = base_url.is_empty() || base_url == "mock";

        Self {
            base_url,
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(5))
                .build()
                .expect("Failed to create HTTP client"),
            cache: Cache::builder()
                .max_capacity(AUTH_CACHE_MAX_CAPACITY)
                .time_to_live(AUTH_CACHE_TTL)
                .build(),
            mock_mode,
        }
    }

    /// Verify a bearer token and resolve the owning account.
    ///
    /// Returns cached response if available, otherwise calls the auth service.
    pub async fn verify(&self, token: &BearerToken) -> Result<AccountId, Error> {
        let cache_key = token.as_str().to_string();

        // Check cache first
        if let Some(cached) = self.cache.get(&cache_key).await {
            debug!("Auth cache hit");
            return Ok(cached.account_id()?.to_string());
        }

        // Get response (mock or real)
        let response = if self.mock_mode {
            self.mock_verify(token)
        } else {
            self.remote_verify(token).await?
        };

        // Cache the response
        self.cache.insert(cache_key, response.clone()).await;

        Ok(response.account_id()?.to_string())
    }

    /// Call the remote auth service.
    async fn remote_verify(&self, token: &BearerToken) -> Result<VerifyResponse, Error> {
        let url = format!("{}/internal/auth/verify", self.base_url);
        let request = VerifyRequest::new(token.as_str());

        debug!(url = %url, "Calling auth service");

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Auth service request failed");
                Error::internal(format!("Auth service unavailable: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Auth service returned error");
            return Err(Error::auth(
                AuthErrorCode::Rejected,
                format!("Auth service returned {}: {}", status, body),
            ));
        }

        let verify_response: VerifyResponse = response.json().await.map_err(|e| {
            warn!(error = %e, "Failed to parse auth response");
            Error::internal(format!("Invalid auth response: {}", e))
        })?;

        Ok(verify_response)
    }

    /// Mock verification for testing/development.
    fn mock_verify(&self, token: &BearerToken) -> VerifyResponse {
        debug!("Using mock auth verification");
        VerifyResponse {
            valid: true,
            account_id: Some(mock_account_id(token)),
            error: None,
        }
    }

}

/// Generate a deterministic mock account ID from the token.
/// This is for testing only - in production, the auth service provides this.
pub fn mock_account_id(token: &BearerToken) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    token.as_str().hash(&mut hasher);
    let hash = hasher.finish();
    format!("acct-{:016x}", hash)
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Account timer registry
    pub hub: Arc<Hub>,
    /// Auth service client
    pub auth_client: AuthClient,
}

impl AppState {
    pub fn new(hub: Arc<Hub>, auth_url: impl Into<String>) -> Self {
        Self {
            hub,
            auth_client: AuthClient::new(auth_url),
        }
    }
}
