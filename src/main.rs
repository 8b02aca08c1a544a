//! Pomosync server
//!
//! Multi-device pomodoro timer synchronization:
//! - Token-authenticated WebSocket connections
//! - Server-authoritative session state machine per account
//! - Broadcast fan-out so every device mirrors the same timer
//! - Background tick worker that completes phases on the wall clock

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::info;

use sync_hub::{Hub, MemorySettingsStore, MemoryTaskStore};
use sync_server::{router, AppState};
use sync_worker::{WorkerConfig, WorkerScheduler};
use telemetry::{health, init_tracing_from_env};

/// Application configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,

    /// Auth service URL for token verification ("mock" for local dev)
    #[serde(default = "default_auth_url")]
    auth_url: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_auth_url() -> String {
    "mock".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            auth_url: default_auth_url(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    init_tracing_from_env();

    info!("Starting pomosync server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = load_config()?;
    info!(auth_url = %config.auth_url, "Loaded config");

    // Build the account timer registry
    let hub = Arc::new(Hub::new(
        Arc::new(MemoryTaskStore::default()),
        Arc::new(MemorySettingsStore::default()),
    ));
    health().hub.set_healthy();

    if config.auth_url == "mock" || config.auth_url.is_empty() {
        info!("Auth running in mock mode");
    }
    health().auth.set_healthy();

    // Start background workers
    let worker_scheduler = Arc::new(WorkerScheduler::new(WorkerConfig::default(), hub.clone()));
    let _worker_handles = worker_scheduler.start();

    // Create application state and router
    let state = AppState::new(hub, &config.auth_url);
    let app = router(state);

    // Start HTTP server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Config::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("POMOSYNC")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // Manual overrides for flat fields from environment
    if let Ok(host) = std::env::var("POMOSYNC_HOST") {
        config.host = host;
    }
    if let Ok(port) = std::env::var("POMOSYNC_PORT") {
        config.port = port.parse().context("Invalid POMOSYNC_PORT")?;
    }
    if let Ok(auth_url) = std::env::var("POMOSYNC_AUTH_URL") {
        config.auth_url = auth_url;
    }

    Ok(config)
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received terminate signal"),
    }
}
