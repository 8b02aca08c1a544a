//! Common test setup functions.

use std::net::SocketAddr;
use std::sync::Arc;

use sync_client::ClientConfig;
use sync_hub::{Hub, MemorySettingsStore, MemoryTaskStore};
use sync_server::{mock_account_id, router, AppState};
use sync_worker::{WorkerConfig, WorkerScheduler};
use telemetry::health;
use timer_core::{AccountId, BearerToken, Task, TaskId};

/// Test context running the real server over a real socket.
///
/// This exercises the same production code paths by:
/// - Using the real Axum router with all middleware
/// - Using the in-memory task and settings stores behind the real traits
/// - Using mock auth (any well-formed token maps to a stable account)
/// - Running the real background tick worker
pub struct TestContext {
    pub addr: SocketAddr,
    pub hub: Arc<Hub>,
    pub tasks: Arc<MemoryTaskStore>,
    pub settings: Arc<MemorySettingsStore>,
    server: tokio::task::JoinHandle<()>,
    workers: Vec<tokio::task::JoinHandle<()>>,
}

impl TestContext {
    /// Create a new test context with the server listening on an
    /// ephemeral port.
    pub async fn new() -> Self {
        let tasks = Arc::new(MemoryTaskStore::new());
        let settings = Arc::new(MemorySettingsStore::new());
        let hub = Arc::new(Hub::new(tasks.clone(), settings.clone()));

        health().auth.set_healthy();
        health().hub.set_healthy();

        let scheduler = Arc::new(WorkerScheduler::new(WorkerConfig::default(), hub.clone()));
        let workers = scheduler.start();

        let state = AppState::new(hub.clone(), "mock");
        let app = router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local addr");

        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Server error");
        });

        Self {
            addr,
            hub,
            tasks,
            settings,
            server,
            workers,
        }
    }

    /// The server's WebSocket base URL.
    pub fn ws_base(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// The server's HTTP base URL.
    pub fn http_base(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Raw WebSocket endpoint URL with the token already attached.
    pub fn ws_url(&self, token: &str) -> String {
        format!("{}/ws/pomodoro?token={}", self.ws_base(), token)
    }

    /// Client config pointing at this server.
    pub fn client_config(&self, token: &str) -> ClientConfig {
        ClientConfig::new(self.ws_base(), token)
    }

    /// The account id mock auth assigns to a token.
    pub fn account_for(&self, token: &str) -> AccountId {
        let token = BearerToken::parse(token).expect("invalid test token");
        mock_account_id(&token)
    }

    /// Seed a task for the account behind a token.
    pub fn seed_task(&self, token: &str, task: Task) {
        self.tasks.insert_task(&self.account_for(token), task);
    }

    /// Read back a seeded task.
    pub fn task(&self, token: &str, task_id: TaskId) -> Option<Task> {
        self.tasks.task(&self.account_for(token), task_id)
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        self.server.abort();
        for worker in &self.workers {
            worker.abort();
        }
    }
}
