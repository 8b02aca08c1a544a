//! WebSocket API layer for the pomosync server.

pub mod response;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::{mock_account_id, AppState, AuthClient};
