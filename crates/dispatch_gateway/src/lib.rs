//! Network surfaces for the dispatch coordinator: the JSON request/response
//! API, the WebSocket event channel and the connection registry that
//! delivers ride events to connected users.

pub mod config;
pub mod connections;
pub mod http;
pub mod protocol;
pub mod session;
pub mod state;
pub mod telemetry;
pub mod ws;

pub use http::create_router;
pub use state::AppState;
