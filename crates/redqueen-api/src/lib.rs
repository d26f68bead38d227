//! Red Queen API crate - axum HTTP server, route handlers, SSE streaming.
//!
//! Exposes the chat service as a small JSON API, serves the embedded chat
//! page, and streams change notifications over server-sent events.

pub mod error;
pub mod handlers;
pub mod host;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
