//! chatscan API crate - axum HTTP server and route handlers.
//!
//! Exposes the greeting and chat endpoints, the screenshot OCR endpoints
//! (plain, position-grouped, and the batch upload), vision-model analysis,
//! and a health check.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
