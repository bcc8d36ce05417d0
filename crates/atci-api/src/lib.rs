//! Axum HTTP API for the transcription service.
//!
//! This crate provides:
//! - Range-capable media serving from the watch roots
//! - Queue inspection and manipulation endpoints
//! - Subtitle stream listing
//! - The optional shared-password gate for non-loopback clients

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
