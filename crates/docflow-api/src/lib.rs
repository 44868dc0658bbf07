//! Axum HTTP API server.
//!
//! This crate provides:
//! - Upload and processing-request endpoints
//! - The polling list and artifact download
//! - Health, readiness and Prometheus metrics
//! - Rate limiting, security headers and request ids

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
