//! Axum HTTP API server for asynchronous video-to-GIF conversion.
//!
//! This crate provides:
//! - Multipart upload, status polling and GIF download endpoints
//! - Shared-secret API key authentication
//! - Security headers, request ids and request logging
//! - Prometheus metrics

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::{ApiConfig, ConfigError};
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
