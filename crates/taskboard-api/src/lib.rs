//! Axum HTTP API server for the queue inspector.
//!
//! This crate provides:
//! - Read-only JSON endpoints over queues, counts and jobs
//! - Layered configuration (defaults, YAML, environment)
//! - Request ids, request logging and Prometheus metrics

pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::{ApiConfig, AppConfig};
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
