//! Container status agent
//!
//! HTTP surface, configuration and middleware for the status exporter.
//! The aggregation logic lives in `status-lib`.

pub mod api;
pub mod config;
pub mod error;
pub mod rate_limit;

pub use api::{create_app, create_router, serve, AppState};
pub use config::AgentConfig;
pub use rate_limit::RateLimiter;
