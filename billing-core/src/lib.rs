//! Shared infrastructure for the billing services: configuration loading,
//! the common error type, request middleware, tracing setup and retry
//! helpers for transiently failing operations.

pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod observability;
pub mod retry;

// Re-export commonly used dependencies so services stay on one version.
pub use async_trait;
pub use axum;
pub use mongodb;
pub use serde;
pub use serde_json;
pub use tokio;
pub use tower;
pub use tower_http;
pub use tracing;
pub use validator;
