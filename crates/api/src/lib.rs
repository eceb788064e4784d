//! Hook administration and event ingest HTTP API.
//!
//! Exposes config, state, error handling, the router builder and routes so
//! the binary and the integration tests share one construction path.

pub mod config;
pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
