//! Domain layer for the CMS hook dispatch service.
//!
//! Everything in this crate is pure: no database, network, or runtime
//! dependencies. The `db`, `events` and `api` crates build on these types.

pub mod error;
pub mod event_types;
pub mod execution;
pub mod hooks;
pub mod retry;
pub mod template;
pub mod types;
