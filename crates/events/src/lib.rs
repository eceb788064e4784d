//! Hook dispatch engine.
//!
//! - [`HookRegistry`]: validated CRUD over hooks and their execution history.
//! - [`HookDispatcher`]: fans an event out to subscribed hooks, records every
//!   attempt and queues retries. Never fails its caller.
//! - [`RetryScheduler`]: background task running queued retries when due.
//! - [`EventBus`] / [`HookListener`]: in-process publish/subscribe so domain
//!   code can raise events without awaiting delivery.
//! - [`HookStore`]: the persistence seam, with PostgreSQL and in-memory
//!   implementations.

pub mod bus;
pub mod config;
pub mod delivery;
pub mod dispatcher;
pub mod listener;
pub mod registry;
pub mod scheduler;
pub mod store;

pub use bus::{EventBus, PlatformEvent};
pub use config::DispatchConfig;
pub use delivery::{DeliveryError, HookClient};
pub use dispatcher::{AttemptReport, HookDispatcher};
pub use listener::HookListener;
pub use registry::{HookRegistry, RegistryError};
pub use scheduler::RetryScheduler;
pub use store::{HookStore, MemoryHookStore, PgHookStore, StoreError};
