use std::sync::Arc;

use cms_events::{EventBus, HookClient, HookDispatcher, HookRegistry, PgHookStore};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone; everything inside is an `Arc` or a pool handle.
#[derive(Clone)]
pub struct AppState {
    pub pool: cms_db::DbPool,
    pub config: Arc<ServerConfig>,
    pub registry: HookRegistry<PgHookStore>,
    pub dispatcher: HookDispatcher<PgHookStore>,
    /// Events published here reach hooks through the listener task.
    pub event_bus: Arc<EventBus>,
}

impl AppState {
    /// Wire the hook registry and dispatcher over `pool`.
    pub fn new(pool: cms_db::DbPool, config: ServerConfig, event_bus: Arc<EventBus>) -> Self {
        let store = Arc::new(PgHookStore::new(pool.clone()));
        let registry = HookRegistry::new(store);
        let dispatcher = HookDispatcher::new(
            registry.clone(),
            HookClient::new(),
            config.dispatch.clone(),
        );

        Self {
            pool,
            config: Arc::new(config),
            registry,
            dispatcher,
            event_bus,
        }
    }
}
