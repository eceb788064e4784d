//! Shared helpers for dispatch engine tests.
//!
//! Everything runs against [`MemoryHookStore`] with zero retry backoff so
//! queued retries are due immediately.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use cms_core::retry::RetryPolicy;
use cms_db::models::hook::{CreateHook, Hook};
use cms_events::{
    DispatchConfig, HookClient, HookDispatcher, HookRegistry, HookStore, MemoryHookStore,
    RetryScheduler,
};

/// Dispatch config with no backoff.
pub fn test_config() -> DispatchConfig {
    DispatchConfig {
        poll_interval: Duration::from_millis(50),
        batch_size: 10,
        retry_policy: RetryPolicy::fixed(Duration::ZERO, Duration::ZERO),
        claim_grace: Duration::from_secs(60),
        max_response_body_bytes: 1024,
        user_agent: "cms-hooks/test".to_string(),
    }
}

pub struct Harness {
    pub store: Arc<MemoryHookStore>,
    pub registry: HookRegistry<MemoryHookStore>,
    pub dispatcher: HookDispatcher<MemoryHookStore>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: DispatchConfig) -> Self {
        let store = Arc::new(MemoryHookStore::new());
        let registry = HookRegistry::new(Arc::clone(&store));
        let dispatcher = HookDispatcher::new(registry.clone(), HookClient::new(), config);
        Self {
            store,
            registry,
            dispatcher,
        }
    }

    pub fn scheduler(&self) -> RetryScheduler<MemoryHookStore> {
        RetryScheduler::new(self.dispatcher.clone())
    }

    /// Insert a hook straight into the store, bypassing validation.
    pub async fn insert_hook(&self, input: CreateHook) -> Hook {
        self.store.create_hook(&input).await.expect("insert hook")
    }
}

/// A POST hook for `event_type` pointing at `url`.
pub fn hook_input(event_type: &str, url: Option<String>) -> CreateHook {
    CreateHook {
        name: format!("{event_type} hook"),
        event_type: event_type.to_string(),
        endpoint_url: url,
        ..Default::default()
    }
}
