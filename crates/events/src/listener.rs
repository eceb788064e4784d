//! Bridge from the [`EventBus`](crate::bus::EventBus) to the dispatcher.

use tokio::sync::broadcast;

use crate::bus::PlatformEvent;
use crate::dispatcher::HookDispatcher;
use crate::store::HookStore;

/// Background service that dispatches every published event to its hooks.
pub struct HookListener;

impl HookListener {
    /// Run the listener loop.
    ///
    /// Each event is dispatched on its own task so a slow hook never holds
    /// up the bus. The loop exits when the bus is dropped.
    pub async fn run<S: HookStore + 'static>(
        dispatcher: HookDispatcher<S>,
        mut receiver: broadcast::Receiver<PlatformEvent>,
    ) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    dispatcher.spawn_trigger(event.event_type, event.data);
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(
                        skipped = n,
                        "Hook listener lagged, some events were not dispatched"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, hook listener shutting down");
                    break;
                }
            }
        }
    }
}
