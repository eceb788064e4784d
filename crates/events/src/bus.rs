//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! Domain actions publish a [`PlatformEvent`] and return immediately; the
//! [`HookListener`](crate::listener::HookListener) picks it up and hands it
//! to the dispatcher. Share the bus as `Arc<EventBus>`.

use serde_json::Value;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// PlatformEvent
// ---------------------------------------------------------------------------

/// A domain occurrence that hooks may subscribe to.
#[derive(Debug, Clone)]
pub struct PlatformEvent {
    /// Event tag, e.g. `"content.published"`.
    pub event_type: String,
    /// Handed to hooks as the template context.
    pub data: Value,
}

impl PlatformEvent {
    pub fn new(event_type: impl Into<String>, data: Value) -> Self {
        Self {
            event_type: event_type.into(),
            data,
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// Fan-out bus: every subscriber sees every event published after it subscribed.
pub struct EventBus {
    sender: broadcast::Sender<PlatformEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// Once the buffer is full the oldest events are overwritten and slow
    /// receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event. Never blocks and never fails.
    ///
    /// Returns the number of subscribers that will see it.
    pub fn publish(&self, event: PlatformEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(dropped) => {
                tracing::debug!(
                    event_type = %dropped.0.event_type,
                    "No subscribers, event dropped"
                );
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlatformEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
