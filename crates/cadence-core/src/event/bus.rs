//! Broadcast event bus for distributing `CadenceEvent` to multiple subscribers.
//!
//! Publishing with no active subscribers is a no-op, so engines never wait on
//! observers.

use cadence_types::event::CadenceEvent;
use tokio::sync::broadcast;

/// Default channel capacity for a substrate's bus.
pub const DEFAULT_BUS_CAPACITY: usize = 1024;

/// Multi-consumer bus for engine events.
///
/// Cloning the bus clones the sender, so every engine task can publish.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CadenceEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<CadenceEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: CadenceEvent) {
        let _ = self.sender.send(event);
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("receiver_count", &self.sender.receiver_count())
            .finish()
    }
}
