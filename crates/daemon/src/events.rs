//! Resource change notifications
//!
//! Mutating verbs publish on this bus after their write lands. Consumers
//! (a live-update channel, cache invalidation) subscribe; with no
//! subscribers, publishing is a no-op.

use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceEvent {
    Updated(String),
    Deleted(String),
}

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ResourceEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }
}

impl EventBus {
    pub fn subscribe(&self) -> broadcast::Receiver<ResourceEvent> {
        self.tx.subscribe()
    }

    pub fn updated(&self, uri: &str) {
        let _ = self.tx.send(ResourceEvent::Updated(uri.to_string()));
    }

    pub fn deleted(&self, uri: &str) {
        let _ = self.tx.send(ResourceEvent::Deleted(uri.to_string()));
    }
}
