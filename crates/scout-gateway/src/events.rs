//! Typed domain event bus decoupling storage from delivery.

use scout_core::{ChangeRecord, Finding, Job};
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 256;

/// One observed mutation, typed by collection
#[derive(Debug, Clone)]
pub enum DomainEvent {
    /// A job document changed
    Job(ChangeRecord<Job>),

    /// A finding document changed
    Finding(ChangeRecord<Finding>),
}

impl DomainEvent {
    /// The id of the changed document
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Job(record) => &record.key,
            Self::Finding(record) => &record.key,
        }
    }
}

/// Broadcast bus carrying [`DomainEvent`]s from the change feed to any
/// number of delivery surfaces.
///
/// Publishing never blocks and never fails: with no subscribers the event
/// is simply dropped, and a slow subscriber lags rather than stalling the
/// feed.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    /// Create a bus with the default buffer capacity
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a bus buffering up to `capacity` events per subscriber
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event to all current subscribers
    pub fn publish(&self, event: DomainEvent) {
        // A send error only means nobody is listening right now.
        let _ = self.tx.send(event);
    }

    /// Subscribe to events published after this call
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.tx.subscribe()
    }

    /// Number of live subscribers
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_core::{ChangeOp, Job, Metadata, Provider};

    fn job_event() -> DomainEvent {
        let job = Job::pending("dns-1", Provider::Dns, "a1", "example.com", Metadata::new());
        DomainEvent::Job(ChangeRecord::with_document(ChangeOp::Insert, "dns-1", job))
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_silent() {
        let bus = EventBus::new();
        bus.publish(job_event());
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_subscribers_each_receive_published_events() {
        let bus = EventBus::new();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        bus.publish(job_event());

        for rx in [&mut first, &mut second] {
            let event = rx.recv().await.unwrap();
            assert_eq!(event.key(), "dns-1");
        }
    }
}
