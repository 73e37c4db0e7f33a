//! Event Bus (spec §4.1): in-process fan-out of typed events, bounded
//! per-subscriber queues, slow-subscriber drop policy, never blocks the
//! publisher. Grounded in the channel-command pattern
//! (`CommandResponder<T> = oneshot::Sender<...>` in
//! `tasker-orchestration/src/orchestration/commands/types.rs`), generalized
//! from a single oneshot reply to a many-subscriber broadcast.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tokio::sync::mpsc;
use tracing::warn;

use crate::events::ControlPlaneEvent;

const SUBSCRIBER_BUFFER: usize = 256;

type SubscriberId = u64;

/// A subscription handle. Deregisters itself from the bus on drop, modeling
/// "the channel closes automatically when ctx is cancelled" from spec §4.1.
pub struct ControlPlaneEventStream {
    id: SubscriberId,
    bus: Arc<EventBusInner>,
    receiver: mpsc::Receiver<ControlPlaneEvent>,
}

impl ControlPlaneEventStream {
    pub async fn recv(&mut self) -> Option<ControlPlaneEvent> {
        self.receiver.recv().await
    }
}

impl Drop for ControlPlaneEventStream {
    fn drop(&mut self) {
        self.bus.deregister(self.id);
    }
}

struct EventBusInner {
    subscribers: RwLock<HashMap<SubscriberId, mpsc::Sender<ControlPlaneEvent>>>,
    next_id: AtomicU64,
}

impl EventBusInner {
    fn deregister(&self, id: SubscriberId) {
        self.subscribers.write().expect("event bus lock poisoned").remove(&id);
    }
}

/// Typed publish/subscribe broker. Cloning an `EventBus` shares the same
/// subscriber table (it is a thin handle over an `Arc`).
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<EventBusInner>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(EventBusInner {
                subscribers: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    pub fn subscribe(&self) -> ControlPlaneEventStream {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        self.inner.subscribers.write().expect("event bus lock poisoned").insert(id, tx);
        ControlPlaneEventStream { id, bus: Arc::clone(&self.inner), receiver: rx }
    }

    /// Never blocks and never errors. A subscriber whose buffer is full has
    /// its event dropped with a logged warning (slow-subscriber isolation,
    /// spec §5).
    pub fn publish(&self, event: ControlPlaneEvent) {
        let subscribers = self.inner.subscribers.read().expect("event bus lock poisoned");
        for (id, sender) in subscribers.iter() {
            if let Err(mpsc::error::TrySendError::Full(_)) = sender.try_send(event.clone()) {
                warn!(subscriber_id = id, "dropping event for slow subscriber");
            }
        }
    }

    /// Drains pending subscribers by dropping every sender, which closes
    /// each subscriber's channel from this end.
    pub fn close(&self) {
        self.inner.subscribers.write().expect("event bus lock poisoned").clear();
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.read().expect("event bus lock poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ProcessEvent;
    use crate::model::WorkflowId;

    fn sample_event(workflow_id: WorkflowId) -> ControlPlaneEvent {
        ControlPlaneEvent::Process(ProcessEvent::WorkflowComplete { workflow_id })
    }

    #[tokio::test]
    async fn publish_delivers_to_all_subscribers_in_order() {
        let bus = EventBus::new();
        let workflow_id = uuid::Uuid::now_v7();
        let mut sub_a = bus.subscribe();
        let mut sub_b = bus.subscribe();

        bus.publish(sample_event(workflow_id));
        bus.publish(sample_event(workflow_id));

        assert!(sub_a.recv().await.is_some());
        assert!(sub_a.recv().await.is_some());
        assert!(sub_b.recv().await.is_some());
        assert!(sub_b.recv().await.is_some());
    }

    #[tokio::test]
    async fn dropping_stream_deregisters_subscriber() {
        let bus = EventBus::new();
        let stream = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        drop(stream);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn full_subscriber_buffer_drops_without_blocking_publisher() {
        let bus = EventBus::new();
        let workflow_id = uuid::Uuid::now_v7();
        let _slow = bus.subscribe();

        for _ in 0..(SUBSCRIBER_BUFFER + 10) {
            bus.publish(sample_event(workflow_id));
        }
        // Publishing past capacity must return promptly rather than hang.
    }
}
