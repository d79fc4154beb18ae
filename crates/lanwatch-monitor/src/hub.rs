//! Broadcast hub: fan-out of push events to connected observers.
//!
//! Each observer owns a bounded queue. Publishing never waits: a full queue
//! drops the event for that observer only, and a closed queue unregisters
//! it. Events are full-state snapshots, so nothing is replayed to late
//! subscribers.

use std::sync::Arc;

use dashmap::DashMap;
use lanwatch_core::{HardwareId, PushEvent};
use lanwatch_whitelist::ChangeListener;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

/// Process-wide observer registry. Clone is cheap (inner Arc).
#[derive(Clone)]
pub struct BroadcastHub {
    inner: Arc<HubInner>,
}

struct HubInner {
    observers: DashMap<Uuid, mpsc::Sender<Arc<PushEvent>>>,
    buffer: usize,
}

/// A registered observer. Dropping it unregisters the observer.
pub struct Subscription {
    id: Uuid,
    events: mpsc::Receiver<Arc<PushEvent>>,
    hub: BroadcastHub,
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Next event, or `None` once the hub has dropped this observer.
    pub async fn recv(&mut self) -> Option<Arc<PushEvent>> {
        self.events.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.unregister(self.id);
    }
}

impl BroadcastHub {
    pub fn new(buffer: usize) -> Self {
        Self {
            inner: Arc::new(HubInner {
                observers: DashMap::new(),
                buffer: buffer.max(1),
            }),
        }
    }

    pub fn subscribe(&self) -> Subscription {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(self.inner.buffer);
        self.inner.observers.insert(id, tx);

        tracing::info!(observer_id = %id, observers = self.observer_count(), "Observer connected");

        Subscription {
            id,
            events: rx,
            hub: self.clone(),
        }
    }

    fn unregister(&self, id: Uuid) {
        if self.inner.observers.remove(&id).is_some() {
            tracing::info!(observer_id = %id, observers = self.observer_count(), "Observer disconnected");
        }
    }

    pub fn observer_count(&self) -> usize {
        self.inner.observers.len()
    }

    /// Deliver `event` to every connected observer. Returns how many accepted it.
    pub fn publish(&self, event: PushEvent) -> usize {
        let kind = event.kind();
        let event = Arc::new(event);
        let mut delivered = 0;
        let mut closed = Vec::new();

        for entry in self.inner.observers.iter() {
            match entry.value().try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(observer_id = %entry.key(), kind, "Observer lagging, event dropped");
                }
                Err(TrySendError::Closed(_)) => closed.push(*entry.key()),
            }
        }

        // Removal must wait until the shard read guards are released.
        for id in closed {
            self.unregister(id);
        }

        tracing::debug!(kind, delivered, "Event published");
        delivered
    }
}

/// Whitelist changes go out as `whitelist` events. Publishing never blocks,
/// so it is safe under the whitelist's mutation lock.
impl ChangeListener for BroadcastHub {
    fn whitelist_changed(&self, ids: &[HardwareId]) {
        self.publish(PushEvent::Whitelist(ids.to_vec()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn whitelist_event(n: usize) -> PushEvent {
        PushEvent::Whitelist(
            (0..n)
                .map(|i| HardwareId::canonicalize(&format!("aa:bb:cc:dd:ee:{i:02x}")))
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_publish_reaches_every_observer() {
        let hub = BroadcastHub::new(8);
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();

        assert_eq!(hub.publish(whitelist_event(1)), 2);
        assert_eq!(*a.recv().await.unwrap(), whitelist_event(1));
        assert_eq!(*b.recv().await.unwrap(), whitelist_event(1));
    }

    #[tokio::test]
    async fn test_disconnected_observer_does_not_block_others() {
        let hub = BroadcastHub::new(8);
        let mut stays = hub.subscribe();
        let leaves = hub.subscribe();
        let mut also_stays = hub.subscribe();

        drop(leaves);
        assert_eq!(hub.observer_count(), 2);

        assert_eq!(hub.publish(whitelist_event(2)), 2);
        assert_eq!(*stays.recv().await.unwrap(), whitelist_event(2));
        assert_eq!(*also_stays.recv().await.unwrap(), whitelist_event(2));
    }

    #[tokio::test]
    async fn test_lagging_observer_only_loses_its_own_events() {
        let hub = BroadcastHub::new(1);
        let _stalled = hub.subscribe();
        let mut active = hub.subscribe();

        assert_eq!(hub.publish(whitelist_event(1)), 2);
        assert_eq!(*active.recv().await.unwrap(), whitelist_event(1));

        // `_stalled` never reads, so its single slot is still full.
        assert_eq!(hub.publish(whitelist_event(2)), 1);
        assert_eq!(*active.recv().await.unwrap(), whitelist_event(2));
        assert_eq!(hub.observer_count(), 2);
    }

    #[tokio::test]
    async fn test_late_subscriber_gets_no_replay() {
        let hub = BroadcastHub::new(8);
        assert_eq!(hub.publish(whitelist_event(1)), 0);

        let mut late = hub.subscribe();
        hub.publish(PushEvent::Devices(vec![]));
        assert_eq!(*late.recv().await.unwrap(), PushEvent::Devices(vec![]));
    }
}
