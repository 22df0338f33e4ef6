use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use aifs_types::Timestamp;

/// Classification of engine events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// An asset became visible (its transaction committed).
    AssetCommitted,
    /// An asset was deleted.
    AssetDeleted,
    /// A snapshot was created and signed.
    SnapshotCreated,
    /// A branch pointer moved (or was created).
    BranchUpdated,
    /// A branch pointer was removed.
    BranchDeleted,
    /// A tag was created.
    TagCreated,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::AssetCommitted => "asset_committed",
            Self::AssetDeleted => "asset_deleted",
            Self::SnapshotCreated => "snapshot_created",
            Self::BranchUpdated => "branch_updated",
            Self::BranchDeleted => "branch_deleted",
            Self::TagCreated => "tag_created",
        };
        write!(f, "{s}")
    }
}

/// One event flowing out of the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineEvent {
    pub kind: EventKind,
    pub namespace: String,
    /// The id the event is about: asset id, snapshot id, or ref name.
    pub subject: String,
    pub at: Timestamp,
}

/// Filter for event subscriptions.
#[derive(Clone, Debug, Default)]
pub struct EventFilter {
    /// If set, only events in this namespace are delivered.
    pub namespace: Option<String>,
    /// If set, only events of these kinds are delivered.
    pub kinds: Option<Vec<EventKind>>,
}

impl EventFilter {
    pub fn matches(&self, event: &EngineEvent) -> bool {
        if let Some(ref ns) = self.namespace {
            if *ns != event.namespace {
                return false;
            }
        }
        if let Some(ref kinds) = self.kinds {
            if !kinds.contains(&event.kind) {
                return false;
            }
        }
        true
    }
}

struct Subscriber {
    filter: EventFilter,
    sender: broadcast::Sender<EngineEvent>,
}

/// Fan-out bus delivering engine events to matching subscribers.
///
/// Stale subscribers (all receivers dropped) are pruned on the next
/// publish that touches them.
pub struct EventBus {
    capacity: usize,
    subscribers: RwLock<Vec<Subscriber>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Register a subscriber; returns the receiving end.
    pub fn subscribe(&self, filter: EventFilter) -> broadcast::Receiver<EngineEvent> {
        let (tx, rx) = broadcast::channel(self.capacity);
        self.subscribers
            .write()
            .expect("event bus poisoned")
            .push(Subscriber { filter, sender: tx });
        rx
    }

    /// Deliver an event to every matching subscriber.
    pub fn publish(&self, event: EngineEvent) {
        let mut subs = self.subscribers.write().expect("event bus poisoned");
        subs.retain(|sub| {
            if sub.filter.matches(&event) {
                sub.sender.send(event.clone()).is_ok()
            } else {
                sub.sender.receiver_count() > 0
            }
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().expect("event bus poisoned").len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: EventKind, namespace: &str) -> EngineEvent {
        EngineEvent {
            kind,
            namespace: namespace.into(),
            subject: "subject".into(),
            at: Timestamp::from_epoch_secs(0),
        }
    }

    #[tokio::test]
    async fn subscriber_receives_matching_events() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe(EventFilter::default());
        bus.publish(event(EventKind::AssetCommitted, "ns"));
        let received = rx.recv().await.unwrap();
        assert_eq!(received.kind, EventKind::AssetCommitted);
    }

    #[tokio::test]
    async fn namespace_filter_applies() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe(EventFilter {
            namespace: Some("ns1".into()),
            kinds: None,
        });
        bus.publish(event(EventKind::TagCreated, "ns2"));
        bus.publish(event(EventKind::TagCreated, "ns1"));
        let received = rx.recv().await.unwrap();
        assert_eq!(received.namespace, "ns1");
    }

    #[tokio::test]
    async fn kind_filter_applies() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe(EventFilter {
            namespace: None,
            kinds: Some(vec![EventKind::SnapshotCreated]),
        });
        bus.publish(event(EventKind::AssetCommitted, "ns"));
        bus.publish(event(EventKind::SnapshotCreated, "ns"));
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::SnapshotCreated);
    }

    #[test]
    fn dropped_subscriber_pruned_on_publish() {
        let bus = EventBus::default();
        let rx = bus.subscribe(EventFilter::default());
        assert_eq!(bus.subscriber_count(), 1);
        drop(rx);
        bus.publish(event(EventKind::AssetDeleted, "ns"));
        assert_eq!(bus.subscriber_count(), 0);
    }
}
