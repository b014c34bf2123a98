//! Child-event source that fans transport events out to subscriptions.

use crate::types::ChildEvent;
use crossbeam_channel::{bounded, Sender, TrySendError};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use super::types::{
    DropReason, OverflowPolicy, SourceEvent, SubscriptionConfig, SubscriptionHandle,
    SubscriptionId,
};

/// Internal subscription state.
struct Subscription {
    location: String,
    overflow: OverflowPolicy,
    sender: Sender<SourceEvent>,
    /// Events skipped because the buffer was full.
    dropped: Arc<AtomicU64>,
    /// A skip happened that the subscriber has not been told about yet.
    gap_open: AtomicBool,
}

/// Outcome of offering an event to one subscriber.
enum Delivery {
    Sent,
    Skipped,
    Gone,
    Overflowed,
}

impl Subscription {
    fn offer(&self, event: SourceEvent) -> Delivery {
        // Announce earlier skips before anything newer gets through.
        if self.gap_open.load(Ordering::Acquire) {
            let gap = SourceEvent::Gap {
                missed: self.dropped.load(Ordering::Relaxed),
            };
            match self.sender.try_send(gap) {
                Ok(()) => self.gap_open.store(false, Ordering::Release),
                Err(TrySendError::Disconnected(_)) => return Delivery::Gone,
                Err(TrySendError::Full(_)) => return self.full(),
            }
        }

        match self.sender.try_send(event) {
            Ok(()) => Delivery::Sent,
            Err(TrySendError::Disconnected(_)) => Delivery::Gone,
            Err(TrySendError::Full(_)) => self.full(),
        }
    }

    fn full(&self) -> Delivery {
        match self.overflow {
            OverflowPolicy::DropEvent => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                self.gap_open.store(true, Ordering::Release);
                Delivery::Skipped
            }
            OverflowPolicy::DropSubscriber => Delivery::Overflowed,
        }
    }
}

/// Shared subscription table. Handles keep a weak reference for `cancel`.
pub(crate) struct Registry {
    subscriptions: RwLock<HashMap<SubscriptionId, Subscription>>,
    next_id: AtomicU64,
}

impl Registry {
    /// Remove a subscription, sending `farewell` best effort.
    pub(crate) fn remove(&self, id: SubscriptionId, farewell: SourceEvent) -> bool {
        let removed = self.subscriptions.write().remove(&id);
        match removed {
            Some(sub) => {
                let _ = sub.sender.try_send(farewell);
                debug!(id = id.0, location = %sub.location, "subscription removed");
                true
            }
            None => false,
        }
    }

    /// Remove every subscription on `location`, sending `farewell` to each.
    fn remove_location(&self, location: &str, farewell: SourceEvent) -> usize {
        let mut subs = self.subscriptions.write();
        let ids: Vec<SubscriptionId> = subs
            .iter()
            .filter(|(_, sub)| sub.location == location)
            .map(|(id, _)| *id)
            .collect();

        for id in &ids {
            if let Some(sub) = subs.remove(id) {
                let _ = sub.sender.try_send(farewell.clone());
            }
        }
        ids.len()
    }
}

/// Hub between a transport and the consumers of its child events.
///
/// The transport calls [`ChildEventSource::publish`] once per backend
/// notification. Every subscription on that location receives the events in
/// publish order on its own bounded channel. Cheap to clone; clones share
/// the same subscriptions.
#[derive(Clone)]
pub struct ChildEventSource {
    registry: Arc<Registry>,
}

impl ChildEventSource {
    /// Create a source with no subscriptions.
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry {
                subscriptions: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Subscribe to child events at `location`.
    pub fn subscribe(
        &self,
        location: impl Into<String>,
        config: SubscriptionConfig,
    ) -> SubscriptionHandle {
        let location = location.into();
        let id = SubscriptionId(self.registry.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = bounded(config.buffer_size);
        let missed = Arc::new(AtomicU64::new(0));

        let subscription = Subscription {
            location: location.clone(),
            overflow: config.overflow,
            sender,
            dropped: Arc::clone(&missed),
            gap_open: AtomicBool::new(false),
        };
        self.registry.subscriptions.write().insert(id, subscription);
        debug!(id = id.0, location = %location, "subscribed");

        SubscriptionHandle {
            id,
            location,
            receiver,
            registry: Arc::downgrade(&self.registry),
            missed,
        }
    }

    /// Unsubscribe and clean up.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.registry.remove(id, SourceEvent::Cancelled);
    }

    /// Deliver a child event to every subscription on `location`.
    ///
    /// Returns the number of subscriptions that received it.
    pub fn publish(&self, location: &str, event: ChildEvent<Value>) -> usize {
        let mut delivered = 0;
        let mut gone = Vec::new();
        let mut overflowed = Vec::new();

        {
            let subs = self.registry.subscriptions.read();
            for (id, sub) in subs.iter().filter(|(_, sub)| sub.location == location) {
                match sub.offer(SourceEvent::Child {
                    event: event.clone(),
                }) {
                    Delivery::Sent => delivered += 1,
                    Delivery::Skipped => {
                        warn!(id = id.0, key = %event.key, "subscriber buffer full, event dropped");
                    }
                    Delivery::Gone => gone.push(*id),
                    Delivery::Overflowed => overflowed.push(*id),
                }
            }
        }

        if !gone.is_empty() || !overflowed.is_empty() {
            let mut subs = self.registry.subscriptions.write();
            for id in gone {
                subs.remove(&id);
                debug!(id = id.0, "pruned disconnected subscription");
            }
            for id in overflowed {
                if let Some(sub) = subs.remove(&id) {
                    warn!(id = id.0, location = %sub.location, "dropping slow subscriber");
                    // Might fail, the buffer is full
                    let _ = sub.sender.try_send(SourceEvent::Dropped {
                        reason: DropReason::BufferOverflow,
                    });
                }
            }
        }

        delivered
    }

    /// Report an upstream failure at `location`.
    ///
    /// Every subscription there gets [`SourceEvent::Failed`] and is removed.
    pub fn fail(&self, location: &str, reason: impl Into<String>) -> usize {
        let reason = reason.into();
        warn!(location, reason = %reason, "event source failed");
        self.registry
            .remove_location(location, SourceEvent::Failed { reason })
    }

    /// Close `location` without an error, dropping its subscriptions.
    pub fn close(&self, location: &str) -> usize {
        debug!(location, "location closed");
        self.registry.remove_location(
            location,
            SourceEvent::Dropped {
                reason: DropReason::LocationClosed,
            },
        )
    }

    /// Get subscription count.
    pub fn subscription_count(&self) -> usize {
        self.registry.subscriptions.read().len()
    }

    /// Get subscription count on one location.
    pub fn subscription_count_at(&self, location: &str) -> usize {
        self.registry
            .subscriptions
            .read()
            .values()
            .filter(|sub| sub.location == location)
            .count()
    }

    /// Events skipped for a subscription under [`OverflowPolicy::DropEvent`].
    pub fn dropped_events(&self, id: SubscriptionId) -> Option<u64> {
        self.registry
            .subscriptions
            .read()
            .get(&id)
            .map(|sub| sub.dropped.load(Ordering::Relaxed))
    }
}

impl Default for ChildEventSource {
    fn default() -> Self {
        Self::new()
    }
}
