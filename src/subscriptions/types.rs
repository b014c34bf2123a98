//! Subscription types for child-event delivery.

use crate::types::ChildEvent;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use super::manager::Registry;

/// Configuration for a subscription.
#[derive(Clone, Debug)]
pub struct SubscriptionConfig {
    /// Max buffered events per subscriber.
    /// Default: 1000
    pub buffer_size: usize,

    /// What to do when the buffer is full.
    pub overflow: OverflowPolicy,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            buffer_size: 1000,
            overflow: OverflowPolicy::DropEvent,
        }
    }
}

/// Behaviour when a subscriber falls behind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Skip the event for that subscriber and count it. The subscriber is
    /// told with [`SourceEvent::Gap`] ahead of the next event that fits.
    #[default]
    DropEvent,
    /// Drop the subscriber entirely.
    DropSubscriber,
}

/// Events delivered to a subscription.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceEvent {
    /// A child of the subscribed location changed.
    Child { event: ChildEvent<Value> },

    /// Events were skipped because the buffer was full. Delivery goes on,
    /// but state built from earlier events no longer matches the source.
    Gap { missed: u64 },

    /// The upstream source failed. No further events follow.
    Failed { reason: String },

    /// Explicitly unsubscribed.
    Cancelled,

    /// Subscription was dropped by the hub.
    Dropped { reason: DropReason },
}

impl SourceEvent {
    /// True if nothing can follow this event.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SourceEvent::Child { .. } | SourceEvent::Gap { .. })
    }
}

/// Why a subscription was dropped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Send buffer overflowed (slow consumer).
    BufferOverflow,
    /// Location was closed by the source.
    LocationClosed,
}

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Handle to receive events from a subscription.
///
/// Dropping the handle disconnects its channel; the hub forgets the
/// subscription on the next publish to its location.
pub struct SubscriptionHandle {
    pub id: SubscriptionId,
    /// Location this subscription listens on.
    pub location: String,
    /// Channel to receive events.
    pub receiver: crossbeam_channel::Receiver<SourceEvent>,
    pub(super) registry: Weak<Registry>,
    /// Shared with the hub, bumped on every skipped event.
    pub(super) missed: Arc<AtomicU64>,
}

impl SubscriptionHandle {
    /// Unsubscribe. Events already buffered can still be received, followed
    /// by [`SourceEvent::Cancelled`].
    pub fn cancel(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id, SourceEvent::Cancelled);
        }
    }

    /// Events skipped for this subscription so far, announced or not.
    pub fn missed_events(&self) -> u64 {
        self.missed.load(Ordering::Relaxed)
    }

    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<SourceEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<SourceEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<SourceEvent, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}
