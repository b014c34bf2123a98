//! Live collection driven by a subscription.
//!
//! Pulls raw child events off a [`SubscriptionHandle`], maps them with a
//! [`PayloadMapper`] and applies them to an [`OrderedCollection`]. Each
//! resulting delta goes to a [`DeltaSink`], typically a UI list that mirrors
//! the collection incrementally.

use crate::collection::OrderedCollection;
use crate::error::{CollectionError, Result};
use crate::mapper::{map_child_event, PayloadMapper};
use crate::subscriptions::{SourceEvent, SubscriptionHandle};
use crate::types::{ChildKey, StructuralDelta};
use crossbeam_channel::{RecvTimeoutError, TryRecvError};
use std::time::Duration;
use tracing::{debug, warn};

/// Consumer of structural deltas.
pub trait DeltaSink<T> {
    fn inserted(&mut self, index: usize, item: &T, key: &ChildKey);

    fn updated(&mut self, index: usize, old: &T, new: &T, key: &ChildKey);

    fn removed(&mut self, index: usize, item: &T, key: &ChildKey);

    fn moved(&mut self, from: usize, to: usize, item: &T, key: &ChildKey);

    /// Dispatch one delta to the matching callback.
    fn deliver(&mut self, delta: &StructuralDelta<T>) {
        match delta {
            StructuralDelta::InsertedAt { index, item, key } => self.inserted(*index, item, key),
            StructuralDelta::UpdatedAt {
                index,
                old,
                new,
                key,
            } => self.updated(*index, old, new, key),
            StructuralDelta::RemovedAt { index, item, key } => self.removed(*index, item, key),
            StructuralDelta::MovedFromTo {
                from,
                to,
                item,
                key,
            } => self.moved(*from, *to, item, key),
        }
    }
}

/// Collects deltas in arrival order.
impl<T: Clone> DeltaSink<T> for Vec<StructuralDelta<T>> {
    fn inserted(&mut self, index: usize, item: &T, key: &ChildKey) {
        self.push(StructuralDelta::InsertedAt {
            index,
            item: item.clone(),
            key: key.clone(),
        });
    }

    fn updated(&mut self, index: usize, old: &T, new: &T, key: &ChildKey) {
        self.push(StructuralDelta::UpdatedAt {
            index,
            old: old.clone(),
            new: new.clone(),
            key: key.clone(),
        });
    }

    fn removed(&mut self, index: usize, item: &T, key: &ChildKey) {
        self.push(StructuralDelta::RemovedAt {
            index,
            item: item.clone(),
            key: key.clone(),
        });
    }

    fn moved(&mut self, from: usize, to: usize, item: &T, key: &ChildKey) {
        self.push(StructuralDelta::MovedFromTo {
            from,
            to,
            item: item.clone(),
            key: key.clone(),
        });
    }
}

/// Lifecycle of a live collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LiveState {
    /// Receiving events.
    Active,
    /// Cancelled, dropped or failed. The collection keeps its last state.
    Terminated,
}

/// An [`OrderedCollection`] fed by one subscription.
pub struct LiveCollection<T, M> {
    handle: SubscriptionHandle,
    mapper: M,
    collection: OrderedCollection<T>,
    state: LiveState,
}

impl<T, M> LiveCollection<T, M>
where
    T: Clone,
    M: PayloadMapper<T>,
{
    /// Start from an empty collection.
    pub fn new(handle: SubscriptionHandle, mapper: M) -> Self {
        Self::with_collection(handle, mapper, OrderedCollection::new())
    }

    /// Start from a restored collection.
    pub fn with_collection(
        handle: SubscriptionHandle,
        mapper: M,
        collection: OrderedCollection<T>,
    ) -> Self {
        Self {
            handle,
            mapper,
            collection,
            state: LiveState::Active,
        }
    }

    /// Current state of the mirrored collection.
    pub fn collection(&self) -> &OrderedCollection<T> {
        &self.collection
    }

    /// Give up the subscription and keep the collection.
    pub fn into_collection(self) -> OrderedCollection<T> {
        self.collection
    }

    /// Get lifecycle state.
    pub fn state(&self) -> LiveState {
        self.state
    }

    /// True while events are still being applied.
    pub fn is_active(&self) -> bool {
        self.state == LiveState::Active
    }

    /// Location the subscription listens on.
    pub fn location(&self) -> &str {
        &self.handle.location
    }

    /// Handle one event from the source.
    ///
    /// A payload that cannot be mapped rejects the event with
    /// [`CollectionError::Cast`] and leaves the collection untouched. An
    /// upstream failure terminates the live collection and is returned as
    /// [`CollectionError::Source`]. Events skipped by the hub terminate it
    /// with [`CollectionError::Diverged`].
    pub fn process(&mut self, event: SourceEvent) -> Result<Option<StructuralDelta<T>>> {
        if !self.is_active() {
            return Ok(None);
        }
        if event.is_terminal() {
            self.state = LiveState::Terminated;
        }

        match event {
            SourceEvent::Child { event } => {
                let mapped = map_child_event(&self.mapper, event)?;
                Ok(self.collection.apply(mapped))
            }
            SourceEvent::Gap { missed } => Err(self.diverge(missed)),
            SourceEvent::Failed { reason } => {
                warn!(location = %self.location(), reason = %reason, "live collection failed");
                Err(CollectionError::Source(reason))
            }
            SourceEvent::Cancelled => {
                debug!(location = %self.location(), "live collection cancelled");
                Ok(None)
            }
            SourceEvent::Dropped { reason } => {
                warn!(location = %self.location(), ?reason, "subscription dropped");
                Ok(None)
            }
        }
    }

    /// Apply every event that is already waiting, without blocking.
    ///
    /// Returns how many deltas reached `sink`. Stops at the first error;
    /// events behind it stay queued for the next call.
    pub fn pump<S: DeltaSink<T> + ?Sized>(&mut self, sink: &mut S) -> Result<usize> {
        let mut delivered = 0;

        while self.is_active() {
            match self.handle.try_recv() {
                Ok(event) => {
                    if let Some(delta) = self.process(event)? {
                        sink.deliver(&delta);
                        delivered += 1;
                    }
                }
                Err(TryRecvError::Empty) => {
                    self.check_missed()?;
                    break;
                }
                Err(TryRecvError::Disconnected) => {
                    self.check_missed()?;
                    self.terminate("source disconnected");
                }
            }
        }

        Ok(delivered)
    }

    /// Wait up to `timeout` for the next event and apply it.
    ///
    /// `Ok(None)` means nothing changed: a timeout, an absorbed event, or
    /// termination.
    pub fn next_delta(&mut self, timeout: Duration) -> Result<Option<StructuralDelta<T>>> {
        if !self.is_active() {
            return Ok(None);
        }

        match self.handle.recv_timeout(timeout) {
            Ok(event) => self.process(event),
            Err(RecvTimeoutError::Timeout) => {
                self.check_missed()?;
                Ok(None)
            }
            Err(RecvTimeoutError::Disconnected) => {
                self.check_missed()?;
                self.terminate("source disconnected");
                Ok(None)
            }
        }
    }

    /// Stop listening. The collection stays queryable.
    pub fn cancel(&mut self) {
        if self.is_active() {
            self.handle.cancel();
            self.terminate("cancelled");
        }
    }

    /// Skips the hub has not announced yet count as well once the queue
    /// runs dry.
    fn check_missed(&mut self) -> Result<()> {
        match self.handle.missed_events() {
            0 => Ok(()),
            missed => Err(self.diverge(missed)),
        }
    }

    fn diverge(&mut self, missed: u64) -> CollectionError {
        warn!(location = %self.location(), missed, "events missed, live collection diverged");
        self.handle.cancel();
        self.state = LiveState::Terminated;
        CollectionError::Diverged { missed }
    }

    fn terminate(&mut self, why: &str) {
        debug!(location = %self.location(), why, "live collection terminated");
        self.state = LiveState::Terminated;
    }
}
