//! Ordered collection kept in sync with child events.

use crate::error::{CollectionError, Result};
use crate::types::{ChildEvent, ChildKey, EventKind, StructuralDelta};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tracing::{debug, warn};

use super::snapshot::CollectionSnapshot;

/// An ordered, key-addressable mirror of a remote collection.
///
/// Mutated only through [`OrderedCollection::apply`]. Three structures are
/// kept in lockstep:
/// - `keys`: the total order of children
/// - `items`: key -> item
/// - `positions`: key -> index into `keys`
///
/// Not synchronized. One caller drives it with events in delivery order.
#[derive(Clone, Debug)]
pub struct OrderedCollection<T> {
    keys: Vec<ChildKey>,
    items: HashMap<ChildKey, T>,
    positions: HashMap<ChildKey, usize>,
}

impl<T> OrderedCollection<T> {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self {
            keys: Vec::new(),
            items: HashMap::new(),
            positions: HashMap::new(),
        }
    }

    /// Rebuild a collection from saved keys and a parallel item list.
    pub fn from_snapshot(keys: Vec<ChildKey>, items: Vec<T>) -> Result<Self> {
        if keys.len() != items.len() {
            return Err(CollectionError::InvalidSnapshot(format!(
                "{} keys but {} items",
                keys.len(),
                items.len()
            )));
        }

        let mut by_key = HashMap::with_capacity(keys.len());
        for (key, item) in keys.iter().cloned().zip(items) {
            match by_key.entry(key) {
                Entry::Occupied(e) => {
                    return Err(CollectionError::InvalidSnapshot(format!(
                        "duplicate key {}",
                        e.key()
                    )))
                }
                Entry::Vacant(e) => {
                    e.insert(item);
                }
            }
        }

        Ok(Self::assemble(keys, by_key))
    }

    /// Rebuild a collection from saved keys and a key -> item map.
    pub fn from_keyed(keys: Vec<ChildKey>, mut items: HashMap<ChildKey, T>) -> Result<Self> {
        if keys.len() != items.len() {
            return Err(CollectionError::InvalidSnapshot(format!(
                "{} keys but {} items",
                keys.len(),
                items.len()
            )));
        }

        let mut by_key = HashMap::with_capacity(keys.len());
        for key in &keys {
            let item = items.remove(key).ok_or_else(|| {
                CollectionError::InvalidSnapshot(format!("no item for key {}", key))
            })?;
            if by_key.insert(key.clone(), item).is_some() {
                return Err(CollectionError::InvalidSnapshot(format!(
                    "duplicate key {}",
                    key
                )));
            }
        }

        Ok(Self::assemble(keys, by_key))
    }

    /// Rebuild a collection from a [`CollectionSnapshot`].
    pub fn restore(snapshot: CollectionSnapshot<T>) -> Result<Self> {
        Self::from_snapshot(snapshot.keys, snapshot.items)
    }

    fn assemble(keys: Vec<ChildKey>, items: HashMap<ChildKey, T>) -> Self {
        let positions = keys
            .iter()
            .enumerate()
            .map(|(i, k)| (k.clone(), i))
            .collect();
        Self {
            keys,
            items,
            positions,
        }
    }

    // --- Accessors ---

    /// Number of children.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True if there are no children.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// True if `key` is currently in the collection.
    pub fn contains_key(&self, key: &str) -> bool {
        self.positions.contains_key(key)
    }

    /// Item at `index`.
    pub fn item_at(&self, index: usize) -> Result<&T> {
        let key = self.key_at(index)?;
        Ok(&self.items[key])
    }

    /// Key at `index`.
    pub fn key_at(&self, index: usize) -> Result<&ChildKey> {
        self.keys.get(index).ok_or(CollectionError::OutOfRange {
            index,
            len: self.keys.len(),
        })
    }

    /// Item stored under `key`.
    pub fn item_for_key(&self, key: &str) -> Result<&T> {
        self.items
            .get(key)
            .ok_or_else(|| CollectionError::KeyNotFound(ChildKey::from(key)))
    }

    /// Current position of `key`, if present.
    pub fn index_for_key(&self, key: &str) -> Option<usize> {
        self.positions.get(key).copied()
    }

    /// Keys in order.
    pub fn keys(&self) -> &[ChildKey] {
        &self.keys
    }

    /// Items in order.
    pub fn items(&self) -> impl Iterator<Item = &T> + '_ {
        self.keys.iter().map(move |k| &self.items[k])
    }

    /// `(key, item)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&ChildKey, &T)> + '_ {
        self.keys.iter().map(move |k| (k, &self.items[k]))
    }

    // --- Mutation helpers ---

    /// Index a new child goes to, given the sibling it should follow.
    /// Unknown anchors fall back to the end.
    fn target_index(&self, anchor: Option<&ChildKey>) -> usize {
        match anchor {
            None => 0,
            Some(anchor) => match self.positions.get(anchor) {
                Some(&i) => i + 1,
                None => {
                    debug!(anchor = %anchor, "anchor not present, placing at end");
                    self.keys.len()
                }
            },
        }
    }

    /// Refresh `positions` for every key at or after `from`.
    fn reindex(&mut self, from: usize) {
        for (i, key) in self.keys.iter().enumerate().skip(from) {
            if let Some(slot) = self.positions.get_mut(key) {
                *slot = i;
            } else {
                self.positions.insert(key.clone(), i);
            }
        }
    }

    fn insert_at(&mut self, index: usize, key: ChildKey, item: T) {
        self.keys.insert(index, key.clone());
        self.items.insert(key, item);
        self.reindex(index);
    }

    /// Take `key` out of the order only; its item stays in `items`.
    fn detach(&mut self, key: &ChildKey) -> Option<usize> {
        let index = self.positions.remove(key)?;
        self.keys.remove(index);
        self.reindex(index);
        Some(index)
    }

    /// Snapshot of the current state.
    pub fn snapshot(&self) -> CollectionSnapshot<T>
    where
        T: Clone,
    {
        CollectionSnapshot::new(self.keys.clone(), self.items().cloned().collect())
    }

    /// Consume the collection into a snapshot.
    pub fn into_snapshot(mut self) -> CollectionSnapshot<T> {
        let items = self
            .keys
            .iter()
            .filter_map(|k| self.items.remove(k))
            .collect();
        CollectionSnapshot::new(self.keys, items)
    }

    #[cfg(test)]
    pub(crate) fn is_consistent(&self) -> bool {
        self.keys.len() == self.items.len()
            && self.keys.len() == self.positions.len()
            && self
                .keys
                .iter()
                .enumerate()
                .all(|(i, k)| self.items.contains_key(k) && self.positions.get(k) == Some(&i))
    }
}

impl<T: Clone> OrderedCollection<T> {
    /// Apply one child event.
    ///
    /// Returns the structural delta a consumer must mirror, or `None` if the
    /// event was absorbed without changing anything (duplicate add, change or
    /// removal of an unknown key, payload-less add).
    pub fn apply(&mut self, event: ChildEvent<T>) -> Option<StructuralDelta<T>> {
        let ChildEvent {
            key,
            payload,
            anchor,
            kind,
        } = event;

        match kind {
            EventKind::Added => self.add(key, payload, anchor.as_ref()),
            EventKind::Changed => self.change(key, payload),
            EventKind::Removed => self.remove(key),
            EventKind::Moved => self.relocate(key, payload, anchor.as_ref()),
        }
    }

    fn add(
        &mut self,
        key: ChildKey,
        payload: Option<T>,
        anchor: Option<&ChildKey>,
    ) -> Option<StructuralDelta<T>> {
        if self.positions.contains_key(&key) {
            debug!(key = %key, "duplicate add ignored");
            return None;
        }
        let Some(item) = payload else {
            warn!(key = %key, "add without payload ignored");
            return None;
        };

        let index = self.target_index(anchor);
        self.insert_at(index, key.clone(), item.clone());
        debug!(key = %key, index, "inserted child");

        Some(StructuralDelta::InsertedAt { index, item, key })
    }

    fn change(&mut self, key: ChildKey, payload: Option<T>) -> Option<StructuralDelta<T>> {
        let Some(&index) = self.positions.get(&key) else {
            debug!(key = %key, "change of unknown key ignored");
            return None;
        };
        let Some(new) = payload else {
            warn!(key = %key, "change without payload ignored");
            return None;
        };

        let slot = self.items.get_mut(&key)?;
        let old = std::mem::replace(slot, new.clone());
        debug!(key = %key, index, "updated child");

        Some(StructuralDelta::UpdatedAt {
            index,
            old,
            new,
            key,
        })
    }

    fn remove(&mut self, key: ChildKey) -> Option<StructuralDelta<T>> {
        let Some(index) = self.detach(&key) else {
            debug!(key = %key, "removal of unknown key ignored");
            return None;
        };
        let item = self.items.remove(&key)?;
        debug!(key = %key, index, "removed child");

        Some(StructuralDelta::RemovedAt { index, item, key })
    }

    fn relocate(
        &mut self,
        key: ChildKey,
        payload: Option<T>,
        anchor: Option<&ChildKey>,
    ) -> Option<StructuralDelta<T>> {
        let Some(from) = self.detach(&key) else {
            debug!(key = %key, "move of unknown key treated as add");
            return self.add(key, payload, anchor);
        };

        // Anchor is resolved against the order with `key` already taken out.
        let to = self.target_index(anchor);
        self.keys.insert(to, key.clone());
        self.reindex(to);

        let slot = self.items.get_mut(&key)?;
        if let Some(item) = payload {
            *slot = item;
        }
        let item = slot.clone();
        debug!(key = %key, from, to, "moved child");

        Some(StructuralDelta::MovedFromTo { from, to, item, key })
    }
}

impl<T: PartialEq> OrderedCollection<T> {
    /// Position of the first item equal to `item`.
    pub fn position_for_item(&self, item: &T) -> Option<usize> {
        self.items().position(|candidate| candidate == item)
    }

    pub fn contains_item(&self, item: &T) -> bool {
        self.items.values().any(|candidate| candidate == item)
    }
}

impl<T> Default for OrderedCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}
