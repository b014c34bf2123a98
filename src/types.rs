//! Core types for the live collection.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Key of a child within a remote collection.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChildKey(pub String);

impl ChildKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ChildKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChildKey({})", self.0)
    }
}

impl fmt::Display for ChildKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ChildKey {
    fn from(s: &str) -> Self {
        ChildKey(s.to_string())
    }
}

impl From<String> for ChildKey {
    fn from(s: String) -> Self {
        ChildKey(s)
    }
}

impl Borrow<str> for ChildKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// What happened to a child.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Added,
    Changed,
    Removed,
    Moved,
}

/// A single structural notification about one child of a remote collection.
///
/// `P` is the payload type: raw `serde_json::Value` as delivered by a
/// transport, or a typed item once mapped.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChildEvent<P> {
    /// Key of the child this event is about.
    pub key: ChildKey,

    /// Value carried by the event. Removals may omit it.
    pub payload: Option<P>,

    /// Key of the sibling this child sits right after (None = first).
    pub anchor: Option<ChildKey>,

    pub kind: EventKind,
}

impl<P> ChildEvent<P> {
    pub fn added(key: impl Into<ChildKey>, payload: P, anchor: Option<&str>) -> Self {
        Self {
            key: key.into(),
            payload: Some(payload),
            anchor: anchor.map(ChildKey::from),
            kind: EventKind::Added,
        }
    }

    pub fn changed(key: impl Into<ChildKey>, payload: P, anchor: Option<&str>) -> Self {
        Self {
            key: key.into(),
            payload: Some(payload),
            anchor: anchor.map(ChildKey::from),
            kind: EventKind::Changed,
        }
    }

    pub fn removed(key: impl Into<ChildKey>) -> Self {
        Self {
            key: key.into(),
            payload: None,
            anchor: None,
            kind: EventKind::Removed,
        }
    }

    pub fn moved(key: impl Into<ChildKey>, payload: Option<P>, anchor: Option<&str>) -> Self {
        Self {
            key: key.into(),
            payload,
            anchor: anchor.map(ChildKey::from),
            kind: EventKind::Moved,
        }
    }

    /// Replace the payload, keeping key, anchor and kind.
    pub fn with_payload<U>(self, payload: Option<U>) -> ChildEvent<U> {
        ChildEvent {
            key: self.key,
            payload,
            anchor: self.anchor,
            kind: self.kind,
        }
    }
}

/// How a consumer's ordered presentation must change after one event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StructuralDelta<T> {
    InsertedAt {
        index: usize,
        item: T,
        key: ChildKey,
    },
    UpdatedAt {
        index: usize,
        old: T,
        new: T,
        key: ChildKey,
    },
    RemovedAt {
        index: usize,
        item: T,
        key: ChildKey,
    },
    MovedFromTo {
        from: usize,
        to: usize,
        item: T,
        key: ChildKey,
    },
}

impl<T> StructuralDelta<T> {
    /// Key of the child the delta is about.
    pub fn key(&self) -> &ChildKey {
        match self {
            Self::InsertedAt { key, .. } => key,
            Self::UpdatedAt { key, .. } => key,
            Self::RemovedAt { key, .. } => key,
            Self::MovedFromTo { key, .. } => key,
        }
    }

    /// Position the child occupies after the delta (None once removed).
    pub fn final_index(&self) -> Option<usize> {
        match self {
            Self::InsertedAt { index, .. } => Some(*index),
            Self::UpdatedAt { index, .. } => Some(*index),
            Self::RemovedAt { .. } => None,
            Self::MovedFromTo { to, .. } => Some(*to),
        }
    }
}
