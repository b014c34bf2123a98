//! # Live Collection
//!
//! An ordered, incrementally synchronized mirror of a remote collection,
//! driven by child add/change/remove/move notifications.
//!
//! ## Core Concepts
//!
//! - **Child events**: notifications naming a child, its value, and the
//!   sibling it sits after
//! - **Ordered collection**: applies events and reports positional deltas
//! - **Mappers**: typed conversion of raw JSON payloads
//! - **Subscriptions**: ordered per-location delivery from a transport
//!
//! ## Example
//!
//! ```ignore
//! use live_collection::{ChildEvent, ChildEventSource, JsonMapper, LiveCollection, SubscriptionConfig};
//!
//! let source = ChildEventSource::new();
//! let handle = source.subscribe("chats/general", SubscriptionConfig::default());
//! let mut live: LiveCollection<Message, _> = LiveCollection::new(handle, JsonMapper::new());
//!
//! // Transport side
//! source.publish("chats/general", ChildEvent::added("m1", json!({"text": "hi"}), None));
//!
//! // Consumer side
//! let mut deltas = Vec::new();
//! live.pump(&mut deltas)?;
//! ```

pub mod collection;
pub mod error;
pub mod live;
pub mod mapper;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use collection::{CollectionSnapshot, OrderedCollection};
pub use error::{CastError, CollectionError, Result};
pub use live::{DeltaSink, LiveCollection, LiveState};
pub use mapper::{list_of, map_child_event, map_of, FnMapper, JsonMapper, PayloadMapper};
pub use subscriptions::{
    ChildEventSource, DropReason, OverflowPolicy, SourceEvent, SubscriptionConfig,
    SubscriptionHandle, SubscriptionId,
};
pub use types::*;
