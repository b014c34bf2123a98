//! Subscription system for child events.
//!
//! A transport pushes backend notifications into a [`ChildEventSource`];
//! consumers subscribe per location and read events from a bounded channel:
//! - Events arrive in publish order
//! - Slow consumers either lose events or are dropped, per [`OverflowPolicy`]
//! - Upstream failure ends every subscription on the location
//!
//! # Example
//!
//! ```ignore
//! let source = ChildEventSource::new();
//! let handle = source.subscribe("chats/general", SubscriptionConfig::default());
//!
//! loop {
//!     match handle.recv() {
//!         Ok(SourceEvent::Child { event }) => println!("{} {}", event.kind, event.key),
//!         Ok(SourceEvent::Failed { reason }) => break,
//!         Ok(_) | Err(_) => break,
//!     }
//! }
//! ```

mod manager;
mod types;

pub use manager::ChildEventSource;
pub use types::{
    DropReason, OverflowPolicy, SourceEvent, SubscriptionConfig, SubscriptionHandle,
    SubscriptionId,
};
