//! Ordered live collection.
//!
//! Children arrive as add/change/remove/move events, each naming the
//! sibling it should follow. The collection keeps them in that order and
//! reports every change as a positional delta.

mod ordered;
mod snapshot;

pub use ordered::OrderedCollection;
pub use snapshot::CollectionSnapshot;
