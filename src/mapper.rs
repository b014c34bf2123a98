//! Typed mapping of raw payloads.
//!
//! Transports deliver payloads as `serde_json::Value`. A [`PayloadMapper`]
//! turns them into the collection's item type before the event is applied,
//! so a collection never sees a payload it cannot hold.

use crate::error::{CastError, CollectionError, Result};
use crate::types::{ChildEvent, ChildKey, EventKind};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::type_name;
use std::marker::PhantomData;

/// Strategy for turning a raw payload into an item.
pub trait PayloadMapper<T> {
    fn map(&self, raw: &Value) -> std::result::Result<T, CastError>;
}

/// Maps payloads through `serde`.
///
/// JSON `null` is reported as [`CastError::Absent`] rather than handed to
/// the deserializer, so `Option<T>` targets still reject a missing child.
pub struct JsonMapper<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonMapper<T> {
    /// Create a mapper for `T`.
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonMapper<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DeserializeOwned> PayloadMapper<T> for JsonMapper<T> {
    fn map(&self, raw: &Value) -> std::result::Result<T, CastError> {
        if raw.is_null() {
            return Err(CastError::Absent {
                target: type_name::<T>(),
            });
        }
        T::deserialize(raw).map_err(|e| CastError::Mismatch {
            target: type_name::<T>(),
            reason: e.to_string(),
        })
    }
}

/// Adapts a closure into a [`PayloadMapper`].
pub struct FnMapper<F>(pub F);

impl<T, F> PayloadMapper<T> for FnMapper<F>
where
    F: Fn(&Value) -> std::result::Result<T, CastError>,
{
    fn map(&self, raw: &Value) -> std::result::Result<T, CastError> {
        (self.0)(raw)
    }
}

/// Map the payload of a raw child event.
///
/// Removals never need a payload, so theirs is dropped unmapped. Events that
/// carry no payload stay payload-less.
pub fn map_child_event<T, M>(mapper: &M, event: ChildEvent<Value>) -> Result<ChildEvent<T>>
where
    M: PayloadMapper<T> + ?Sized,
{
    let payload = match (event.kind, event.payload.as_ref()) {
        (EventKind::Removed, _) | (_, None) => None,
        (_, Some(raw)) => Some(mapper.map(raw).map_err(|source| CollectionError::Cast {
            key: event.key.clone(),
            source,
        })?),
    };
    Ok(event.with_payload(payload))
}

/// Map every child of an array or object payload, in order.
///
/// Object children keep the order the payload listed them in, not key
/// order. `null` has no children and maps to an empty list.
pub fn list_of<T, M>(mapper: &M, raw: &Value) -> std::result::Result<Vec<T>, CastError>
where
    M: PayloadMapper<T> + ?Sized,
{
    match raw {
        Value::Null => Ok(Vec::new()),
        Value::Array(children) => children.iter().map(|c| mapper.map(c)).collect(),
        Value::Object(children) => children.values().map(|c| mapper.map(c)).collect(),
        other => Err(CastError::Mismatch {
            target: type_name::<Vec<T>>(),
            reason: format!("expected children, found {}", kind_of(other)),
        }),
    }
}

/// Map every child of an object payload to a `(key, item)` pair, in payload
/// order.
pub fn map_of<T, M>(mapper: &M, raw: &Value) -> std::result::Result<Vec<(ChildKey, T)>, CastError>
where
    M: PayloadMapper<T> + ?Sized,
{
    match raw {
        Value::Null => Ok(Vec::new()),
        Value::Object(children) => children
            .iter()
            .map(|(key, c)| mapper.map(c).map(|item| (ChildKey::from(key.as_str()), item)))
            .collect(),
        other => Err(CastError::Mismatch {
            target: type_name::<Vec<(ChildKey, T)>>(),
            reason: format!("expected keyed children, found {}", kind_of(other)),
        }),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
