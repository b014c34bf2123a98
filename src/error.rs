//! Error types for the live collection.

use crate::types::ChildKey;
use thiserror::Error;

/// Main error type for collection operations.
#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Index {index} out of range (len {len})")]
    OutOfRange { index: usize, len: usize },

    #[error("Key not found: {0}")]
    KeyNotFound(ChildKey),

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Unable to map payload for {key}: {source}")]
    Cast {
        key: ChildKey,
        #[source]
        source: CastError,
    },

    #[error("Event source failed: {0}")]
    Source(String),

    #[error("Missed {missed} events, collection no longer matches its source")]
    Diverged { missed: u64 },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CollectionError {
    fn from(e: serde_json::Error) -> Self {
        CollectionError::Serialization(e.to_string())
    }
}

/// Failure to turn a raw payload into a typed item.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CastError {
    /// The payload was null or missing.
    #[error("no value present for {target}")]
    Absent { target: &'static str },

    /// The payload was present but did not fit the target type.
    #[error("unable to cast payload to {target}: {reason}")]
    Mismatch { target: &'static str, reason: String },
}

/// Result type for collection operations.
pub type Result<T> = std::result::Result<T, CollectionError>;
