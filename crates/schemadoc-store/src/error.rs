//! Store error types for schemadoc-store.
//!
//! [`StoreError`] covers malformed documents, unreachable conversions and
//! everything the schema graph can report, via [`CoreError`].

use schemadoc_core::{CoreError, SchemaId};
use thiserror::Error;

/// Errors produced by document store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A serialized document does not have the expected structure.
    #[error("malformed document: {reason}")]
    MalformedDocument { reason: String },

    /// A log entry's schema cannot be converted to the requested target.
    #[error("no conversion path from {origin} to {target}")]
    NoConversionPath { origin: SchemaId, target: SchemaId },

    /// A schema graph or patch primitive failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
