//! Core error types for schemadoc-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering the
//! failure modes of the schema graph, lens evaluation and patch primitives.

use thiserror::Error;

use crate::id::SchemaId;

/// Core errors produced by the schemadoc-core crate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// A lineage name has no registered head.
    #[error("unknown lineage: '{name}'")]
    UnknownLineage { name: String },

    /// A lineage was re-created while the store rejects re-rooting.
    #[error("lineage already exists: '{name}' (head {head})")]
    LineageExists { name: String, head: SchemaId },

    /// A schema identity is not registered in the graph.
    #[error("unknown schema: {id}")]
    UnknownSchema { id: SchemaId },

    /// No lens path connects the two identities in either direction.
    #[error("no lens path from {from} to {to}")]
    NoPathFound { from: SchemaId, to: SchemaId },

    /// A lens cannot be applied to the shape it was registered against.
    #[error("invalid lens: {reason}")]
    InvalidLens { reason: String },

    /// A patch operation cannot be applied to the current value.
    #[error("invalid patch at '{path}': {reason}")]
    InvalidPatch { path: String, reason: String },

    /// A string is not a 64-character hex schema identity.
    #[error("invalid schema id '{input}'")]
    InvalidSchemaId { input: String },

    /// A string is not a valid JSON pointer.
    #[error("invalid JSON pointer '{pointer}'")]
    InvalidPointer { pointer: String },
}

impl CoreError {
    pub(crate) fn invalid_lens(reason: impl Into<String>) -> Self {
        CoreError::InvalidLens {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_patch(path: impl ToString, reason: impl Into<String>) -> Self {
        CoreError::InvalidPatch {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}
