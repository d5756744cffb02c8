//! Patch-log documents.
//!
//! A [`Document`] is nothing but its ordered, append-only list of
//! [`PatchEntry`]s. There is no cached materialized value: what a document
//! "contains" under some schema is always recomputed from the log by
//! [`crate::DocumentStore::read_as`].

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use schemadoc_core::{Patch, SchemaId};

use crate::error::StoreError;

/// One write: the schema it was made under and the patch it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchEntry {
    pub schema: SchemaId,
    pub patch: Patch,
}

/// An append-only log of patch entries.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    entries: Vec<PatchEntry>,
}

impl Document {
    /// Returns the log entries in write order.
    pub fn entries(&self) -> &[PatchEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends one entry. Only the store calls this; entries are never
    /// edited or removed.
    pub(crate) fn push(&mut self, entry: PatchEntry) {
        self.entries.push(entry);
    }

    /// Parses a document from its JSON form, rejecting structurally
    /// invalid logs with [`StoreError::MalformedDocument`].
    pub fn from_json(value: &Value) -> Result<Self, StoreError> {
        let Some(object) = value.as_object() else {
            return Err(malformed("document is not a JSON object"));
        };
        let Some(entries) = object.get("entries") else {
            return Err(malformed("missing 'entries' field"));
        };
        if !entries.is_array() {
            return Err(malformed("'entries' is not an array"));
        }
        serde_json::from_value(value.clone()).map_err(|e| malformed(e.to_string()))
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).expect("Document serialization should never fail")
    }
}

impl FromStr for Document {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: Value = serde_json::from_str(s)?;
        Self::from_json(&value)
    }
}

fn malformed(reason: impl Into<String>) -> StoreError {
    StoreError::MalformedDocument {
        reason: reason.into(),
    }
}
