//! Patch-log document store for schemadoc.
//!
//! Documents are append-only logs of `(schema, patch)` entries. Reading a
//! document under any registered schema replays the log through the lens
//! graph held by [`DocumentStore`]; writing appends one entry tagged with
//! the writer's schema. Existing entries are never migrated or rewritten.
//!
//! # Modules
//!
//! - [`error`]: StoreError enum with all failure modes
//! - [`config`]: read and lineage policies, environment loading
//! - [`document`]: Document and PatchEntry
//! - [`store`]: DocumentStore with `init_doc`, `read_as`, `change_typed_doc`

pub mod config;
pub mod document;
pub mod error;
pub mod store;

// Re-export key types for ergonomic use.
pub use config::{LineagePolicy, ReadPolicy, StoreConfig};
pub use document::{Document, PatchEntry};
pub use error::StoreError;
pub use store::DocumentStore;
