//! Schema graph and lens machinery for schemadoc.
//!
//! # Modules
//!
//! - [`id`]: content-derived [`SchemaId`]
//! - [`hash`]: blake3 identity derivation
//! - [`lens`]: reversible lens steps
//! - [`shape`]: schema shapes and their evolution under lenses
//! - [`pointer`], [`patch`]: JSON pointers, structural diff and apply
//! - [`convert`]: patch conversion along a lens path
//! - [`graph`], [`path`]: the schema graph and shortest lens-path search

pub mod convert;
pub mod error;
pub mod graph;
pub mod hash;
pub mod id;
pub mod lens;
pub mod patch;
pub mod path;
pub mod pointer;
pub mod shape;

// Re-export commonly used types
pub use convert::{convert_patch, convert_patch_to, evolve_along};
pub use error::CoreError;
pub use graph::{LineagePolicy, SchemaGraph};
pub use id::SchemaId;
pub use lens::{DataType, Lens, LensOp, PropertySpec, ValueMapping};
pub use patch::{apply, apply_creating_parents, diff, Patch, PatchOp};
pub use path::{find_lens_path, LensPath};
pub use pointer::JsonPointer;
pub use shape::Shape;
