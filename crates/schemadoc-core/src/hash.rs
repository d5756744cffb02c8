//! Deterministic schema identity derivation using blake3.
//!
//! Identities are pure functions of their inputs, so two independent
//! graphs that register the same lens on the same predecessor agree on
//! the resulting identity without coordinating.
//!
//! - **Lineage root**: `H("schemadoc.lineage" ‖ ROOT ‖ name)`
//! - **Version**: `H("schemadoc.version" ‖ predecessor ‖ canonical(lens))`
//!
//! The leading domain tags keep a lineage name from ever colliding with a
//! lens encoding. Lens bytes come from [`Lens::canonical_bytes`].

use crate::id::SchemaId;
use crate::lens::Lens;

const LINEAGE_DOMAIN: &[u8] = b"schemadoc.lineage";
const VERSION_DOMAIN: &[u8] = b"schemadoc.version";

/// Identity of the first version of lineage `name`.
pub fn lineage_root_id(name: &str) -> SchemaId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(LINEAGE_DOMAIN);
    hasher.update(SchemaId::ROOT.as_bytes());
    hasher.update(&(name.len() as u64).to_le_bytes());
    hasher.update(name.as_bytes());
    hasher.finalize().into()
}

/// Identity produced by applying `lens` on top of `predecessor`.
pub fn version_id(predecessor: SchemaId, lens: &Lens) -> SchemaId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(VERSION_DOMAIN);
    hasher.update(predecessor.as_bytes());
    hasher.update(&lens.canonical_bytes());
    hasher.finalize().into()
}
