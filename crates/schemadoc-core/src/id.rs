//! Content-derived schema identities.
//!
//! A [`SchemaId`] is the 32-byte blake3 digest produced by
//! [`crate::hash`]. It is `Copy`, totally ordered, and serializes as a
//! lowercase hex string so it can be used as a JSON map key.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

/// Identity of one schema version.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId([u8; 32]);

impl SchemaId {
    /// The sentinel every lineage root descends from.
    pub const ROOT: SchemaId = SchemaId([0; 32]);

    /// Wraps raw digest bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        SchemaId(bytes)
    }

    /// Returns the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        *self == Self::ROOT
    }

    /// Lowercase hex encoding (64 characters).
    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }

    /// First 12 hex characters, for log lines.
    pub fn short(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(12);
        hex
    }
}

impl From<blake3::Hash> for SchemaId {
    fn from(hash: blake3::Hash) -> Self {
        SchemaId(*hash.as_bytes())
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SchemaId({})", self.short())
    }
}

impl FromStr for SchemaId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        blake3::Hash::from_hex(s)
            .map(SchemaId::from)
            .map_err(|_| CoreError::InvalidSchemaId {
                input: s.to_string(),
            })
    }
}

impl Serialize for SchemaId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for SchemaId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HexVisitor;

        impl Visitor<'_> for HexVisitor {
            type Value = SchemaId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a 64-character hex schema id")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<SchemaId, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(HexVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_is_all_zero() {
        assert_eq!(SchemaId::ROOT.as_bytes(), &[0u8; 32]);
        assert!(SchemaId::ROOT.is_root());
        assert_eq!(SchemaId::ROOT.to_hex(), "0".repeat(64));
    }

    #[test]
    fn hex_parse_roundtrip() {
        let id = SchemaId::from(blake3::hash(b"project"));
        let parsed: SchemaId = id.to_hex().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = "not-hex".parse::<SchemaId>().unwrap_err();
        assert!(matches!(err, CoreError::InvalidSchemaId { .. }));
    }

    #[test]
    fn serializes_as_hex_string() {
        let id = SchemaId::from(blake3::hash(b"x"));
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.to_hex()));
        let back: SchemaId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn debug_uses_short_form() {
        let id = SchemaId::from(blake3::hash(b"x"));
        assert_eq!(format!("{:?}", id), format!("SchemaId({})", &id.to_hex()[..12]));
    }
}
