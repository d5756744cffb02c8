//! Lenses: declarative, reversible transformations between schema shapes.
//!
//! A [`Lens`] is an ordered list of [`LensOp`]s. Every op carries enough
//! information to be inverted, so every lens has a [`Lens::reverse`] that
//! undoes it. The serialized form is the canonical encoding hashed into
//! schema identities (see [`crate::hash`]), which is why lenses use only
//! `Vec` and `serde_json::Value` (sorted maps) and never `HashMap`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Primitive JSON data types a property can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    String,
    Number,
    Boolean,
    Object,
    Array,
    Null,
}

impl DataType {
    /// The value a property of this type takes when nothing was written.
    pub fn default_value(self) -> Value {
        match self {
            DataType::String => Value::String(String::new()),
            DataType::Number => Value::from(0),
            DataType::Boolean => Value::Bool(false),
            DataType::Object => Value::Object(Default::default()),
            DataType::Array => Value::Array(Vec::new()),
            DataType::Null => Value::Null,
        }
    }
}

/// A property declaration shared by `add` and `remove`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySpec {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
    /// Element type when `data_type` is `array`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<DataType>,
    #[serde(default, deserialize_with = "explicit_null", skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// Deserializes a present field as `Some`, so that `"default": null` stays
/// `Some(Value::Null)` and re-serializes to the same canonical bytes.
/// Pair with `#[serde(default)]` for the absent case.
pub(crate) fn explicit_null<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl PropertySpec {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        PropertySpec {
            name: name.into(),
            data_type,
            items: None,
            default: None,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_items(mut self, items: DataType) -> Self {
        self.items = Some(items);
        self
    }
}

/// One direction of a value conversion table.
///
/// Values are matched by equality; a value with no entry maps to `default`
/// when set and is passed through unchanged otherwise.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValueMapping {
    pub entries: Vec<(Value, Value)>,
    #[serde(default, deserialize_with = "explicit_null", skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ValueMapping {
    pub fn new(entries: impl IntoIterator<Item = (Value, Value)>) -> Self {
        ValueMapping {
            entries: entries.into_iter().collect(),
            default: None,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn map(&self, value: &Value) -> Value {
        self.entries
            .iter()
            .find(|(from, _)| from == value)
            .map(|(_, to)| to.clone())
            .or_else(|| self.default.clone())
            .unwrap_or_else(|| value.clone())
    }
}

/// A single step of a lens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum LensOp {
    /// Introduce a property.
    Add(PropertySpec),
    /// Drop a property. Carries the full declaration so it can be reversed.
    Remove(PropertySpec),
    Rename {
        source: String,
        destination: String,
    },
    /// Lift `host.name` to a top-level `name`.
    Hoist { host: String, name: String },
    /// Push a top-level `name` down into `host.name`.
    Plunge { host: String, name: String },
    /// Apply a nested lens inside the object property `name`.
    In { name: String, lens: Lens },
    /// Apply a nested lens to every element of the current array.
    Map { lens: Lens },
    /// Translate the values written to property `name`.
    Convert {
        name: String,
        forward: ValueMapping,
        reverse: ValueMapping,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source_type: Option<DataType>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        destination_type: Option<DataType>,
    },
}

impl LensOp {
    pub fn add(name: impl Into<String>, data_type: DataType) -> Self {
        LensOp::Add(PropertySpec::new(name, data_type))
    }

    pub fn remove(name: impl Into<String>, data_type: DataType) -> Self {
        LensOp::Remove(PropertySpec::new(name, data_type))
    }

    pub fn rename(source: impl Into<String>, destination: impl Into<String>) -> Self {
        LensOp::Rename {
            source: source.into(),
            destination: destination.into(),
        }
    }

    pub fn hoist(host: impl Into<String>, name: impl Into<String>) -> Self {
        LensOp::Hoist {
            host: host.into(),
            name: name.into(),
        }
    }

    pub fn plunge(host: impl Into<String>, name: impl Into<String>) -> Self {
        LensOp::Plunge {
            host: host.into(),
            name: name.into(),
        }
    }

    pub fn within(name: impl Into<String>, lens: impl Into<Lens>) -> Self {
        LensOp::In {
            name: name.into(),
            lens: lens.into(),
        }
    }

    pub fn map(lens: impl Into<Lens>) -> Self {
        LensOp::Map { lens: lens.into() }
    }

    /// The inverse step.
    pub fn reverse(&self) -> LensOp {
        match self {
            LensOp::Add(spec) => LensOp::Remove(spec.clone()),
            LensOp::Remove(spec) => LensOp::Add(spec.clone()),
            LensOp::Rename {
                source,
                destination,
            } => LensOp::Rename {
                source: destination.clone(),
                destination: source.clone(),
            },
            LensOp::Hoist { host, name } => LensOp::Plunge {
                host: host.clone(),
                name: name.clone(),
            },
            LensOp::Plunge { host, name } => LensOp::Hoist {
                host: host.clone(),
                name: name.clone(),
            },
            LensOp::In { name, lens } => LensOp::In {
                name: name.clone(),
                lens: lens.reverse(),
            },
            LensOp::Map { lens } => LensOp::Map {
                lens: lens.reverse(),
            },
            LensOp::Convert {
                name,
                forward,
                reverse,
                source_type,
                destination_type,
            } => LensOp::Convert {
                name: name.clone(),
                forward: reverse.clone(),
                reverse: forward.clone(),
                source_type: *destination_type,
                destination_type: *source_type,
            },
        }
    }
}

/// An ordered list of lens steps. The empty lens is the identity.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lens(Vec<LensOp>);

impl Lens {
    pub fn new(ops: Vec<LensOp>) -> Self {
        Lens(ops)
    }

    /// The identity lens.
    pub fn empty() -> Self {
        Lens(Vec::new())
    }

    pub fn ops(&self) -> &[LensOp] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The lens that undoes this one: steps reversed and each inverted.
    pub fn reverse(&self) -> Lens {
        Lens(self.0.iter().rev().map(LensOp::reverse).collect())
    }

    /// Canonical byte encoding used for identity derivation.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        // Lens contains only Vec and sorted-map Values, so this is stable.
        serde_json::to_vec(self).expect("Lens serialization should never fail")
    }
}

impl From<Vec<LensOp>> for Lens {
    fn from(ops: Vec<LensOp>) -> Self {
        Lens(ops)
    }
}

impl FromIterator<LensOp> for Lens {
    fn from_iter<I: IntoIterator<Item = LensOp>>(iter: I) -> Self {
        Lens(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reverse_inverts_and_reorders() {
        let lens = Lens::new(vec![
            LensOp::add("title", DataType::String),
            LensOp::rename("summary", "description"),
        ]);
        let rev = lens.reverse();
        assert_eq!(
            rev.ops(),
            &[
                LensOp::rename("description", "summary"),
                LensOp::remove("title", DataType::String),
            ]
        );
        assert_eq!(rev.reverse(), lens);
    }

    #[test]
    fn nested_lenses_reverse_recursively() {
        let lens = Lens::new(vec![LensOp::within(
            "tags",
            vec![LensOp::map(vec![LensOp::rename("label", "name")])],
        )]);
        let expected = Lens::new(vec![LensOp::within(
            "tags",
            vec![LensOp::map(vec![LensOp::rename("name", "label")])],
        )]);
        assert_eq!(lens.reverse(), expected);
    }

    #[test]
    fn convert_reverse_swaps_tables_and_types() {
        let op = LensOp::Convert {
            name: "status".into(),
            forward: ValueMapping::new([(json!(false), json!("todo"))]),
            reverse: ValueMapping::new([(json!("todo"), json!(false))]),
            source_type: Some(DataType::Boolean),
            destination_type: Some(DataType::String),
        };
        match op.reverse() {
            LensOp::Convert {
                forward,
                source_type,
                destination_type,
                ..
            } => {
                assert_eq!(forward.map(&json!("todo")), json!(false));
                assert_eq!(source_type, Some(DataType::String));
                assert_eq!(destination_type, Some(DataType::Boolean));
            }
            other => panic!("unexpected reverse: {:?}", other),
        }
    }

    #[test]
    fn value_mapping_falls_back_to_default_then_passthrough() {
        let m = ValueMapping::new([(json!("done"), json!(true))]);
        assert_eq!(m.map(&json!("done")), json!(true));
        assert_eq!(m.map(&json!("other")), json!("other"));
        let m = m.with_default(json!(false));
        assert_eq!(m.map(&json!("other")), json!(false));
    }

    #[test]
    fn serialized_form_is_tagged_by_op() {
        let lens = Lens::new(vec![
            LensOp::Add(PropertySpec::new("title", DataType::String).with_default(json!("untitled"))),
            LensOp::rename("a", "b"),
        ]);
        assert_eq!(
            serde_json::to_value(&lens).unwrap(),
            json!([
                {"op": "add", "name": "title", "type": "string", "default": "untitled"},
                {"op": "rename", "source": "a", "destination": "b"}
            ])
        );
    }

    #[test]
    fn canonical_bytes_are_stable() {
        let a = Lens::new(vec![LensOp::add("x", DataType::Number)]);
        let b: Lens = serde_json::from_slice(&a.canonical_bytes()).unwrap();
        assert_eq!(a.canonical_bytes(), b.canonical_bytes());
    }

    #[test]
    fn type_defaults() {
        assert_eq!(DataType::String.default_value(), json!(""));
        assert_eq!(DataType::Number.default_value(), json!(0));
        assert_eq!(DataType::Boolean.default_value(), json!(false));
        assert_eq!(DataType::Object.default_value(), json!({}));
        assert_eq!(DataType::Array.default_value(), json!([]));
        assert_eq!(DataType::Null.default_value(), json!(null));
    }

    #[test]
    fn explicit_null_default_survives_json() {
        let lens = Lens::new(vec![
            LensOp::Add(PropertySpec::new("x", DataType::Null).with_default(json!(null))),
            LensOp::add("y", DataType::String),
        ]);
        let text = serde_json::to_string(&lens).unwrap();
        let back: Lens = serde_json::from_str(&text).unwrap();
        assert_eq!(back, lens);
        assert_eq!(back.canonical_bytes(), lens.canonical_bytes());

        // Absent stays absent.
        let LensOp::Add(spec) = &back.ops()[1] else {
            panic!("expected add");
        };
        assert_eq!(spec.default, None);
    }
}
