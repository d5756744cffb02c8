//! Schema shapes: the JSON-schema-like structure associated with a schema
//! identity.
//!
//! Shapes are evolved by lenses. Registration evolves strictly
//! ([`Shape::evolve`]), so a lens that renames a missing property or adds
//! one twice is rejected before it reaches the graph. Patch conversion
//! evolves leniently, skipping steps that do not fit, because a lens path
//! may cross edges spliced in with [`crate::graph::SchemaGraph::connect`]
//! whose lens was never checked against the shapes on either side.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::lens::{DataType, Lens, LensOp, PropertySpec};
use crate::pointer::JsonPointer;

/// The structure of a value under some schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Shape {
    Any,
    Null,
    Boolean,
    Number,
    String,
    Array { items: Box<Shape> },
    Object { properties: IndexMap<String, Property> },
}

/// A named slot of an object shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub shape: Shape,
    /// Explicit default; falls back to the shape's type default.
    #[serde(
        default,
        deserialize_with = "crate::lens::explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<Value>,
}

impl Property {
    pub fn default_value(&self) -> Value {
        self.default
            .clone()
            .unwrap_or_else(|| self.shape.default_value())
    }

    fn from_spec(spec: &PropertySpec) -> Property {
        let shape = match spec.data_type {
            DataType::Array => Shape::Array {
                items: Box::new(spec.items.map(Shape::of_type).unwrap_or(Shape::Any)),
            },
            other => Shape::of_type(other),
        };
        Property {
            shape,
            default: spec.default.clone(),
        }
    }
}

impl Default for Shape {
    fn default() -> Self {
        Shape::empty_object()
    }
}

impl Shape {
    /// An object with no properties: the shape of the sentinel root.
    pub fn empty_object() -> Self {
        Shape::Object {
            properties: IndexMap::new(),
        }
    }

    pub fn of_type(data_type: DataType) -> Self {
        match data_type {
            DataType::String => Shape::String,
            DataType::Number => Shape::Number,
            DataType::Boolean => Shape::Boolean,
            DataType::Null => Shape::Null,
            DataType::Array => Shape::Array {
                items: Box::new(Shape::Any),
            },
            DataType::Object => Shape::empty_object(),
        }
    }

    pub fn properties(&self) -> Option<&IndexMap<String, Property>> {
        match self {
            Shape::Object { properties } => Some(properties),
            _ => None,
        }
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties()?.get(name)
    }

    /// The value this shape takes when nothing was written, with nested
    /// object defaults filled in.
    pub fn default_value(&self) -> Value {
        match self {
            Shape::Any | Shape::Null => Value::Null,
            Shape::Boolean => Value::Bool(false),
            Shape::Number => Value::from(0),
            Shape::String => Value::String(String::new()),
            Shape::Array { .. } => Value::Array(Vec::new()),
            Shape::Object { properties } => Value::Object(
                properties
                    .iter()
                    .map(|(name, prop)| (name.clone(), prop.default_value()))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }

    /// The sub-shape addressed by `pointer`. Array elements are addressed by
    /// any segment; `Any` absorbs every further segment.
    pub fn at(&self, pointer: &JsonPointer) -> Option<&Shape> {
        let mut current = self;
        for segment in pointer.segments() {
            current = match current {
                Shape::Object { properties } => &properties.get(segment)?.shape,
                Shape::Array { items } => &**items,
                Shape::Any => return Some(current),
                _ => return None,
            };
        }
        Some(current)
    }

    /// Evolves this shape through `lens`, rejecting steps that do not apply.
    pub fn evolve(&self, lens: &Lens) -> Result<Shape, CoreError> {
        let mut out = self.clone();
        out.apply_lens(lens, true)?;
        Ok(out)
    }

    /// Evolves this shape through `lens`, skipping steps that do not apply.
    pub fn evolve_lenient(&self, lens: &Lens) -> Shape {
        let mut out = self.clone();
        // Lenient mode never reports an error.
        let _ = out.apply_lens(lens, false);
        out
    }

    fn apply_lens(&mut self, lens: &Lens, strict: bool) -> Result<(), CoreError> {
        for op in lens.ops() {
            self.apply_op(op, strict)?;
        }
        Ok(())
    }

    fn apply_op(&mut self, op: &LensOp, strict: bool) -> Result<(), CoreError> {
        if let LensOp::Map { lens } = op {
            return match self {
                Shape::Array { items } => items.apply_lens(lens, strict),
                other => reject(strict, format!("map applied to non-array shape {other:?}")),
            };
        }

        let Shape::Object { properties } = self else {
            return reject(strict, format!("{} applied to a non-object shape", op_name(op)));
        };

        match op {
            LensOp::Add(spec) => {
                if properties.contains_key(&spec.name) && strict {
                    return reject(strict, format!("property '{}' already exists", spec.name));
                }
                properties.insert(spec.name.clone(), Property::from_spec(spec));
            }
            LensOp::Remove(spec) => {
                if properties.shift_remove(&spec.name).is_none() {
                    return reject(strict, format!("cannot remove missing property '{}'", spec.name));
                }
            }
            LensOp::Rename {
                source,
                destination,
            } => {
                if !properties.contains_key(source) {
                    return reject(strict, format!("cannot rename missing property '{source}'"));
                }
                if properties.contains_key(destination) {
                    return reject(strict, format!("rename target '{destination}' already exists"));
                }
                *properties = std::mem::take(properties)
                    .into_iter()
                    .map(|(k, v)| if &k == source { (destination.clone(), v) } else { (k, v) })
                    .collect();
            }
            LensOp::Hoist { host, name } => {
                let lifted = match properties.get_mut(host).map(|p| &mut p.shape) {
                    Some(Shape::Object { properties: inner }) => inner.shift_remove(name),
                    _ => None,
                };
                match lifted {
                    Some(prop) => {
                        properties.insert(name.clone(), prop);
                    }
                    None => return reject(strict, format!("cannot hoist '{host}.{name}'")),
                }
            }
            LensOp::Plunge { host, name } => {
                if !matches!(
                    properties.get(host).map(|p| &p.shape),
                    Some(Shape::Object { .. })
                ) {
                    return reject(strict, format!("plunge host '{host}' is not an object"));
                }
                let Some(prop) = properties.shift_remove(name) else {
                    return reject(strict, format!("cannot plunge missing property '{name}'"));
                };
                if let Some(Shape::Object { properties: inner }) =
                    properties.get_mut(host).map(|p| &mut p.shape)
                {
                    inner.insert(name.clone(), prop);
                }
            }
            LensOp::In { name, lens } => match properties.get_mut(name) {
                Some(prop) => prop.shape.apply_lens(lens, strict)?,
                None => return reject(strict, format!("'in' targets missing property '{name}'")),
            },
            LensOp::Convert {
                name,
                forward,
                destination_type,
                ..
            } => {
                let Some(prop) = properties.get_mut(name) else {
                    return reject(strict, format!("cannot convert missing property '{name}'"));
                };
                if let Some(dt) = destination_type {
                    prop.shape = Shape::of_type(*dt);
                }
                prop.default = prop.default.as_ref().map(|d| forward.map(d));
            }
            LensOp::Map { .. } => unreachable!("handled above"),
        }
        Ok(())
    }
}

fn reject(strict: bool, reason: String) -> Result<(), CoreError> {
    if strict {
        Err(CoreError::invalid_lens(reason))
    } else {
        Ok(())
    }
}

fn op_name(op: &LensOp) -> &'static str {
    match op {
        LensOp::Add(_) => "add",
        LensOp::Remove(_) => "remove",
        LensOp::Rename { .. } => "rename",
        LensOp::Hoist { .. } => "hoist",
        LensOp::Plunge { .. } => "plunge",
        LensOp::In { .. } => "in",
        LensOp::Map { .. } => "map",
        LensOp::Convert { .. } => "convert",
    }
}
