//! Structural patches over JSON values.
//!
//! A [`Patch`] is an ordered list of [`PatchOp`]s in the RFC 6902 style
//! (`add`, `remove`, `replace`), addressed by [`JsonPointer`]. This module
//! provides the two primitives the document store is built on:
//!
//! - [`diff`] computes the patch that turns one snapshot into another.
//! - [`apply`] produces a new value from an existing one plus a patch,
//!   never mutating or aliasing its input.
//!
//! Application is lenient where concurrent writers under different schemas
//! routinely disagree: `replace` of a missing object key inserts it and
//! `remove` of a missing object key does nothing. A missing parent container
//! or an out-of-range array index is an error for [`apply`].
//! [`apply_creating_parents`] instead creates missing object parents, which
//! reads need when a lens moves a write under a host object that no entry
//! of the log ever created.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::pointer::JsonPointer;

/// A single structural edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOp {
    Add { path: JsonPointer, value: Value },
    Remove { path: JsonPointer },
    Replace { path: JsonPointer, value: Value },
}

/// An ordered sequence of structural edits.
pub type Patch = Vec<PatchOp>;

impl PatchOp {
    pub fn add(path: JsonPointer, value: Value) -> Self {
        PatchOp::Add { path, value }
    }

    pub fn remove(path: JsonPointer) -> Self {
        PatchOp::Remove { path }
    }

    pub fn replace(path: JsonPointer, value: Value) -> Self {
        PatchOp::Replace { path, value }
    }

    pub fn path(&self) -> &JsonPointer {
        match self {
            PatchOp::Add { path, .. } | PatchOp::Remove { path } | PatchOp::Replace { path, .. } => {
                path
            }
        }
    }

    /// The written value, if this op writes one.
    pub fn value(&self) -> Option<&Value> {
        match self {
            PatchOp::Add { value, .. } | PatchOp::Replace { value, .. } => Some(value),
            PatchOp::Remove { .. } => None,
        }
    }

    /// Returns the same op addressed at `path`.
    pub fn with_path(&self, path: JsonPointer) -> PatchOp {
        match self {
            PatchOp::Add { value, .. } => PatchOp::Add {
                path,
                value: value.clone(),
            },
            PatchOp::Remove { .. } => PatchOp::Remove { path },
            PatchOp::Replace { value, .. } => PatchOp::Replace {
                path,
                value: value.clone(),
            },
        }
    }

    /// Returns the same op with its written value replaced. Removes are
    /// returned unchanged.
    pub fn with_value(&self, value: Value) -> PatchOp {
        match self {
            PatchOp::Add { path, .. } => PatchOp::Add {
                path: path.clone(),
                value,
            },
            PatchOp::Replace { path, .. } => PatchOp::Replace {
                path: path.clone(),
                value,
            },
            PatchOp::Remove { path } => PatchOp::Remove { path: path.clone() },
        }
    }
}

// ---------------------------------------------------------------------------
// diff
// ---------------------------------------------------------------------------

/// Computes the patch that transforms `before` into `after`.
pub fn diff(before: &Value, after: &Value) -> Patch {
    let mut ops = Vec::new();
    diff_into(&JsonPointer::root(), before, after, &mut ops);
    ops
}

fn diff_into(path: &JsonPointer, before: &Value, after: &Value, ops: &mut Patch) {
    match (before, after) {
        (Value::Object(old), Value::Object(new)) => {
            for key in old.keys() {
                if !new.contains_key(key) {
                    ops.push(PatchOp::remove(path.child(key.as_str())));
                }
            }
            for (key, new_value) in new {
                let child = path.child(key.as_str());
                match old.get(key) {
                    Some(old_value) => diff_into(&child, old_value, new_value, ops),
                    None => ops.push(PatchOp::add(child, new_value.clone())),
                }
            }
        }
        (Value::Array(old), Value::Array(new)) => {
            let common = old.len().min(new.len());
            for i in 0..common {
                diff_into(&path.child(i.to_string()), &old[i], &new[i], ops);
            }
            // Trailing removals go highest index first so earlier ops keep
            // later indices valid.
            for i in (common..old.len()).rev() {
                ops.push(PatchOp::remove(path.child(i.to_string())));
            }
            for (i, value) in new.iter().enumerate().skip(common) {
                ops.push(PatchOp::add(path.child(i.to_string()), value.clone()));
            }
        }
        _ if before == after => {}
        _ => ops.push(PatchOp::replace(path.clone(), after.clone())),
    }
}

// ---------------------------------------------------------------------------
// apply
// ---------------------------------------------------------------------------

/// Applies `patch` to a copy of `value` and returns the copy.
pub fn apply(value: &Value, patch: &[PatchOp]) -> Result<Value, CoreError> {
    apply_all(value, patch, false)
}

/// Like [`apply`], except that `add` and `replace` first create any missing
/// object parents, and `remove` under a missing parent does nothing.
pub fn apply_creating_parents(value: &Value, patch: &[PatchOp]) -> Result<Value, CoreError> {
    apply_all(value, patch, true)
}

fn apply_all(value: &Value, patch: &[PatchOp], create_parents: bool) -> Result<Value, CoreError> {
    let mut out = value.clone();
    for op in patch {
        apply_op(&mut out, op, create_parents)?;
    }
    Ok(out)
}

fn apply_op(doc: &mut Value, op: &PatchOp, create_parents: bool) -> Result<(), CoreError> {
    let path = op.path();
    let Some((parent_path, key)) = path.split_last() else {
        match op {
            PatchOp::Add { value, .. } | PatchOp::Replace { value, .. } => *doc = value.clone(),
            PatchOp::Remove { .. } => *doc = Value::Null,
        }
        return Ok(());
    };

    if create_parents && get(doc, &parent_path).is_none() {
        match op {
            PatchOp::Remove { .. } => return Ok(()),
            _ => create_object_parents(doc, &parent_path, path)?,
        }
    }

    let parent = resolve_mut(doc, &parent_path).ok_or_else(|| missing_parent(path))?;

    match parent {
        Value::Object(map) => {
            apply_to_object(map, key, op);
            Ok(())
        }
        Value::Array(items) => apply_to_array(items, key, op),
        other => Err(CoreError::invalid_patch(
            path,
            format!("cannot index into {}", type_name(other)),
        )),
    }
}

/// Walks `parents`, inserting an empty object for every missing object key.
/// Array elements are never created.
fn create_object_parents(
    doc: &mut Value,
    parents: &JsonPointer,
    path: &JsonPointer,
) -> Result<(), CoreError> {
    let mut current = doc;
    for segment in parents.segments() {
        current = match current {
            Value::Object(map) => map
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new())),
            Value::Array(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get_mut(i))
                .ok_or_else(|| missing_parent(path))?,
            _ => return Err(missing_parent(path)),
        };
    }
    Ok(())
}

fn missing_parent(path: &JsonPointer) -> CoreError {
    CoreError::invalid_patch(path, "parent container does not exist")
}

fn apply_to_object(map: &mut Map<String, Value>, key: &str, op: &PatchOp) {
    match op {
        PatchOp::Add { value, .. } | PatchOp::Replace { value, .. } => {
            map.insert(key.to_string(), value.clone());
        }
        PatchOp::Remove { .. } => {
            map.remove(key);
        }
    }
}

fn apply_to_array(items: &mut Vec<Value>, key: &str, op: &PatchOp) -> Result<(), CoreError> {
    let path = op.path();
    if key == "-" {
        return match op {
            PatchOp::Add { value, .. } => {
                items.push(value.clone());
                Ok(())
            }
            _ => Err(CoreError::invalid_patch(path, "'-' is only valid for add")),
        };
    }
    let index: usize = key
        .parse()
        .map_err(|_| CoreError::invalid_patch(path, format!("'{key}' is not an array index")))?;

    match op {
        PatchOp::Add { value, .. } => {
            if index > items.len() {
                return Err(out_of_bounds(path, index, items.len()));
            }
            items.insert(index, value.clone());
        }
        PatchOp::Replace { value, .. } => {
            if index == items.len() {
                items.push(value.clone());
            } else if let Some(slot) = items.get_mut(index) {
                *slot = value.clone();
            } else {
                return Err(out_of_bounds(path, index, items.len()));
            }
        }
        PatchOp::Remove { .. } => {
            if index >= items.len() {
                return Err(out_of_bounds(path, index, items.len()));
            }
            items.remove(index);
        }
    }
    Ok(())
}

fn out_of_bounds(path: &JsonPointer, index: usize, len: usize) -> CoreError {
    CoreError::invalid_patch(path, format!("index {index} out of bounds for length {len}"))
}

fn resolve_mut<'a>(doc: &'a mut Value, path: &JsonPointer) -> Option<&'a mut Value> {
    let mut current = doc;
    for segment in path.segments() {
        current = match current {
            Value::Object(map) => map.get_mut(segment)?,
            Value::Array(items) => items.get_mut(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Looks up the value at `path`.
pub fn get<'a>(doc: &'a Value, path: &JsonPointer) -> Option<&'a Value> {
    let mut current = doc;
    for segment in path.segments() {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
