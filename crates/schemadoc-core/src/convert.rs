//! Patch conversion through a lens path.
//!
//! [`convert_patch`] rewrites a patch written against the origin schema of
//! a [`LensPath`] into the equivalent patch against its target schema:
//!
//! 1. **Expand**: every write of a non-empty container becomes a write of
//!    the empty container followed by one `add` per child, so lens steps
//!    only ever see leaf writes and empty-container creations.
//! 2. **Lens**: each op runs through every lens step of the path in order.
//!    Steps rewrite paths (`rename`, `hoist`, `plunge`), drop ops
//!    (`remove`), recurse with a narrowed path (`in`, `map`) or translate
//!    values (`convert`).
//! 3. **Defaults**: after every op that creates an empty object, `add` ops
//!    are inserted for each property default of the target shape at that
//!    pointer.

use serde_json::{Map, Value};

use crate::lens::{Lens, LensOp};
use crate::patch::{Patch, PatchOp};
use crate::path::LensPath;
use crate::shape::Shape;

/// Converts `patch`, written against the schema whose shape is
/// `origin_shape`, along `path`.
pub fn convert_patch(path: &LensPath, patch: &[PatchOp], origin_shape: &Shape) -> Patch {
    convert_patch_to(path, patch, &evolve_along(path, origin_shape))
}

/// The shape reached by evolving `origin_shape` through every lens of
/// `path`, skipping steps that do not fit.
pub fn evolve_along(path: &LensPath, origin_shape: &Shape) -> Shape {
    path.lenses()
        .fold(origin_shape.clone(), |shape, lens| shape.evolve_lenient(lens))
}

/// [`convert_patch`] with the target shape already computed by
/// [`evolve_along`], for callers converting many patches along one path.
pub fn convert_patch_to(path: &LensPath, patch: &[PatchOp], target_shape: &Shape) -> Patch {
    let mut ops = Vec::with_capacity(patch.len());
    for op in patch {
        expand_op(op, &mut ops);
    }

    for lens in path.lenses() {
        ops = ops.into_iter().filter_map(|op| run_lens(lens, op)).collect();
    }

    add_default_values(ops, target_shape)
}

/// Runs one patch op through a lens. `None` means the lens dropped it.
pub fn run_lens(lens: &Lens, op: PatchOp) -> Option<PatchOp> {
    lens.ops()
        .iter()
        .try_fold(op, |op, lens_op| run_lens_op(lens_op, op))
}

fn run_lens_op(lens_op: &LensOp, op: PatchOp) -> Option<PatchOp> {
    let path = op.path();
    match lens_op {
        LensOp::Add(_) => Some(op),
        LensOp::Remove(spec) => {
            if path.first() == Some(spec.name.as_str()) {
                None
            } else {
                Some(op)
            }
        }
        LensOp::Rename {
            source,
            destination,
        } => {
            if path.first() == Some(source.as_str()) {
                Some(op.with_path(path.with_first(destination)))
            } else {
                Some(op)
            }
        }
        LensOp::Hoist { host, name } => {
            let lifted = matches!(path.segments(), [h, n, ..] if h == host && n == name);
            if lifted {
                Some(op.with_path(path.tail()))
            } else {
                Some(op)
            }
        }
        LensOp::Plunge { host, name } => {
            if path.first() == Some(name.as_str()) {
                Some(op.with_path(path.prefixed([host.as_str()])))
            } else {
                Some(op)
            }
        }
        LensOp::In { name, lens } => {
            if path.first() != Some(name.as_str()) {
                return Some(op);
            }
            let inner = run_lens(lens, op.with_path(path.tail()))?;
            let prefixed = inner.path().prefixed([name.as_str()]);
            Some(inner.with_path(prefixed))
        }
        LensOp::Map { lens } => {
            let Some(index) = path.first().map(str::to_string) else {
                return Some(op);
            };
            let inner = run_lens(lens, op.with_path(path.tail()))?;
            let prefixed = inner.path().prefixed([index]);
            Some(inner.with_path(prefixed))
        }
        LensOp::Convert { name, forward, .. } => {
            let at_property = matches!(path.segments(), [only] if only == name);
            if at_property {
                if let Some(value) = op.value() {
                    let mapped = forward.map(value);
                    return Some(op.with_value(mapped));
                }
            }
            Some(op)
        }
    }
}

fn expand_op(op: &PatchOp, out: &mut Patch) {
    match op.value() {
        Some(Value::Object(map)) if !map.is_empty() => {
            out.push(op.with_value(Value::Object(Map::new())));
            for (key, child) in map {
                expand_op(&PatchOp::add(op.path().child(key.as_str()), child.clone()), out);
            }
        }
        Some(Value::Array(items)) if !items.is_empty() => {
            out.push(op.with_value(Value::Array(Vec::new())));
            for (i, child) in items.iter().enumerate() {
                expand_op(&PatchOp::add(op.path().child(i.to_string()), child.clone()), out);
            }
        }
        _ => out.push(op.clone()),
    }
}

fn add_default_values(ops: Patch, target: &Shape) -> Patch {
    let mut out = Vec::with_capacity(ops.len());
    for op in ops {
        let creates_empty_object = matches!(op.value(), Some(Value::Object(m)) if m.is_empty());
        let defaults: Vec<PatchOp> = if creates_empty_object {
            match target.at(op.path()).and_then(Shape::properties) {
                Some(properties) => properties
                    .iter()
                    .map(|(name, prop)| {
                        PatchOp::add(op.path().child(name.as_str()), prop.default_value())
                    })
                    .collect(),
                None => Vec::new(),
            }
        } else {
            Vec::new()
        };
        out.push(op);
        out.extend(defaults);
    }
    out
}
