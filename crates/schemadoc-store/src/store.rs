//! The document store: create, read and write patch-log documents against
//! a schema graph.
//!
//! [`DocumentStore`] owns a [`SchemaGraph`] and a [`StoreConfig`]. It never
//! holds on to documents: every operation takes the document explicitly
//! and either returns a materialized value or appends exactly one entry.
//!
//! # Reads
//!
//! [`DocumentStore::read_as`] folds the log left to right. Each entry's
//! patch is converted from its origin schema to the target along the lens
//! path resolved by the graph, then applied to the accumulator, producing a
//! fresh accumulator each step. Object parents a lens moved a write under
//! are created on the way. Reads take `&self` and share nothing
//! mutable, so reads under different targets may run in parallel.
//!
//! # Writes
//!
//! [`DocumentStore::change_typed_doc`] materializes the document under the
//! writer's schema, lets the caller mutate a copy, diffs the two snapshots
//! and appends the diff. Failure leaves the log untouched.

use std::collections::HashMap;

use serde_json::{Map, Value};

use schemadoc_core::{
    apply_creating_parents, convert_patch_to, diff, evolve_along, CoreError, JsonPointer, Lens,
    LensPath, PatchOp, SchemaGraph, SchemaId, Shape,
};

use crate::config::{ReadPolicy, StoreConfig};
use crate::document::{Document, PatchEntry};
use crate::error::StoreError;

/// Schema graph plus the document read/write algorithms.
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    graph: SchemaGraph,
    config: StoreConfig,
}

impl DocumentStore {
    /// Creates a store with an empty graph and default configuration.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        DocumentStore {
            graph: SchemaGraph::new().with_lineage_policy(config.lineage_policy),
            config,
        }
    }

    /// Wraps an existing graph. The config's lineage policy is applied to it.
    pub fn from_graph(mut graph: SchemaGraph, config: StoreConfig) -> Self {
        graph.set_lineage_policy(config.lineage_policy);
        DocumentStore { graph, config }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn graph(&self) -> &SchemaGraph {
        &self.graph
    }

    pub fn into_graph(self) -> SchemaGraph {
        self.graph
    }

    // -----------------------------------------------------------------------
    // Schema graph operations
    // -----------------------------------------------------------------------

    /// See [`SchemaGraph::create_lineage`].
    pub fn create_lineage(&mut self, name: &str) -> Result<SchemaId, StoreError> {
        Ok(self.graph.create_lineage(name)?)
    }

    /// See [`SchemaGraph::register_version`].
    pub fn register_version(&mut self, lens: Lens, name: &str) -> Result<SchemaId, StoreError> {
        Ok(self.graph.register_version(lens, name)?)
    }

    /// See [`SchemaGraph::register_version_by_id`].
    pub fn register_version_by_id(&mut self, lens: Lens, from: SchemaId) -> Result<SchemaId, StoreError> {
        Ok(self.graph.register_version_by_id(lens, from)?)
    }

    /// See [`SchemaGraph::connect`].
    pub fn connect(&mut self, lens: Lens, from: SchemaId, to: SchemaId) -> Result<(), StoreError> {
        Ok(self.graph.connect(lens, from, to)?)
    }

    /// See [`SchemaGraph::resolve_path`].
    pub fn resolve_path(&self, from: SchemaId, to: SchemaId) -> Result<LensPath, StoreError> {
        Ok(self.graph.resolve_path(from, to)?)
    }

    /// Current head of lineage `name`.
    pub fn head(&self, name: &str) -> Result<SchemaId, StoreError> {
        self.graph.head(name).ok_or_else(|| {
            CoreError::UnknownLineage {
                name: name.to_string(),
            }
            .into()
        })
    }

    // -----------------------------------------------------------------------
    // Documents
    // -----------------------------------------------------------------------

    /// Creates a document whose single entry writes `initial` under `schema`.
    pub fn init_doc(&self, initial: &Value, schema: SchemaId) -> Result<Document, StoreError> {
        self.ensure_known(schema)?;
        let patch = diff(&empty_value(), initial);
        let mut doc = Document::default();
        doc.push(PatchEntry { schema, patch });
        tracing::debug!(schema = %schema.short(), "initialized document");
        Ok(doc)
    }

    /// Materializes `doc` under `target`.
    pub fn read_as(&self, doc: &Document, target: SchemaId) -> Result<Value, StoreError> {
        self.ensure_known(target)?;

        let synthetic = match self.config.read_policy {
            ReadPolicy::FillDefaults => Some(PatchEntry {
                schema: target,
                patch: vec![PatchOp::add(JsonPointer::root(), empty_value())],
            }),
            ReadPolicy::Sparse => None,
        };

        // Per origin: the lens path and the shape it evolves into.
        let mut routes: HashMap<SchemaId, (LensPath, Shape)> = HashMap::new();
        let mut acc = empty_value();
        for entry in synthetic.iter().chain(doc.entries()) {
            if !routes.contains_key(&entry.schema) {
                let path = self.conversion_path(entry.schema, target)?;
                let target_shape = evolve_along(&path, self.graph.shape_of(entry.schema)?);
                routes.insert(entry.schema, (path, target_shape));
            }
            let (path, target_shape) = &routes[&entry.schema];
            let converted = convert_patch_to(path, &entry.patch, target_shape);
            acc = apply_creating_parents(&acc, &converted)?;
        }
        Ok(acc)
    }

    /// Reads `doc` under `writer`, applies `mutate` to the value, and
    /// appends the resulting diff as one entry tagged `writer`.
    pub fn change_typed_doc<'d, F>(
        &self,
        doc: &'d mut Document,
        writer: SchemaId,
        mutate: F,
    ) -> Result<&'d PatchEntry, StoreError>
    where
        F: FnOnce(&mut Value),
    {
        self.try_change_typed_doc(doc, writer, |value| {
            mutate(value);
            Ok::<(), StoreError>(())
        })
    }

    /// Like [`change_typed_doc`](Self::change_typed_doc) for mutations that
    /// can fail. A failed mutation appends nothing.
    pub fn try_change_typed_doc<'d, F, E>(
        &self,
        doc: &'d mut Document,
        writer: SchemaId,
        mutate: F,
    ) -> Result<&'d PatchEntry, E>
    where
        F: FnOnce(&mut Value) -> Result<(), E>,
        E: From<StoreError>,
    {
        let before = self.read_as(doc, writer)?;
        let mut after = before.clone();
        mutate(&mut after)?;
        let patch = diff(&before, &after);
        tracing::debug!(
            writer = %writer.short(),
            ops = patch.len(),
            entry = doc.len(),
            "appending patch entry"
        );
        doc.push(PatchEntry {
            schema: writer,
            patch,
        });
        Ok(doc
            .entries()
            .last()
            .expect("entry was just appended"))
    }

    fn ensure_known(&self, id: SchemaId) -> Result<(), StoreError> {
        if self.graph.contains(id) {
            Ok(())
        } else {
            Err(CoreError::UnknownSchema { id }.into())
        }
    }

    fn conversion_path(&self, origin: SchemaId, target: SchemaId) -> Result<LensPath, StoreError> {
        self.graph
            .resolve_path(origin, target)
            .map_err(|_| StoreError::NoConversionPath { origin, target })
    }
}

fn empty_value() -> Value {
    Value::Object(Map::new())
}
