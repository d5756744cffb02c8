//! SchemaGraph: the DAG of schema identities connected by lenses.
//!
//! [`SchemaGraph`] is an owned value, so any number of independent graphs
//! can coexist in one process. Nodes are schema identities with the shape
//! computed when they were registered; edges carry lenses. Each
//! registration inserts a forward edge labelled with the lens and a
//! backward edge labelled with its reverse, which is what lets
//! [`find_lens_path`] convert patches in either direction.
//!
//! The graph is append-only: nodes and edges are inserted, never removed,
//! and a node's shape never changes after registration. The name→head map
//! is the only state that is overwritten.

use std::collections::{BTreeMap, HashMap};

use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableGraph;
use petgraph::visit::EdgeRef;
use petgraph::{Directed, Direction};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::hash::{lineage_root_id, version_id};
use crate::id::SchemaId;
use crate::lens::Lens;
use crate::path::{find_lens_path, LensPath};
use crate::shape::Shape;

/// A registered schema version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaNode {
    pub id: SchemaId,
    pub shape: Shape,
    /// Lineage the identity was derived in, when registered through a name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lineage: Option<String>,
}

/// Which way a lens edge points relative to its registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeDirection {
    Forward,
    Backward,
}

/// A lens labelling one direction of a registered connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LensEdge {
    pub lens: Lens,
    pub direction: EdgeDirection,
}

/// What `create_lineage` does when the name already has a head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineagePolicy {
    /// Silently re-root the name at its root identity.
    #[default]
    Reset,
    /// Fail with [`CoreError::LineageExists`].
    Reject,
}

/// The schema graph plus the lineage name→head map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaGraph {
    graph: StableGraph<SchemaNode, LensEdge, Directed, u32>,
    index: HashMap<SchemaId, NodeIndex<u32>>,
    heads: BTreeMap<String, SchemaId>,
    #[serde(default)]
    lineage_policy: LineagePolicy,
}

impl Default for SchemaGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaGraph {
    /// Creates a graph holding only the sentinel root with an empty object
    /// shape.
    pub fn new() -> Self {
        let mut graph = StableGraph::new();
        let root = graph.add_node(SchemaNode {
            id: SchemaId::ROOT,
            shape: Shape::empty_object(),
            lineage: None,
        });
        let mut index = HashMap::new();
        index.insert(SchemaId::ROOT, root);
        SchemaGraph {
            graph,
            index,
            heads: BTreeMap::new(),
            lineage_policy: LineagePolicy::default(),
        }
    }

    pub fn with_lineage_policy(mut self, policy: LineagePolicy) -> Self {
        self.lineage_policy = policy;
        self
    }

    pub fn lineage_policy(&self) -> LineagePolicy {
        self.lineage_policy
    }

    pub fn set_lineage_policy(&mut self, policy: LineagePolicy) {
        self.lineage_policy = policy;
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    /// Returns a read-only reference to the underlying petgraph graph.
    pub fn raw(&self) -> &StableGraph<SchemaNode, LensEdge, Directed, u32> {
        &self.graph
    }

    pub fn node_index(&self, id: SchemaId) -> Option<NodeIndex<u32>> {
        self.index.get(&id).copied()
    }

    pub fn contains(&self, id: SchemaId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn node(&self, id: SchemaId) -> Option<&SchemaNode> {
        self.node_index(id).map(|idx| &self.graph[idx])
    }

    /// Number of registered identities, the sentinel root included.
    pub fn schema_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Current head of lineage `name`.
    pub fn head(&self, name: &str) -> Option<SchemaId> {
        self.heads.get(name).copied()
    }

    /// All lineage heads, sorted by name.
    pub fn heads(&self) -> impl Iterator<Item = (&str, SchemaId)> {
        self.heads.iter().map(|(name, id)| (name.as_str(), *id))
    }

    /// The lineage an identity was derived in, if it was registered by name.
    pub fn lineage_of(&self, id: SchemaId) -> Option<&str> {
        self.node(id)?.lineage.as_deref()
    }

    /// The shape registered for `id`.
    pub fn shape_of(&self, id: SchemaId) -> Result<&Shape, CoreError> {
        self.node(id)
            .map(|n| &n.shape)
            .ok_or(CoreError::UnknownSchema { id })
    }

    /// Resolves the lens path between two identities.
    pub fn resolve_path(&self, from: SchemaId, to: SchemaId) -> Result<LensPath, CoreError> {
        let path = find_lens_path(self, from, to).ok_or(CoreError::NoPathFound { from, to })?;
        tracing::debug!(
            from = %from.short(),
            to = %to.short(),
            hops = path.len(),
            "resolved lens path"
        );
        Ok(path)
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Starts (or re-roots) lineage `name` and returns its root identity.
    ///
    /// The root identity depends only on `name`. Under
    /// [`LineagePolicy::Reset`] an existing head is overwritten; under
    /// [`LineagePolicy::Reject`] it is an error.
    pub fn create_lineage(&mut self, name: &str) -> Result<SchemaId, CoreError> {
        if let Some(head) = self.head(name) {
            match self.lineage_policy {
                LineagePolicy::Reject => {
                    return Err(CoreError::LineageExists {
                        name: name.to_string(),
                        head,
                    })
                }
                LineagePolicy::Reset => {
                    tracing::warn!(lineage = name, old_head = %head.short(), "re-rooting lineage");
                }
            }
        }

        let id = lineage_root_id(name);
        self.insert_version(SchemaId::ROOT, id, Lens::empty(), Some(name))?;
        self.heads.insert(name.to_string(), id);
        tracing::debug!(lineage = name, id = %id.short(), "created lineage");
        Ok(id)
    }

    /// Registers `lens` on top of the head of lineage `name`, advances the
    /// head, and returns the new identity.
    pub fn register_version(&mut self, lens: Lens, name: &str) -> Result<SchemaId, CoreError> {
        let head = self.head(name).ok_or_else(|| CoreError::UnknownLineage {
            name: name.to_string(),
        })?;
        let id = version_id(head, &lens);
        self.insert_version(head, id, lens, Some(name))?;
        self.heads.insert(name.to_string(), id);
        tracing::debug!(lineage = name, id = %id.short(), "registered version");
        Ok(id)
    }

    /// Registers `lens` on top of `from` without touching any head.
    pub fn register_version_by_id(&mut self, lens: Lens, from: SchemaId) -> Result<SchemaId, CoreError> {
        let id = version_id(from, &lens);
        let lineage = self.lineage_of(from).map(str::to_string);
        self.insert_version(from, id, lens, lineage.as_deref())?;
        tracing::debug!(from = %from.short(), id = %id.short(), "registered version by id");
        Ok(id)
    }

    /// Splices an edge labelled `lens` between two existing identities.
    ///
    /// No identity is derived and no shape changes. Connecting the same
    /// `(from, to, lens)` twice inserts nothing the second time.
    pub fn connect(&mut self, lens: Lens, from: SchemaId, to: SchemaId) -> Result<(), CoreError> {
        let from_idx = self
            .node_index(from)
            .ok_or(CoreError::UnknownSchema { id: from })?;
        let to_idx = self
            .node_index(to)
            .ok_or(CoreError::UnknownSchema { id: to })?;
        if self.has_forward_edge(from_idx, to_idx, &lens) {
            return Ok(());
        }
        self.add_edge_pair(from_idx, to_idx, lens);
        tracing::debug!(from = %from.short(), to = %to.short(), "connected schemas");
        Ok(())
    }

    /// Inserts node `id` (if new) with an edge pair from `from`.
    ///
    /// Idempotent: a known `id` already has exactly this edge because `id`
    /// is derived from `(from, lens)`.
    fn insert_version(
        &mut self,
        from: SchemaId,
        id: SchemaId,
        lens: Lens,
        lineage: Option<&str>,
    ) -> Result<(), CoreError> {
        let from_idx = self
            .node_index(from)
            .ok_or(CoreError::UnknownSchema { id: from })?;
        if self.contains(id) {
            return Ok(());
        }
        let shape = self.graph[from_idx].shape.evolve(&lens)?;
        let idx = self.graph.add_node(SchemaNode {
            id,
            shape,
            lineage: lineage.map(str::to_string),
        });
        self.index.insert(id, idx);
        self.add_edge_pair(from_idx, idx, lens);
        Ok(())
    }

    fn add_edge_pair(&mut self, from: NodeIndex<u32>, to: NodeIndex<u32>, lens: Lens) {
        let reverse = lens.reverse();
        self.graph.add_edge(
            from,
            to,
            LensEdge {
                lens,
                direction: EdgeDirection::Forward,
            },
        );
        self.graph.add_edge(
            to,
            from,
            LensEdge {
                lens: reverse,
                direction: EdgeDirection::Backward,
            },
        );
    }

    fn has_forward_edge(&self, from: NodeIndex<u32>, to: NodeIndex<u32>, lens: &Lens) -> bool {
        self.graph
            .edges_directed(from, Direction::Outgoing)
            .any(|e| {
                e.target() == to
                    && e.weight().direction == EdgeDirection::Forward
                    && &e.weight().lens == lens
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lens::{DataType, LensOp};
    use serde_json::json;

    fn v1_lens() -> Lens {
        Lens::new(vec![
            LensOp::add("title", DataType::String),
            LensOp::add("summary", DataType::String),
        ])
    }

    #[test]
    fn new_graph_holds_only_the_sentinel() {
        let g = SchemaGraph::new();
        assert_eq!(g.schema_count(), 1);
        assert!(g.contains(SchemaId::ROOT));
        assert_eq!(g.shape_of(SchemaId::ROOT).unwrap(), &Shape::empty_object());
        assert_eq!(g.heads().count(), 0);
    }

    #[test]
    fn create_lineage_sets_head_to_root_identity() {
        let mut g = SchemaGraph::new();
        let root = g.create_lineage("Project").unwrap();
        assert_eq!(root, lineage_root_id("Project"));
        assert_eq!(g.head("Project"), Some(root));
        assert_eq!(g.lineage_of(root), Some("Project"));
        assert_eq!(g.raw().edge_count(), 2);
    }

    #[test]
    fn register_version_advances_head_and_evolves_shape() {
        let mut g = SchemaGraph::new();
        let root = g.create_lineage("Project").unwrap();
        let v1 = g.register_version(v1_lens(), "Project").unwrap();
        assert_eq!(v1, version_id(root, &v1_lens()));
        assert_eq!(g.head("Project"), Some(v1));
        assert_eq!(
            g.shape_of(v1).unwrap().default_value(),
            json!({"title": "", "summary": ""})
        );
    }

    #[test]
    fn register_version_on_unknown_lineage_fails() {
        let mut g = SchemaGraph::new();
        let err = g.register_version(v1_lens(), "Nope").unwrap_err();
        assert_eq!(err, CoreError::UnknownLineage { name: "Nope".into() });
        assert_eq!(g.schema_count(), 1);
    }

    #[test]
    fn invalid_lens_leaves_graph_unchanged() {
        let mut g = SchemaGraph::new();
        let root = g.create_lineage("Project").unwrap();
        let before = g.raw().edge_count();
        let err = g
            .register_version(Lens::new(vec![LensOp::rename("missing", "x")]), "Project")
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidLens { .. }));
        assert_eq!(g.raw().edge_count(), before);
        assert_eq!(g.head("Project"), Some(root));
    }

    #[test]
    fn register_by_id_does_not_move_head() {
        let mut g = SchemaGraph::new();
        g.create_lineage("Project").unwrap();
        let v1 = g.register_version(v1_lens(), "Project").unwrap();
        let side = g
            .register_version_by_id(Lens::new(vec![LensOp::add("status", DataType::String)]), v1)
            .unwrap();
        assert_eq!(g.head("Project"), Some(v1));
        assert!(g.contains(side));
        assert_eq!(g.lineage_of(side), Some("Project"));
    }

    #[test]
    fn reregistering_same_lens_is_idempotent() {
        let mut g = SchemaGraph::new();
        let root = g.create_lineage("Project").unwrap();
        let a = g.register_version_by_id(v1_lens(), root).unwrap();
        let edges = g.raw().edge_count();
        let b = g.register_version_by_id(v1_lens(), root).unwrap();
        assert_eq!(a, b);
        assert_eq!(g.raw().edge_count(), edges);
    }

    #[test]
    fn independent_graphs_agree_on_identities() {
        let mut g1 = SchemaGraph::new();
        let mut g2 = SchemaGraph::new();
        g1.create_lineage("Project").unwrap();
        g2.create_lineage("Project").unwrap();
        assert_eq!(
            g1.register_version(v1_lens(), "Project").unwrap(),
            g2.register_version(v1_lens(), "Project").unwrap()
        );
    }

    #[test]
    fn recreating_lineage_resets_head_by_default() {
        let mut g = SchemaGraph::new();
        let root = g.create_lineage("Project").unwrap();
        let v1 = g.register_version(v1_lens(), "Project").unwrap();
        assert_eq!(g.create_lineage("Project").unwrap(), root);
        assert_eq!(g.head("Project"), Some(root));
        // History stays in the graph.
        assert!(g.contains(v1));
    }

    #[test]
    fn recreating_lineage_can_be_rejected() {
        let mut g = SchemaGraph::new().with_lineage_policy(LineagePolicy::Reject);
        let root = g.create_lineage("Project").unwrap();
        let err = g.create_lineage("Project").unwrap_err();
        assert_eq!(
            err,
            CoreError::LineageExists {
                name: "Project".into(),
                head: root
            }
        );
    }

    #[test]
    fn connect_requires_existing_identities() {
        let mut g = SchemaGraph::new();
        let root = g.create_lineage("Project").unwrap();
        let ghost = lineage_root_id("Ghost");
        let err = g.connect(Lens::empty(), root, ghost).unwrap_err();
        assert_eq!(err, CoreError::UnknownSchema { id: ghost });
    }

    #[test]
    fn connect_is_idempotent_and_keeps_shapes() {
        let mut g = SchemaGraph::new();
        let a = g.create_lineage("A").unwrap();
        let b = g.create_lineage("B").unwrap();
        let shape_before = g.shape_of(b).unwrap().clone();
        let nodes = g.schema_count();

        g.connect(Lens::empty(), a, b).unwrap();
        let edges = g.raw().edge_count();
        g.connect(Lens::empty(), a, b).unwrap();

        assert_eq!(g.raw().edge_count(), edges);
        assert_eq!(g.schema_count(), nodes);
        assert_eq!(g.shape_of(b).unwrap(), &shape_before);
    }

    #[test]
    fn resolve_path_reports_disconnected_identities() {
        let g = SchemaGraph::new();
        let ghost = lineage_root_id("Ghost");
        let err = g.resolve_path(SchemaId::ROOT, ghost).unwrap_err();
        assert_eq!(
            err,
            CoreError::NoPathFound {
                from: SchemaId::ROOT,
                to: ghost
            }
        );
    }

    #[test]
    fn graph_survives_json_roundtrip() {
        let mut g = SchemaGraph::new();
        g.create_lineage("Project").unwrap();
        let v1 = g.register_version(v1_lens(), "Project").unwrap();
        let json = serde_json::to_string(&g).unwrap();
        let back: SchemaGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(back.head("Project"), Some(v1));
        assert_eq!(back.shape_of(v1).unwrap(), g.shape_of(v1).unwrap());
        assert!(back.resolve_path(SchemaId::ROOT, v1).is_ok());
    }
}
