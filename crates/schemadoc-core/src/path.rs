//! Lens-path resolution over the schema graph.
//!
//! Every registration stores its lens on a forward edge and the reversed
//! lens on a backward edge, so a breadth-first search over outgoing edges
//! explores both directions.
//!
//! # Tie-break
//!
//! Neighbours are expanded in edge insertion order and a node keeps the
//! first edge that discovers it. Among all shortest paths the one chosen is
//! therefore the one whose sequence of edges, compared step by step from the
//! origin, was registered earliest. Splicing a new edge with
//! [`SchemaGraph::connect`] only changes the choice when it makes a path
//! strictly shorter.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::graph::SchemaGraph;
use crate::id::SchemaId;
use crate::lens::{Lens, LensOp};

/// One traversed edge.
#[derive(Debug, Clone, PartialEq)]
pub struct PathStep {
    pub from: SchemaId,
    pub to: SchemaId,
    pub lens: Lens,
}

/// A resolved route between two schema identities.
#[derive(Debug, Clone, PartialEq)]
pub struct LensPath {
    pub from: SchemaId,
    pub to: SchemaId,
    pub steps: Vec<PathStep>,
}

impl LensPath {
    /// The empty path from an identity to itself.
    pub fn identity(id: SchemaId) -> Self {
        LensPath {
            from: id,
            to: id,
            steps: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn lenses(&self) -> impl Iterator<Item = &Lens> {
        self.steps.iter().map(|s| &s.lens)
    }

    /// Identities visited, origin first.
    pub fn nodes(&self) -> Vec<SchemaId> {
        std::iter::once(self.from)
            .chain(self.steps.iter().map(|s| s.to))
            .collect()
    }

    /// All steps concatenated into a single lens.
    pub fn composed(&self) -> Lens {
        self.steps
            .iter()
            .flat_map(|s| s.lens.ops().iter().cloned())
            .collect::<Vec<LensOp>>()
            .into()
    }
}

/// Finds the lens path from `from` to `to`, or `None` when either identity
/// is unknown or the two are not connected.
pub fn find_lens_path(graph: &SchemaGraph, from: SchemaId, to: SchemaId) -> Option<LensPath> {
    let start = graph.node_index(from)?;
    let goal = graph.node_index(to)?;
    if start == goal {
        return Some(LensPath::identity(from));
    }

    let raw = graph.raw();
    let mut discovered_by: HashMap<NodeIndex<u32>, EdgeIndex<u32>> = HashMap::new();
    let mut seen: HashSet<NodeIndex<u32>> = HashSet::from([start]);
    let mut queue = VecDeque::from([start]);

    while let Some(node) = queue.pop_front() {
        let mut edges: Vec<(EdgeIndex<u32>, NodeIndex<u32>)> = raw
            .edges_directed(node, Direction::Outgoing)
            .map(|e| (e.id(), e.target()))
            .collect();
        edges.sort_by_key(|(edge, _)| edge.index());

        for (edge, next) in edges {
            if !seen.insert(next) {
                continue;
            }
            discovered_by.insert(next, edge);
            if next == goal {
                return Some(build_path(graph, from, to, goal, &discovered_by));
            }
            queue.push_back(next);
        }
    }
    None
}

fn build_path(
    graph: &SchemaGraph,
    from: SchemaId,
    to: SchemaId,
    goal: NodeIndex<u32>,
    discovered_by: &HashMap<NodeIndex<u32>, EdgeIndex<u32>>,
) -> LensPath {
    let raw = graph.raw();
    let mut steps = Vec::new();
    let mut cursor = goal;
    while let Some(&edge) = discovered_by.get(&cursor) {
        let Some((source, target)) = raw.edge_endpoints(edge) else {
            break;
        };
        steps.push(PathStep {
            from: raw[source].id,
            to: raw[target].id,
            lens: raw[edge].lens.clone(),
        });
        cursor = source;
    }
    steps.reverse();
    LensPath { from, to, steps }
}
