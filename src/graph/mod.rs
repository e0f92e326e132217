//! Typed dependency graph over factory entities.
//!
//! Nodes are [`EntityId`]s (resources and activities), edges carry an
//! [`EdgeKind`] and whether their target is known to the catalog. The graph
//! is built once by [`GraphBuilder`] and is read-only afterwards.
//!
//! Edges are unique per `(source, target, kind)`: adding the same triple twice
//! is a no-op. No cycle detection or ordering is imposed; pipelines that call
//! each other in a loop are kept as declared.

pub mod builder;

pub use builder::GraphBuilder;

use petgraph::Direction;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::collections::{HashMap, HashSet, VecDeque};

use crate::core::{EdgeKind, EntityId};

/// One edge of the graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub struct DependencyEdge {
    pub source: EntityId,
    pub target: EntityId,
    pub kind: EdgeKind,
    /// False when the target is not in the catalog (external or dangling)
    pub resolved: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EdgeData {
    kind: EdgeKind,
    resolved: bool,
}

/// Directed multigraph of typed dependencies.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraph<EntityId, EdgeData>,
    node_map: HashMap<EntityId, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node if it does not exist yet.
    pub(crate) fn ensure_node(&mut self, node: EntityId) -> NodeIndex {
        if let Some(&index) = self.node_map.get(&node) {
            index
        } else {
            let index = self.graph.add_node(node.clone());
            self.node_map.insert(node, index);
            index
        }
    }

    /// Add an edge unless the same `(source, target, kind)` already exists.
    ///
    /// Returns true when the edge is new.
    pub(crate) fn add_edge(&mut self, source: EntityId, target: EntityId, kind: EdgeKind, resolved: bool) -> bool {
        let from = self.ensure_node(source);
        let to = self.ensure_node(target);

        if self.graph.edges_connecting(from, to).any(|e| e.weight().kind == kind) {
            return false;
        }
        self.graph.add_edge(from, to, EdgeData {
            kind,
            resolved,
        });
        true
    }

    fn edge(&self, index: EdgeIndex) -> Option<DependencyEdge> {
        let (from, to) = self.graph.edge_endpoints(index)?;
        let data = self.graph[index];
        Some(DependencyEdge {
            source: self.graph[from].clone(),
            target: self.graph[to].clone(),
            kind: data.kind,
            resolved: data.resolved,
        })
    }

    /// All edges, in the order they were added.
    pub fn edges(&self) -> Vec<DependencyEdge> {
        self.graph.edge_indices().filter_map(|e| self.edge(e)).collect()
    }

    pub fn edges_of_kind(&self, kind: EdgeKind) -> Vec<DependencyEdge> {
        self.edges().into_iter().filter(|e| e.kind == kind).collect()
    }

    /// Edges whose target is not in the catalog.
    pub fn unresolved_edges(&self) -> Vec<DependencyEdge> {
        self.edges().into_iter().filter(|e| !e.resolved).collect()
    }

    /// Edges leaving `source`, optionally of one kind, in insertion order.
    pub fn outgoing(&self, source: &EntityId, kind: Option<EdgeKind>) -> Vec<DependencyEdge> {
        self.adjacent(source, kind, Direction::Outgoing)
    }

    /// Edges entering `target`, optionally of one kind, in insertion order.
    pub fn incoming(&self, target: &EntityId, kind: Option<EdgeKind>) -> Vec<DependencyEdge> {
        self.adjacent(target, kind, Direction::Incoming)
    }

    fn adjacent(&self, node: &EntityId, kind: Option<EdgeKind>, direction: Direction) -> Vec<DependencyEdge> {
        let Some(&index) = self.node_map.get(node) else {
            return Vec::new();
        };
        let mut ids: Vec<EdgeIndex> = self
            .graph
            .edges_directed(index, direction)
            .filter(|e| kind.is_none_or(|k| e.weight().kind == k))
            .map(|e| e.id())
            .collect();
        ids.sort();
        ids.into_iter().filter_map(|e| self.edge(e)).collect()
    }

    /// Every entity reachable from `source` along edges of `kind`,
    /// breadth-first, excluding `source` unless it lies on a cycle.
    pub fn transitive_targets(&self, source: &EntityId, kind: EdgeKind) -> Vec<EntityId> {
        let mut reached = Vec::new();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([source.clone()]);

        while let Some(current) = queue.pop_front() {
            for edge in self.outgoing(&current, Some(kind)) {
                if seen.insert(edge.target.clone()) {
                    reached.push(edge.target.clone());
                    queue.push_back(edge.target);
                }
            }
        }

        reached
    }

    pub fn contains(&self, node: &EntityId) -> bool {
        self.node_map.contains_key(node)
    }

    /// All nodes, in insertion order.
    pub fn nodes(&self) -> Vec<EntityId> {
        self.graph.node_indices().map(|idx| self.graph[idx].clone()).collect()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edges.
    pub fn len(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.edge_count() == 0
    }

    /// Render the edges of `kind` reachable from `root` as an indented tree.
    ///
    /// Nodes already printed on the current path are marked instead of
    /// being expanded again.
    pub fn to_tree_string(&self, root: &EntityId, kind: EdgeKind) -> String {
        let mut result = format!("{root}\n");
        let mut path = vec![root.clone()];
        self.build_tree_string(root, kind, &mut result, "", &mut path);
        result
    }

    fn build_tree_string(
        &self,
        node: &EntityId,
        kind: EdgeKind,
        result: &mut String,
        prefix: &str,
        path: &mut Vec<EntityId>,
    ) {
        let children = self.outgoing(node, Some(kind));
        for (i, edge) in children.iter().enumerate() {
            let is_last = i == children.len() - 1;
            let connector = if is_last { "└── " } else { "├── " };
            let marker = if edge.resolved { "" } else { " (unresolved)" };

            if path.contains(&edge.target) {
                result.push_str(&format!("{prefix}{connector}{} (cycle)\n", edge.target));
                continue;
            }
            result.push_str(&format!("{prefix}{connector}{}{marker}\n", edge.target));

            let child_prefix = if is_last { format!("{prefix}    ") } else { format!("{prefix}│   ") };
            path.push(edge.target.clone());
            self.build_tree_string(&edge.target, kind, result, &child_prefix, path);
            path.pop();
        }
    }
}

impl Serialize for DependencyGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("DependencyGraph", 2)?;
        state.serialize_field("nodes", &self.nodes())?;
        state.serialize_field("edges", &self.edges())?;
        state.end()
    }
}
