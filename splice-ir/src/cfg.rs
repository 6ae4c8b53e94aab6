//! The inter-procedural control-flow graph.

use crate::ids::CfgNode;
use std::collections::BTreeSet;

/// The kind of control transfer an [`Edge`] represents.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum EdgeLabel {
    /// Control falls through to the textually following block without a
    /// transfer instruction.
    Fallthrough,
    /// An unconditional or conditional branch.
    Branch,
    /// A call to the target, expected to return.
    Call,
    /// A return to an unspecified caller (typically targets a
    /// [`ProxyBlock`](crate::ProxyBlock)).
    Return,
}

/// A single control-flow edge `(source, target, label)`.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Edge {
    pub source: CfgNode,
    pub target: CfgNode,
    pub label: EdgeLabel,
}

/// The module-wide control-flow graph.
///
/// Edges are stored as a flat, ordered set rather than adjacency lists per
/// node: the mutation engine's edge-redirection work is dominated by
/// "find every edge touching this node" queries, which a `BTreeSet<Edge>`
/// answers by range-scanning once edges are additionally indexed — here
/// kept simple as a linear scan, since a single function's block count is
/// small relative to a whole module's.
#[derive(Debug, Clone, Default)]
pub struct Cfg {
    edges: BTreeSet<Edge>,
}

impl Cfg {
    pub fn new() -> Self {
        Self {
            edges: BTreeSet::new(),
        }
    }

    pub fn insert(&mut self, edge: Edge) -> bool {
        self.edges.insert(edge)
    }

    pub fn remove(&mut self, edge: &Edge) -> bool {
        self.edges.remove(edge)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Every edge originating at `node`.
    pub fn outgoing(&self, node: CfgNode) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.source == node)
    }

    /// Every edge terminating at `node`.
    pub fn incoming(&self, node: CfgNode) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.target == node)
    }

    /// Whether `node` has any outgoing fall-through edge.
    pub fn has_outgoing_fallthrough(&self, node: CfgNode) -> bool {
        self.outgoing(node)
            .any(|e| e.label == EdgeLabel::Fallthrough)
    }

    /// Redirect every edge with `source == from` to originate at `to`
    /// instead.
    pub fn retarget_source(&mut self, from: CfgNode, to: CfgNode) {
        let moved: Vec<Edge> = self
            .edges
            .iter()
            .filter(|e| e.source == from)
            .copied()
            .collect();
        for edge in moved {
            self.edges.remove(&edge);
            self.edges.insert(Edge {
                source: to,
                ..edge
            });
        }
    }

    /// Redirect every edge with `target == from` to terminate at `to`
    /// instead.
    pub fn retarget_target(&mut self, from: CfgNode, to: CfgNode) {
        let moved: Vec<Edge> = self
            .edges
            .iter()
            .filter(|e| e.target == from)
            .copied()
            .collect();
        for edge in moved {
            self.edges.remove(&edge);
            self.edges.insert(Edge {
                target: to,
                ..edge
            });
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    pub fn extend(&mut self, other: Cfg) {
        self.edges.extend(other.edges);
    }
}
