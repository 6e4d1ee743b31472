//! Knowledge graphs built from extracted relational facts.
//!
//! A [`KnowledgeGraph`] is a directed multi-relation graph: nodes are unique
//! text identifiers or literal strings (identity is exact text equality),
//! edges carry a predicate label, and parallel edges between the same ordered
//! pair with different labels are permitted.
//!
//! Builders absorb extractor noise by design: a [`TripleRecord`] that does not
//! have exactly three fields is dropped before it reaches the graph, silently.
//! Both endpoint nodes of every admitted triple are materialized even when
//! they end up with no further edges.

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

/// A raw relational fact as parsed from extractor output, possibly malformed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TripleRecord {
    /// The parsed fields, in source order. Well-formed records have three.
    pub fields: Vec<String>,
}

impl TripleRecord {
    /// Wrap already-split fields.
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    /// The validated triple, if this record has exactly three fields.
    pub fn well_formed(&self) -> Option<Triple> {
        match self.fields.as_slice() {
            [subject, predicate, object] => Some(Triple {
                subject: subject.clone(),
                predicate: predicate.clone(),
                object: object.clone(),
            }),
            _ => None,
        }
    }
}

impl From<Triple> for TripleRecord {
    fn from(triple: Triple) -> Self {
        Self {
            fields: vec![triple.subject, triple.predicate, triple.object],
        }
    }
}

/// A well-formed (subject, predicate, object) fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

impl Triple {
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }
}

impl std::fmt::Display for Triple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.subject, self.predicate, self.object)
    }
}

/// Directed multi-relation graph with text-identity nodes.
///
/// Built once per extraction batch, then read-only: the corpus graph folds in
/// triples from many requests, the input graph holds a single request's.
#[derive(Debug, Default)]
pub struct KnowledgeGraph {
    graph: DiGraph<String, String>,
    node_index: HashMap<String, NodeIndex>,
}

impl KnowledgeGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from raw records, dropping malformed ones.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = TripleRecord>,
    {
        let mut graph = Self::new();
        graph.extend_from_records(records);
        graph
    }

    /// Fold more raw records into this graph (corpus accumulation).
    pub fn extend_from_records<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = TripleRecord>,
    {
        for record in records {
            if let Some(triple) = record.well_formed() {
                self.insert(&triple);
            }
        }
    }

    /// Insert one well-formed triple as a labeled edge subject → object.
    ///
    /// Both endpoints are materialized as nodes even if this is their only
    /// mention.
    pub fn insert(&mut self, triple: &Triple) {
        let subject = self.ensure_node(&triple.subject);
        let object = self.ensure_node(&triple.object);
        self.graph.add_edge(subject, object, triple.predicate.clone());
    }

    fn ensure_node(&mut self, text: &str) -> NodeIndex {
        if let Some(&idx) = self.node_index.get(text) {
            return idx;
        }
        let idx = self.graph.add_node(text.to_string());
        self.node_index.insert(text.to_string(), idx);
        idx
    }

    /// Number of materialized nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of labeled edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Whether a node with this exact text exists.
    pub fn has_node(&self, text: &str) -> bool {
        self.node_index.contains_key(text)
    }

    /// The node carrying this exact text, if any.
    pub fn node_by_text(&self, text: &str) -> Option<NodeIndex> {
        self.node_index.get(text).copied()
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    /// The text identity of a node.
    pub fn node_text(&self, idx: NodeIndex) -> &str {
        &self.graph[idx]
    }

    /// Whether an edge `a → b` with exactly this label exists.
    pub fn has_edge(&self, a: NodeIndex, b: NodeIndex, label: &str) -> bool {
        self.graph
            .edges_connecting(a, b)
            .any(|edge| edge.weight() == label)
    }

    /// Outgoing edges of a node as `(target, label)` pairs.
    pub fn edges_out(&self, idx: NodeIndex) -> impl Iterator<Item = (NodeIndex, &str)> + '_ {
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|edge| (edge.target(), edge.weight().as_str()))
    }

    /// Incoming edges of a node as `(source, label)` pairs.
    pub fn edges_in(&self, idx: NodeIndex) -> impl Iterator<Item = (NodeIndex, &str)> + '_ {
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .map(|edge| (edge.source(), edge.weight().as_str()))
    }

    /// All edges as `(source, target, label)`, in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (NodeIndex, NodeIndex, &str)> + '_ {
        self.graph
            .edge_references()
            .map(|edge| (edge.source(), edge.target(), edge.weight().as_str()))
    }

    /// All edges re-materialized as triples, in insertion order.
    pub fn triples(&self) -> Vec<Triple> {
        self.edges()
            .map(|(s, t, label)| {
                Triple::new(self.node_text(s), label, self.node_text(t))
            })
            .collect()
    }
}
