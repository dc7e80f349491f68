//! # Knowledge Graph
//!
//! Undirected simple graph over resolved entities. Nodes and edges keep
//! insertion order; at most one edge joins any unordered endpoint pair and
//! the first relation label wins.
//!
//! Built once per run by [`GraphBuilder`], then only read.

pub mod builder;

use std::collections::BTreeMap;

use hashbrown::{HashMap, HashSet};
use serde::Serialize;

use crate::model::{Edge, Entity, EntityId, EntityType};

pub use builder::{
    check_relation_rows, BuildReport, Endpoint, GraphBuilder, RelationValidity, UnresolvedEndpointWarning,
};

/// Outcome of a single edge insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeInsert {
    Added,
    /// The pair already has an edge; the earlier relation is kept.
    Duplicate,
    SelfLoop,
    /// An endpoint is not a node of this graph.
    MissingEndpoint,
}

// ============================================================================
// KnowledgeGraph
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraph {
    nodes: Vec<Entity>,
    index: HashMap<EntityId, usize>,
    /// node index → neighbour indices, in edge insertion order
    adjacency: Vec<Vec<usize>>,
    edges: Vec<Edge>,
    /// unordered pairs as `(min, max)` node indices
    pairs: HashSet<(usize, usize)>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, or merge into the existing node with the same id.
    pub fn add_node(&mut self, entity: Entity) -> usize {
        if let Some(&i) = self.index.get(&entity.canonical_id) {
            let existing = &mut self.nodes[i];
            existing.merge(&entity.display_name, entity.entity_type, &entity.attributes);
            return i;
        }
        let i = self.nodes.len();
        self.index.insert(entity.canonical_id.clone(), i);
        self.nodes.push(entity);
        self.adjacency.push(Vec::new());
        i
    }

    /// Insert an edge under the simple-graph rules.
    pub fn add_edge(&mut self, source: &EntityId, target: &EntityId, relation: &str) -> EdgeInsert {
        let (Some(&s), Some(&t)) = (self.index.get(source), self.index.get(target)) else {
            return EdgeInsert::MissingEndpoint;
        };
        if s == t {
            return EdgeInsert::SelfLoop;
        }
        if !self.pairs.insert((s.min(t), s.max(t))) {
            return EdgeInsert::Duplicate;
        }
        self.adjacency[s].push(t);
        self.adjacency[t].push(s);
        self.edges.push(Edge::new(source.clone(), target.clone(), relation));
        EdgeInsert::Added
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn nodes(&self) -> &[Entity] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.index.contains_key(id)
    }

    pub fn index_of(&self, id: &EntityId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn node(&self, id: &EntityId) -> Option<&Entity> {
        self.index_of(id).map(|i| &self.nodes[i])
    }

    /// Neighbour indices of node `i`.
    pub fn neighbors(&self, i: usize) -> &[usize] {
        &self.adjacency[i]
    }

    pub fn degree(&self, i: usize) -> usize {
        self.adjacency[i].len()
    }

    pub fn degree_of(&self, id: &EntityId) -> usize {
        self.index_of(id).map_or(0, |i| self.degree(i))
    }

    pub fn has_edge(&self, a: &EntityId, b: &EntityId) -> bool {
        match (self.index_of(a), self.index_of(b)) {
            (Some(a), Some(b)) => self.adjacent(a, b),
            _ => false,
        }
    }

    /// Index-level edge test.
    pub fn adjacent(&self, a: usize, b: usize) -> bool {
        self.pairs.contains(&(a.min(b), a.max(b)))
    }

    /// Nodes with no incident edge, in insertion order.
    pub fn isolated_nodes(&self) -> Vec<&EntityId> {
        self.nodes
            .iter()
            .zip(&self.adjacency)
            .filter(|(_, adj)| adj.is_empty())
            .map(|(n, _)| &n.canonical_id)
            .collect()
    }

    /// `2E / (n (n - 1))`; zero below two nodes.
    pub fn density(&self) -> f64 {
        let n = self.nodes.len() as f64;
        if n < 2.0 {
            return 0.0;
        }
        2.0 * self.edges.len() as f64 / (n * (n - 1.0))
    }

    /// Connected components as node-index lists, each in BFS order,
    /// ordered by their lowest node index.
    pub fn components(&self) -> Vec<Vec<usize>> {
        let mut seen = vec![false; self.nodes.len()];
        let mut out = Vec::new();
        for start in 0..self.nodes.len() {
            if seen[start] {
                continue;
            }
            seen[start] = true;
            let mut component = vec![start];
            let mut head = 0;
            while head < component.len() {
                let v = component[head];
                head += 1;
                for &w in &self.adjacency[v] {
                    if !seen[w] {
                        seen[w] = true;
                        component.push(w);
                    }
                }
            }
            out.push(component);
        }
        out
    }

    /// True for a non-empty graph with a single component.
    pub fn is_connected(&self) -> bool {
        !self.nodes.is_empty() && self.components().len() == 1
    }

    /// Node counts and average degree per entity type.
    pub fn type_stats(&self) -> BTreeMap<EntityType, TypeStats> {
        let mut stats: BTreeMap<EntityType, TypeStats> = BTreeMap::new();
        for (i, node) in self.nodes.iter().enumerate() {
            let s = stats.entry(node.entity_type).or_default();
            s.count += 1;
            s.total_degree += self.degree(i);
        }
        for s in stats.values_mut() {
            s.average_degree = s.total_degree as f64 / s.count as f64;
        }
        stats
    }

    /// Edge counts per relation label.
    pub fn relation_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for e in &self.edges {
            *counts.entry(e.relation.clone()).or_insert(0) += 1;
        }
        counts
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TypeStats {
    pub count: usize,
    pub total_degree: usize,
    pub average_degree: f64,
}
