//! # Centrality & Community Analyzer
//!
//! Read-only metrics over a built [`KnowledgeGraph`], recomputed wholesale
//! on every run.
//!
//! ```text
//! KnowledgeGraph ──▶ analyze() ──┬──▶ Analysis::Structured(GraphMetrics)
//!                                └──▶ Analysis::Empty(EmptyGraphWarning)   (no edges)
//! ```
//!
//! An edgeless graph still gets degree centrality (all zeros), but
//! betweenness and community structure are meaningless there, so the
//! caller receives an explicit warning instead of degenerate numbers.

pub mod advice;
pub mod centrality;
pub mod community;
pub mod stats;

use std::cmp::Reverse;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::graph::KnowledgeGraph;
use crate::model::{EntityId, EntityType};

pub use advice::{recommendations, Recommendation};
pub use centrality::{betweenness_centrality, closeness_centrality, degree_centrality, raw_degrees};
pub use community::{louvain, modularity, LouvainConfig, Partition};
pub use stats::GraphStats;

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub seed: u64,
    pub resolution: f64,
    pub max_passes: usize,
    /// Length of the reported ranking.
    pub top_n: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self { seed: 42, resolution: 1.0, max_passes: 100, top_n: 20 }
    }
}

impl AnalysisConfig {
    pub fn louvain(&self) -> LouvainConfig {
        LouvainConfig {
            resolution: self.resolution,
            max_passes: self.max_passes,
            seed: self.seed,
            ..LouvainConfig::default()
        }
    }
}

// ============================================================================
// Results
// ============================================================================

/// One row of the centrality ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedNode {
    pub id: EntityId,
    pub name: String,
    pub entity_type: EntityType,
    pub degree: usize,
    pub degree_centrality: f64,
    pub betweenness_centrality: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphMetrics {
    pub degree_centrality: BTreeMap<EntityId, f64>,
    pub betweenness_centrality: BTreeMap<EntityId, f64>,
    pub closeness_centrality: BTreeMap<EntityId, f64>,
    pub community: BTreeMap<EntityId, usize>,
    pub community_count: usize,
    pub modularity: f64,
    /// Every node, by degree centrality descending, ties by id ascending.
    pub ranking: Vec<RankedNode>,
    /// Nodes without edges, in insertion order.
    pub isolated: Vec<EntityId>,
    pub stats: GraphStats,
    /// Design advice from `stats` and `modularity`, in rule order.
    pub recommendations: Vec<Recommendation>,
}

impl GraphMetrics {
    pub fn top(&self, n: usize) -> &[RankedNode] {
        &self.ranking[..n.min(self.ranking.len())]
    }
}

/// The graph has no edges: only trivial metrics exist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmptyGraphWarning {
    pub node_count: usize,
    /// All zeros.
    pub degree_centrality: BTreeMap<EntityId, f64>,
}

impl fmt::Display for EmptyGraphWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "graph has {} nodes and no edges; nothing to analyze", self.node_count)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Analysis {
    Structured(GraphMetrics),
    Empty(EmptyGraphWarning),
}

impl Analysis {
    pub fn metrics(&self) -> Option<&GraphMetrics> {
        match self {
            Analysis::Structured(m) => Some(m),
            Analysis::Empty(_) => None,
        }
    }

    pub fn is_empty_graph(&self) -> bool {
        matches!(self, Analysis::Empty(_))
    }

    /// Degree centrality is defined in both outcomes.
    pub fn degree_centrality(&self) -> &BTreeMap<EntityId, f64> {
        match self {
            Analysis::Structured(m) => &m.degree_centrality,
            Analysis::Empty(w) => &w.degree_centrality,
        }
    }
}

// ============================================================================
// Analyzer
// ============================================================================

pub fn analyze(graph: &KnowledgeGraph, config: &AnalysisConfig) -> Analysis {
    let ids: Vec<&EntityId> = graph.nodes().iter().map(|e| &e.canonical_id).collect();
    let degree = degree_centrality(graph);
    let by_id = |scores: &[f64]| -> BTreeMap<EntityId, f64> {
        ids.iter().zip(scores).map(|(id, &s)| ((*id).clone(), s)).collect()
    };

    if graph.edge_count() == 0 {
        let warning = EmptyGraphWarning { node_count: graph.node_count(), degree_centrality: by_id(&degree) };
        warn!(nodes = warning.node_count, "graph has no edges, skipping betweenness and communities");
        return Analysis::Empty(warning);
    }

    let betweenness = betweenness_centrality(graph);
    let closeness = closeness_centrality(graph);
    let partition = louvain(graph, &config.louvain());
    let ranking = rank(graph, &degree, &betweenness);
    let stats = GraphStats::compute(graph);
    let recommendations = recommendations(&stats, partition.modularity);

    info!(
        nodes = stats.node_count,
        edges = stats.edge_count,
        communities = partition.community_count,
        modularity = partition.modularity,
        "analysis complete"
    );

    Analysis::Structured(GraphMetrics {
        degree_centrality: by_id(&degree),
        betweenness_centrality: by_id(&betweenness),
        closeness_centrality: by_id(&closeness),
        community: ids.iter().zip(&partition.membership).map(|(id, &c)| ((*id).clone(), c)).collect(),
        community_count: partition.community_count,
        modularity: partition.modularity,
        ranking,
        isolated: graph.isolated_nodes().into_iter().cloned().collect(),
        stats,
        recommendations,
    })
}

/// Degree descending, then canonical id ascending.
fn rank(graph: &KnowledgeGraph, degree: &[f64], betweenness: &[f64]) -> Vec<RankedNode> {
    let mut order: Vec<usize> = (0..graph.node_count()).collect();
    order.sort_by_key(|&i| (Reverse(graph.degree(i)), &graph.nodes()[i].canonical_id));
    order
        .into_iter()
        .map(|i| {
            let node = &graph.nodes()[i];
            RankedNode {
                id: node.canonical_id.clone(),
                name: node.display_name.clone(),
                entity_type: node.entity_type,
                degree: graph.degree(i),
                degree_centrality: degree[i],
                betweenness_centrality: betweenness[i],
            }
        })
        .collect()
}

/// BFS hop distances from `source`; `None` for unreachable nodes.
pub(crate) fn distances_from(graph: &KnowledgeGraph, source: usize) -> Vec<Option<usize>> {
    let mut dist = vec![None; graph.node_count()];
    let mut queue = VecDeque::new();
    dist[source] = Some(0);
    queue.push_back(source);
    while let Some(v) = queue.pop_front() {
        let next = dist[v].map_or(0, |d| d + 1);
        for &w in graph.neighbors(v) {
            if dist[w].is_none() {
                dist[w] = Some(next);
                queue.push_back(w);
            }
        }
    }
    dist
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Entity;
    use proptest::prelude::*;

    fn graph(ids: &[&str], edges: &[(&str, &str)]) -> KnowledgeGraph {
        let mut g = KnowledgeGraph::new();
        for id in ids {
            g.add_node(Entity::new(*id, *id));
        }
        for (a, b) in edges {
            g.add_edge(&EntityId::new(*a), &EntityId::new(*b), "r");
        }
        g
    }

    #[test]
    fn test_empty_graph_warning() {
        let g = graph(&["a", "b", "c"], &[]);
        let analysis = analyze(&g, &AnalysisConfig::default());
        let Analysis::Empty(w) = &analysis else {
            panic!("expected empty-graph warning");
        };
        assert_eq!(w.node_count, 3);
        assert!(analysis.degree_centrality().values().all(|&d| d == 0.0));
    }

    #[test]
    fn test_ranking_ties_by_id() {
        let g = graph(&["c", "b", "a", "hub", "lonely"], &[("hub", "c"), ("hub", "b"), ("hub", "a")]);
        let analysis = analyze(&g, &AnalysisConfig::default());
        let m = analysis.metrics().unwrap();
        let order: Vec<&str> = m.ranking.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(order, vec!["hub", "a", "b", "c", "lonely"]);
        assert_eq!(m.isolated, vec![EntityId::new("lonely")]);
        assert_eq!(m.top(2).len(), 2);
        assert_eq!(m.top(99).len(), 5);
    }

    #[test]
    fn test_metrics_keyed_by_id() {
        let g = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
        let m = analyze(&g, &AnalysisConfig::default()).metrics().cloned().unwrap();
        assert_eq!(m.degree_centrality[&EntityId::new("b")], 1.0);
        assert_eq!(m.betweenness_centrality[&EntityId::new("b")], 1.0);
        assert_eq!(m.community.len(), 3);
        assert_eq!(m.recommendations.len(), 8);
        assert!(matches!(m.recommendations[0], Recommendation::Density { level: advice::Level::High, .. }));
    }

    proptest! {
        #[test]
        fn test_degree_sum_is_twice_edges(edges in proptest::collection::vec((0usize..12, 0usize..12), 0..40)) {
            let mut g = KnowledgeGraph::new();
            for i in 0..12 {
                g.add_node(Entity::new(format!("n{i}"), ""));
            }
            for (a, b) in &edges {
                g.add_edge(&EntityId::new(format!("n{a}")), &EntityId::new(format!("n{b}")), "r");
            }
            let sum: usize = raw_degrees(&g).iter().sum();
            prop_assert_eq!(sum, 2 * g.edge_count());

            // Normalised scores scale back to the same total.
            let normalised: f64 = degree_centrality(&g).iter().sum();
            prop_assert!((normalised * 11.0 - sum as f64).abs() < 1e-9);
        }
    }
}
