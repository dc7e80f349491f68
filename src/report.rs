//! Metrics report: the serialisable end product of a run.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::analysis::{Analysis, GraphStats, RankedNode, Recommendation};
use crate::graph::KnowledgeGraph;
use crate::model::{EntityId, EntityType};
use crate::{Result, RunSummary};

/// Per-node metrics as reported.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeReport {
    pub name: String,
    pub entity_type: EntityType,
    pub degree_centrality: f64,
    pub betweenness_centrality: f64,
    pub closeness_centrality: f64,
    pub community_id: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsReport {
    pub generated_at: chrono::DateTime<chrono::Utc>,
    /// Set when the graph had no edges; the remaining metrics are trivial.
    pub warning: Option<String>,
    /// canonical id → metrics
    pub nodes: BTreeMap<String, NodeReport>,
    pub top: Vec<RankedNode>,
    pub node_count: usize,
    pub edge_count: usize,
    pub density: f64,
    pub is_connected: bool,
    pub modularity: Option<f64>,
    pub community_count: Option<usize>,
    pub stats: Option<GraphStats>,
    /// Empty when the graph had no edges.
    pub recommendations: Vec<Recommendation>,
    pub summary: RunSummary,
}

impl MetricsReport {
    pub fn new(graph: &KnowledgeGraph, analysis: &Analysis, summary: &RunSummary, top_n: usize) -> Self {
        let metrics = analysis.metrics();
        let mut nodes = BTreeMap::new();
        for node in graph.nodes() {
            let id = &node.canonical_id;
            let score = |scores: Option<&BTreeMap<EntityId, f64>>| scores.and_then(|s| s.get(id).copied()).unwrap_or(0.0);
            nodes.insert(
                id.to_string(),
                NodeReport {
                    name: node.display_name.clone(),
                    entity_type: node.entity_type,
                    degree_centrality: score(Some(analysis.degree_centrality())),
                    betweenness_centrality: score(metrics.map(|m| &m.betweenness_centrality)),
                    closeness_centrality: score(metrics.map(|m| &m.closeness_centrality)),
                    community_id: metrics.and_then(|m| m.community.get(id).copied()),
                },
            );
        }

        Self {
            generated_at: chrono::Utc::now(),
            warning: match analysis {
                Analysis::Empty(w) => Some(w.to_string()),
                Analysis::Structured(_) => None,
            },
            nodes,
            top: metrics.map(|m| m.top(top_n).to_vec()).unwrap_or_default(),
            node_count: graph.node_count(),
            edge_count: graph.edge_count(),
            density: graph.density(),
            is_connected: graph.is_connected(),
            modularity: metrics.map(|m| m.modularity),
            community_count: metrics.map(|m| m.community_count),
            stats: metrics.map(|m| m.stats.clone()),
            recommendations: metrics.map(|m| m.recommendations.clone()).unwrap_or_default(),
            summary: summary.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
