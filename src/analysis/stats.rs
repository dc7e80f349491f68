//! Whole-graph statistics.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::graph::{KnowledgeGraph, TypeStats};
use crate::model::EntityType;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub density: f64,
    pub is_connected: bool,
    pub component_count: usize,
    pub isolated_count: usize,
    pub average_degree: f64,
    pub max_degree: usize,
    pub min_degree: usize,
    /// degree → number of nodes with that degree
    pub degree_distribution: BTreeMap<usize, usize>,
    pub average_clustering: f64,
    /// Only defined for connected graphs.
    pub diameter: Option<usize>,
    pub average_path_length: Option<f64>,
    pub by_type: BTreeMap<EntityType, TypeStats>,
    pub relations: BTreeMap<String, usize>,
}

impl GraphStats {
    pub fn compute(graph: &KnowledgeGraph) -> Self {
        let n = graph.node_count();
        let degrees: Vec<usize> = (0..n).map(|i| graph.degree(i)).collect();

        let mut degree_distribution = BTreeMap::new();
        for &d in &degrees {
            *degree_distribution.entry(d).or_insert(0) += 1;
        }

        let components = graph.components();
        let is_connected = n > 0 && components.len() == 1;
        let (diameter, average_path_length) = if is_connected {
            let (diameter, apl) = path_lengths(graph);
            (Some(diameter), Some(apl))
        } else {
            (None, None)
        };

        Self {
            node_count: n,
            edge_count: graph.edge_count(),
            density: graph.density(),
            is_connected,
            component_count: components.len(),
            isolated_count: degrees.iter().filter(|&&d| d == 0).count(),
            average_degree: if n == 0 { 0.0 } else { degrees.iter().sum::<usize>() as f64 / n as f64 },
            max_degree: degrees.iter().copied().max().unwrap_or(0),
            min_degree: degrees.iter().copied().min().unwrap_or(0),
            degree_distribution,
            average_clustering: average_clustering(graph),
            diameter,
            average_path_length,
            by_type: graph.type_stats(),
            relations: graph.relation_counts(),
        }
    }
}

/// Local clustering `2T / (k (k - 1))` per node; nodes with degree below
/// two count as zero in the mean.
pub fn clustering(graph: &KnowledgeGraph) -> Vec<f64> {
    (0..graph.node_count())
        .map(|i| {
            let nbrs = graph.neighbors(i);
            let k = nbrs.len();
            if k < 2 {
                return 0.0;
            }
            let mut links = 0usize;
            for (a, &u) in nbrs.iter().enumerate() {
                for &v in &nbrs[a + 1..] {
                    if graph.adjacent(u, v) {
                        links += 1;
                    }
                }
            }
            2.0 * links as f64 / (k * (k - 1)) as f64
        })
        .collect()
}

pub fn average_clustering(graph: &KnowledgeGraph) -> f64 {
    let c = clustering(graph);
    if c.is_empty() {
        0.0
    } else {
        c.iter().sum::<f64>() / c.len() as f64
    }
}

/// Diameter and mean shortest-path length of a connected graph.
fn path_lengths(graph: &KnowledgeGraph) -> (usize, f64) {
    let n = graph.node_count();
    if n <= 1 {
        return (0, 0.0);
    }
    let mut diameter = 0;
    let mut total = 0usize;
    for u in 0..n {
        for d in super::distances_from(graph, u).into_iter().flatten() {
            diameter = diameter.max(d);
            total += d;
        }
    }
    (diameter, total as f64 / (n * (n - 1)) as f64)
}
