//! Louvain community detection.
//!
//! Each level runs a local-moving phase (nodes visited in a seeded random
//! order, each moved to the neighbouring community with the best
//! modularity gain) and then aggregates every community into one weighted
//! super-node. Levels repeat until nothing moves or the modularity gain
//! falls below `min_improvement`.
//!
//! ```text
//! Q = Σ_c [ L_c / m  -  γ (d_c / 2m)² ]
//! ```
//!
//! `L_c` = edges inside `c`, `d_c` = degree sum of `c`, `m` = edge count,
//! `γ` = resolution. Neighbour communities are scanned in ascending id
//! order and ties keep the earlier candidate, so a fixed seed gives a
//! fixed partition.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::graph::KnowledgeGraph;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LouvainConfig {
    /// Higher values favour more, smaller communities.
    pub resolution: f64,
    /// Upper bound on aggregation levels, and on sweeps within a level.
    pub max_passes: usize,
    pub min_improvement: f64,
    pub seed: u64,
}

impl Default for LouvainConfig {
    fn default() -> Self {
        Self { resolution: 1.0, max_passes: 100, min_improvement: 1e-7, seed: 42 }
    }
}

/// Community membership per node (indexed like the graph's nodes).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Partition {
    /// Community ids, numbered 0.. in order of first appearance.
    pub membership: Vec<usize>,
    pub community_count: usize,
    pub modularity: f64,
}

impl Partition {
    /// Member node indices of every community.
    pub fn communities(&self) -> Vec<Vec<usize>> {
        let mut out = vec![Vec::new(); self.community_count];
        for (node, &c) in self.membership.iter().enumerate() {
            out[c].push(node);
        }
        out
    }
}

// ============================================================================
// Weighted level graph
// ============================================================================

/// One aggregation level. Node `i` stands for a set of original nodes.
struct Level {
    adj: Vec<Vec<(usize, f64)>>,
    /// Weight of edges folded inside the super-node.
    internal: Vec<f64>,
    /// Weighted degree: neighbour weights plus twice the internal weight.
    degree: Vec<f64>,
}

impl Level {
    fn from_graph(graph: &KnowledgeGraph) -> Self {
        let n = graph.node_count();
        let adj: Vec<Vec<(usize, f64)>> = (0..n)
            .map(|i| graph.neighbors(i).iter().map(|&j| (j, 1.0)).collect())
            .collect();
        let degree = adj.iter().map(|a| a.len() as f64).collect();
        Self { adj, internal: vec![0.0; n], degree }
    }

    fn len(&self) -> usize {
        self.adj.len()
    }

    /// Collapse communities (already numbered 0..k) into super-nodes.
    fn aggregate(&self, community: &[usize], k: usize) -> Self {
        let mut internal = vec![0.0; k];
        let mut links: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); k];

        for i in 0..self.len() {
            let ci = community[i];
            internal[ci] += self.internal[i];
            for &(j, w) in &self.adj[i] {
                if j < i {
                    continue;
                }
                let cj = community[j];
                if ci == cj {
                    internal[ci] += w;
                } else {
                    *links[ci].entry(cj).or_insert(0.0) += w;
                    *links[cj].entry(ci).or_insert(0.0) += w;
                }
            }
        }

        let adj: Vec<Vec<(usize, f64)>> = links.into_iter().map(|m| m.into_iter().collect()).collect();
        let degree = adj
            .iter()
            .zip(&internal)
            .map(|(a, &inner)| a.iter().map(|&(_, w)| w).sum::<f64>() + 2.0 * inner)
            .collect();
        Self { adj, internal, degree }
    }
}

// ============================================================================
// Louvain
// ============================================================================

/// Partition the graph. Edgeless graphs get one community per node and
/// modularity zero.
pub fn louvain(graph: &KnowledgeGraph, config: &LouvainConfig) -> Partition {
    let n = graph.node_count();
    let m = graph.edge_count() as f64;
    if m == 0.0 {
        return Partition { membership: (0..n).collect(), community_count: n, modularity: 0.0 };
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut level = Level::from_graph(graph);
    // original node → node of the current level
    let mut membership: Vec<usize> = (0..n).collect();
    let mut current_q = modularity(graph, &membership, config.resolution);

    for pass in 0..config.max_passes {
        let (community, moved) = local_moving(&level, m, config, &mut rng);
        if !moved {
            break;
        }
        let (community, k) = renumber(&community);
        let candidate: Vec<usize> = membership.iter().map(|&v| community[v]).collect();
        let q = modularity(graph, &candidate, config.resolution);
        debug!(pass, communities = k, modularity = q, "louvain level");

        if q - current_q < config.min_improvement {
            break;
        }
        membership = candidate;
        current_q = q;
        level = level.aggregate(&community, k);
        if k == 1 {
            break;
        }
    }

    let (membership, community_count) = renumber(&membership);
    Partition { membership, community_count, modularity: current_q }
}

/// One local-moving phase. Returns the community of every level node and
/// whether any node changed community.
fn local_moving(level: &Level, m: f64, config: &LouvainConfig, rng: &mut StdRng) -> (Vec<usize>, bool) {
    let n = level.len();
    let two_m = 2.0 * m;
    let gamma = config.resolution;

    let mut community: Vec<usize> = (0..n).collect();
    let mut total: Vec<f64> = level.degree.clone();
    let mut order: Vec<usize> = (0..n).collect();
    let mut moved_any = false;

    for _ in 0..config.max_passes {
        order.shuffle(rng);
        let mut moved = false;

        for &i in &order {
            let ci = community[i];
            let ki = level.degree[i];

            let mut weights: BTreeMap<usize, f64> = BTreeMap::new();
            for &(j, w) in &level.adj[i] {
                *weights.entry(community[j]).or_insert(0.0) += w;
            }

            total[ci] -= ki;
            let gain = |c: usize, w: f64| w - gamma * total[c] * ki / two_m;

            let mut best = ci;
            let mut best_gain = gain(ci, weights.get(&ci).copied().unwrap_or(0.0));
            for (&c, &w) in &weights {
                let g = gain(c, w);
                if g > best_gain {
                    best = c;
                    best_gain = g;
                }
            }

            total[best] += ki;
            if best != ci {
                community[i] = best;
                moved = true;
            }
        }

        if !moved {
            break;
        }
        moved_any = true;
    }

    (community, moved_any)
}

/// Renumber labels 0.. in order of first appearance.
fn renumber(labels: &[usize]) -> (Vec<usize>, usize) {
    let mut mapping: BTreeMap<usize, usize> = BTreeMap::new();
    let renumbered: Vec<usize> = labels
        .iter()
        .map(|&c| {
            let next = mapping.len();
            *mapping.entry(c).or_insert(next)
        })
        .collect();
    (renumbered, mapping.len())
}

/// Modularity of `membership` on the unweighted graph.
pub fn modularity(graph: &KnowledgeGraph, membership: &[usize], resolution: f64) -> f64 {
    let m = graph.edge_count() as f64;
    if m == 0.0 {
        return 0.0;
    }
    let k = membership.iter().copied().max().map_or(0, |c| c + 1);
    let mut inside = vec![0.0; k];
    let mut degree_sum = vec![0.0; k];

    for (i, &c) in membership.iter().enumerate() {
        degree_sum[c] += graph.degree(i) as f64;
    }
    for e in graph.edges() {
        let (Some(s), Some(t)) = (graph.index_of(&e.source), graph.index_of(&e.target)) else {
            continue;
        };
        if membership[s] == membership[t] {
            inside[membership[s]] += 1.0;
        }
    }

    inside
        .iter()
        .zip(&degree_sum)
        .map(|(&l, &d)| l / m - resolution * (d / (2.0 * m)).powi(2))
        .sum()
}
