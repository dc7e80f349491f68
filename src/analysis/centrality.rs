//! Node centrality over the undirected simple graph.
//!
//! All functions return one score per node, indexed like
//! [`KnowledgeGraph::nodes`].

use std::collections::VecDeque;

use crate::graph::KnowledgeGraph;

/// Degree normalised by `n - 1`; all zeros for a single node.
pub fn degree_centrality(graph: &KnowledgeGraph) -> Vec<f64> {
    let n = graph.node_count();
    if n <= 1 {
        return vec![0.0; n];
    }
    let scale = 1.0 / (n - 1) as f64;
    (0..n).map(|i| graph.degree(i) as f64 * scale).collect()
}

/// Raw (unnormalised) degree. Sums to `2E`.
pub fn raw_degrees(graph: &KnowledgeGraph) -> Vec<usize> {
    (0..graph.node_count()).map(|i| graph.degree(i)).collect()
}

/// Shortest-path betweenness (Brandes), equal credit split across tied
/// shortest paths.
///
/// Normalised for undirected graphs: the all-sources sum counts every pair
/// twice and is scaled by `1 / ((n - 1)(n - 2))`. Graphs with two nodes or
/// fewer score zero everywhere.
pub fn betweenness_centrality(graph: &KnowledgeGraph) -> Vec<f64> {
    let n = graph.node_count();
    let mut centrality = vec![0.0; n];
    if n <= 2 {
        return centrality;
    }

    let mut stack: Vec<usize> = Vec::with_capacity(n);
    let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut sigma = vec![0.0f64; n];
    let mut dist = vec![-1i64; n];
    let mut delta = vec![0.0f64; n];
    let mut queue = VecDeque::with_capacity(n);

    for s in 0..n {
        stack.clear();
        for p in preds.iter_mut() {
            p.clear();
        }
        sigma.fill(0.0);
        dist.fill(-1);
        delta.fill(0.0);

        sigma[s] = 1.0;
        dist[s] = 0;
        queue.push_back(s);

        while let Some(v) = queue.pop_front() {
            stack.push(v);
            for &w in graph.neighbors(v) {
                if dist[w] < 0 {
                    dist[w] = dist[v] + 1;
                    queue.push_back(w);
                }
                if dist[w] == dist[v] + 1 {
                    sigma[w] += sigma[v];
                    preds[w].push(v);
                }
            }
        }

        while let Some(w) = stack.pop() {
            for &v in &preds[w] {
                delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
            }
            if w != s {
                centrality[w] += delta[w];
            }
        }
    }

    let scale = 1.0 / ((n - 1) as f64 * (n - 2) as f64);
    for c in centrality.iter_mut() {
        *c *= scale;
    }
    centrality
}

/// Closeness with the Wasserman–Faust correction for disconnected graphs:
/// `(r / d) * (r / (n - 1))`, where `r` counts reachable other nodes and
/// `d` is their total distance.
pub fn closeness_centrality(graph: &KnowledgeGraph) -> Vec<f64> {
    let n = graph.node_count();
    (0..n)
        .map(|u| {
            let dist = super::distances_from(graph, u);
            let (reached, total) = dist
                .iter()
                .flatten()
                .fold((0usize, 0usize), |(r, t), &d| if d > 0 { (r + 1, t + d) } else { (r, t) });
            if total == 0 || n <= 1 {
                return 0.0;
            }
            let r = reached as f64;
            (r / total as f64) * (r / (n - 1) as f64)
        })
        .collect()
}
