//! End-to-end tests for centrality, communities and export on built graphs.

use questgraph::analysis::{analyze, modularity, AnalysisConfig};
use questgraph::export::export_cypher_dump;
use questgraph::{Analysis, Entity, EntityId, EntityType, KnowledgeGraph, MemoryStore, GraphStore};

fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> KnowledgeGraph {
    let mut g = KnowledgeGraph::new();
    for n in nodes {
        g.add_node(Entity::new(*n, *n).with_type(EntityType::Npc));
    }
    for (a, b) in edges {
        g.add_edge(&EntityId::new(*a), &EntityId::new(*b), "认识");
    }
    g
}

fn two_triangles() -> KnowledgeGraph {
    graph(
        &["a", "b", "c", "d", "e", "f"],
        &[("a", "b"), ("b", "c"), ("a", "c"), ("d", "e"), ("e", "f"), ("d", "f"), ("c", "d")],
    )
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

// ============================================================================
// 1. Centrality
// ============================================================================

#[test]
fn test_path_centrality() {
    let g = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
    let Analysis::Structured(m) = analyze(&g, &AnalysisConfig::default()) else {
        panic!("path has edges");
    };
    let b = EntityId::new("b");
    let a = EntityId::new("a");

    assert!(close(m.degree_centrality[&b], 1.0));
    assert!(close(m.degree_centrality[&a], 0.5));
    assert!(close(m.betweenness_centrality[&b], 1.0));
    assert!(close(m.betweenness_centrality[&a], 0.0));
    assert!(close(m.closeness_centrality[&b], 1.0));
    assert!(close(m.closeness_centrality[&a], 2.0 / 3.0));
    assert_eq!(m.stats.diameter, Some(2));
}

#[test]
fn test_ranking_ties_break_by_id() {
    let g = graph(&["z", "y", "x"], &[("z", "y"), ("y", "x"), ("x", "z")]);
    let m = analyze(&g, &AnalysisConfig::default());
    let ids: Vec<&str> = m.metrics().unwrap().ranking.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["x", "y", "z"]);
}

#[test]
fn test_disconnected_graph() {
    let g = graph(&["a", "b", "c", "d", "lonely"], &[("a", "b"), ("c", "d")]);
    let m = analyze(&g, &AnalysisConfig::default());
    let m = m.metrics().unwrap();

    assert!(!m.stats.is_connected);
    assert_eq!(m.stats.component_count, 3);
    assert_eq!(m.stats.diameter, None);
    assert_eq!(m.isolated, vec![EntityId::new("lonely")]);
    assert!(close(m.closeness_centrality[&EntityId::new("lonely")], 0.0));
}

#[test]
fn test_edgeless_graph_warns() {
    let g = graph(&["a", "b"], &[]);
    let analysis = analyze(&g, &AnalysisConfig::default());
    assert!(analysis.is_empty_graph());
    assert_eq!(analysis.degree_centrality().len(), 2);
    assert!(analysis.metrics().is_none());
}

// ============================================================================
// 2. Communities
// ============================================================================

#[test]
fn test_two_triangles_split() {
    let g = two_triangles();
    let m = analyze(&g, &AnalysisConfig::default());
    let m = m.metrics().unwrap();

    let c = |id: &str| m.community[&EntityId::new(id)];
    assert_eq!(m.community_count, 2);
    assert_eq!(c("a"), c("b"));
    assert_eq!(c("b"), c("c"));
    assert_eq!(c("d"), c("f"));
    assert_ne!(c("a"), c("d"));
    assert!(close(m.modularity, 2.0 * (3.0 / 7.0 - 0.25)));
}

#[test]
fn test_modularity_matches_partition() {
    let g = two_triangles();
    let m = analyze(&g, &AnalysisConfig::default());
    let m = m.metrics().unwrap();
    let membership: Vec<usize> = g.nodes().iter().map(|n| m.community[&n.canonical_id]).collect();
    assert!(close(modularity(&g, &membership, 1.0), m.modularity));

    // Everything in one community scores zero.
    assert!(close(modularity(&g, &[0; 6], 1.0), 0.0));
}

#[test]
fn test_same_seed_same_partition() {
    let g = two_triangles();
    let config = AnalysisConfig { seed: 7, ..AnalysisConfig::default() };
    assert_eq!(analyze(&g, &config), analyze(&g, &config));
}

// ============================================================================
// 3. Export and store
// ============================================================================

#[test]
fn test_dump_and_store_agree() {
    let g = two_triangles();

    let mut out = Vec::new();
    export_cypher_dump(&g, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert_eq!(text.matches("MERGE (n:Entity").count(), 6);
    assert_eq!(text.matches("MERGE (a)-[:REL").count(), 7);

    let store = MemoryStore::from_graph(&g).unwrap();
    let rows = store.query_relations().unwrap();
    assert_eq!(rows.len(), 7);
    assert!(rows.iter().all(|r| r.relation == "认识" && r.source_type == "NPC"));
}
