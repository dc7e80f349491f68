//! Graph assembly from resolved entities and deduplicated facts.
//!
//! The builder never mints: endpoints are looked up in the resolver and a
//! fact whose subject or object is unknown is dropped with an
//! [`UnresolvedEndpointWarning`]. Drops, duplicates and self-loops are
//! counted in the [`BuildReport`].

use serde::Serialize;
use tracing::{debug, info, warn};

use super::{EdgeInsert, KnowledgeGraph};
use crate::model::{EntityId, Triplet};
use crate::resolve::{columns, relation_label, EntityResolver, Row};

/// Which side of a fact failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Subject,
    Object,
    Both,
}

/// A fact dropped because an endpoint is not a known node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedEndpointWarning {
    pub subject: String,
    pub predicate: String,
    pub object: String,
    pub missing: Endpoint,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BuildReport {
    pub edges_added: usize,
    pub dropped_edges: usize,
    pub duplicate_edges: usize,
    pub self_loops: usize,
    pub unresolved: Vec<UnresolvedEndpointWarning>,
}

impl BuildReport {
    fn record(&mut self, outcome: EdgeInsert) {
        match outcome {
            EdgeInsert::Added => self.edges_added += 1,
            EdgeInsert::Duplicate => self.duplicate_edges += 1,
            EdgeInsert::SelfLoop => self.self_loops += 1,
            EdgeInsert::MissingEndpoint => self.dropped_edges += 1,
        }
    }

    fn drop_unresolved(&mut self, subject: &str, predicate: &str, object: &str, missing: Endpoint) {
        debug!(subject, predicate, object, ?missing, "dropping fact with unresolved endpoint");
        self.dropped_edges += 1;
        self.unresolved.push(UnresolvedEndpointWarning {
            subject: subject.to_owned(),
            predicate: predicate.to_owned(),
            object: object.to_owned(),
            missing,
        });
    }
}

fn missing_side(s: &Option<EntityId>, o: &Option<EntityId>) -> Option<Endpoint> {
    match (s.is_some(), o.is_some()) {
        (true, true) => None,
        (false, true) => Some(Endpoint::Subject),
        (true, false) => Some(Endpoint::Object),
        (false, false) => Some(Endpoint::Both),
    }
}

// ============================================================================
// GraphBuilder
// ============================================================================

pub struct GraphBuilder<'r> {
    resolver: &'r EntityResolver,
}

impl<'r> GraphBuilder<'r> {
    pub fn new(resolver: &'r EntityResolver) -> Self {
        Self { resolver }
    }

    /// A graph holding every resolved entity, without edges.
    pub fn nodes_only(&self) -> KnowledgeGraph {
        let mut graph = KnowledgeGraph::new();
        for entity in self.resolver.entities() {
            graph.add_node(entity.clone());
        }
        graph
    }

    /// Build the graph from deduplicated triplets.
    pub fn build(&self, triplets: &[Triplet]) -> (KnowledgeGraph, BuildReport) {
        let mut graph = self.nodes_only();
        let report = self.extend(&mut graph, triplets);
        (graph, report)
    }

    /// Insert triplets into an existing graph. Re-inserting known facts
    /// leaves the edge set unchanged.
    pub fn extend(&self, graph: &mut KnowledgeGraph, triplets: &[Triplet]) -> BuildReport {
        let mut report = BuildReport::default();
        for t in triplets {
            let s = self.resolver.lookup(&t.subject);
            let o = self.resolver.lookup(&t.object);
            match (&s, &o) {
                (Some(s), Some(o)) => report.record(graph.add_edge(s, o, &t.predicate)),
                _ => {
                    let missing = missing_side(&s, &o).unwrap_or(Endpoint::Both);
                    report.drop_unresolved(&t.subject, &t.predicate, &t.object, missing);
                }
            }
        }
        log_report(graph, &report);
        report
    }

    /// Build from tabular relation rows (`source*`/`target*` columns).
    pub fn build_tabular(&self, rows: &[Row]) -> (KnowledgeGraph, BuildReport) {
        let mut graph = self.nodes_only();
        let mut report = BuildReport::default();
        let relation_columns = &self.resolver.columns().relation;

        for row in rows {
            let s = self.resolver.find_node_id(row, "source");
            let o = self.resolver.find_node_id(row, "target");
            let relation = relation_label(row, relation_columns);
            match (&s, &o) {
                (Some(s), Some(o)) => report.record(graph.add_edge(s, o, &relation)),
                _ => {
                    let missing = missing_side(&s, &o).unwrap_or(Endpoint::Both);
                    report.drop_unresolved(
                        endpoint_text(row, "source"),
                        &relation,
                        endpoint_text(row, "target"),
                        missing,
                    );
                }
            }
        }
        log_report(&graph, &report);
        (graph, report)
    }
}

fn endpoint_text<'a>(row: &'a Row, prefix: &str) -> &'a str {
    columns::ENDPOINT_SUFFIXES
        .iter()
        .find_map(|suffix| columns::cell(row, &format!("{prefix}{suffix}")))
        .unwrap_or_default()
}

fn log_report(graph: &KnowledgeGraph, report: &BuildReport) {
    if report.dropped_edges > 0 {
        warn!(dropped = report.dropped_edges, "dropped facts with unresolved endpoints");
    }
    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        added = report.edges_added,
        duplicates = report.duplicate_edges,
        self_loops = report.self_loops,
        "graph built"
    );
}

// ============================================================================
// Relation-row validity
// ============================================================================

/// Columns that identify relation endpoints.
pub const ENDPOINT_COLUMNS: [&str; 4] = ["source", "target", "source_id", "target_id"];

/// Result of checking a locally parsed relation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationValidity {
    Valid,
    Empty,
    /// No row carries a recognisable endpoint column.
    NoEndpointColumns,
    /// A sampled row has no endpoint value at all.
    NullEndpoints { row: usize },
}

impl RelationValidity {
    pub fn is_valid(&self) -> bool {
        matches!(self, RelationValidity::Valid)
    }
}

/// Check a relation table: non-empty, endpoint columns present, and each
/// of the first `sample` rows has at least one endpoint value.
pub fn check_relation_rows(rows: &[Row], sample: usize) -> RelationValidity {
    if rows.is_empty() {
        return RelationValidity::Empty;
    }
    let has_columns = rows
        .iter()
        .any(|r| ENDPOINT_COLUMNS.iter().any(|c| r.contains_key(*c)));
    if !has_columns {
        return RelationValidity::NoEndpointColumns;
    }
    for (i, row) in rows.iter().take(sample).enumerate() {
        if !ENDPOINT_COLUMNS.iter().any(|c| columns::cell(row, c).is_some()) {
            return RelationValidity::NullEndpoints { row: i };
        }
    }
    RelationValidity::Valid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntityType;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn resolver(names: &[&str]) -> EntityResolver {
        let mut r = EntityResolver::new();
        for n in names {
            r.resolve(n);
        }
        r
    }

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect()
    }

    #[test]
    fn test_duplicate_facts_make_one_edge() {
        let r = resolver(&["A", "B"]);
        let t = Triplet::new("A", "rel1", "B");
        let (g, report) = GraphBuilder::new(&r).build(&[t.clone(), t]);
        assert_eq!(g.edge_count(), 1);
        assert_eq!(report.duplicate_edges, 1);
    }

    #[test]
    fn test_unresolved_endpoint_is_dropped() {
        let r = resolver(&["A"]);
        let (g, report) = GraphBuilder::new(&r).build(&[Triplet::new("A", "rel", "Nowhere")]);
        assert_eq!(g.edge_count(), 0);
        assert_eq!(g.node_count(), 1);
        assert_eq!(report.dropped_edges, 1);
        assert_eq!(report.unresolved[0].missing, Endpoint::Object);
    }

    #[test]
    fn test_self_loop_counted() {
        let r = resolver(&["A"]);
        let (g, report) = GraphBuilder::new(&r).build(&[Triplet::new("A", "rel", "A")]);
        assert_eq!(g.edge_count(), 0);
        assert_eq!(report.self_loops, 1);
    }

    #[test]
    fn test_extend_is_idempotent() {
        let r = resolver(&["A", "B", "C"]);
        let facts = [Triplet::new("A", "r1", "B"), Triplet::new("B", "r2", "C")];
        let builder = GraphBuilder::new(&r);
        let (mut g, _) = builder.build(&facts);
        let before = g.edges().to_vec();
        let again = builder.extend(&mut g, &facts);
        assert_eq!(g.edges(), before.as_slice());
        assert_eq!(again.edges_added, 0);
        assert_eq!(again.duplicate_edges, 2);
    }

    #[test]
    fn test_tabular_edges() {
        let mut r = EntityResolver::new();
        r.register("npc_1", "法师", EntityType::Npc, &BTreeMap::new());
        r.register("quest_1", "Introduce Yourself", EntityType::Quest, &BTreeMap::new());
        let rows = vec![
            row(&[("source", "npc_1"), ("target_name", "Introduce Yourself"), ("relation", "发布")]),
            row(&[("source_name", "法师"), ("target", "quest_1"), ("relation", "again")]),
            row(&[("source", "npc_1"), ("target", "quest_404")]),
        ];
        let (g, report) = GraphBuilder::new(&r).build_tabular(&rows);
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.edges()[0].relation, "发布");
        assert_eq!(report.duplicate_edges, 1);
        assert_eq!(report.unresolved[0].object, "quest_404");
        assert_eq!(report.unresolved[0].predicate, "Unknown");
    }

    #[test]
    fn test_relation_row_validity() {
        assert_eq!(check_relation_rows(&[], 3), RelationValidity::Empty);
        assert_eq!(check_relation_rows(&[row(&[("from", "a")])], 3), RelationValidity::NoEndpointColumns);
        let rows = vec![
            row(&[("source", "a"), ("target", "b")]),
            row(&[("source", "nan"), ("target", "")]),
        ];
        assert_eq!(check_relation_rows(&rows, 3), RelationValidity::NullEndpoints { row: 1 });
        assert!(check_relation_rows(&rows, 1).is_valid());
    }

    proptest::proptest! {
        #[test]
        fn test_rebuild_adds_nothing(facts in proptest::collection::vec(("[a-e]", "r[12]", "[a-e]"), 0..30)) {
            let r = resolver(&["a", "b", "c", "d", "e"]);
            let facts: Vec<Triplet> = facts.into_iter().map(Triplet::from).collect();
            let builder = GraphBuilder::new(&r);
            let (mut g, _) = builder.build(&facts);
            let before = g.edges().to_vec();
            let again = builder.extend(&mut g, &facts);
            proptest::prop_assert_eq!(g.edges(), before.as_slice());
            proptest::prop_assert_eq!(again.edges_added, 0);
        }
    }
}
