//! End-to-end tests for the record pipeline.
//!
//! Each test exercises: parse -> extract -> resolve -> build -> analyze
//! through `Pipeline::run()`.

use questgraph::{
    EntityId, EntityType, Error, KnowledgeGraph, Pipeline, PipelineConfig, RawRecord, SourceKind, SourceSet,
};

fn config() -> PipelineConfig {
    PipelineConfig { static_knowledge: false, ..PipelineConfig::default() }
}

fn id_of(graph: &KnowledgeGraph, name: &str) -> EntityId {
    graph
        .nodes()
        .iter()
        .find(|n| n.display_name == name)
        .map(|n| n.canonical_id.clone())
        .unwrap_or_else(|| panic!("no node named {name}"))
}

fn introduce_yourself() -> RawRecord {
    RawRecord::delimited(
        SourceKind::Quest,
        "1",
        "NPC_1/Introduce Yourself/Go talk to the Wizard./进入魔法师小屋。/Forest/.../100",
    )
}

// ============================================================================
// 1. One quest becomes a connected star
// ============================================================================

#[test]
fn test_introduce_yourself_links_quest_and_location() {
    let sources = SourceSet::new().with(SourceKind::Quest, vec![introduce_yourself()]);
    let out = Pipeline::new(config()).unwrap().run(&sources).unwrap();

    let quest = id_of(&out.graph, "Introduce Yourself");
    let forest = id_of(&out.graph, "Forest");
    assert_eq!(quest, EntityId::new("quest_1"));
    assert!(out.graph.has_edge(&quest, &forest));
    assert!(out.graph.degree_of(&forest) >= 1);
    assert_eq!(out.graph.node(&forest).unwrap().entity_type, EntityType::Location);

    // 发生于, 奖励金币, 要求到达, 发布
    assert_eq!(out.graph.edge_count(), 4);
    assert_eq!(out.graph.node_count(), 5);

    let metrics = out.analysis.metrics().expect("graph has edges");
    assert_eq!(metrics.degree_centrality[&quest], 1.0);
    assert_eq!(metrics.ranking[0].id, quest);
    assert!((metrics.betweenness_centrality[&quest] - 1.0).abs() < 1e-9);
}

#[test]
fn test_giver_lookup_and_reward() {
    let sources = SourceSet::new().with(SourceKind::Quest, vec![introduce_yourself()]);
    let out = Pipeline::new(config()).unwrap().run(&sources).unwrap();

    let wizard = id_of(&out.graph, "法师");
    assert_eq!(out.graph.node(&wizard).unwrap().entity_type, EntityType::Npc);
    assert!(out.graph.has_edge(&wizard, &EntityId::new("quest_1")));
    assert!(out.triplets.iter().any(|t| t.predicate == "奖励金币" && t.object == "100金"));
}

// ============================================================================
// 2. Sources and malformed records
// ============================================================================

#[test]
fn test_no_sources_is_an_error() {
    let err = Pipeline::new(config()).unwrap().run(&SourceSet::new()).unwrap_err();
    assert!(matches!(err, Error::NoDataAvailable));

    let empty = SourceSet::new().with(SourceKind::Quest, Vec::new());
    let err = Pipeline::new(config()).unwrap().run(&empty).unwrap_err();
    assert!(matches!(err, Error::NoDataAvailable));
}

#[test]
fn test_missing_sources_degrade() {
    let sources = SourceSet::new().with(SourceKind::Quest, vec![introduce_yourself()]);
    let out = Pipeline::new(config()).unwrap().run(&sources).unwrap();
    assert_eq!(out.summary.missing_sources, 5);
}

#[test]
fn test_malformed_records_are_skipped_and_counted() {
    let sources = SourceSet::new()
        .with(SourceKind::Quest, vec![
            introduce_yourself(),
            RawRecord::delimited(SourceKind::Quest, "2", "Basic/Title/Text"),
        ])
        .with(SourceKind::Item, vec![RawRecord::delimited(SourceKind::Item, "388", "-1/2")]);

    let out = Pipeline::new(config()).unwrap().run(&sources).unwrap();
    assert_eq!(out.summary.records_seen, 3);
    assert_eq!(out.summary.records_skipped, 2);
    assert!(out.graph.contains(&EntityId::new("quest_1")));
}

// ============================================================================
// 3. Endpoint minting switched off
// ============================================================================

#[test]
fn test_unresolved_endpoints_are_dropped_without_minting() {
    let config = PipelineConfig { mint_unresolved_endpoints: false, ..config() };
    let sources = SourceSet::new().with(SourceKind::Quest, vec![introduce_yourself()]);
    let out = Pipeline::new(config).unwrap().run(&sources).unwrap();

    assert_eq!(out.graph.node_count(), 1);
    assert_eq!(out.summary.dropped_edges, 4);
    assert_eq!(out.summary.unresolved_tokens, 4);
    assert_eq!(out.build.unresolved.len(), 4);
    assert!(out.analysis.is_empty_graph());
}

#[test]
fn test_sentinel_endpoint_is_counted_once_when_minting() {
    let odd_trip = RawRecord::delimited(SourceKind::Quest, "50", "Basic/Odd Trip/d/前往-1。/-1/-1/-1");
    let sources = SourceSet::new().with(SourceKind::Quest, vec![odd_trip]);
    let out = Pipeline::new(config()).unwrap().run(&sources).unwrap();

    assert!(out.triplets.iter().any(|t| t.object == "-1"));
    assert_eq!(out.summary.dropped_edges, 1);
    assert_eq!(out.summary.unresolved_tokens, 1);
    assert_eq!(out.graph.node_count(), 1);
}

#[test]
fn test_known_location_record_is_reused() {
    let sources = SourceSet::new()
        .with(SourceKind::Quest, vec![introduce_yourself()])
        .with(SourceKind::Location, vec![RawRecord::delimited(SourceKind::Location, "5", "Forest/west")]);
    let config = PipelineConfig { mint_unresolved_endpoints: false, ..config() };
    let out = Pipeline::new(config).unwrap().run(&sources).unwrap();

    assert!(out.graph.has_edge(&EntityId::new("quest_1"), &EntityId::new("loc_5")));
    assert_eq!(out.graph.node(&EntityId::new("loc_5")).unwrap().get("field_1"), Some("west"));
    assert_eq!(out.summary.dropped_edges, 3);
}

// ============================================================================
// 4. Recipes, dialogue and background facts
// ============================================================================

#[test]
fn test_recipes_and_dialogue() {
    let sources = SourceSet::new()
        .with(SourceKind::Item, vec![
            RawRecord::delimited(SourceKind::Item, "130", "箱子/100"),
            RawRecord::delimited(SourceKind::Item, "388", "木材/2"),
        ])
        .with(SourceKind::Recipe, vec![RawRecord::delimited(SourceKind::Recipe, "Chest", "130 1/388 50")])
        .with(SourceKind::Dialogue, vec![RawRecord::pairs(
            SourceKind::Dialogue,
            "克林特",
            [("Mon", "我刚打好一把新剑。"), ("Tue", "要升级你的镐吗？")],
        )]);
    let out = Pipeline::new(config()).unwrap().run(&sources).unwrap();

    let chest = EntityId::new("item_130");
    let wood = id_of(&out.graph, "木材×50");
    assert!(out.graph.has_edge(&chest, &wood));

    let clint = id_of(&out.graph, "克林特");
    assert_eq!(out.graph.degree_of(&clint), 2);
    assert_eq!(out.summary.missing_sources, 3);
}

#[test]
fn test_static_knowledge_adds_background_facts() {
    let sources = SourceSet::new().with(SourceKind::Quest, vec![introduce_yourself()]);
    let out = Pipeline::new(PipelineConfig::default()).unwrap().run(&sources).unwrap();

    let pierre = id_of(&out.graph, "皮埃尔");
    assert_eq!(out.graph.degree_of(&pierre), 2);
    assert_eq!(out.graph.node(&pierre).unwrap().entity_type, EntityType::Npc);
    assert!(out.graph.edge_count() > 4);
}

#[test]
fn test_runs_are_deterministic() {
    let sources = SourceSet::from_records(vec![
        introduce_yourself(),
        RawRecord::delimited(SourceKind::Quest, "6", "Basic/Getting Started/d/带来15个防风草。/Farm/-1/-1"),
        RawRecord::delimited(SourceKind::Quest, "7", "Basic/Raising Animals/d/前往畜棚。/Ranch/-1/-1"),
    ]);
    let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
    let a = pipeline.run(&sources).unwrap();
    let b = pipeline.run(&sources).unwrap();

    assert_eq!(a.triplets, b.triplets);
    assert_eq!(a.analysis, b.analysis);
    assert_eq!(a.summary, b.summary);
}

#[test]
fn test_report_serialises() {
    let sources = SourceSet::new().with(SourceKind::Quest, vec![introduce_yourself()]);
    let out = Pipeline::new(config()).unwrap().run(&sources).unwrap();
    let json: serde_json::Value = serde_json::from_str(&out.report(3).to_json().unwrap()).unwrap();

    assert_eq!(json["node_count"], 5);
    assert_eq!(json["top"].as_array().unwrap().len(), 3);
    assert_eq!(json["top"][0]["name"], "Introduce Yourself");
    assert_eq!(json["summary"]["missing_sources"], 5);
    assert!(json["warning"].is_null());
}
