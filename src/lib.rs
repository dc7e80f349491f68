//! # questgraph — Game-Data Knowledge Graph
//!
//! Extracts a typed entity-relation graph from loosely structured game
//! records, resolves entities across inconsistent id schemes, and ranks
//! NPCs, quests, items and locations by structural importance.
//!
//! ## Design Principles
//!
//! 1. **Pure stages**: parsing and rule application are functions of their input
//! 2. **Clean DTOs**: `Entity`, `Triplet`, `Edge`, `Record` cross all boundaries
//! 3. **Rules are data**: extraction is driven by a declarative [`RuleTable`]
//! 4. **Explicit run state**: one [`EntityResolver`] per run, never shared
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use questgraph::{Pipeline, PipelineConfig, RawRecord, SourceKind, SourceSet};
//!
//! # fn example() -> questgraph::Result<()> {
//! let sources = SourceSet::new().with(SourceKind::Quest, vec![RawRecord::delimited(
//!     SourceKind::Quest,
//!     "1",
//!     "NPC_1/Introduce Yourself/Go talk to the Wizard./进入魔法师小屋。/Forest/.../100",
//! )]);
//!
//! let output = Pipeline::new(PipelineConfig::default())?.run(&sources)?;
//! for row in output.analysis.metrics().map(|m| m.top(5)).unwrap_or_default() {
//!     println!("{} ({}) degree={:.3}", row.name, row.entity_type, row.degree_centrality);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Stages
//!
//! | Stage | Module | Output |
//! |-------|--------|--------|
//! | Record Parser | `parser` | typed `Record` |
//! | Relation Extractor | `extract` | `Triplet` stream |
//! | Entity Resolver | `resolve` | canonical `EntityId` |
//! | Graph Builder | `graph` | `KnowledgeGraph` |
//! | Analyzer | `analysis` | `Analysis` |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod parser;
pub mod extract;
pub mod resolve;
pub mod graph;
pub mod analysis;
pub mod store;
pub mod export;
pub mod report;
pub mod config;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

// ============================================================================
// Re-exports
// ============================================================================

pub use model::{
    Entity, EntityId, EntityType, Triplet, Edge,
    RawRecord, RawBody, SourceKind, Record,
};
pub use extract::{Extractor, RuleTable};
pub use resolve::{EntityResolver, ColumnCandidates, Row};
pub use graph::{KnowledgeGraph, GraphBuilder, BuildReport, UnresolvedEndpointWarning};
pub use analysis::{Analysis, AnalysisConfig, GraphMetrics, EmptyGraphWarning};
pub use store::{GraphStore, MemoryStore, RelationRow};
pub use report::MetricsReport;
pub use config::PipelineConfig;

// ============================================================================
// Sources
// ============================================================================

/// One snapshot of every upstream data source. `None` means the source
/// is absent; an empty list counts as absent too.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSet {
    pub quests: Option<Vec<RawRecord>>,
    pub items: Option<Vec<RawRecord>>,
    pub npcs: Option<Vec<RawRecord>>,
    pub locations: Option<Vec<RawRecord>>,
    pub recipes: Option<Vec<RawRecord>>,
    pub dialogue: Option<Vec<RawRecord>>,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group loose records by their kind.
    pub fn from_records(records: impl IntoIterator<Item = RawRecord>) -> Self {
        let mut set = Self::new();
        for record in records {
            set.slot_mut(record.kind).get_or_insert_with(Vec::new).push(record);
        }
        set
    }

    pub fn with(mut self, kind: SourceKind, records: Vec<RawRecord>) -> Self {
        *self.slot_mut(kind) = Some(records);
        self
    }

    /// Records of a source, or `None` when it is absent or empty.
    pub fn get(&self, kind: SourceKind) -> Option<&[RawRecord]> {
        let slot = match kind {
            SourceKind::Quest => &self.quests,
            SourceKind::Item => &self.items,
            SourceKind::Npc => &self.npcs,
            SourceKind::Location => &self.locations,
            SourceKind::Recipe => &self.recipes,
            SourceKind::Dialogue => &self.dialogue,
        };
        slot.as_deref().filter(|r| !r.is_empty())
    }

    fn slot_mut(&mut self, kind: SourceKind) -> &mut Option<Vec<RawRecord>> {
        match kind {
            SourceKind::Quest => &mut self.quests,
            SourceKind::Item => &mut self.items,
            SourceKind::Npc => &mut self.npcs,
            SourceKind::Location => &mut self.locations,
            SourceKind::Recipe => &mut self.recipes,
            SourceKind::Dialogue => &mut self.dialogue,
        }
    }
}

/// Items go first so recipes can name their ingredients; quests before
/// recipes and dialogue so quest names claim their ids first.
const PROCESSING_ORDER: [SourceKind; 6] = [
    SourceKind::Item,
    SourceKind::Npc,
    SourceKind::Location,
    SourceKind::Quest,
    SourceKind::Recipe,
    SourceKind::Dialogue,
];

// ============================================================================
// Run results
// ============================================================================

/// Counts of every non-fatal condition in a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub records_seen: usize,
    pub records_skipped: usize,
    pub rule_failures: usize,
    pub discarded_captures: usize,
    pub triplets_extracted: usize,
    pub duplicate_triplets: usize,
    pub unresolved_tokens: usize,
    pub dropped_edges: usize,
    pub duplicate_edges: usize,
    pub self_loops: usize,
    pub missing_sources: usize,
    /// Relations were re-read from the graph store.
    pub store_fallback: bool,
}

#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Deduplicated facts, in extraction order.
    pub triplets: Vec<Triplet>,
    pub graph: KnowledgeGraph,
    pub build: BuildReport,
    pub analysis: Analysis,
    pub summary: RunSummary,
}

impl RunOutput {
    pub fn report(&self, top_n: usize) -> MetricsReport {
        MetricsReport::new(&self.graph, &self.analysis, &self.summary, top_n)
    }

    pub fn triplet_rows(&self) -> Vec<export::TripletRow> {
        export::triplet_rows(&self.triplets)
    }

    pub fn entity_rows(&self) -> Vec<export::EntityRow> {
        export::entity_rows(self.graph.nodes())
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// The entry point: parse → extract → resolve → build → analyze.
///
/// A `Pipeline` holds only configuration and rules; every run owns its
/// own resolver and graph, so runs are independent.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    rules: RuleTable,
}

impl Pipeline {
    /// Pipeline with the standard rule table.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        Ok(Self::with_rules(config, RuleTable::standard()?))
    }

    pub fn with_rules(config: PipelineConfig, rules: RuleTable) -> Self {
        Self { config, rules }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run over raw record sources.
    pub fn run(&self, sources: &SourceSet) -> Result<RunOutput> {
        let mut summary = RunSummary::default();
        let opts = self.config.parse_options();

        // Phase 1: parse
        let mut records: Vec<Record> = Vec::new();
        for kind in PROCESSING_ORDER {
            let Some(raws) = sources.get(kind) else {
                warn!(error = %Error::MissingSource(kind.to_string()), "source degraded to no data");
                summary.missing_sources += 1;
                continue;
            };
            for raw in raws {
                summary.records_seen += 1;
                match parser::decode(raw, &opts) {
                    Ok(record) => records.push(record),
                    Err(e) => {
                        warn!(record_id = %raw.id, source = %kind, error = %e, "skipping record");
                        summary.records_skipped += 1;
                    }
                }
            }
        }
        if summary.missing_sources == PROCESSING_ORDER.len() {
            return Err(Error::NoDataAvailable);
        }
        info!(records = records.len(), skipped = summary.records_skipped, "records parsed");

        // Phase 2: id-bearing entities and the item catalog
        let mut resolver = EntityResolver::with_columns(self.config.columns.clone());
        let mut extractor = Extractor::new(self.rules.clone());
        for record in &records {
            register_record(&mut resolver, &mut extractor, record);
        }

        // Phase 3: extract
        let mut triplets = Vec::new();
        for record in &records {
            let mut facts = extractor.extract(record);
            triplets.extend(facts.by_ref());
            summary.rule_failures += facts.rule_failures();
            summary.discarded_captures += facts.discarded_captures();
        }
        if self.config.static_knowledge {
            triplets.extend_from_slice(extractor.static_triplets());
        }
        summary.triplets_extracted = triplets.len();
        let (triplets, duplicates) = extract::dedup_triplets(triplets);
        summary.duplicate_triplets = duplicates;
        info!(triplets = triplets.len(), duplicates, failures = summary.rule_failures, "facts extracted");

        // Phase 4: resolve endpoints
        if self.config.mint_unresolved_endpoints {
            for t in &triplets {
                let (subject_type, object_type) = self.rules.roles_of(&t.predicate);
                resolver.resolve_as(&t.subject, subject_type);
                resolver.resolve_as(&t.object, object_type);
            }
        }

        // Phase 5: build + analyze
        let (graph, build) = GraphBuilder::new(&resolver).build(&triplets);
        summary.unresolved_tokens = unresolved_endpoint_count(&build);
        let analysis = self.finish(&graph, &build, &mut summary);

        Ok(RunOutput { triplets, graph, build, analysis, summary })
    }

    /// Run over exported node and relation tables.
    ///
    /// When the relation table fails the validity check, relations are
    /// re-read from `store` and the corrected rows are written back as a
    /// MERGE refresh: the store keeps one row per `(subject, predicate,
    /// object)`, so the write fills missing entity names and types without
    /// adding relationships.
    pub fn run_tabular(&self, nodes: &[Row], relations: &[Row], store: Option<&dyn GraphStore>) -> Result<RunOutput> {
        let mut summary = RunSummary { records_seen: nodes.len() + relations.len(), ..RunSummary::default() };

        let mut resolver = EntityResolver::with_columns(self.config.columns.clone());
        if nodes.is_empty() {
            warn!(error = %Error::MissingSource("nodes".into()), "source degraded to no data");
            summary.missing_sources += 1;
        }
        for (index, row) in nodes.iter().enumerate() {
            resolver.register_row(row, index);
        }

        let validity = graph::check_relation_rows(relations, self.config.relation_sample_size);
        let relation_rows: Vec<Row> = if validity.is_valid() {
            relations.to_vec()
        } else {
            warn!(?validity, "relation table invalid, querying graph store");
            let corrected = match store {
                Some(store) => store.query_relations()?,
                None => Vec::new(),
            };
            if corrected.is_empty() {
                if nodes.is_empty() {
                    return Err(Error::NoDataAvailable);
                }
                warn!(error = %Error::MissingSource("relations".into()), "source degraded to no data");
                summary.missing_sources += 1;
                Vec::new()
            } else {
                if let Some(store) = store {
                    store.write_relations(&corrected)?;
                }
                info!(rows = corrected.len(), "using relations from graph store");
                summary.store_fallback = true;
                if self.config.mint_unresolved_endpoints {
                    for row in &corrected {
                        register_store_endpoints(&mut resolver, row);
                    }
                }
                corrected.iter().map(RelationRow::to_row).collect()
            }
        };

        let (graph, build) = GraphBuilder::new(&resolver).build_tabular(&relation_rows);
        summary.unresolved_tokens = unresolved_endpoint_count(&build);
        let analysis = self.finish(&graph, &build, &mut summary);

        Ok(RunOutput { triplets: Vec::new(), graph, build, analysis, summary })
    }

    fn finish(&self, graph: &KnowledgeGraph, build: &BuildReport, summary: &mut RunSummary) -> Analysis {
        summary.dropped_edges = build.dropped_edges;
        summary.duplicate_edges = build.duplicate_edges;
        summary.self_loops = build.self_loops;

        let analysis = analysis::analyze(graph, &self.config.analysis);
        info!(
            skipped = summary.records_skipped,
            dropped_edges = summary.dropped_edges,
            unresolved = summary.unresolved_tokens,
            missing_sources = summary.missing_sources,
            "run complete"
        );
        analysis
    }
}

fn register_record(resolver: &mut EntityResolver, extractor: &mut Extractor, record: &Record) {
    use std::collections::BTreeMap;

    let mut attrs = BTreeMap::new();
    let mut put = |key: &str, value: Option<&String>| {
        if let Some(v) = value {
            attrs.insert(key.to_owned(), v.clone());
        }
    };

    match record {
        Record::Quest(q) => {
            put("quest_type", q.quest_type.as_ref());
            put("description", q.description.as_ref());
            put("objective", q.objective.as_ref());
            put("location", q.location.as_ref());
            put("next_quest", q.next_quest.as_ref());
            put("reward", q.reward.as_ref());
            resolver.register(format!("quest_{}", q.id), &q.name, EntityType::Quest, &attrs);
        }
        Record::Item(i) => {
            put("price", i.price.as_ref());
            extractor.catalog_mut().insert(&i.id, &i.name);
            resolver.register(format!("item_{}", i.id), &i.name, EntityType::Item, &attrs);
        }
        Record::Npc(n) => {
            resolver.register(format!("npc_{}", n.id), &n.name, EntityType::Npc, &extra_attributes(&n.extra));
        }
        Record::Location(l) => {
            resolver.register(format!("loc_{}", l.id), &l.name, EntityType::Location, &extra_attributes(&l.extra));
        }
        Record::Recipe(_) | Record::Dialogue(_) => {}
    }
    debug!(record_id = record.id(), kind = %record.kind(), "record registered");
}

fn extra_attributes(extra: &[String]) -> std::collections::BTreeMap<String, String> {
    extra.iter().enumerate().map(|(i, v)| (format!("field_{}", i + 1), v.clone())).collect()
}

fn register_store_endpoints(resolver: &mut EntityResolver, row: &RelationRow) {
    let empty = std::collections::BTreeMap::new();
    for (id, name, ty) in [
        (&row.source_id, &row.source_name, &row.source_type),
        (&row.target_id, &row.target_name, &row.target_type),
    ] {
        if !model::Field::is_sentinel(id) {
            resolver.register(id.as_str(), name, EntityType::parse(ty), &empty);
        }
    }
}

fn unresolved_endpoint_count(build: &BuildReport) -> usize {
    build
        .unresolved
        .iter()
        .map(|w| match w.missing {
            graph::Endpoint::Both => 2,
            graph::Endpoint::Subject | graph::Endpoint::Object => 1,
        })
        .sum()
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Malformed record {record_id}: {reason}")]
    MalformedRecord { record_id: String, reason: String },

    #[error("Missing source: {0}")]
    MissingSource(String),

    #[error("No data available: every source is absent or empty")]
    NoDataAvailable,

    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
