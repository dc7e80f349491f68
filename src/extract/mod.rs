//! # Relation Extractor
//!
//! Applies the [`RuleTable`] to one decoded record and yields triplets
//! lazily. Each rule runs in isolation: a failing rule is logged, counted
//! and skipped while the record's remaining rules still run.
//!
//! ```text
//! Record ──▶ [rule, rule, rule, ...] ──▶ RecordTriplets (lazy, consumed once)
//!                                           │
//!                     all records + static ─┴──▶ dedup_triplets ──▶ Vec<Triplet>
//! ```

pub mod rules;

use std::borrow::Cow;

use hashbrown::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::model::{DialogueRecord, RecipeRecord, Record, Triplet};

pub use rules::{
    LookupDirection, LookupRule, ObjectPolicy, PatternRule, PositionalRule, RuleError, RuleOutput, RuleTable,
};

// ============================================================================
// Item catalog
// ============================================================================

/// Item id → display name, used to name recipe ingredients.
#[derive(Debug, Clone, Default)]
pub struct ItemCatalog {
    names: HashMap<String, String>,
}

impl ItemCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// First registration of an id wins.
    pub fn insert(&mut self, id: impl Into<String>, name: impl Into<String>) {
        self.names.entry(id.into()).or_insert_with(|| name.into());
    }

    /// Display name, or `物品_<id>` for ids missing from the catalog.
    pub fn name_of<'a>(&'a self, id: &str) -> Cow<'a, str> {
        match self.names.get(id) {
            Some(name) => Cow::Borrowed(name.as_str()),
            None => Cow::Owned(format!("物品_{id}")),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

// ============================================================================
// Extractor
// ============================================================================

/// Stateless rule application over decoded records.
#[derive(Debug, Clone)]
pub struct Extractor {
    rules: RuleTable,
    catalog: ItemCatalog,
}

impl Extractor {
    pub fn new(rules: RuleTable) -> Self {
        Self { rules, catalog: ItemCatalog::new() }
    }

    pub fn with_catalog(mut self, catalog: ItemCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn catalog(&self) -> &ItemCatalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut ItemCatalog {
        &mut self.catalog
    }

    /// Lazily apply every rule relevant to `record`.
    pub fn extract<'a>(&'a self, record: &'a Record) -> RecordTriplets<'a> {
        let steps = match record {
            Record::Quest(_) => {
                let mut steps = Vec::with_capacity(
                    self.rules.positional.len() + self.rules.patterns.len() + self.rules.lookups.len(),
                );
                steps.extend(self.rules.positional.iter().map(Step::Positional));
                steps.extend(self.rules.patterns.iter().map(Step::Pattern));
                steps.extend(self.rules.lookups.iter().map(Step::Lookup));
                steps
            }
            Record::Recipe(_) => vec![Step::Recipe],
            Record::Dialogue(_) => vec![Step::Mentions],
            // Items, NPCs and locations contribute entities, not relations.
            Record::Item(_) | Record::Npc(_) | Record::Location(_) => Vec::new(),
        };

        RecordTriplets {
            extractor: self,
            record,
            steps: steps.into_iter(),
            pending: Vec::new().into_iter(),
            rule_failures: 0,
            discarded_captures: 0,
        }
    }

    /// Background facts asserted once per run.
    pub fn static_triplets(&self) -> &[Triplet] {
        &self.rules.static_facts
    }

    fn apply(&self, step: &Step<'_>, record: &Record) -> Result<RuleOutput, RuleError> {
        match (step, record) {
            (Step::Positional(rule), Record::Quest(q)) => rule.apply(q),
            (Step::Pattern(rule), Record::Quest(q)) => Ok(rule.apply(q)),
            (Step::Lookup(rule), Record::Quest(q)) => Ok(rule.apply(q)),
            (Step::Recipe, Record::Recipe(r)) => Ok(self.recipe_triplets(r).into()),
            (Step::Mentions, Record::Dialogue(d)) => Ok(self.mention_triplets(d).into()),
            _ => Ok(RuleOutput::default()),
        }
    }

    fn recipe_triplets(&self, recipe: &RecipeRecord) -> Vec<Triplet> {
        let result_name = self.catalog.name_of(&recipe.result.item_id);
        recipe
            .materials
            .iter()
            .map(|m| {
                let material = format!("{}×{}", self.catalog.name_of(&m.item_id), m.count);
                Triplet::new(result_name.as_ref(), rules::PRED_CRAFT_NEEDS, material)
            })
            .collect()
    }

    fn mention_triplets(&self, dialogue: &DialogueRecord) -> Vec<Triplet> {
        let mut out = Vec::new();
        for (_, line) in &dialogue.lines {
            for keyword in &self.rules.mention_keywords {
                if line.contains(keyword.as_str()) {
                    out.push(Triplet::new(&dialogue.speaker, rules::PRED_MENTIONS, keyword));
                }
            }
        }
        out
    }
}

#[derive(Debug, Clone, Copy)]
enum Step<'a> {
    Positional(&'a PositionalRule),
    Pattern(&'a PatternRule),
    Lookup(&'a LookupRule),
    Recipe,
    Mentions,
}

impl Step<'_> {
    fn name(&self) -> Cow<'static, str> {
        match self {
            Step::Positional(r) => Cow::Owned(format!("positional[{}]", r.slot)),
            Step::Pattern(r) => Cow::Owned(format!("pattern[{}]", r.predicate)),
            Step::Lookup(r) => Cow::Owned(format!("lookup[{}]", r.predicate)),
            Step::Recipe => Cow::Borrowed("recipe"),
            Step::Mentions => Cow::Borrowed("mentions"),
        }
    }
}

// ============================================================================
// Lazy per-record sequence
// ============================================================================

/// Triplets of one record, produced rule by rule on demand.
///
/// Finite and not restartable. Failure and discard counts are complete
/// once the iterator is exhausted.
pub struct RecordTriplets<'a> {
    extractor: &'a Extractor,
    record: &'a Record,
    steps: std::vec::IntoIter<Step<'a>>,
    pending: std::vec::IntoIter<Triplet>,
    rule_failures: usize,
    discarded_captures: usize,
}

impl RecordTriplets<'_> {
    pub fn rule_failures(&self) -> usize {
        self.rule_failures
    }

    pub fn discarded_captures(&self) -> usize {
        self.discarded_captures
    }
}

impl Iterator for RecordTriplets<'_> {
    type Item = Triplet;

    fn next(&mut self) -> Option<Triplet> {
        loop {
            if let Some(t) = self.pending.next() {
                return Some(t);
            }
            let step = self.steps.next()?;
            match self.extractor.apply(&step, self.record) {
                Ok(out) => {
                    if out.discarded > 0 {
                        debug!(
                            record_id = self.record.id(),
                            rule = %step.name(),
                            discarded = out.discarded,
                            "discarded over-long captures"
                        );
                    }
                    self.discarded_captures += out.discarded;
                    self.pending = out.triplets.into_iter();
                }
                Err(e) => {
                    warn!(record_id = self.record.id(), rule = %step.name(), error = %e, "extraction rule failed, skipping");
                    self.rule_failures += 1;
                }
            }
        }
    }
}

// ============================================================================
// Dedup
// ============================================================================

/// Remove exact duplicates, keeping first occurrences in order.
///
/// Returns the surviving triplets and the number removed.
pub fn dedup_triplets(triplets: Vec<Triplet>) -> (Vec<Triplet>, usize) {
    let before = triplets.len();
    let mut seen: HashSet<Triplet> = HashSet::with_capacity(before);
    let kept: Vec<Triplet> = triplets.into_iter().filter(|t| seen.insert(t.clone())).collect();
    let removed = before - kept.len();
    (kept, removed)
}
