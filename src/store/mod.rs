//! # Graph Store Trait
//!
//! The contract between the pipeline and an external property-graph store.
//! The pipeline reads relations back from the store when its own relation
//! table fails the validity check, and writes the corrected set back.
//!
//! The store holds `(:Entity {id, name, type})-[:REL {type}]->(:Entity)`
//! and answers one pattern query:
//!
//! ```text
//! MATCH (a:Entity)-[r:REL]->(b:Entity)
//! RETURN a.id, a.name, a.type, r.type, b.id, b.name, b.type
//! ORDER BY a.name, r.type
//! ```
//!
//! ## Implementations
//!
//! | Store | Module | Description |
//! |-------|--------|-------------|
//! | `MemoryStore` | `memory` | In-memory, for tests and embedding |

pub mod memory;

use serde::{Deserialize, Serialize};

use crate::resolve::Row;
use crate::Result;

pub use memory::MemoryStore;

/// One row of the relation pattern query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationRow {
    pub source_id: String,
    pub source_name: String,
    pub source_type: String,
    pub relation: String,
    pub target_id: String,
    pub target_name: String,
    pub target_type: String,
}

impl RelationRow {
    /// Tabular form used by the relation table: the endpoint ids go under
    /// `source` / `target`.
    pub fn to_row(&self) -> Row {
        [
            ("source", &self.source_id),
            ("source_name", &self.source_name),
            ("source_type", &self.source_type),
            ("relation", &self.relation),
            ("target", &self.target_id),
            ("target_name", &self.target_name),
            ("target_type", &self.target_type),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.clone()))
        .collect()
    }
}

/// External property-graph store.
pub trait GraphStore {
    /// Every `(:Entity)-[:REL]->(:Entity)` row, ordered by source name then
    /// relation type.
    fn query_relations(&self) -> Result<Vec<RelationRow>>;

    /// Persist a corrected relation set (MERGE semantics: existing nodes
    /// and relationships are not duplicated).
    fn write_relations(&self, rows: &[RelationRow]) -> Result<()>;
}
