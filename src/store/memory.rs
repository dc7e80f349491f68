//! In-memory graph store.
//!
//! Reference implementation of [`GraphStore`]: hash maps behind
//! `parking_lot` locks, shared through an `Arc` so clones see the same
//! data.
//!
//! ## Limitations
//!
//! - **No transactions**: writes apply immediately.
//! - **Per-collection locks**: a multi-row write is not atomic with
//!   respect to concurrent readers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::{GraphStore, RelationRow};
use crate::graph::KnowledgeGraph;
use crate::{Error, Result};

// ============================================================================
// MemoryStore
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
struct StoredEntity {
    id: String,
    name: String,
    entity_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct StoredRel {
    id: u64,
    source: String,
    target: String,
    rel_type: String,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    entities: RwLock<HashMap<String, StoredEntity>>,
    relationships: RwLock<Vec<StoredRel>>,
    next_rel_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every node and edge of a built graph.
    pub fn from_graph(graph: &KnowledgeGraph) -> Result<Self> {
        let store = Self::new();
        for node in graph.nodes() {
            store.merge_entity(node.canonical_id.as_str(), &node.display_name, node.entity_type.as_str())?;
        }
        for edge in graph.edges() {
            store.merge_relationship(edge.source.as_str(), edge.target.as_str(), &edge.relation)?;
        }
        Ok(store)
    }

    /// `MERGE (:Entity {id})`, filling an empty name or type.
    pub fn merge_entity(&self, id: &str, name: &str, entity_type: &str) -> Result<()> {
        if id.trim().is_empty() {
            return Err(Error::Store("entity id must not be empty".into()));
        }
        let mut entities = self.inner.entities.write();
        let entry = entities.entry(id.to_owned()).or_insert_with(|| StoredEntity {
            id: id.to_owned(),
            name: String::new(),
            entity_type: String::new(),
        });
        if entry.name.is_empty() {
            entry.name = name.to_owned();
        }
        if entry.entity_type.is_empty() {
            entry.entity_type = entity_type.to_owned();
        }
        Ok(())
    }

    /// `MERGE (a)-[:REL {type}]->(b)`. Both endpoints must exist.
    pub fn merge_relationship(&self, source: &str, target: &str, rel_type: &str) -> Result<u64> {
        {
            let entities = self.inner.entities.read();
            for id in [source, target] {
                if !entities.contains_key(id) {
                    return Err(Error::Store(format!("no entity with id {id:?}")));
                }
            }
        }

        let mut rels = self.inner.relationships.write();
        if let Some(existing) = rels
            .iter()
            .find(|r| r.source == source && r.target == target && r.rel_type == rel_type)
        {
            return Ok(existing.id);
        }
        let id = self.inner.next_rel_id.fetch_add(1, Ordering::Relaxed) + 1;
        rels.push(StoredRel {
            id,
            source: source.to_owned(),
            target: target.to_owned(),
            rel_type: rel_type.to_owned(),
        });
        Ok(id)
    }

    pub fn entity_count(&self) -> usize {
        self.inner.entities.read().len()
    }

    pub fn relationship_count(&self) -> usize {
        self.inner.relationships.read().len()
    }

    /// Drop every relationship, keeping the entities.
    pub fn clear_relationships(&self) {
        self.inner.relationships.write().clear();
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("entities", &self.entity_count())
            .field("relationships", &self.relationship_count())
            .finish()
    }
}

// ============================================================================
// GraphStore impl
// ============================================================================

impl GraphStore for MemoryStore {
    fn query_relations(&self) -> Result<Vec<RelationRow>> {
        let entities = self.inner.entities.read();
        let rels = self.inner.relationships.read();

        let mut rows: Vec<RelationRow> = rels
            .iter()
            .filter_map(|r| {
                let a = entities.get(&r.source)?;
                let b = entities.get(&r.target)?;
                Some(RelationRow {
                    source_id: a.id.clone(),
                    source_name: a.name.clone(),
                    source_type: a.entity_type.clone(),
                    relation: r.rel_type.clone(),
                    target_id: b.id.clone(),
                    target_name: b.name.clone(),
                    target_type: b.entity_type.clone(),
                })
            })
            .collect();
        // Stable: insertion order breaks remaining ties.
        rows.sort_by(|x, y| (&x.source_name, &x.relation).cmp(&(&y.source_name, &y.relation)));
        debug!(rows = rows.len(), "relation query");
        Ok(rows)
    }

    fn write_relations(&self, rows: &[RelationRow]) -> Result<()> {
        for row in rows {
            self.merge_entity(&row.source_id, &row.source_name, &row.source_type)?;
            self.merge_entity(&row.target_id, &row.target_name, &row.target_type)?;
            self.merge_relationship(&row.source_id, &row.target_id, &row.relation)?;
        }
        debug!(rows = rows.len(), "relations written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Entity, EntityType};
    use pretty_assertions::assert_eq;

    fn row(s: (&str, &str), rel: &str, t: (&str, &str)) -> RelationRow {
        RelationRow {
            source_id: s.0.into(),
            source_name: s.1.into(),
            source_type: "NPC".into(),
            relation: rel.into(),
            target_id: t.0.into(),
            target_name: t.1.into(),
            target_type: "Quest".into(),
        }
    }

    #[test]
    fn test_query_is_ordered_by_source_name_then_relation() {
        let store = MemoryStore::new();
        store
            .write_relations(&[
                row(("n2", "罗宾"), "发布", ("q7", "Community Center")),
                row(("n1", "Abigail"), "提到", ("i1", "剑")),
                row(("n1", "Abigail"), "出售", ("i2", "种子")),
            ])
            .unwrap();

        let got: Vec<(String, String)> = store
            .query_relations()
            .unwrap()
            .into_iter()
            .map(|r| (r.source_name, r.relation))
            .collect();
        assert_eq!(got, vec![
            ("Abigail".to_string(), "出售".to_string()),
            ("Abigail".to_string(), "提到".to_string()),
            ("罗宾".to_string(), "发布".to_string()),
        ]);
    }

    #[test]
    fn test_write_merges() {
        let store = MemoryStore::new();
        let r = row(("n1", "法师"), "发布", ("q1", "Introduce Yourself"));
        store.write_relations(&[r.clone(), r]).unwrap();
        assert_eq!(store.entity_count(), 2);
        assert_eq!(store.relationship_count(), 1);
    }

    #[test]
    fn test_relationship_needs_endpoints() {
        let store = MemoryStore::new();
        store.merge_entity("a", "A", "Item").unwrap();
        assert!(matches!(store.merge_relationship("a", "ghost", "r"), Err(Error::Store(_))));
        assert!(store.merge_entity("  ", "blank", "Item").is_err());
    }

    #[test]
    fn test_from_graph() {
        let mut g = KnowledgeGraph::new();
        g.add_node(Entity::new("npc_1", "法师").with_type(EntityType::Npc));
        g.add_node(Entity::new("quest_1", "Introduce Yourself").with_type(EntityType::Quest));
        g.add_edge(&"npc_1".into(), &"quest_1".into(), "发布");

        let store = MemoryStore::from_graph(&g).unwrap();
        let rows = store.query_relations().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].source_type, "NPC");
        assert_eq!(rows[0].target_name, "Introduce Yourself");

        // Clones share state.
        let view = store.clone();
        store.clear_relationships();
        assert_eq!(view.relationship_count(), 0);
    }
}
