//! # Entity Resolver
//!
//! Maps raw identifiers and raw names to canonical entity ids.
//!
//! Lookup priority for [`EntityResolver::resolve`]:
//!
//! 1. the token is already a known canonical id
//! 2. the token is in the accumulated name → id table
//! 3. mint `ent_<12 hex of sha256(token)>` and register the token as its name
//!
//! Resolution is first-seen-wins: once a token maps to an id in a run it
//! keeps that id, even if an id-bearing record for the "same" entity
//! arrives later. One resolver belongs to exactly one run.

pub mod columns;

use std::collections::BTreeMap;

use hashbrown::HashMap;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::model::{Entity, EntityId, EntityType, Field};
use crate::parser::parse_attribute_string;

pub use columns::{ColumnCandidates, Row, extract_value, relation_label};

/// Prefix of ids minted from raw tokens.
pub const MINTED_PREFIX: &str = "ent_";

/// Deterministic id for a raw token.
pub fn mint_id(token: &str) -> EntityId {
    let digest = Sha256::digest(token.as_bytes());
    EntityId(format!("{MINTED_PREFIX}{}", hex::encode(&digest[..6])))
}

/// Per-run resolution state: entities in first-seen order plus the
/// id and name indexes.
#[derive(Debug, Clone, Default)]
pub struct EntityResolver {
    entities: Vec<Entity>,
    by_id: HashMap<EntityId, usize>,
    names: HashMap<String, EntityId>,
    columns: ColumnCandidates,
    unresolved_tokens: usize,
}

impl EntityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_columns(columns: ColumnCandidates) -> Self {
        Self { columns, ..Self::default() }
    }

    // ========================================================================
    // Token resolution
    // ========================================================================

    /// Resolve a raw token, minting a new entity when nothing matches.
    ///
    /// Blank and sentinel tokens never resolve; they are counted.
    pub fn resolve(&mut self, raw: &str) -> Option<EntityId> {
        self.resolve_as(raw, EntityType::Unknown)
    }

    /// Like [`resolve`](Self::resolve), with a type hint applied when the
    /// entity is minted or still `Unknown`.
    pub fn resolve_as(&mut self, raw: &str, hint: EntityType) -> Option<EntityId> {
        let token = raw.trim();
        if Field::is_sentinel(token) {
            self.unresolved_tokens += 1;
            debug!(token = raw, "sentinel token does not resolve");
            return None;
        }

        if let Some(id) = self.lookup(token) {
            if !hint.is_unknown() {
                self.merge_into(&id, "", hint, &BTreeMap::new());
            }
            return Some(id);
        }

        let id = mint_id(token);
        debug!(token, id = %id, "minting entity");
        let entity = Entity::new(id.clone(), token).with_type(hint);
        self.insert(entity);
        self.names.insert(token.to_owned(), id.clone());
        Some(id)
    }

    /// Tiers 1 and 2 only; never mints.
    pub fn lookup(&self, raw: &str) -> Option<EntityId> {
        let token = raw.trim();
        if token.is_empty() {
            return None;
        }
        if self.by_id.contains_key(token) {
            return Some(EntityId::new(token));
        }
        self.names.get(token).cloned()
    }

    // ========================================================================
    // Id-bearing registration
    // ========================================================================

    /// Register an entity under an explicit id.
    ///
    /// An existing id only has its empty slots filled. The name is added to
    /// the name table only when no earlier sighting claimed it.
    pub fn register(
        &mut self,
        id: impl Into<EntityId>,
        name: &str,
        entity_type: EntityType,
        attributes: &BTreeMap<String, String>,
    ) -> EntityId {
        let id = id.into();
        let name = name.trim();

        if self.by_id.contains_key(&id) {
            self.merge_into(&id, name, entity_type, attributes);
        } else {
            let mut entity = Entity::new(id.clone(), name).with_type(entity_type);
            entity.attributes = attributes.clone();
            self.insert(entity);
        }

        if !name.is_empty() {
            if let Some(existing) = self.names.get(name) {
                if *existing != id {
                    debug!(name, kept = %existing, ignored = %id, "name already resolved, keeping first sighting");
                }
            } else {
                self.names.insert(name.to_owned(), id.clone());
            }
        }
        id
    }

    /// Register one tabular node row; rows without an id column get
    /// `node_<index>`.
    pub fn register_row(&mut self, row: &Row, index: usize) -> EntityId {
        let attributes = row
            .get(columns::ATTRIBUTES_COLUMN)
            .map(|raw| parse_attribute_string(raw))
            .unwrap_or_default();

        let id = extract_value(row, &attributes, &self.columns.id).unwrap_or_else(|| format!("node_{index}"));
        let name = extract_value(row, &attributes, &self.columns.name).unwrap_or_default();
        let entity_type = extract_value(row, &attributes, &self.columns.entity_type)
            .map(|t| EntityType::parse(&t))
            .unwrap_or_default();

        self.register(id, &name, entity_type, &attributes)
    }

    /// Resolve one endpoint of a relation row, trying `<prefix>`,
    /// `<prefix>_id` and `<prefix>_name`, each as an id and then as a name.
    pub fn find_node_id(&self, row: &Row, prefix: &str) -> Option<EntityId> {
        columns::ENDPOINT_SUFFIXES.iter().find_map(|suffix| {
            let column = format!("{prefix}{suffix}");
            columns::cell(row, &column).and_then(|v| self.lookup(v))
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn columns(&self) -> &ColumnCandidates {
        &self.columns
    }

    pub fn entity(&self, id: &EntityId) -> Option<&Entity> {
        self.by_id.get(id).map(|&i| &self.entities[i])
    }

    /// Entities in first-seen order.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Blank or sentinel tokens seen by `resolve`.
    pub fn unresolved_tokens(&self) -> usize {
        self.unresolved_tokens
    }

    fn insert(&mut self, entity: Entity) {
        self.by_id.insert(entity.canonical_id.clone(), self.entities.len());
        self.entities.push(entity);
    }

    fn merge_into(&mut self, id: &EntityId, name: &str, entity_type: EntityType, attributes: &BTreeMap<String, String>) {
        if let Some(&i) = self.by_id.get(id) {
            self.entities[i].merge(name, entity_type, attributes);
        }
    }
}
