//! Entity — a resolved node of the knowledge graph.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical entity identifier, unique within one analysis run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for EntityId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityId {
    fn from(v: &str) -> Self { Self(v.to_owned()) }
}

impl From<String> for EntityId {
    fn from(v: String) -> Self { Self(v) }
}

/// Kind of game element an entity stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum EntityType {
    #[serde(rename = "NPC")]
    Npc,
    Quest,
    Item,
    Location,
    #[default]
    Unknown,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Npc => "NPC",
            EntityType::Quest => "Quest",
            EntityType::Item => "Item",
            EntityType::Location => "Location",
            EntityType::Unknown => "Unknown",
        }
    }

    /// Lenient parse used for tabular type columns. Anything unrecognised is `Unknown`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "npc" => EntityType::Npc,
            "quest" => EntityType::Quest,
            "item" => EntityType::Item,
            "location" => EntityType::Location,
            _ => EntityType::Unknown,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, EntityType::Unknown)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved entity.
///
/// `display_name` is not unique; it only feeds resolution and reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub canonical_id: EntityId,
    pub display_name: String,
    pub entity_type: EntityType,
    pub attributes: BTreeMap<String, String>,
}

impl Entity {
    pub fn new(canonical_id: impl Into<EntityId>, display_name: impl Into<String>) -> Self {
        Self {
            canonical_id: canonical_id.into(),
            display_name: display_name.into(),
            entity_type: EntityType::Unknown,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_type(mut self, entity_type: EntityType) -> Self {
        self.entity_type = entity_type;
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Merge a repeat sighting into this entity.
    ///
    /// Only empty slots are filled: a missing or empty attribute, an empty
    /// display name, an `Unknown` type. Existing values are never replaced.
    pub fn merge(&mut self, display_name: &str, entity_type: EntityType, attributes: &BTreeMap<String, String>) {
        if self.display_name.is_empty() && !display_name.is_empty() {
            self.display_name = display_name.to_owned();
        }
        if self.entity_type.is_unknown() {
            self.entity_type = entity_type;
        }
        for (key, value) in attributes {
            if value.is_empty() {
                continue;
            }
            let slot = self.attributes.entry(key.clone()).or_default();
            if slot.is_empty() {
                *slot = value.clone();
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}
