//! Raw input records and their decoded, typed form.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

// ============================================================================
// Raw input
// ============================================================================

/// Which upstream data source a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    Quest,
    Item,
    Npc,
    Location,
    Recipe,
    Dialogue,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Quest => "quests",
            SourceKind::Item => "items",
            SourceKind::Npc => "npcs",
            SourceKind::Location => "locations",
            SourceKind::Recipe => "recipes",
            SourceKind::Dialogue => "dialogue",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Undecoded record body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawBody {
    /// A single delimited line, e.g. `"Basic/Title/Text/Objective/-1"`.
    Delimited(String),
    /// A text block of `key: value` / `key=value` lines.
    Block(String),
    /// Already split key/value pairs, in source order.
    Pairs(Vec<(String, String)>),
}

/// One raw record keyed by an opaque record id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub id: String,
    pub kind: SourceKind,
    pub body: RawBody,
}

impl RawRecord {
    pub fn delimited(kind: SourceKind, id: impl Into<String>, line: impl Into<String>) -> Self {
        Self { id: id.into(), kind, body: RawBody::Delimited(line.into()) }
    }

    pub fn block(kind: SourceKind, id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), kind, body: RawBody::Block(text.into()) }
    }

    pub fn pairs<K, V>(kind: SourceKind, id: impl Into<String>, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            id: id.into(),
            kind,
            body: RawBody::Pairs(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
        }
    }
}

// ============================================================================
// Parsed fields
// ============================================================================

/// A single positional field. Sentinels decode to `Absent` at parse time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Field {
    Value(String),
    Absent,
}

impl Field {
    pub fn is_sentinel(raw: &str) -> bool {
        let t = raw.trim();
        t.is_empty() || t == "-1" || t.eq_ignore_ascii_case("null")
    }

    pub fn decode(raw: &str) -> Self {
        if Field::is_sentinel(raw) {
            Field::Absent
        } else {
            Field::Value(raw.trim().to_owned())
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Field::Value(v) => Some(v),
            Field::Absent => None,
        }
    }
}

/// Ordered fields of one record.
pub type Fields = SmallVec<[Field; 8]>;

// ============================================================================
// Typed records
// ============================================================================

/// Slot indices of the quest layout `type/name/description/objective/location/next/reward`.
pub mod quest_slot {
    pub const TYPE: usize = 0;
    pub const NAME: usize = 1;
    pub const DESCRIPTION: usize = 2;
    pub const OBJECTIVE: usize = 3;
    pub const LOCATION: usize = 4;
    pub const NEXT_QUEST: usize = 5;
    pub const REWARD: usize = 6;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestRecord {
    pub id: String,
    pub name: String,
    pub quest_type: Option<String>,
    pub description: Option<String>,
    pub objective: Option<String>,
    pub location: Option<String>,
    pub next_quest: Option<String>,
    pub reward: Option<String>,
    /// Every field in source order, padded to the full layout.
    pub fields: Fields,
}

impl QuestRecord {
    /// Positional access. Out-of-range and absent slots read as `None`.
    pub fn field(&self, slot: usize) -> Option<&str> {
        self.fields.get(slot).and_then(Field::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: String,
    pub name: String,
    pub price: Option<String>,
}

/// NPCs and locations share the `name/...` layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedRecord {
    pub id: String,
    pub name: String,
    pub extra: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub item_id: String,
    pub count: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeRecord {
    pub id: String,
    pub result: Ingredient,
    pub materials: Vec<Ingredient>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueRecord {
    pub speaker: String,
    pub lines: Vec<(String, String)>,
}

/// A record decoded once at parse time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Record {
    Quest(QuestRecord),
    Item(ItemRecord),
    Npc(NamedRecord),
    Location(NamedRecord),
    Recipe(RecipeRecord),
    Dialogue(DialogueRecord),
}

impl Record {
    pub fn id(&self) -> &str {
        match self {
            Record::Quest(q) => &q.id,
            Record::Item(i) => &i.id,
            Record::Npc(n) | Record::Location(n) => &n.id,
            Record::Recipe(r) => &r.id,
            Record::Dialogue(d) => &d.speaker,
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            Record::Quest(_) => SourceKind::Quest,
            Record::Item(_) => SourceKind::Item,
            Record::Npc(_) => SourceKind::Npc,
            Record::Location(_) => SourceKind::Location,
            Record::Recipe(_) => SourceKind::Recipe,
            Record::Dialogue(_) => SourceKind::Dialogue,
        }
    }
}
