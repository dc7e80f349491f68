//! # Knowledge Graph Model
//!
//! Clean DTOs shared by every pipeline stage:
//! parser → extractor → resolver → graph builder → analyzer.
//!
//! This module is pure data.

pub mod entity;
pub mod triplet;
pub mod edge;
pub mod record;

pub use entity::{Entity, EntityId, EntityType};
pub use triplet::Triplet;
pub use edge::Edge;
pub use record::{
    RawRecord, RawBody, SourceKind, Field, Fields,
    Record, QuestRecord, ItemRecord, NamedRecord, RecipeRecord, DialogueRecord, Ingredient,
    quest_slot,
};
