//! Edge in the simple-graph view.

use serde::{Deserialize, Serialize};
use super::EntityId;

/// An undirected simple-graph edge between two resolved entities.
///
/// `source`/`target` keep the orientation of the fact that produced the
/// edge, but uniqueness is by unordered endpoint pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: EntityId,
    pub target: EntityId,
    pub relation: String,
}

impl Edge {
    pub fn new(source: impl Into<EntityId>, target: impl Into<EntityId>, relation: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relation: relation.into(),
        }
    }
}
