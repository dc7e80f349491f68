//! Column-candidate lookup for tabular rows.
//!
//! Exported node and relation tables disagree on column names
//! (`id` vs `entity_id`, `name` vs `label`, ...). Each attribute is looked
//! up through its own ordered candidate list.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::Field;

/// One tabular row: column → cell text.
pub type Row = BTreeMap<String, String>;

/// Ordered column candidates for id, display name and type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnCandidates {
    pub id: Vec<String>,
    pub name: Vec<String>,
    #[serde(rename = "type")]
    pub entity_type: Vec<String>,
    pub relation: Vec<String>,
}

impl Default for ColumnCandidates {
    fn default() -> Self {
        fn owned(cols: &[&str]) -> Vec<String> {
            cols.iter().map(|c| (*c).to_owned()).collect()
        }
        Self {
            id: owned(&["id", "entity_id", "ID", "Id"]),
            name: owned(&["name", "entity_name", "Name", "label"]),
            entity_type: owned(&["type", "Type", "category", "label"]),
            relation: owned(&["relation", "relation_type", "type"]),
        }
    }
}

/// Column holding the loosely formatted attribute string.
pub const ATTRIBUTES_COLUMN: &str = "attributes";

/// Suffixes tried after an endpoint prefix such as `source` or `target`.
pub const ENDPOINT_SUFFIXES: [&str; 3] = ["", "_id", "_name"];

/// Default relation label when no candidate column has a value.
pub const UNKNOWN_RELATION: &str = "Unknown";

/// A cell counts as present when it is not a sentinel and not `nan`.
pub fn cell<'a>(row: &'a Row, column: &str) -> Option<&'a str> {
    let v = row.get(column)?.trim();
    if Field::is_sentinel(v) || v.eq_ignore_ascii_case("nan") {
        None
    } else {
        Some(v)
    }
}

/// First present value among `candidates`, checking the row before the
/// parsed attributes for each candidate in turn.
pub fn extract_value(row: &Row, attributes: &BTreeMap<String, String>, candidates: &[String]) -> Option<String> {
    candidates.iter().find_map(|c| {
        cell(row, c)
            .map(str::to_owned)
            .or_else(|| attributes.get(c).filter(|v| !v.trim().is_empty()).cloned())
    })
}

/// Relation label of an edge row.
pub fn relation_label(row: &Row, candidates: &[String]) -> String {
    candidates
        .iter()
        .find_map(|c| cell(row, c))
        .unwrap_or(UNKNOWN_RELATION)
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect()
    }

    #[test]
    fn test_candidate_order() {
        let cols = ColumnCandidates::default();
        let r = row(&[("entity_id", "npc_7"), ("Id", "ignored")]);
        assert_eq!(extract_value(&r, &BTreeMap::new(), &cols.id).as_deref(), Some("npc_7"));
    }

    #[test]
    fn test_attributes_consulted_per_candidate() {
        let cols = ColumnCandidates::default();
        let r = row(&[("entity_name", "罗宾")]);
        let attrs: BTreeMap<String, String> = [("name".to_owned(), "Robin".to_owned())].into();
        // `name` is missing from the row but present in attributes, and it
        // comes before `entity_name` in the list.
        assert_eq!(extract_value(&r, &attrs, &cols.name).as_deref(), Some("Robin"));
    }

    #[test]
    fn test_nan_and_sentinel_cells_are_absent() {
        let r = row(&[("id", "nan"), ("entity_id", "-1"), ("ID", "x1")]);
        assert_eq!(extract_value(&r, &BTreeMap::new(), &ColumnCandidates::default().id).as_deref(), Some("x1"));
    }

    #[test]
    fn test_relation_label_default() {
        let cols = ColumnCandidates::default();
        assert_eq!(relation_label(&row(&[("relation_type", "发布")]), &cols.relation), "发布");
        assert_eq!(relation_label(&row(&[("weight", "1")]), &cols.relation), UNKNOWN_RELATION);
    }
}
