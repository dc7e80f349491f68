//! Flat tables and Cypher DUMP export of a built graph.
//!
//! ```text
//! triplets ──▶ triplet_rows()  (subject, relation, object)
//! entities ──▶ entity_rows()   (entity_id, entity_name)
//! KnowledgeGraph ──▶ export_cypher_dump() ──▶ MERGE statements
//!   → paste into Neo4j Browser, or feed cypher-shell
//! ```
//!
//! Concrete file encodings (CSV, Excel, ...) are left to the caller; the
//! rows are plain serde structs.

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::graph::KnowledgeGraph;
use crate::model::{Entity, Triplet};
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripletRow {
    pub subject: String,
    pub relation: String,
    pub object: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRow {
    pub entity_id: String,
    pub entity_name: String,
}

pub fn triplet_rows(triplets: &[Triplet]) -> Vec<TripletRow> {
    triplets
        .iter()
        .map(|t| TripletRow {
            subject: t.subject.clone(),
            relation: t.predicate.clone(),
            object: t.object.clone(),
        })
        .collect()
}

pub fn entity_rows(entities: &[Entity]) -> Vec<EntityRow> {
    entities
        .iter()
        .map(|e| EntityRow {
            entity_id: e.canonical_id.to_string(),
            entity_name: e.display_name.clone(),
        })
        .collect()
}

/// Export a graph as a Cypher DUMP script.
///
/// Nodes become `(:Entity {id})` with name, type and attributes set;
/// edges become `[:REL {type}]` in their source → target orientation.
/// MERGE keeps the script safe to load twice.
pub fn export_cypher_dump(graph: &KnowledgeGraph, writer: &mut dyn Write) -> Result<()> {
    writeln!(writer, "// questgraph Cypher DUMP")?;
    writeln!(writer, "// Generated {}", chrono::Utc::now().to_rfc3339())?;
    writeln!(writer, "// Nodes: {}", graph.node_count())?;
    writeln!(writer, "// Relationships: {}", graph.edge_count())?;
    writeln!(writer)?;

    for node in graph.nodes() {
        let mut sets = vec![
            format!("n.name = {}", quote(&node.display_name)),
            format!("n.type = {}", quote(node.entity_type.as_str())),
        ];
        for (key, value) in &node.attributes {
            // Reserved keys are written above.
            if matches!(key.as_str(), "id" | "name" | "type") {
                continue;
            }
            sets.push(format!("n.{} = {}", property_key(key), quote(value)));
        }
        writeln!(
            writer,
            "MERGE (n:Entity {{id: {}}}) SET {};",
            quote(node.canonical_id.as_str()),
            sets.join(", ")
        )?;
    }

    writeln!(writer)?;
    writeln!(writer, "// Relationships")?;

    for edge in graph.edges() {
        writeln!(
            writer,
            "MATCH (a:Entity {{id: {}}}), (b:Entity {{id: {}}}) MERGE (a)-[:REL {{type: {}}}]->(b);",
            quote(edge.source.as_str()),
            quote(edge.target.as_str()),
            quote(&edge.relation),
        )?;
    }

    Ok(())
}

/// Single-quoted Cypher string literal.
fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Property key, backtick-quoted unless it is a plain identifier.
fn property_key(key: &str) -> String {
    let plain = key.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        key.to_owned()
    } else {
        format!("`{}`", key.replace('`', "``"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntityType;

    #[test]
    fn test_quote() {
        assert_eq!(quote("hello"), "'hello'");
        assert_eq!(quote("Pierre's"), r"'Pierre\'s'");
        assert_eq!(quote(r"a\b"), r"'a\\b'");
    }

    #[test]
    fn test_property_key() {
        assert_eq!(property_key("quest_type"), "quest_type");
        assert_eq!(property_key("季节"), "`季节`");
        assert_eq!(property_key("2nd"), "`2nd`");
    }

    #[test]
    fn test_rows() {
        let rows = triplet_rows(&[Triplet::new("Introduce Yourself", "发生于", "Forest")]);
        assert_eq!(rows[0].relation, "发生于");
        let rows = entity_rows(&[Entity::new("loc_1", "Forest")]);
        assert_eq!(rows, vec![EntityRow { entity_id: "loc_1".into(), entity_name: "Forest".into() }]);
    }

    #[test]
    fn test_cypher_dump() {
        let mut g = KnowledgeGraph::new();
        g.add_node(Entity::new("npc_1", "法师").with_type(EntityType::Npc).with_attribute("home", "Wizard's Tower"));
        g.add_node(Entity::new("quest_1", "Introduce Yourself").with_type(EntityType::Quest));
        g.add_edge(&"npc_1".into(), &"quest_1".into(), "发布");

        let mut out = Vec::new();
        export_cypher_dump(&g, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("// Nodes: 2"));
        assert!(text.contains(r"MERGE (n:Entity {id: 'npc_1'}) SET n.name = '法师', n.type = 'NPC', n.home = 'Wizard\'s Tower';"));
        assert!(text.contains("MATCH (a:Entity {id: 'npc_1'}), (b:Entity {id: 'quest_1'}) MERGE (a)-[:REL {type: '发布'}]->(b);"));
    }
}
