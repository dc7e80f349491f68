//! Design recommendations derived from whole-graph statistics.
//!
//! Rules, in report order:
//!
//! | Rule | Input | Thresholds |
//! |------|-------|------------|
//! | density | `GraphStats::density` | `< 0.01` sparse, `> 0.1` dense |
//! | type balance | types with more than 5 nodes | at least 3 is balanced |
//! | modularity | Louvain modularity | `> 0.5` high, `> 0.3` moderate |
//! | connectivity | average degree | `3..=5` ideal |
//! | type share | NPC, Item, Location, Unknown | count and percent of all nodes |

use std::fmt;

use serde::Serialize;

use super::GraphStats;
use crate::model::EntityType;

const SPARSE_DENSITY: f64 = 0.01;
const DENSE_DENSITY: f64 = 0.1;
const MAJOR_TYPE_MIN_NODES: usize = 5;
const BALANCED_MAJOR_TYPES: usize = 3;
const HIGH_MODULARITY: f64 = 0.5;
const MODERATE_MODULARITY: f64 = 0.3;
const IDEAL_DEGREE: (f64, f64) = (3.0, 5.0);

/// Types whose share is always reported, even at zero.
const SHARE_TYPES: [EntityType; 4] = [EntityType::Npc, EntityType::Item, EntityType::Location, EntityType::Unknown];

/// Where a measure sits relative to its target band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Low,
    Ideal,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModularityLevel {
    High,
    Moderate,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recommendation {
    Density { density: f64, level: Level },
    TypeBalance { major_types: usize, balanced: bool },
    Modularity { modularity: f64, level: ModularityLevel },
    Connectivity { average_degree: f64, level: Level },
    TypeShare { entity_type: EntityType, count: usize, percent: f64 },
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recommendation::Density { density, level } => match level {
                Level::Low => write!(f, "density {density:.4} is low; link more quests together"),
                Level::Ideal => write!(f, "density {density:.4} is balanced"),
                Level::High => write!(f, "density {density:.4} is high; consider pruning links"),
            },
            Recommendation::TypeBalance { major_types, balanced: true } => {
                write!(f, "{major_types} major element types; distribution is balanced")
            }
            Recommendation::TypeBalance { major_types, balanced: false } => {
                write!(f, "only {major_types} major element types; add more kinds of game element")
            }
            Recommendation::Modularity { modularity, level } => match level {
                ModularityLevel::High => write!(f, "modularity {modularity:.3} is high; structure is clear"),
                ModularityLevel::Moderate => write!(f, "modularity {modularity:.3} is moderate"),
                ModularityLevel::Low => write!(f, "modularity {modularity:.3} is low; separate feature areas"),
            },
            Recommendation::Connectivity { average_degree, level } => match level {
                Level::Low => write!(f, "average degree {average_degree:.1} is below 3-5; add interactions"),
                Level::Ideal => write!(f, "average degree {average_degree:.1} is within 3-5"),
                Level::High => write!(f, "average degree {average_degree:.1} is above 3-5; simplify"),
            },
            Recommendation::TypeShare { entity_type, count, percent } => {
                write!(f, "{entity_type}: {count} nodes ({percent:.1}%)")
            }
        }
    }
}

/// Apply every rule to `stats`.
pub fn recommendations(stats: &GraphStats, modularity: f64) -> Vec<Recommendation> {
    let mut out = Vec::with_capacity(4 + SHARE_TYPES.len());

    let density = stats.density;
    let level = if density < SPARSE_DENSITY {
        Level::Low
    } else if density > DENSE_DENSITY {
        Level::High
    } else {
        Level::Ideal
    };
    out.push(Recommendation::Density { density, level });

    let major_types = stats.by_type.values().filter(|t| t.count > MAJOR_TYPE_MIN_NODES).count();
    out.push(Recommendation::TypeBalance { major_types, balanced: major_types >= BALANCED_MAJOR_TYPES });

    let level = if modularity > HIGH_MODULARITY {
        ModularityLevel::High
    } else if modularity > MODERATE_MODULARITY {
        ModularityLevel::Moderate
    } else {
        ModularityLevel::Low
    };
    out.push(Recommendation::Modularity { modularity, level });

    let average_degree = stats.average_degree;
    let level = if average_degree < IDEAL_DEGREE.0 {
        Level::Low
    } else if average_degree > IDEAL_DEGREE.1 {
        Level::High
    } else {
        Level::Ideal
    };
    out.push(Recommendation::Connectivity { average_degree, level });

    for entity_type in SHARE_TYPES {
        let count = stats.by_type.get(&entity_type).map_or(0, |t| t.count);
        let percent = if stats.node_count == 0 { 0.0 } else { count as f64 * 100.0 / stats.node_count as f64 };
        out.push(Recommendation::TypeShare { entity_type, count, percent });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::TypeStats;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn stats(density: f64, average_degree: f64, types: &[(EntityType, usize)]) -> GraphStats {
        let by_type: BTreeMap<EntityType, TypeStats> = types
            .iter()
            .map(|&(t, count)| (t, TypeStats { count, total_degree: 0, average_degree: 0.0 }))
            .collect();
        GraphStats {
            node_count: types.iter().map(|(_, c)| c).sum(),
            edge_count: 0,
            density,
            is_connected: false,
            component_count: 0,
            isolated_count: 0,
            average_degree,
            max_degree: 0,
            min_degree: 0,
            degree_distribution: BTreeMap::new(),
            average_clustering: 0.0,
            diameter: None,
            average_path_length: None,
            by_type,
            relations: BTreeMap::new(),
        }
    }

    fn density_level(density: f64) -> Level {
        match recommendations(&stats(density, 4.0, &[]), 0.4)[0] {
            Recommendation::Density { level, .. } => level,
            ref other => panic!("unexpected {other:?}"),
        }
    }

    fn modularity_level(modularity: f64) -> ModularityLevel {
        match recommendations(&stats(0.05, 4.0, &[]), modularity)[2] {
            Recommendation::Modularity { level, .. } => level,
            ref other => panic!("unexpected {other:?}"),
        }
    }

    fn degree_level(average_degree: f64) -> Level {
        match recommendations(&stats(0.05, average_degree, &[]), 0.4)[3] {
            Recommendation::Connectivity { level, .. } => level,
            ref other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_density_boundaries() {
        assert_eq!(density_level(0.009), Level::Low);
        assert_eq!(density_level(0.01), Level::Ideal);
        assert_eq!(density_level(0.1), Level::Ideal);
        assert_eq!(density_level(0.11), Level::High);
    }

    #[test]
    fn test_modularity_boundaries() {
        assert_eq!(modularity_level(0.51), ModularityLevel::High);
        assert_eq!(modularity_level(0.5), ModularityLevel::Moderate);
        assert_eq!(modularity_level(0.31), ModularityLevel::Moderate);
        assert_eq!(modularity_level(0.3), ModularityLevel::Low);
    }

    #[test]
    fn test_average_degree_band_is_inclusive() {
        assert_eq!(degree_level(2.9), Level::Low);
        assert_eq!(degree_level(3.0), Level::Ideal);
        assert_eq!(degree_level(5.0), Level::Ideal);
        assert_eq!(degree_level(5.1), Level::High);
    }

    #[test]
    fn test_type_balance_counts_types_over_five_nodes() {
        let balanced = stats(0.05, 4.0, &[(EntityType::Npc, 6), (EntityType::Quest, 6), (EntityType::Item, 6)]);
        assert_eq!(
            recommendations(&balanced, 0.4)[1],
            Recommendation::TypeBalance { major_types: 3, balanced: true }
        );

        let thin = stats(0.05, 4.0, &[(EntityType::Npc, 6), (EntityType::Quest, 6), (EntityType::Item, 5)]);
        assert_eq!(
            recommendations(&thin, 0.4)[1],
            Recommendation::TypeBalance { major_types: 2, balanced: false }
        );
    }

    #[test]
    fn test_type_shares_include_unknown_and_absent_types() {
        let s = stats(0.05, 4.0, &[(EntityType::Quest, 4), (EntityType::Npc, 2), (EntityType::Unknown, 2)]);
        let shares: Vec<_> = recommendations(&s, 0.4).into_iter().skip(4).collect();
        assert_eq!(
            shares,
            vec![
                Recommendation::TypeShare { entity_type: EntityType::Npc, count: 2, percent: 25.0 },
                Recommendation::TypeShare { entity_type: EntityType::Item, count: 0, percent: 0.0 },
                Recommendation::TypeShare { entity_type: EntityType::Location, count: 0, percent: 0.0 },
                Recommendation::TypeShare { entity_type: EntityType::Unknown, count: 2, percent: 25.0 },
            ]
        );
        assert_eq!(shares[3].to_string(), "Unknown: 2 nodes (25.0%)");
    }

    #[test]
    fn test_recommendations_serialise_with_kind() {
        let r = Recommendation::Density { density: 0.05, level: Level::Ideal };
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["kind"], "density");
        assert_eq!(json["level"], "ideal");
    }
}
