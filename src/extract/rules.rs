//! Declarative extraction rules.
//!
//! Every rule is data: a slot or trigger pattern, a predicate label, and a
//! capture policy. Rules are applied independently; collisions between rule
//! types are expected and left for the global dedup pass.
//!
//! | Kind        | Input                    | Emits                              |
//! |-------------|--------------------------|------------------------------------|
//! | Positional  | quest slot               | `(quest, predicate, slot value)`   |
//! | Pattern     | free-text quest slot     | `(quest, predicate, capture)`      |
//! | Lookup      | quest record id          | giver / reward facts               |
//! | Static      | nothing                  | background facts, once per run     |

use hashbrown::HashMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::{quest_slot, EntityType, QuestRecord, Triplet};
use crate::Result;

// ============================================================================
// Rule failures
// ============================================================================

/// A single rule application failed; the record's other rules still run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("field {slot} is not a whole number: {value:?}")]
    NotNumeric { slot: usize, value: String },
}

/// What one rule application produced.
#[derive(Debug, Default)]
pub struct RuleOutput {
    pub triplets: Vec<Triplet>,
    /// Captures thrown away for exceeding the length cap.
    pub discarded: usize,
}

impl From<Vec<Triplet>> for RuleOutput {
    fn from(triplets: Vec<Triplet>) -> Self {
        Self { triplets, discarded: 0 }
    }
}

// ============================================================================
// Positional rules
// ============================================================================

/// How a positional slot value becomes a triplet object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectPolicy {
    /// The slot value as-is.
    Verbatim,
    /// A positive whole number rendered as `"<n>金"`; zero emits nothing.
    Gold,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionalRule {
    pub slot: usize,
    pub predicate: String,
    pub policy: ObjectPolicy,
}

impl PositionalRule {
    pub fn new(slot: usize, predicate: impl Into<String>, policy: ObjectPolicy) -> Self {
        Self { slot, predicate: predicate.into(), policy }
    }

    pub fn apply(&self, quest: &QuestRecord) -> std::result::Result<RuleOutput, RuleError> {
        // Absent slots (sentinels, padding) are skipped, not failures.
        let Some(value) = quest.field(self.slot) else {
            return Ok(RuleOutput::default());
        };

        let object = match self.policy {
            ObjectPolicy::Verbatim => value.to_owned(),
            ObjectPolicy::Gold => {
                if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(RuleError::NotNumeric { slot: self.slot, value: value.to_owned() });
                }
                let amount: u64 = value
                    .parse()
                    .map_err(|_| RuleError::NotNumeric { slot: self.slot, value: value.to_owned() })?;
                if amount == 0 {
                    return Ok(RuleOutput::default());
                }
                format!("{amount}金")
            }
        };

        Ok(vec![Triplet::new(&quest.name, &self.predicate, object)].into())
    }
}

// ============================================================================
// Pattern rules
// ============================================================================

/// Trigger pattern → predicate, capturing a bounded object after the trigger.
#[derive(Debug, Clone)]
pub struct PatternRule {
    /// Quest slot holding the free text to scan.
    pub slot: usize,
    pub pattern: Regex,
    pub predicate: String,
    /// Capture group holding the object.
    pub group: usize,
    /// Captures of `cap` characters or more are discarded as false positives.
    pub cap: usize,
}

impl PatternRule {
    pub fn new(slot: usize, pattern: &str, predicate: impl Into<String>, group: usize, cap: usize) -> Result<Self> {
        Ok(Self {
            slot,
            pattern: Regex::new(pattern)?,
            predicate: predicate.into(),
            group,
            cap,
        })
    }

    pub fn apply(&self, quest: &QuestRecord) -> RuleOutput {
        let mut out = RuleOutput::default();
        let Some(text) = quest.field(self.slot) else {
            return out;
        };

        for caps in self.pattern.captures_iter(text) {
            let Some(m) = caps.get(self.group) else { continue };
            let object = m.as_str().trim();
            if object.is_empty() {
                continue;
            }
            if object.chars().count() >= self.cap {
                out.discarded += 1;
                continue;
            }
            out.triplets.push(Triplet::new(&quest.name, &self.predicate, object));
        }
        out
    }
}

// ============================================================================
// Lookup-table rules
// ============================================================================

/// Which end of the fact the table value occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupDirection {
    /// `(value, predicate, quest)`, e.g. the giver of a quest.
    ValueToQuest,
    /// `(quest, predicate, value)`, e.g. a known reward.
    QuestToValue,
}

/// Static facts keyed by quest record id.
#[derive(Debug, Clone)]
pub struct LookupRule {
    pub predicate: String,
    pub direction: LookupDirection,
    pub entries: HashMap<String, String>,
}

impl LookupRule {
    pub fn new<'a>(
        predicate: impl Into<String>,
        direction: LookupDirection,
        entries: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        Self {
            predicate: predicate.into(),
            direction,
            entries: entries.into_iter().map(|(k, v)| (k.to_owned(), v.to_owned())).collect(),
        }
    }

    pub fn apply(&self, quest: &QuestRecord) -> RuleOutput {
        let Some(value) = self.entries.get(&quest.id) else {
            return RuleOutput::default();
        };
        let triplet = match self.direction {
            LookupDirection::ValueToQuest => Triplet::new(value, &self.predicate, &quest.name),
            LookupDirection::QuestToValue => Triplet::new(&quest.name, &self.predicate, value),
        };
        vec![triplet].into()
    }
}

// ============================================================================
// Rule table
// ============================================================================

/// The complete rule set consulted by the extractor.
#[derive(Debug, Clone)]
pub struct RuleTable {
    pub positional: Vec<PositionalRule>,
    pub patterns: Vec<PatternRule>,
    pub lookups: Vec<LookupRule>,
    /// Keywords whose mention in a dialogue line emits `(speaker, 提到, keyword)`.
    pub mention_keywords: Vec<String>,
    /// Background facts asserted once per run.
    pub static_facts: Vec<Triplet>,
    /// predicate → (subject type, object type), used to type minted endpoints.
    pub roles: HashMap<String, (EntityType, EntityType)>,
}

pub const PRED_OCCURS_AT: &str = "发生于";
pub const PRED_GOLD_REWARD: &str = "奖励金币";
pub const PRED_REWARD: &str = "奖励";
pub const PRED_GIVES: &str = "发布";
pub const PRED_COLLECT: &str = "需要收集";
pub const PRED_DELIVER: &str = "需要交付";
pub const PRED_KILL: &str = "要求击杀";
pub const PRED_REACH: &str = "要求到达";
pub const PRED_CRAFT_NEEDS: &str = "合成需要";
pub const PRED_MENTIONS: &str = "提到";

impl RuleTable {
    /// The game's standard rule set.
    pub fn standard() -> Result<Self> {
        use EntityType::*;

        let positional = vec![
            PositionalRule::new(quest_slot::LOCATION, PRED_OCCURS_AT, ObjectPolicy::Verbatim),
            PositionalRule::new(quest_slot::REWARD, PRED_GOLD_REWARD, ObjectPolicy::Gold),
        ];

        let obj = quest_slot::OBJECTIVE;
        let patterns = vec![
            PatternRule::new(obj, r"带(?:来|给).*?(\d+).*?(个)?(.*?)[。，]", PRED_COLLECT, 3, 50)?,
            PatternRule::new(obj, r"收集.*?(\d+).*?(个)?(.*?)[。，]", PRED_COLLECT, 3, 50)?,
            PatternRule::new(obj, r"带给.*?(一株|一个|一瓶)(.*?)[。，]", PRED_DELIVER, 2, 50)?,
            PatternRule::new(obj, r"(?:击杀|杀死|讨伐).*?(\d+).*?(只|个)(.*?)[。，]", PRED_KILL, 3, 50)?,
            PatternRule::new(obj, r"(?:进入|抵达|到达|前往)(.*?)[。，]", PRED_REACH, 1, 100)?,
        ];

        let lookups = vec![
            LookupRule::new(PRED_GIVES, LookupDirection::ValueToQuest, [
                ("1", "法师"), ("2", "齐先生"), ("6", "镇长刘易斯"), ("7", "罗宾"),
                ("21", "玛妮"), ("22", "乔迪"), ("100", "罗宾"), ("101", "乔迪"),
            ]),
            LookupRule::new(PRED_REWARD, LookupDirection::QuestToValue, [
                ("6", "100金"), ("7", "100金"), ("8", "100金"), ("24", "250金"),
                ("100", "250金"), ("101", "350金"), ("102", "750金"),
            ]),
        ];

        let mention_keywords = ["剑", "斧", "镐", "鱼竿", "种子", "作物"]
            .into_iter()
            .map(String::from)
            .collect();

        let static_facts = [
            // Shops
            ("皮埃尔", "出售", "种子"),
            ("皮埃尔", "出售", "肥料"),
            ("克林特", "出售", "矿石"),
            ("克林特", "打造", "工具"),
            ("罗宾", "出售", "建材"),
            ("威利", "出售", "鱼竿"),
            ("玛妮", "出售", "动物"),
            // What places contain
            ("矿洞", "包含", "矿石"),
            ("矿洞", "包含", "怪物"),
            ("森林", "包含", "forageables"),
            ("河流", "包含", "鱼类"),
            ("海洋", "包含", "鱼类"),
            // Seasons
            ("春季", "适合种植", "防风草"),
            ("春季", "适合种植", "花椰菜"),
            ("夏季", "适合种植", "蓝莓"),
            ("夏季", "适合种植", "辣椒"),
            ("秋季", "适合种植", "蔓越莓"),
            ("秋季", "适合种植", "南瓜"),
        ]
        .into_iter()
        .map(Triplet::from)
        .collect();

        let roles = [
            (PRED_GIVES, (Npc, Quest)),
            (PRED_OCCURS_AT, (Quest, Location)),
            (PRED_REACH, (Quest, Location)),
            (PRED_COLLECT, (Quest, Item)),
            (PRED_DELIVER, (Quest, Item)),
            (PRED_KILL, (Quest, Unknown)),
            (PRED_GOLD_REWARD, (Quest, Unknown)),
            (PRED_REWARD, (Quest, Item)),
            (PRED_CRAFT_NEEDS, (Item, Item)),
            (PRED_MENTIONS, (Npc, Item)),
            ("出售", (Npc, Item)),
            ("打造", (Npc, Item)),
            ("包含", (Location, Unknown)),
            ("适合种植", (Unknown, Item)),
        ]
        .into_iter()
        .map(|(p, r)| (p.to_owned(), r))
        .collect();

        Ok(Self { positional, patterns, lookups, mention_keywords, static_facts, roles })
    }

    /// Type hints for the subject and object of a predicate.
    pub fn roles_of(&self, predicate: &str) -> (EntityType, EntityType) {
        self.roles.get(predicate).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Field, Fields};

    fn quest(id: &str, name: &str, slots: &[&str]) -> QuestRecord {
        let mut fields: Fields = slots.iter().map(|s| Field::decode(s)).collect();
        while fields.len() < quest_slot::REWARD + 1 {
            fields.push(Field::Absent);
        }
        QuestRecord {
            id: id.into(),
            name: name.into(),
            quest_type: None,
            description: None,
            objective: fields[quest_slot::OBJECTIVE].as_str().map(str::to_owned),
            location: None,
            next_quest: None,
            reward: None,
            fields,
        }
    }

    #[test]
    fn test_positional_skips_sentinel() {
        let rule = PositionalRule::new(quest_slot::LOCATION, PRED_OCCURS_AT, ObjectPolicy::Verbatim);
        let q = quest("1", "Q", &["Basic", "Q", "d", "o", "-1"]);
        assert!(rule.apply(&q).unwrap().triplets.is_empty());
    }

    #[test]
    fn test_gold_policy() {
        let rule = PositionalRule::new(quest_slot::REWARD, PRED_GOLD_REWARD, ObjectPolicy::Gold);

        let q = quest("1", "Q", &["Basic", "Q", "d", "o", "-1", "-1", "250"]);
        assert_eq!(rule.apply(&q).unwrap().triplets, vec![Triplet::new("Q", PRED_GOLD_REWARD, "250金")]);

        let zero = quest("1", "Q", &["Basic", "Q", "d", "o", "-1", "-1", "0"]);
        assert!(rule.apply(&zero).unwrap().triplets.is_empty());

        let junk = quest("1", "Q", &["Basic", "Q", "d", "o", "-1", "-1", "lots"]);
        assert_eq!(
            rule.apply(&junk).unwrap_err(),
            RuleError::NotNumeric { slot: quest_slot::REWARD, value: "lots".into() },
        );
    }

    #[test]
    fn test_pattern_reach() {
        let table = RuleTable::standard().unwrap();
        let q = quest("1", "Introduce Yourself", &["NPC_1", "Introduce Yourself", "d", "进入魔法师小屋。"]);
        let out: Vec<Triplet> = table.patterns.iter().flat_map(|r| r.apply(&q).triplets).collect();
        assert_eq!(out, vec![Triplet::new("Introduce Yourself", PRED_REACH, "魔法师小屋")]);
    }

    #[test]
    fn test_pattern_collect_and_kill() {
        let table = RuleTable::standard().unwrap();
        let q = quest("5", "Q", &["Basic", "Q", "d", "收集10个铜矿石，然后击杀5只史莱姆。"]);
        let out: Vec<Triplet> = table.patterns.iter().flat_map(|r| r.apply(&q).triplets).collect();
        assert!(out.contains(&Triplet::new("Q", PRED_COLLECT, "铜矿石")));
        assert!(out.contains(&Triplet::new("Q", PRED_KILL, "史莱姆")));
    }

    #[test]
    fn test_pattern_cap_discards_long_capture() {
        let rule = PatternRule::new(quest_slot::OBJECTIVE, r"前往(.*?)[。，]", PRED_REACH, 1, 5).unwrap();
        let q = quest("1", "Q", &["Basic", "Q", "d", "前往一个非常非常遥远的地方。前往矿洞。"]);
        let out = rule.apply(&q);
        assert_eq!(out.discarded, 1);
        assert_eq!(out.triplets, vec![Triplet::new("Q", PRED_REACH, "矿洞")]);
    }

    #[test]
    fn test_lookup_directions() {
        let table = RuleTable::standard().unwrap();
        let q = quest("6", "Advancement", &["Basic", "Advancement", "d", "o"]);
        let out: Vec<Triplet> = table.lookups.iter().flat_map(|r| r.apply(&q).triplets).collect();
        assert_eq!(out, vec![
            Triplet::new("镇长刘易斯", PRED_GIVES, "Advancement"),
            Triplet::new("Advancement", PRED_REWARD, "100金"),
        ]);
    }

    #[test]
    fn test_bad_pattern_is_an_error() {
        assert!(PatternRule::new(0, r"(unclosed", "x", 1, 10).is_err());
    }
}
