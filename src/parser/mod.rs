//! # Record Parser
//!
//! Turns one raw record into ordered fields, then into a typed [`Record`].
//! Pure functions over record text. Relation semantics live in `extract`.
//!
//! ```text
//! RawRecord ──split──▶ Fields (sentinels → Absent, padded) ──decode──▶ Record
//! ```

pub mod attributes;

use crate::model::*;
use crate::{Error, Result};

pub use attributes::parse_attribute_string;

/// Field-level parsing knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Field delimiter for `RawBody::Delimited`.
    pub delimiter: char,
    /// Minimum field count for a quest record.
    pub min_quest_fields: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self { delimiter: '/', min_quest_fields: 4 }
    }
}

// ============================================================================
// Field splitting
// ============================================================================

/// Split a body into ordered fields.
///
/// Fails when fewer than `min` fields are present; pads with
/// [`Field::Absent`] up to `pad_to` otherwise.
pub fn parse_fields(
    record_id: &str,
    body: &RawBody,
    delimiter: char,
    min: usize,
    pad_to: usize,
) -> Result<Fields> {
    let mut fields: Fields = match body {
        RawBody::Delimited(line) => {
            if line.trim().is_empty() {
                Fields::new()
            } else {
                line.split(delimiter).map(Field::decode).collect()
            }
        }
        RawBody::Block(text) => parse_block(text).into_iter().map(|(_, v)| Field::decode(&v)).collect(),
        RawBody::Pairs(pairs) => pairs.iter().map(|(_, v)| Field::decode(v)).collect(),
    };

    if fields.len() < min {
        return Err(Error::MalformedRecord {
            record_id: record_id.to_owned(),
            reason: format!("expected at least {min} fields, found {}", fields.len()),
        });
    }
    while fields.len() < pad_to {
        fields.push(Field::Absent);
    }
    Ok(fields)
}

/// Parse a `key: value` / `key=value` block into ordered pairs.
///
/// Blank lines and lines without a separator are ignored. The first
/// separator on a line wins, so values may contain further colons.
pub fn parse_block(text: &str) -> Vec<(String, String)> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() {
                return None;
            }
            let split = match (line.find(':'), line.find('=')) {
                (Some(c), Some(e)) => c.min(e),
                (Some(c), None) => c,
                (None, Some(e)) => e,
                (None, None) => return None,
            };
            let key = line[..split].trim();
            if key.is_empty() {
                return None;
            }
            let value = line[split + 1..].trim();
            Some((key.to_owned(), value.to_owned()))
        })
        .collect()
}

fn pairs_of(body: &RawBody, delimiter: char) -> Vec<(String, String)> {
    match body {
        RawBody::Pairs(pairs) => pairs.clone(),
        RawBody::Block(text) => parse_block(text),
        RawBody::Delimited(line) => line
            .split(delimiter)
            .enumerate()
            .filter(|(_, v)| !v.trim().is_empty())
            .map(|(i, v)| (i.to_string(), v.trim().to_owned()))
            .collect(),
    }
}

// ============================================================================
// Typed decoding
// ============================================================================

/// Decode a raw record into its typed form.
pub fn decode(raw: &RawRecord, opts: &ParseOptions) -> Result<Record> {
    match raw.kind {
        SourceKind::Quest => decode_quest(raw, opts).map(Record::Quest),
        SourceKind::Item => {
            let fields = parse_fields(&raw.id, &raw.body, opts.delimiter, 1, 2)?;
            let name = required(raw, &fields, 0, "item name")?;
            Ok(Record::Item(ItemRecord {
                id: raw.id.clone(),
                name,
                price: fields[1].as_str().map(str::to_owned),
            }))
        }
        SourceKind::Npc => decode_named(raw, opts).map(Record::Npc),
        SourceKind::Location => decode_named(raw, opts).map(Record::Location),
        SourceKind::Recipe => decode_recipe(raw, opts).map(Record::Recipe),
        SourceKind::Dialogue => {
            let lines = pairs_of(&raw.body, opts.delimiter);
            if lines.is_empty() {
                return Err(Error::MalformedRecord {
                    record_id: raw.id.clone(),
                    reason: "dialogue block has no lines".into(),
                });
            }
            Ok(Record::Dialogue(DialogueRecord { speaker: raw.id.clone(), lines }))
        }
    }
}

fn decode_quest(raw: &RawRecord, opts: &ParseOptions) -> Result<QuestRecord> {
    let fields = match &raw.body {
        RawBody::Block(_) | RawBody::Pairs(_) => keyed_quest_fields(raw, opts)?,
        RawBody::Delimited(_) => None,
    };
    let fields = match fields {
        Some(fields) => fields,
        None => parse_fields(
            &raw.id,
            &raw.body,
            opts.delimiter,
            opts.min_quest_fields,
            quest_slot::REWARD + 1,
        )?,
    };
    let name = required(raw, &fields, quest_slot::NAME, "quest name")?;
    let slot = |i: usize| fields[i].as_str().map(str::to_owned);

    Ok(QuestRecord {
        id: raw.id.clone(),
        name,
        quest_type: slot(quest_slot::TYPE),
        description: slot(quest_slot::DESCRIPTION),
        objective: slot(quest_slot::OBJECTIVE),
        location: slot(quest_slot::LOCATION),
        next_quest: slot(quest_slot::NEXT_QUEST),
        reward: slot(quest_slot::REWARD),
        fields,
    })
}

/// Quest slot named by a block key.
fn quest_slot_of(key: &str) -> Option<usize> {
    let slot = match key.trim().to_ascii_lowercase().as_str() {
        "type" => quest_slot::TYPE,
        "name" => quest_slot::NAME,
        "description" => quest_slot::DESCRIPTION,
        "objective" => quest_slot::OBJECTIVE,
        "location" => quest_slot::LOCATION,
        "next" | "next_quest" => quest_slot::NEXT_QUEST,
        "reward" => quest_slot::REWARD,
        _ => return None,
    };
    Some(slot)
}

/// Place keyed quest values by key rather than by line order.
///
/// Returns `None` when no key names a quest slot, so the body is read
/// positionally. Unknown keys follow the layout in line order; a repeated
/// key keeps its first value.
fn keyed_quest_fields(raw: &RawRecord, opts: &ParseOptions) -> Result<Option<Fields>> {
    let pairs = pairs_of(&raw.body, opts.delimiter);
    if !pairs.iter().any(|(k, _)| quest_slot_of(k).is_some()) {
        return Ok(None);
    }
    if pairs.len() < opts.min_quest_fields {
        return Err(Error::MalformedRecord {
            record_id: raw.id.clone(),
            reason: format!("expected at least {} fields, found {}", opts.min_quest_fields, pairs.len()),
        });
    }

    let mut fields: Fields = std::iter::repeat_n(Field::Absent, quest_slot::REWARD + 1).collect();
    let mut filled = [false; quest_slot::REWARD + 1];
    for (key, value) in &pairs {
        match quest_slot_of(key) {
            Some(slot) if !filled[slot] => {
                fields[slot] = Field::decode(value);
                filled[slot] = true;
            }
            Some(_) => {}
            None => fields.push(Field::decode(value)),
        }
    }
    Ok(Some(fields))
}

fn decode_named(raw: &RawRecord, opts: &ParseOptions) -> Result<NamedRecord> {
    let fields = parse_fields(&raw.id, &raw.body, opts.delimiter, 1, 1)?;
    let name = required(raw, &fields, 0, "name")?;
    let extra = fields[1..]
        .iter()
        .filter_map(Field::as_str)
        .map(str::to_owned)
        .collect();
    Ok(NamedRecord { id: raw.id.clone(), name, extra })
}

fn decode_recipe(raw: &RawRecord, opts: &ParseOptions) -> Result<RecipeRecord> {
    let fields = parse_fields(&raw.id, &raw.body, opts.delimiter, 2, 2)?;

    let result_part: Vec<&str> = fields[0].as_str().unwrap_or_default().split_whitespace().collect();
    let [item_id, count, ..] = result_part.as_slice() else {
        return Err(Error::MalformedRecord {
            record_id: raw.id.clone(),
            reason: "recipe result needs an item id and a count".into(),
        });
    };
    let result = Ingredient { item_id: (*item_id).to_owned(), count: (*count).to_owned() };

    // Pairs of `id count`; a dangling id without a count is ignored.
    let material_tokens: Vec<&str> = fields[1].as_str().unwrap_or_default().split_whitespace().collect();
    let materials = material_tokens
        .chunks_exact(2)
        .map(|pair| Ingredient { item_id: pair[0].to_owned(), count: pair[1].to_owned() })
        .collect();

    Ok(RecipeRecord { id: raw.id.clone(), result, materials })
}

fn required(raw: &RawRecord, fields: &Fields, slot: usize, what: &str) -> Result<String> {
    fields
        .get(slot)
        .and_then(Field::as_str)
        .map(str::to_owned)
        .ok_or_else(|| Error::MalformedRecord {
            record_id: raw.id.clone(),
            reason: format!("{what} (field {slot}) is absent"),
        })
}
