//! Attribute-string parsing for tabular node rows.
//!
//! Exported node tables carry a loosely formatted `attributes` column:
//! sometimes JSON, sometimes a single-quoted dict dump, sometimes a bare
//! `{k: v, ...}` list. Parsing never fails; unparseable input yields an
//! empty map.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value as JsonValue;
use tracing::debug;

/// Parse an attribute string into a flat string map.
pub fn parse_attribute_string(raw: &str) -> BTreeMap<String, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        return BTreeMap::new();
    }

    let cleaned = bare_nan_to_null(&trimmed.replace('\'', "\""));
    match serde_json::from_str::<serde_json::Map<String, JsonValue>>(&cleaned) {
        Ok(map) => map
            .into_iter()
            .filter_map(|(k, v)| json_to_string(v).map(|v| (k, v)))
            .collect(),
        Err(e) => {
            debug!(error = %e, "attribute string is not JSON, falling back to manual split");
            parse_manual(trimmed)
        }
    }
}

/// Rewrite unquoted `nan` tokens as JSON `null`; quoted strings are left alone.
fn bare_nan_to_null(text: &str) -> String {
    static BARE_NAN: LazyLock<Option<Regex>> =
        LazyLock::new(|| Regex::new(r#""(?:[^"\\]|\\.)*"|\bnan\b"#).ok());
    match BARE_NAN.as_ref() {
        Some(re) => re
            .replace_all(text, |caps: &Captures<'_>| {
                if caps[0].starts_with('"') { caps[0].to_owned() } else { "null".to_owned() }
            })
            .into_owned(),
        None => text.to_owned(),
    }
}

fn json_to_string(v: JsonValue) -> Option<String> {
    match v {
        JsonValue::Null => None,
        JsonValue::String(s) if s.is_empty() || s.eq_ignore_ascii_case("nan") => None,
        JsonValue::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn parse_manual(raw: &str) -> BTreeMap<String, String> {
    let content = raw.trim_start_matches('{').trim_end_matches('}');
    content
        .split(',')
        .filter_map(|pair| {
            let (key, val) = pair.split_once(':')?;
            let key = strip_quotes(key);
            let val = strip_quotes(val);
            if key.is_empty() || val.is_empty() || val.eq_ignore_ascii_case("nan") {
                None
            } else {
                Some((key.to_owned(), val.to_owned()))
            }
        })
        .collect()
}

fn strip_quotes(s: &str) -> &str {
    s.trim().trim_matches('"').trim_matches('\'').trim()
}
