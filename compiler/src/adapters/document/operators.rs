//! `$match` fragment builders

use serde_json::{Map, Value as JsonValue, json};

use crate::dates::DateWindow;
use crate::filter::{Scalar, UpperBound};
use crate::utils::time::{local_midnight, to_iso_millis};

/// Positional anchoring of a text pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Anywhere,
    Start,
    End,
    Full,
}

/// Case-insensitive regex for `text` with the given anchoring
///
/// The end anchor is `\z`: `$` would also accept a trailing newline.
pub fn pattern(text: &str, anchor: Anchor) -> String {
    let escaped = regex::escape(text);
    match anchor {
        Anchor::Anywhere => escaped,
        Anchor::Start => format!("^{}", escaped),
        Anchor::End => format!(r"{}\z", escaped),
        Anchor::Full => format!(r"^{}\z", escaped),
    }
}

/// Extended-JSON representation of a coerced value
pub fn value(scalar: &Scalar) -> JsonValue {
    match scalar {
        Scalar::Text(s) => JsonValue::String(s.clone()),
        Scalar::Number(n) => JsonValue::Number(n.clone()),
        Scalar::Bool(b) => JsonValue::Bool(*b),
        Scalar::Timestamp(instant) => json!({ "$date": to_iso_millis(*instant) }),
        Scalar::Date(day) => match local_midnight(chrono_tz::UTC, *day) {
            Some(midnight) => json!({ "$date": to_iso_millis(midnight) }),
            None => JsonValue::Null,
        },
        Scalar::ObjectId(hex) => json!({ "$oid": hex }),
    }
}

fn field(path: &str, condition: JsonValue) -> JsonValue {
    let mut map = Map::new();
    map.insert(path.to_string(), condition);
    JsonValue::Object(map)
}

/// `{path: {op: value}}`
pub fn compare(path: &str, op: &str, scalar: &Scalar) -> JsonValue {
    field(path, json!({ op: value(scalar) }))
}

pub fn regex(path: &str, pattern: String) -> JsonValue {
    field(path, json!({ "$regex": pattern, "$options": "i" }))
}

/// Present values not matching `pattern`
pub fn not_regex(path: &str, pattern: String) -> JsonValue {
    field(
        path,
        json!({ "$ne": null, "$not": { "$regex": pattern, "$options": "i" } }),
    )
}

/// Every value, null and absent included, except full case-insensitive matches
pub fn not_equal_text(path: &str, text: &str) -> JsonValue {
    field(
        path,
        json!({ "$not": { "$regex": pattern(text, Anchor::Full), "$options": "i" } }),
    )
}

pub fn is_null(path: &str) -> JsonValue {
    field(path, JsonValue::Null)
}

pub fn not_null(path: &str) -> JsonValue {
    field(path, json!({ "$exists": true, "$ne": null }))
}

/// `$in`/`$nin` over coerced values
pub fn membership(path: &str, op: &str, scalars: &[Scalar]) -> JsonValue {
    let values: Vec<JsonValue> = scalars.iter().map(value).collect();
    field(path, json!({ op: values }))
}

/// Tri-state boolean set: `false` also stands for null and absent
pub fn boolean_membership(path: &str, op: &str, scalars: &[Scalar]) -> JsonValue {
    let wants = |b: bool| scalars.contains(&Scalar::Bool(b));
    let mut values = Vec::new();
    if wants(true) {
        values.push(JsonValue::Bool(true));
    }
    if wants(false) {
        values.push(JsonValue::Bool(false));
        values.push(JsonValue::Null);
    }
    field(path, json!({ op: values }))
}

pub fn range(path: &str, low: &Scalar, high: &UpperBound) -> JsonValue {
    let mut bounds = Map::new();
    bounds.insert("$gte".to_string(), value(low));
    match high {
        UpperBound::Inclusive(high) => bounds.insert("$lte".to_string(), value(high)),
        UpperBound::Exclusive(high) => bounds.insert("$lt".to_string(), value(high)),
    };
    field(path, JsonValue::Object(bounds))
}

/// `[start, end)` window; the end bound is always exclusive
pub fn window(path: &str, window: &DateWindow) -> JsonValue {
    let mut bounds = Map::new();
    if let Some(start) = window.start {
        bounds.insert("$gte".to_string(), value(&Scalar::Timestamp(start)));
    }
    if let Some(end) = window.end {
        bounds.insert("$lt".to_string(), value(&Scalar::Timestamp(end)));
    }
    field(path, JsonValue::Object(bounds))
}
