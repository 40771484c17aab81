//! Reference evaluators for both predicate shapes
//!
//! Small interpreters used to check that the document and relational
//! predicates of one filter select the same records.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use regex::RegexBuilder;
use rustc_hash::FxHashMap;
use serde_json::Value as JsonValue;

use super::relational::{Column, CompareOp, LikeOp, SqlValue, WhereClause};
use crate::core::constants::LIKE_ESCAPE_CHAR;

// === Document matcher ===

/// Whether `doc` satisfies a `$match` fragment
pub fn matches_document(doc: &JsonValue, predicate: &JsonValue) -> bool {
    let Some(map) = predicate.as_object() else {
        panic!("predicate must be an object: {}", predicate);
    };
    map.iter().all(|(key, condition)| match key.as_str() {
        "$and" => array(condition).iter().all(|p| matches_document(doc, p)),
        "$or" => array(condition).iter().any(|p| matches_document(doc, p)),
        path => matches_field(resolve(doc, path), condition),
    })
}

fn array(value: &JsonValue) -> &Vec<JsonValue> {
    value
        .as_array()
        .unwrap_or_else(|| panic!("expected an array: {}", value))
}

fn resolve<'a>(doc: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    path.split('.')
        .try_fold(doc, |current, segment| current.get(segment))
}

fn is_operator_object(condition: &JsonValue) -> bool {
    match condition.as_object() {
        Some(map) => {
            !map.is_empty()
                && map.keys().all(|k| k.starts_with('$'))
                && !map.contains_key("$date")
                && !map.contains_key("$oid")
        }
        None => false,
    }
}

fn matches_field(value: Option<&JsonValue>, condition: &JsonValue) -> bool {
    if !is_operator_object(condition) {
        return equals(value, condition);
    }
    let Some(ops) = condition.as_object() else {
        return false;
    };
    ops.iter().all(|(op, operand)| match op.as_str() {
        "$eq" => equals(value, operand),
        "$ne" => !equals(value, operand),
        "$gt" => compares(value, operand, |o| o == Ordering::Greater),
        "$gte" => compares(value, operand, |o| o != Ordering::Less),
        "$lt" => compares(value, operand, |o| o == Ordering::Less),
        "$lte" => compares(value, operand, |o| o != Ordering::Greater),
        "$in" => array(operand).iter().any(|v| equals(value, v)),
        "$nin" => !array(operand).iter().any(|v| equals(value, v)),
        "$exists" => value.is_some() == operand.as_bool().unwrap_or(true),
        "$regex" => regex_matches(value, operand, ops.get("$options")),
        "$options" => true,
        "$not" => !matches_field(value, operand),
        other => panic!("unsupported operator {}", other),
    })
}

/// Query equality: null matches missing, arrays match on any element
fn equals(value: Option<&JsonValue>, expected: &JsonValue) -> bool {
    match value {
        None | Some(JsonValue::Null) => expected.is_null(),
        Some(whole @ JsonValue::Array(items)) => {
            items.iter().any(|item| same_value(item, expected)) || whole == expected
        }
        Some(actual) => same_value(actual, expected),
    }
}

/// Numbers compare by value regardless of integer/float representation
fn same_value(left: &JsonValue, right: &JsonValue) -> bool {
    match (left, right) {
        (JsonValue::Number(a), JsonValue::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

#[derive(Debug, PartialEq)]
enum SortKey {
    Number(f64),
    Text(String),
    Date(DateTime<Utc>),
    Bool(bool),
}

fn sort_key(value: &JsonValue) -> Option<SortKey> {
    match value {
        JsonValue::Number(n) => n.as_f64().map(SortKey::Number),
        JsonValue::String(s) => Some(SortKey::Text(s.clone())),
        JsonValue::Bool(b) => Some(SortKey::Bool(*b)),
        JsonValue::Object(map) => map
            .get("$date")
            .and_then(JsonValue::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| SortKey::Date(dt.with_timezone(&Utc))),
        _ => None,
    }
}

fn same_kind_cmp(left: &SortKey, right: &SortKey) -> Option<Ordering> {
    match (left, right) {
        (SortKey::Number(a), SortKey::Number(b)) => a.partial_cmp(b),
        (SortKey::Text(a), SortKey::Text(b)) => Some(a.cmp(b)),
        (SortKey::Date(a), SortKey::Date(b)) => Some(a.cmp(b)),
        (SortKey::Bool(a), SortKey::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Ordered comparison between values of the same kind only
fn compares(
    value: Option<&JsonValue>,
    operand: &JsonValue,
    accept: impl Fn(Ordering) -> bool,
) -> bool {
    let Some(bound) = sort_key(operand) else {
        return false;
    };
    let check = |v: &JsonValue| {
        sort_key(v)
            .and_then(|key| same_kind_cmp(&key, &bound))
            .is_some_and(&accept)
    };
    match value {
        Some(JsonValue::Array(items)) => items.iter().any(check),
        Some(v) => check(v),
        None => false,
    }
}

fn regex_matches(
    value: Option<&JsonValue>,
    pattern: &JsonValue,
    options: Option<&JsonValue>,
) -> bool {
    let pattern = pattern.as_str().unwrap_or_default();
    let insensitive = options
        .and_then(JsonValue::as_str)
        .is_some_and(|o| o.contains('i'));
    let re = RegexBuilder::new(pattern)
        .case_insensitive(insensitive)
        .build()
        .unwrap_or_else(|e| panic!("bad regex {}: {}", pattern, e));
    let check = |v: &JsonValue| v.as_str().is_some_and(|s| re.is_match(s));
    match value {
        Some(JsonValue::Array(items)) => items.iter().any(check),
        Some(v) => check(v),
        None => false,
    }
}

// === Relational evaluator ===

/// Column value of one joined row
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Value(SqlValue),
    Array(Vec<SqlValue>),
}

/// One row of `base LEFT JOIN relations`, keyed by `table.column`
#[derive(Debug, Clone, Default)]
pub struct SqlRow {
    cells: FxHashMap<String, Cell>,
}

impl SqlRow {
    pub fn set(&mut self, table: &str, column: &str, cell: Cell) {
        self.cells.insert(format!("{}.{}", table, column), cell);
    }

    fn get(&self, column: &Column) -> &Cell {
        let table = column.table.as_deref().unwrap_or_default();
        self.cells
            .get(&format!("{}.{}", table, column.name))
            .unwrap_or(&Cell::Null)
    }

    fn scalar(&self, column: &Column) -> Option<&SqlValue> {
        match self.get(column) {
            Cell::Value(value) => Some(value),
            Cell::Null => None,
            Cell::Array(_) => panic!("array column {} used as scalar", column.name),
        }
    }
}

/// Three-valued evaluation; `None` is SQL NULL (unknown)
pub fn eval_where(row: &SqlRow, clause: &WhereClause) -> Option<bool> {
    match clause {
        WhereClause::Compare { column, op, value } => {
            let ordering = compare_values(row.scalar(column)?, value)?;
            Some(match op {
                CompareOp::Eq => ordering == Ordering::Equal,
                CompareOp::Ne => ordering != Ordering::Equal,
                CompareOp::Lt => ordering == Ordering::Less,
                CompareOp::Lte => ordering != Ordering::Greater,
                CompareOp::Gt => ordering == Ordering::Greater,
                CompareOp::Gte => ordering != Ordering::Less,
            })
        }
        WhereClause::Like {
            column,
            op,
            pattern,
            negated,
        } => {
            let SqlValue::Text(text) = row.scalar(column)? else {
                return None;
            };
            let matched = like_matches(text, pattern, *op == LikeOp::ILike);
            Some(matched != *negated)
        }
        WhereClause::In {
            column,
            values,
            negated,
        } => {
            let actual = row.scalar(column)?;
            let found = values
                .iter()
                .any(|v| compare_values(actual, v) == Some(Ordering::Equal));
            Some(found != *negated)
        }
        WhereClause::Between { column, low, high } => {
            let actual = row.scalar(column)?;
            Some(
                compare_values(actual, low)? != Ordering::Less
                    && compare_values(actual, high)? != Ordering::Greater,
            )
        }
        WhereClause::IsNull { column, negated } => {
            let is_null = matches!(row.get(column), Cell::Null);
            Some(is_null != *negated)
        }
        WhereClause::ArrayContains { column, value } => match row.get(column) {
            Cell::Array(items) => Some(items.contains(value)),
            Cell::Null => None,
            Cell::Value(_) => panic!("scalar column {} used as array", column.name),
        },
        WhereClause::And(clauses) => {
            let results: Vec<Option<bool>> = clauses.iter().map(|c| eval_where(row, c)).collect();
            if results.contains(&Some(false)) {
                Some(false)
            } else if results.contains(&None) {
                None
            } else {
                Some(true)
            }
        }
        WhereClause::Or(clauses) => {
            let results: Vec<Option<bool>> = clauses.iter().map(|c| eval_where(row, c)).collect();
            if results.contains(&Some(true)) {
                Some(true)
            } else if results.contains(&None) {
                None
            } else {
                Some(false)
            }
        }
        WhereClause::Not(inner) => eval_where(row, inner).map(|b| !b),
    }
}

fn midnight(day: NaiveDate) -> Option<DateTime<Utc>> {
    day.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc())
}

fn compare_values(left: &SqlValue, right: &SqlValue) -> Option<Ordering> {
    use SqlValue::*;
    match (left, right) {
        (Text(a), Text(b)) => Some(a.cmp(b)),
        (Integer(a), Integer(b)) => Some(a.cmp(b)),
        (Integer(a), Float(b)) => (*a as f64).partial_cmp(b),
        (Float(a), Integer(b)) => a.partial_cmp(&(*b as f64)),
        (Float(a), Float(b)) => a.partial_cmp(b),
        (Bool(a), Bool(b)) => Some(a.cmp(b)),
        (Timestamp(a), Timestamp(b)) => Some(a.cmp(b)),
        (Date(a), Date(b)) => Some(a.cmp(b)),
        (Date(a), Timestamp(b)) => midnight(*a).map(|a| a.cmp(b)),
        (Timestamp(a), Date(b)) => midnight(*b).map(|b| a.cmp(&b)),
        (a, b) => panic!("incomparable values {:?} and {:?}", a, b),
    }
}

/// LIKE with `%`, `_` and the escape character
fn like_matches(text: &str, pattern: &str, insensitive: bool) -> bool {
    let mut re = String::from("^");
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            c if c == LIKE_ESCAPE_CHAR => {
                if let Some(next) = chars.next() {
                    re.push_str(&regex::escape(&next.to_string()));
                }
            }
            '%' => re.push_str(".*"),
            '_' => re.push('.'),
            c => re.push_str(&regex::escape(&c.to_string())),
        }
    }
    re.push('$');
    RegexBuilder::new(&re)
        .case_insensitive(insensitive)
        .dot_matches_new_line(true)
        .build()
        .is_ok_and(|re| re.is_match(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_null_matches_missing() {
        let doc = json!({ "a": 1 });
        assert!(matches_document(&doc, &json!({ "b": null })));
        assert!(!matches_document(&doc, &json!({ "b": { "$exists": true, "$ne": null } })));
        assert!(matches_document(&doc, &json!({ "b": { "$nin": [1] } })));
    }

    #[test]
    fn test_document_dates_and_arrays() {
        let doc = json!({
            "at": { "$date": "2025-01-15T08:30:00.000Z" },
            "tags": ["a", "b"]
        });
        assert!(matches_document(
            &doc,
            &json!({ "at": { "$gte": { "$date": "2025-01-15T00:00:00.000Z" } } })
        ));
        assert!(matches_document(&doc, &json!({ "tags": { "$eq": "b" } })));
        assert!(!matches_document(&doc, &json!({ "tags": { "$ne": "b" } })));
    }

    #[test]
    fn test_like_matches() {
        assert!(like_matches("100% done", "%0\\%%", false));
        assert!(!like_matches("1000 done", "%0\\%%", false));
        assert!(like_matches("Report", "rep%", true));
        assert!(!like_matches("Report", "rep%", false));
        assert!(like_matches("a_b", "a\\_b", false));
        assert!(!like_matches("axb", "a\\_b", false));
    }

    #[test]
    fn test_three_valued_logic() {
        let row = SqlRow::default();
        let column = Column::new(Some("t".to_string()), "x");
        let eq = WhereClause::compare(&column, CompareOp::Eq, SqlValue::Integer(1));
        assert_eq!(eval_where(&row, &eq), None);
        assert_eq!(eval_where(&row, &eq.clone().not()), None);
        assert_eq!(eval_where(&row, &eq.or_null(&column)), Some(true));
    }
}
