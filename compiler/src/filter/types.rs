//! Filter DSL types
//!
//! Backend-agnostic JSON shape built by callers per request.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::operator::Operator;

/// Single field/operator/value predicate
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: JsonValue,
    /// Evaluate against this attribute of the schema `field` looks up
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended_key: Option<String>,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<JsonValue>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
            extended_key: None,
        }
    }

    pub fn with_extended_key(mut self, key: impl Into<String>) -> Self {
        self.extended_key = Some(key.into());
        self
    }

    /// Dotted field name used in error messages
    pub fn display_field(&self) -> String {
        match &self.extended_key {
            Some(key) => format!("{}.{}", self.field, key),
            None => self.field.clone(),
        }
    }
}

/// Boolean composition of a filter node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    #[default]
    And,
    Or,
}

/// Recursive AND/OR tree of conditions
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Filter {
    #[serde(rename = "type", default)]
    pub kind: FilterType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<Filter>,
}

impl Filter {
    pub fn and(conditions: Vec<Condition>) -> Self {
        Self {
            kind: FilterType::And,
            conditions,
            filters: Vec::new(),
        }
    }

    pub fn or(conditions: Vec<Condition>) -> Self {
        Self {
            kind: FilterType::Or,
            conditions,
            filters: Vec::new(),
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// No conditions and no nested filters
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.filters.is_empty()
    }

    /// Total number of conditions in the tree
    pub fn condition_count(&self) -> usize {
        self.conditions.len()
            + self
                .filters
                .iter()
                .map(Filter::condition_count)
                .sum::<usize>()
    }

    /// Nesting depth; a flat filter has depth 1
    pub fn depth(&self) -> usize {
        1 + self.filters.iter().map(Filter::depth).max().unwrap_or(0)
    }
}
