//! Condition input handed to adapters
//!
//! Value coercion is shared: adapters receive already-typed scalars and
//! resolved date windows, and only decide the predicate shape.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Number, Value as JsonValue};

use super::error::FilterError;
use super::operator::Operator;
use crate::dates::{DateContext, DateWindow};
use crate::schema::{Attribute, DateFormat, Discriminant, ReferenceKind};
use crate::utils::time::{is_plain_date, local_midnight, parse_day, parse_instant};

/// Address of the value a condition reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    /// Table name or relation alias; `None` for bare fields
    pub qualifier: Option<String>,
    pub name: String,
}

impl FieldRef {
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            qualifier: None,
            name: name.into(),
        }
    }

    pub fn qualified(qualifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            qualifier: Some(qualifier.into()),
            name: name.into(),
        }
    }

    /// Dotted path (`alias.name`)
    pub fn path(&self) -> String {
        match &self.qualifier {
            Some(qualifier) => format!("{}.{}", qualifier, self.name),
            None => self.name.clone(),
        }
    }
}

/// Condition value coerced to the attribute's native representation
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Text(String),
    Number(Number),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    /// Calendar date of a date-only attribute
    Date(NaiveDate),
    /// Lowercase 24-character hex object id
    ObjectId(String),
}

/// Upper bound of a `between` range
#[derive(Debug, Clone, PartialEq)]
pub enum UpperBound {
    Inclusive(Scalar),
    /// Plain-date upper bound on a datetime attribute: start of the next day
    Exclusive(Scalar),
}

/// Everything an adapter needs to build one predicate
#[derive(Debug, Clone)]
pub struct ConditionInput<'a> {
    pub field: FieldRef,
    /// Field name as written in the condition, for error messages
    pub display: String,
    pub attribute: &'a Attribute,
    pub value: &'a JsonValue,
    pub operator: &'a Operator,
    /// Date context adjusted for the attribute's date format
    pub dates: DateContext,
}

impl ConditionInput<'_> {
    fn invalid(&self, reason: impl Into<String>) -> FilterError {
        FilterError::invalid_value(self.operator.key(), reason)
    }

    /// Single value coerced to the attribute type
    pub fn scalar(&self) -> Result<Scalar, FilterError> {
        self.coerce(self.value)
    }

    /// Non-empty array of values coerced to the attribute type
    pub fn scalars(&self) -> Result<Vec<Scalar>, FilterError> {
        match self.value {
            JsonValue::Array(values) if !values.is_empty() => {
                values.iter().map(|value| self.coerce(value)).collect()
            }
            _ => Err(self.invalid("expected a non-empty array")),
        }
    }

    /// Pattern text for like/begins-with/ends-with
    pub fn text(&self) -> Result<String, FilterError> {
        match self.value {
            JsonValue::String(s) => Ok(s.clone()),
            JsonValue::Number(n) => Ok(n.to_string()),
            other => Err(self.invalid(format!("expected a string, got {}", other))),
        }
    }

    /// `[low, high]` bounds of a `between` condition
    pub fn range(&self) -> Result<(Scalar, UpperBound), FilterError> {
        let (low, high) = match self.value {
            JsonValue::Array(values) if values.len() == 2 => (&values[0], &values[1]),
            _ => return Err(self.invalid("expected an array of two bounds")),
        };
        let low = self.coerce(low)?;
        let high = match (self.attribute.date_format(), high) {
            (Some(DateFormat::Datetime), JsonValue::String(s)) if is_plain_date(s) => {
                let day = parse_day(s, self.dates.tz)
                    .and_then(|day| day.succ_opt())
                    .ok_or_else(|| self.invalid(format!("'{}' is not a valid date", s)))?;
                let next = local_midnight(self.dates.tz, day)
                    .ok_or_else(|| self.invalid("date out of range"))?;
                UpperBound::Exclusive(Scalar::Timestamp(next))
            }
            _ => UpperBound::Inclusive(self.coerce(high)?),
        };
        Ok((low, high))
    }

    /// Date window of a relative-date operator
    pub fn window(&self) -> Result<DateWindow, FilterError> {
        self.dates.window(self.operator, self.value)
    }

    /// Whether the attribute stores calendar dates rather than instants
    pub fn is_date_only(&self) -> bool {
        self.attribute.date_format() == Some(DateFormat::Date)
    }

    fn coerce(&self, value: &JsonValue) -> Result<Scalar, FilterError> {
        match self.attribute {
            Attribute::String => self.coerce_text(value),
            Attribute::Number | Attribute::Money => self.coerce_number(value),
            Attribute::Boolean => self.coerce_bool(value),
            Attribute::Date { format } => self.coerce_date(*format, value),
            Attribute::Choice { .. } | Attribute::Choices { .. } => {
                match self.attribute.discriminant() {
                    Some(Discriminant::Number) => self.coerce_number(value),
                    _ => self.coerce_text(value),
                }
            }
            Attribute::Lookup { reference, .. } | Attribute::Id { reference } => {
                self.coerce_reference(*reference, value)
            }
        }
    }

    fn coerce_text(&self, value: &JsonValue) -> Result<Scalar, FilterError> {
        match value {
            JsonValue::String(s) => Ok(Scalar::Text(s.clone())),
            JsonValue::Number(n) => Ok(Scalar::Text(n.to_string())),
            JsonValue::Bool(b) => Ok(Scalar::Text(b.to_string())),
            other => Err(self.invalid(format!("expected a string, got {}", other))),
        }
    }

    fn coerce_number(&self, value: &JsonValue) -> Result<Scalar, FilterError> {
        match value {
            JsonValue::Number(n) => Ok(Scalar::Number(n.clone())),
            JsonValue::String(s) => parse_number(s)
                .map(Scalar::Number)
                .ok_or_else(|| self.invalid(format!("'{}' is not a number", s))),
            other => Err(self.invalid(format!("expected a number, got {}", other))),
        }
    }

    fn coerce_bool(&self, value: &JsonValue) -> Result<Scalar, FilterError> {
        let parsed = match value {
            JsonValue::Bool(b) => Some(*b),
            JsonValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            JsonValue::Number(n) => match n.as_i64() {
                Some(1) => Some(true),
                Some(0) => Some(false),
                _ => None,
            },
            _ => None,
        };
        parsed
            .map(Scalar::Bool)
            .ok_or_else(|| self.invalid(format!("expected a boolean, got {}", value)))
    }

    fn coerce_date(&self, format: DateFormat, value: &JsonValue) -> Result<Scalar, FilterError> {
        let text = value
            .as_str()
            .ok_or_else(|| self.invalid(format!("expected a date string, got {}", value)))?;
        let invalid = || self.invalid(format!("'{}' is not a valid date", text));
        match format {
            DateFormat::Date => parse_day(text, self.dates.tz)
                .map(Scalar::Date)
                .ok_or_else(invalid),
            DateFormat::Datetime => parse_instant(text, self.dates.tz)
                .map(Scalar::Timestamp)
                .ok_or_else(invalid),
        }
    }

    fn coerce_reference(
        &self,
        reference: ReferenceKind,
        value: &JsonValue,
    ) -> Result<Scalar, FilterError> {
        let value = reference_value(value)
            .ok_or_else(|| self.invalid(format!("expected a reference, got {}", value)))?;
        match reference {
            ReferenceKind::ObjectId => {
                let hex = value
                    .as_str()
                    .filter(|s| is_object_id(s))
                    .ok_or_else(|| self.invalid(format!("{} is not a valid object id", value)))?;
                Ok(Scalar::ObjectId(hex.to_ascii_lowercase()))
            }
            ReferenceKind::String => self.coerce_text(value),
            ReferenceKind::Number => self.coerce_number(value),
        }
    }
}

/// Unwrap `{id}`, `{_id}` or `{$oid}` reference objects
fn reference_value(value: &JsonValue) -> Option<&JsonValue> {
    match value {
        JsonValue::Object(map) => ["id", "_id", "$oid"]
            .iter()
            .find_map(|key| map.get(*key))
            .and_then(reference_value),
        JsonValue::Null | JsonValue::Array(_) => None,
        scalar => Some(scalar),
    }
}

fn is_object_id(s: &str) -> bool {
    s.len() == 24 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

fn parse_number(s: &str) -> Option<Number> {
    let s = s.trim();
    if let Ok(n) = s.parse::<i64>() {
        return Some(Number::from(n));
    }
    s.parse::<f64>().ok().and_then(Number::from_f64)
}
