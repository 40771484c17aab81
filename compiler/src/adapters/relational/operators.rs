//! Where-clause builders

use chrono::{DateTime, Days, TimeDelta, Utc};

use super::clause::{Column, CompareOp, LikeOp, SqlValue, WhereClause};
use crate::dates::DateWindow;
use crate::filter::{FilterError, Operator, Scalar, UpperBound};
use crate::utils::sql::escape_like_pattern;
use crate::utils::time::ceil_to_date;

/// Positional anchoring of a LIKE pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Anywhere,
    Start,
    End,
    Full,
}

pub fn like_pattern(text: &str, anchor: Anchor) -> String {
    let escaped = escape_like_pattern(text);
    match anchor {
        Anchor::Anywhere => format!("%{}%", escaped),
        Anchor::Start => format!("{}%", escaped),
        Anchor::End => format!("%{}", escaped),
        Anchor::Full => escaped,
    }
}

pub fn like(column: &Column, op: LikeOp, pattern: String, negated: bool) -> WhereClause {
    WhereClause::Like {
        column: column.clone(),
        op,
        pattern,
        negated,
    }
}

pub fn sql_value(scalar: &Scalar) -> SqlValue {
    match scalar {
        Scalar::Text(s) | Scalar::ObjectId(s) => SqlValue::Text(s.clone()),
        Scalar::Number(n) => n
            .as_i64()
            .map(SqlValue::Integer)
            .or_else(|| n.as_f64().map(SqlValue::Float))
            .unwrap_or_else(|| SqlValue::Text(n.to_string())),
        Scalar::Bool(b) => SqlValue::Bool(*b),
        Scalar::Timestamp(instant) => SqlValue::Timestamp(*instant),
        Scalar::Date(day) => SqlValue::Date(*day),
    }
}

pub fn membership(column: &Column, scalars: &[Scalar], negated: bool) -> WhereClause {
    WhereClause::In {
        column: column.clone(),
        values: scalars.iter().map(sql_value).collect(),
        negated,
    }
}

/// Tri-state boolean membership: `false` also stands for NULL
pub fn boolean_membership(column: &Column, scalars: &[Scalar], negated: bool) -> WhereClause {
    let mut values = Vec::new();
    for b in [true, false] {
        if scalars.contains(&Scalar::Bool(b)) {
            values.push(SqlValue::Bool(b));
        }
    }
    let covers_null = values.contains(&SqlValue::Bool(false));
    let set = WhereClause::In {
        column: column.clone(),
        values,
        negated,
    };
    match (negated, covers_null) {
        (false, true) => set.or_null(column),
        (false, false) => set,
        (true, true) => WhereClause::And(vec![set, WhereClause::is_not_null(column)]),
        (true, false) => set.or_null(column),
    }
}

/// Any element of a multi-valued column is in the set
pub fn contains_any(column: &Column, scalars: &[Scalar]) -> WhereClause {
    let mut clauses: Vec<WhereClause> = scalars
        .iter()
        .map(|scalar| WhereClause::ArrayContains {
            column: column.clone(),
            value: sql_value(scalar),
        })
        .collect();
    if clauses.len() == 1 {
        clauses.remove(0)
    } else {
        WhereClause::Or(clauses)
    }
}

pub fn range(column: &Column, low: &Scalar, high: &UpperBound) -> WhereClause {
    match high {
        UpperBound::Inclusive(high) => WhereClause::Between {
            column: column.clone(),
            low: sql_value(low),
            high: sql_value(high),
        },
        UpperBound::Exclusive(high) => WhereClause::And(vec![
            WhereClause::compare(column, CompareOp::Gte, sql_value(low)),
            WhereClause::compare(column, CompareOp::Lt, sql_value(high)),
        ]),
    }
}

/// Bound value in the column's representation; date-only columns compare on dates
fn bound(
    operator: &Operator,
    instant: DateTime<Utc>,
    date_only: bool,
) -> Result<SqlValue, FilterError> {
    if date_only {
        ceil_to_date(instant)
            .map(SqlValue::Date)
            .ok_or_else(|| FilterError::invalid_value(operator.key(), "date out of range"))
    } else {
        Ok(SqlValue::Timestamp(instant))
    }
}

/// Last value still inside a window ending (exclusively) at `end`
fn inclusive_end(
    operator: &Operator,
    end: DateTime<Utc>,
    date_only: bool,
) -> Result<SqlValue, FilterError> {
    let out_of_range = || FilterError::invalid_value(operator.key(), "date out of range");
    if date_only {
        ceil_to_date(end)
            .and_then(|day| day.checked_sub_days(Days::new(1)))
            .map(SqlValue::Date)
            .ok_or_else(out_of_range)
    } else {
        end.checked_sub_signed(TimeDelta::milliseconds(1))
            .map(SqlValue::Timestamp)
            .ok_or_else(out_of_range)
    }
}

/// `[start, end)` as `>= start AND < end`
pub fn window(
    operator: &Operator,
    column: &Column,
    window: &DateWindow,
    date_only: bool,
) -> Result<WhereClause, FilterError> {
    let mut clauses = Vec::new();
    if let Some(start) = window.start {
        clauses.push(WhereClause::compare(
            column,
            CompareOp::Gte,
            bound(operator, start, date_only)?,
        ));
    }
    if let Some(end) = window.end {
        clauses.push(WhereClause::compare(
            column,
            CompareOp::Lt,
            bound(operator, end, date_only)?,
        ));
    }
    Ok(if clauses.len() == 1 {
        clauses.remove(0)
    } else {
        WhereClause::And(clauses)
    })
}

/// `on`: inclusive `BETWEEN start AND end - 1ms` (previous whole day for dates)
pub fn on_day(
    operator: &Operator,
    column: &Column,
    window: &DateWindow,
    date_only: bool,
) -> Result<WhereClause, FilterError> {
    match (window.start, window.end) {
        (Some(start), Some(end)) => Ok(WhereClause::Between {
            column: column.clone(),
            low: bound(operator, start, date_only)?,
            high: inclusive_end(operator, end, date_only)?,
        }),
        _ => Err(FilterError::invalid_value(operator.key(), "expected a bounded day")),
    }
}

/// `on-or-before`: inclusive `<= end - 1ms`
pub fn through_day(
    operator: &Operator,
    column: &Column,
    window: &DateWindow,
    date_only: bool,
) -> Result<WhereClause, FilterError> {
    let end = window
        .end
        .ok_or_else(|| FilterError::invalid_value(operator.key(), "expected an end bound"))?;
    Ok(WhereClause::compare(
        column,
        CompareOp::Lte,
        inclusive_end(operator, end, date_only)?,
    ))
}
