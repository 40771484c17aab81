//! Operator keys
//!
//! The operator set is closed. Keys that are not recognised deserialize into
//! [`Operator::Ignored`] so the compiler can drop them explicitly instead of
//! falling through a default branch.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::{Attribute, Discriminant};

/// Time unit of rolling date operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Hours,
    Days,
    Weeks,
    Months,
    Years,
}

impl TimeUnit {
    pub const ALL: [TimeUnit; 5] = [
        TimeUnit::Hours,
        TimeUnit::Days,
        TimeUnit::Weeks,
        TimeUnit::Months,
        TimeUnit::Years,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Hours => "hours",
            TimeUnit::Days => "days",
            TimeUnit::Weeks => "weeks",
            TimeUnit::Months => "months",
            TimeUnit::Years => "years",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|u| u.as_str() == s)
    }
}

/// Operator family, used for listings and compatibility checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorGroup {
    Comparison,
    Pattern,
    Equality,
    Null,
    Membership,
    Range,
    AbsoluteDay,
    Calendar,
    Rolling,
    Ignored,
}

impl OperatorGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperatorGroup::Comparison => "comparison",
            OperatorGroup::Pattern => "pattern",
            OperatorGroup::Equality => "equality",
            OperatorGroup::Null => "null",
            OperatorGroup::Membership => "membership",
            OperatorGroup::Range => "range",
            OperatorGroup::AbsoluteDay => "absolute-day",
            OperatorGroup::Calendar => "calendar",
            OperatorGroup::Rolling => "rolling",
            OperatorGroup::Ignored => "ignored",
        }
    }
}

/// Result of checking an operator against an attribute type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compatibility {
    Allowed,
    /// Condition contributes nothing (compiles to `None`)
    Degrade,
    Rejected,
}

/// Condition operator
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
    NotLike,
    BeginsWith,
    EndsWith,
    NotBeginWith,
    NotEndWith,
    Eq,
    Ne,
    Null,
    NotNull,
    In,
    NotIn,
    Between,
    On,
    OnOrAfter,
    OnOrBefore,
    Today,
    Yesterday,
    Tomorrow,
    ThisWeek,
    ThisMonth,
    ThisYear,
    ThisFiscalYear,
    NextWeek,
    NextMonth,
    NextYear,
    NextFiscalYear,
    LastWeek,
    LastMonth,
    LastYear,
    LastFiscalYear,
    NextSevenDays,
    LastSevenDays,
    InFiscalYear,
    NextX(TimeUnit),
    LastX(TimeUnit),
    OlderThanX(TimeUnit),
    /// Unrecognised key, compiled to nothing
    Ignored(String),
}

const FIXED_KEYS: &[&str] = &[
    "lt",
    "lte",
    "gt",
    "gte",
    "like",
    "not-like",
    "begins-with",
    "ends-with",
    "not-begin-with",
    "not-end-with",
    "eq",
    "ne",
    "null",
    "not-null",
    "in",
    "not-in",
    "between",
    "on",
    "on-or-after",
    "on-or-before",
    "today",
    "yesterday",
    "tomorrow",
    "this-week",
    "this-month",
    "this-year",
    "this-fiscal-year",
    "next-week",
    "next-month",
    "next-year",
    "next-fiscal-year",
    "last-week",
    "last-month",
    "last-year",
    "last-fiscal-year",
    "next-seven-days",
    "last-seven-days",
    "in-fiscal-year",
];

impl Operator {
    /// Parse an operator key; unknown keys become [`Operator::Ignored`]
    pub fn parse(key: &str) -> Self {
        match key {
            "lt" => Self::Lt,
            "lte" => Self::Lte,
            "gt" => Self::Gt,
            "gte" => Self::Gte,
            "like" => Self::Like,
            "not-like" => Self::NotLike,
            "begins-with" => Self::BeginsWith,
            "ends-with" => Self::EndsWith,
            "not-begin-with" => Self::NotBeginWith,
            "not-end-with" => Self::NotEndWith,
            "eq" => Self::Eq,
            "ne" => Self::Ne,
            "null" => Self::Null,
            "not-null" => Self::NotNull,
            "in" => Self::In,
            "not-in" => Self::NotIn,
            "between" => Self::Between,
            "on" => Self::On,
            "on-or-after" => Self::OnOrAfter,
            "on-or-before" => Self::OnOrBefore,
            "today" => Self::Today,
            "yesterday" => Self::Yesterday,
            "tomorrow" => Self::Tomorrow,
            "this-week" => Self::ThisWeek,
            "this-month" => Self::ThisMonth,
            "this-year" => Self::ThisYear,
            "this-fiscal-year" => Self::ThisFiscalYear,
            "next-week" => Self::NextWeek,
            "next-month" => Self::NextMonth,
            "next-year" => Self::NextYear,
            "next-fiscal-year" => Self::NextFiscalYear,
            "last-week" => Self::LastWeek,
            "last-month" => Self::LastMonth,
            "last-year" => Self::LastYear,
            "last-fiscal-year" => Self::LastFiscalYear,
            "next-seven-days" => Self::NextSevenDays,
            "last-seven-days" => Self::LastSevenDays,
            "in-fiscal-year" => Self::InFiscalYear,
            other => Self::parse_rolling(other).unwrap_or_else(|| Self::Ignored(other.to_string())),
        }
    }

    fn parse_rolling(key: &str) -> Option<Self> {
        if let Some(unit) = key.strip_prefix("next-x-") {
            return TimeUnit::parse(unit).map(Self::NextX);
        }
        if let Some(unit) = key.strip_prefix("last-x-") {
            return TimeUnit::parse(unit).map(Self::LastX);
        }
        if let Some(unit) = key.strip_prefix("olderthan-x-") {
            return TimeUnit::parse(unit).map(Self::OlderThanX);
        }
        None
    }

    /// Every recognised operator, in declaration order
    pub fn known() -> Vec<Operator> {
        let mut operators: Vec<Operator> = FIXED_KEYS.iter().map(|k| Self::parse(k)).collect();
        let rolling: [fn(TimeUnit) -> Operator; 3] = [Self::NextX, Self::LastX, Self::OlderThanX];
        for make in rolling {
            operators.extend(TimeUnit::ALL.into_iter().map(make));
        }
        operators
    }

    /// Wire key of the operator
    pub fn key(&self) -> String {
        match self {
            Self::NextX(unit) => format!("next-x-{}", unit.as_str()),
            Self::LastX(unit) => format!("last-x-{}", unit.as_str()),
            Self::OlderThanX(unit) => format!("olderthan-x-{}", unit.as_str()),
            Self::Ignored(key) => key.clone(),
            fixed => fixed.fixed_key().to_string(),
        }
    }

    fn fixed_key(&self) -> &'static str {
        match self {
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Like => "like",
            Self::NotLike => "not-like",
            Self::BeginsWith => "begins-with",
            Self::EndsWith => "ends-with",
            Self::NotBeginWith => "not-begin-with",
            Self::NotEndWith => "not-end-with",
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Null => "null",
            Self::NotNull => "not-null",
            Self::In => "in",
            Self::NotIn => "not-in",
            Self::Between => "between",
            Self::On => "on",
            Self::OnOrAfter => "on-or-after",
            Self::OnOrBefore => "on-or-before",
            Self::Today => "today",
            Self::Yesterday => "yesterday",
            Self::Tomorrow => "tomorrow",
            Self::ThisWeek => "this-week",
            Self::ThisMonth => "this-month",
            Self::ThisYear => "this-year",
            Self::ThisFiscalYear => "this-fiscal-year",
            Self::NextWeek => "next-week",
            Self::NextMonth => "next-month",
            Self::NextYear => "next-year",
            Self::NextFiscalYear => "next-fiscal-year",
            Self::LastWeek => "last-week",
            Self::LastMonth => "last-month",
            Self::LastYear => "last-year",
            Self::LastFiscalYear => "last-fiscal-year",
            Self::NextSevenDays => "next-seven-days",
            Self::LastSevenDays => "last-seven-days",
            Self::InFiscalYear => "in-fiscal-year",
            Self::NextX(_) | Self::LastX(_) | Self::OlderThanX(_) | Self::Ignored(_) => "",
        }
    }

    pub fn group(&self) -> OperatorGroup {
        match self {
            Self::Lt | Self::Lte | Self::Gt | Self::Gte => OperatorGroup::Comparison,
            Self::Like
            | Self::NotLike
            | Self::BeginsWith
            | Self::EndsWith
            | Self::NotBeginWith
            | Self::NotEndWith => OperatorGroup::Pattern,
            Self::Eq | Self::Ne => OperatorGroup::Equality,
            Self::Null | Self::NotNull => OperatorGroup::Null,
            Self::In | Self::NotIn => OperatorGroup::Membership,
            Self::Between => OperatorGroup::Range,
            Self::On | Self::OnOrAfter | Self::OnOrBefore => OperatorGroup::AbsoluteDay,
            Self::Today
            | Self::Yesterday
            | Self::Tomorrow
            | Self::ThisWeek
            | Self::ThisMonth
            | Self::ThisYear
            | Self::ThisFiscalYear
            | Self::NextWeek
            | Self::NextMonth
            | Self::NextYear
            | Self::NextFiscalYear
            | Self::LastWeek
            | Self::LastMonth
            | Self::LastYear
            | Self::LastFiscalYear
            | Self::NextSevenDays
            | Self::LastSevenDays
            | Self::InFiscalYear => OperatorGroup::Calendar,
            Self::NextX(_) | Self::LastX(_) | Self::OlderThanX(_) => OperatorGroup::Rolling,
            Self::Ignored(_) => OperatorGroup::Ignored,
        }
    }

    /// Whether the operator requires an array value
    pub fn requires_array(&self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }

    /// Check whether the operator can be applied to an attribute
    pub fn compatibility(&self, attribute: &Attribute) -> Compatibility {
        let allowed = match self.group() {
            OperatorGroup::Comparison => {
                attribute.is_numeric() || matches!(attribute, Attribute::Date { .. })
            }
            OperatorGroup::Pattern => {
                matches!(attribute, Attribute::String)
                    || (matches!(attribute, Attribute::Choice { .. })
                        && attribute.discriminant() == Some(Discriminant::String))
            }
            OperatorGroup::Equality | OperatorGroup::Null | OperatorGroup::Ignored => true,
            OperatorGroup::Membership => !matches!(attribute, Attribute::Date { .. }),
            OperatorGroup::Range => {
                return if attribute.is_numeric() || matches!(attribute, Attribute::Date { .. }) {
                    Compatibility::Allowed
                } else {
                    Compatibility::Degrade
                };
            }
            OperatorGroup::AbsoluteDay | OperatorGroup::Calendar | OperatorGroup::Rolling => {
                matches!(attribute, Attribute::Date { .. })
            }
        };
        if allowed {
            Compatibility::Allowed
        } else {
            Compatibility::Rejected
        }
    }
}

impl From<String> for Operator {
    fn from(key: String) -> Self {
        Self::parse(&key)
    }
}

impl From<Operator> for String {
    fn from(operator: Operator) -> Self {
        operator.key()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}
