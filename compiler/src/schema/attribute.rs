//! Attribute metadata
//!
//! Immutable per-field description used to pick operator semantics and
//! coerce condition values into the storage representation.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Storage format of a date attribute
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DateFormat {
    /// Calendar date stored at UTC midnight
    Date,
    /// Full instant
    #[default]
    Datetime,
}

/// How a reference (id or lookup) is stored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReferenceKind {
    /// 24-character hex object id
    #[default]
    ObjectId,
    String,
    Number,
}

/// Value type shared by all options of a choice attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discriminant {
    String,
    Number,
}

/// One selectable option of a choice/choices attribute
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ChoiceOption {
    pub value: JsonValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Field metadata
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Attribute {
    String,
    Number,
    Money,
    Boolean,
    Date {
        #[serde(default)]
        format: DateFormat,
    },
    Choice {
        #[serde(default)]
        options: Vec<ChoiceOption>,
    },
    Choices {
        #[serde(default)]
        options: Vec<ChoiceOption>,
    },
    Lookup {
        target: String,
        #[serde(default)]
        reference: ReferenceKind,
    },
    Id {
        #[serde(default)]
        reference: ReferenceKind,
    },
}

impl Attribute {
    pub fn date() -> Self {
        Self::Date {
            format: DateFormat::Date,
        }
    }

    pub fn datetime() -> Self {
        Self::Date {
            format: DateFormat::Datetime,
        }
    }

    pub fn lookup(target: impl Into<String>, reference: ReferenceKind) -> Self {
        Self::Lookup {
            target: target.into(),
            reference,
        }
    }

    pub fn choice<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<JsonValue>,
    {
        Self::Choice {
            options: options_from(values),
        }
    }

    pub fn choices<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<JsonValue>,
    {
        Self::Choices {
            options: options_from(values),
        }
    }

    /// Type name as written in schema documents
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Money => "money",
            Self::Boolean => "boolean",
            Self::Date { .. } => "date",
            Self::Choice { .. } => "choice",
            Self::Choices { .. } => "choices",
            Self::Lookup { .. } => "lookup",
            Self::Id { .. } => "id",
        }
    }

    pub fn date_format(&self) -> Option<DateFormat> {
        match self {
            Self::Date { format } => Some(*format),
            _ => None,
        }
    }

    /// Discriminant of choice options; string when no numeric options are declared
    pub fn discriminant(&self) -> Option<Discriminant> {
        match self {
            Self::Choice { options } | Self::Choices { options } => {
                if !options.is_empty() && options.iter().all(|o| o.value.is_number()) {
                    Some(Discriminant::Number)
                } else {
                    Some(Discriminant::String)
                }
            }
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Number | Self::Money)
    }
}

fn options_from<I, V>(values: I) -> Vec<ChoiceOption>
where
    I: IntoIterator<Item = V>,
    V: Into<JsonValue>,
{
    values
        .into_iter()
        .map(|v| ChoiceOption {
            value: v.into(),
            label: None,
        })
        .collect()
}
