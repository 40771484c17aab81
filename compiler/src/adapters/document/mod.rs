//! Document-store adapter
//!
//! Emits `$match` fragments as `serde_json::Value`. Dates and object ids use
//! Extended JSON (`{"$date": ...}`, `{"$oid": ...}`). Lookup dereferences read
//! from the `@expand.<field>` alias the caller's join stage populates.

mod operators;

use serde_json::Value as JsonValue;

use super::Adapter;
use crate::core::constants::DOCUMENT_EXPAND_PREFIX;
use crate::filter::{ConditionInput, FilterError, FilterType, Operator};
use crate::schema::{Attribute, Schema};
use operators::Anchor;

/// Adapter producing document-store match fragments
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentAdapter;

impl DocumentAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Adapter for DocumentAdapter {
    type Predicate = JsonValue;
    type Session = ();

    fn name(&self) -> &'static str {
        "document"
    }

    fn session(&self) -> Self::Session {}

    fn qualifier(&self, _schema: &Schema) -> Option<String> {
        None
    }

    fn relation_alias(&self, _schema: &Schema, field: &str, _target: &Schema) -> String {
        format!("{}.{}", DOCUMENT_EXPAND_PREFIX, field)
    }

    fn transform(
        &self,
        _session: &Self::Session,
        operator: &Operator,
        input: &ConditionInput<'_>,
    ) -> Result<Option<JsonValue>, FilterError> {
        let path = input.field.path();
        let path = path.as_str();
        let predicate = match operator {
            Operator::Lt => operators::compare(path, "$lt", &input.scalar()?),
            Operator::Lte => operators::compare(path, "$lte", &input.scalar()?),
            Operator::Gt => operators::compare(path, "$gt", &input.scalar()?),
            Operator::Gte => operators::compare(path, "$gte", &input.scalar()?),

            Operator::Like => {
                operators::regex(path, operators::pattern(&input.text()?, Anchor::Anywhere))
            }
            Operator::BeginsWith => {
                operators::regex(path, operators::pattern(&input.text()?, Anchor::Start))
            }
            Operator::EndsWith => {
                operators::regex(path, operators::pattern(&input.text()?, Anchor::End))
            }
            Operator::NotLike => {
                operators::not_regex(path, operators::pattern(&input.text()?, Anchor::Anywhere))
            }
            Operator::NotBeginWith => {
                operators::not_regex(path, operators::pattern(&input.text()?, Anchor::Start))
            }
            Operator::NotEndWith => {
                operators::not_regex(path, operators::pattern(&input.text()?, Anchor::End))
            }

            Operator::Eq => match input.attribute {
                Attribute::String => {
                    operators::regex(path, operators::pattern(&input.text()?, Anchor::Full))
                }
                // `$eq` on an array field matches any element
                _ => operators::compare(path, "$eq", &input.scalar()?),
            },
            Operator::Ne => match input.attribute {
                Attribute::String => operators::not_equal_text(path, &input.text()?),
                _ => operators::compare(path, "$ne", &input.scalar()?),
            },

            Operator::Null => operators::is_null(path),
            Operator::NotNull => operators::not_null(path),

            Operator::In => match input.attribute {
                Attribute::Boolean => operators::boolean_membership(path, "$in", &input.scalars()?),
                _ => operators::membership(path, "$in", &input.scalars()?),
            },
            Operator::NotIn => match input.attribute {
                Attribute::Boolean => {
                    operators::boolean_membership(path, "$nin", &input.scalars()?)
                }
                _ => operators::membership(path, "$nin", &input.scalars()?),
            },

            Operator::Between => {
                let (low, high) = input.range()?;
                operators::range(path, &low, &high)
            }

            Operator::On
            | Operator::OnOrAfter
            | Operator::OnOrBefore
            | Operator::Today
            | Operator::Yesterday
            | Operator::Tomorrow
            | Operator::ThisWeek
            | Operator::ThisMonth
            | Operator::ThisYear
            | Operator::ThisFiscalYear
            | Operator::NextWeek
            | Operator::NextMonth
            | Operator::NextYear
            | Operator::NextFiscalYear
            | Operator::LastWeek
            | Operator::LastMonth
            | Operator::LastYear
            | Operator::LastFiscalYear
            | Operator::NextSevenDays
            | Operator::LastSevenDays
            | Operator::InFiscalYear
            | Operator::NextX(_)
            | Operator::LastX(_)
            | Operator::OlderThanX(_) => operators::window(path, &input.window()?),

            Operator::Ignored(_) => return Ok(None),
        };
        Ok(Some(predicate))
    }

    fn combine(&self, kind: FilterType, mut predicates: Vec<JsonValue>) -> Option<JsonValue> {
        match predicates.len() {
            0 => None,
            1 => predicates.pop(),
            _ => {
                let key = match kind {
                    FilterType::And => "$and",
                    FilterType::Or => "$or",
                };
                Some(serde_json::json!({ key: predicates }))
            }
        }
    }
}
