//! Relational adapter
//!
//! Emits [`WhereClause`] trees. The active dialect is read once per compile
//! call to decide between native case-insensitive LIKE and plain LIKE; the
//! tree is then rendered with bound parameters by any [`SqlDialect`].
//!
//! [`SqlDialect`]: crate::sql::SqlDialect

mod clause;
mod operators;

pub use clause::{Column, CompareOp, LikeOp, RenderedSql, SqlParams, SqlValue, WhereClause};

use std::sync::Arc;

use super::Adapter;
use crate::filter::{ConditionInput, FilterError, FilterType, Operator};
use crate::schema::{Attribute, Schema};
use crate::sql::{Backend, DialectSource};
use operators::Anchor;

/// Adapter producing SQL where-clause trees
#[derive(Clone)]
pub struct RelationalAdapter {
    dialect: Arc<dyn DialectSource>,
}

impl RelationalAdapter {
    pub fn new(dialect: Arc<dyn DialectSource>) -> Self {
        Self { dialect }
    }

    /// Adapter pinned to one backend
    pub fn for_backend(backend: Backend) -> Self {
        Self::new(Arc::new(backend))
    }
}

impl std::fmt::Debug for RelationalAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationalAdapter")
            .field("backend", &self.dialect.backend())
            .finish()
    }
}

impl Adapter for RelationalAdapter {
    type Predicate = WhereClause;
    type Session = Backend;

    fn name(&self) -> &'static str {
        "relational"
    }

    fn session(&self) -> Backend {
        self.dialect.backend()
    }

    fn qualifier(&self, schema: &Schema) -> Option<String> {
        Some(schema.logical_name.clone())
    }

    fn relation_alias(&self, _schema: &Schema, field: &str, target: &Schema) -> String {
        format!("{}_{}", field, target.logical_name)
    }

    fn transform(
        &self,
        backend: &Backend,
        operator: &Operator,
        input: &ConditionInput<'_>,
    ) -> Result<Option<WhereClause>, FilterError> {
        let column = Column::new(input.field.qualifier.clone(), input.field.name.clone());
        let column = &column;
        let like_op = match backend.dialect().case_insensitive_like() {
            Some(_) => LikeOp::ILike,
            None => LikeOp::Like,
        };
        let pattern = |anchor: Anchor| -> Result<String, FilterError> {
            Ok(operators::like_pattern(&input.text()?, anchor))
        };
        let compare = |op: CompareOp| -> Result<WhereClause, FilterError> {
            Ok(WhereClause::compare(
                column,
                op,
                operators::sql_value(&input.scalar()?),
            ))
        };
        let date_only = input.is_date_only();

        let clause = match operator {
            Operator::Lt => compare(CompareOp::Lt)?,
            Operator::Lte => compare(CompareOp::Lte)?,
            Operator::Gt => compare(CompareOp::Gt)?,
            Operator::Gte => compare(CompareOp::Gte)?,

            Operator::Like => {
                operators::like(column, like_op, pattern(Anchor::Anywhere)?, false)
            }
            Operator::BeginsWith => {
                operators::like(column, like_op, pattern(Anchor::Start)?, false)
            }
            Operator::EndsWith => operators::like(column, like_op, pattern(Anchor::End)?, false),
            Operator::NotLike => operators::like(column, like_op, pattern(Anchor::Anywhere)?, true),
            Operator::NotBeginWith => {
                operators::like(column, like_op, pattern(Anchor::Start)?, true)
            }
            Operator::NotEndWith => operators::like(column, like_op, pattern(Anchor::End)?, true),

            Operator::Eq => match input.attribute {
                Attribute::String => {
                    operators::like(column, like_op, pattern(Anchor::Full)?, false)
                }
                Attribute::Choices { .. } => WhereClause::ArrayContains {
                    column: column.clone(),
                    value: operators::sql_value(&input.scalar()?),
                },
                _ => compare(CompareOp::Eq)?,
            },
            Operator::Ne => match input.attribute {
                Attribute::String => {
                    operators::like(column, like_op, pattern(Anchor::Full)?, true).or_null(column)
                }
                Attribute::Choices { .. } => WhereClause::ArrayContains {
                    column: column.clone(),
                    value: operators::sql_value(&input.scalar()?),
                }
                .not()
                .or_null(column),
                _ => compare(CompareOp::Ne)?.or_null(column),
            },

            Operator::Null => WhereClause::is_null(column),
            Operator::NotNull => WhereClause::is_not_null(column),

            Operator::In => match input.attribute {
                Attribute::Boolean => {
                    operators::boolean_membership(column, &input.scalars()?, false)
                }
                Attribute::Choices { .. } => operators::contains_any(column, &input.scalars()?),
                _ => operators::membership(column, &input.scalars()?, false),
            },
            Operator::NotIn => match input.attribute {
                Attribute::Boolean => {
                    operators::boolean_membership(column, &input.scalars()?, true)
                }
                Attribute::Choices { .. } => operators::contains_any(column, &input.scalars()?)
                    .not()
                    .or_null(column),
                _ => operators::membership(column, &input.scalars()?, true).or_null(column),
            },

            Operator::Between => {
                let (low, high) = input.range()?;
                operators::range(column, &low, &high)
            }

            Operator::On => operators::on_day(operator, column, &input.window()?, date_only)?,
            Operator::OnOrBefore => {
                operators::through_day(operator, column, &input.window()?, date_only)?
            }
            Operator::OnOrAfter
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
            | Operator::OlderThanX(_) => {
                operators::window(operator, column, &input.window()?, date_only)?
            }

            Operator::Ignored(_) => return Ok(None),
        };
        Ok(Some(clause))
    }

    fn combine(&self, kind: FilterType, mut predicates: Vec<WhereClause>) -> Option<WhereClause> {
        match predicates.len() {
            0 => None,
            1 => predicates.pop(),
            _ => Some(match kind {
                FilterType::And => WhereClause::And(predicates),
                FilterType::Or => WhereClause::Or(predicates),
            }),
        }
    }
}
