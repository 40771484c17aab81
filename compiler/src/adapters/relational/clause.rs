//! Where-clause tree and SQL rendering

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::sql::SqlDialect;

/// Bound parameter value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
}

/// Accumulated parameters in placeholder order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlParams {
    pub values: Vec<SqlValue>,
}

impl SqlParams {
    /// Append a value and return its 1-based index
    fn push(&mut self, value: SqlValue) -> usize {
        self.values.push(value);
        self.values.len()
    }
}

/// Optionally table-qualified column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub table: Option<String>,
    pub name: String,
}

impl Column {
    pub fn new(table: Option<String>, name: impl Into<String>) -> Self {
        Self {
            table,
            name: name.into(),
        }
    }

    fn to_sql(&self, dialect: &dyn SqlDialect) -> String {
        match &self.table {
            Some(table) => format!(
                "{}.{}",
                dialect.quote_ident(table),
                dialect.quote_ident(&self.name)
            ),
            None => dialect.quote_ident(&self.name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CompareOp {
    fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
        }
    }
}

/// LIKE flavour chosen from the active dialect at compile time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeOp {
    Like,
    ILike,
}

/// Relational predicate
#[derive(Debug, Clone, PartialEq)]
pub enum WhereClause {
    Compare {
        column: Column,
        op: CompareOp,
        value: SqlValue,
    },
    Like {
        column: Column,
        op: LikeOp,
        /// Already escaped, with `%` wildcards in place
        pattern: String,
        negated: bool,
    },
    In {
        column: Column,
        values: Vec<SqlValue>,
        negated: bool,
    },
    Between {
        column: Column,
        low: SqlValue,
        high: SqlValue,
    },
    IsNull {
        column: Column,
        negated: bool,
    },
    ArrayContains {
        column: Column,
        value: SqlValue,
    },
    And(Vec<WhereClause>),
    Or(Vec<WhereClause>),
    Not(Box<WhereClause>),
}

impl WhereClause {
    pub fn compare(column: &Column, op: CompareOp, value: SqlValue) -> Self {
        Self::Compare {
            column: column.clone(),
            op,
            value,
        }
    }

    pub fn is_null(column: &Column) -> Self {
        Self::IsNull {
            column: column.clone(),
            negated: false,
        }
    }

    pub fn is_not_null(column: &Column) -> Self {
        Self::IsNull {
            column: column.clone(),
            negated: true,
        }
    }

    /// Match `self` or a NULL column
    pub fn or_null(self, column: &Column) -> Self {
        Self::Or(vec![Self::is_null(column), self])
    }

    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Generate the SQL fragment, appending bound values to `params`
    ///
    /// Empty AND renders `1=1` and empty OR renders `1=0`.
    pub fn to_sql(&self, dialect: &dyn SqlDialect, params: &mut SqlParams) -> String {
        match self {
            Self::Compare { column, op, value } => {
                let idx = params.push(value.clone());
                format!(
                    "{} {} {}",
                    column.to_sql(dialect),
                    op.as_sql(),
                    dialect.placeholder(idx)
                )
            }
            Self::Like {
                column,
                op,
                pattern,
                negated,
            } => {
                let idx = params.push(SqlValue::Text(pattern.clone()));
                let keyword = match op {
                    LikeOp::ILike => dialect.case_insensitive_like().unwrap_or("LIKE"),
                    LikeOp::Like => "LIKE",
                };
                format!(
                    "{} {}{} {}{}",
                    column.to_sql(dialect),
                    if *negated { "NOT " } else { "" },
                    keyword,
                    dialect.placeholder(idx),
                    dialect.like_escape()
                )
            }
            Self::In {
                column,
                values,
                negated,
            } => {
                let placeholders: Vec<String> = values
                    .iter()
                    .map(|value| dialect.placeholder(params.push(value.clone())))
                    .collect();
                format!(
                    "{} {}IN ({})",
                    column.to_sql(dialect),
                    if *negated { "NOT " } else { "" },
                    placeholders.join(", ")
                )
            }
            Self::Between { column, low, high } => {
                let low_idx = params.push(low.clone());
                let high_idx = params.push(high.clone());
                format!(
                    "{} BETWEEN {} AND {}",
                    column.to_sql(dialect),
                    dialect.placeholder(low_idx),
                    dialect.placeholder(high_idx)
                )
            }
            Self::IsNull { column, negated } => format!(
                "{} IS {}NULL",
                column.to_sql(dialect),
                if *negated { "NOT " } else { "" }
            ),
            Self::ArrayContains { column, value } => {
                let idx = params.push(value.clone());
                dialect.array_contains(&column.to_sql(dialect), idx)
            }
            Self::And(clauses) => join(clauses, " AND ", "1=1", dialect, params),
            Self::Or(clauses) => join(clauses, " OR ", "1=0", dialect, params),
            Self::Not(inner) => format!("NOT ({})", inner.to_sql(dialect, params)),
        }
    }
}

fn join(
    clauses: &[WhereClause],
    separator: &str,
    empty: &str,
    dialect: &dyn SqlDialect,
    params: &mut SqlParams,
) -> String {
    match clauses {
        [] => empty.to_string(),
        [single] => single.to_sql(dialect, params),
        _ => {
            let parts: Vec<String> = clauses
                .iter()
                .map(|clause| clause.to_sql(dialect, params))
                .collect();
            format!("({})", parts.join(separator))
        }
    }
}

/// SQL text with its parameters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedSql {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl RenderedSql {
    pub fn render(clause: &WhereClause, dialect: &dyn SqlDialect) -> Self {
        let mut params = SqlParams::default();
        let sql = clause.to_sql(dialect, &mut params);
        Self {
            sql,
            params: params.values,
        }
    }
}
