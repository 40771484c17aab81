//! PostgreSQL SQL dialect implementation

use super::SqlDialect;

/// PostgreSQL SQL dialect
pub struct PostgresDialect;

impl SqlDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    fn array_contains(&self, array_col: &str, param_idx: usize) -> String {
        format!("${} = ANY({})", param_idx, array_col)
    }

    fn case_insensitive_like(&self) -> Option<&'static str> {
        Some("ILIKE")
    }
}
