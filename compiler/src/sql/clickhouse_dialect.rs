//! ClickHouse SQL dialect implementation

use super::SqlDialect;
use crate::utils::sql::quote_identifier;

/// ClickHouse SQL dialect
pub struct ClickhouseDialect;

impl SqlDialect for ClickhouseDialect {
    fn name(&self) -> &'static str {
        "clickhouse"
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn quote_ident(&self, name: &str) -> String {
        quote_identifier(name, '`')
    }

    fn array_contains(&self, array_col: &str, _param_idx: usize) -> String {
        format!("has({}, ?)", array_col)
    }

    fn case_insensitive_like(&self) -> Option<&'static str> {
        Some("ILIKE")
    }

    fn like_escape(&self) -> String {
        // Backslash is the built-in escape; no ESCAPE clause
        String::new()
    }
}
