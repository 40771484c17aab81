//! DuckDB SQL dialect implementation

use super::SqlDialect;

/// DuckDB SQL dialect
pub struct DuckdbDialect;

impl SqlDialect for DuckdbDialect {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn array_contains(&self, array_col: &str, _param_idx: usize) -> String {
        format!("array_contains({}, ?)", array_col)
    }

    fn case_insensitive_like(&self) -> Option<&'static str> {
        Some("ILIKE")
    }
}
