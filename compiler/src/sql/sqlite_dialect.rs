//! SQLite SQL dialect implementation

use super::SqlDialect;

/// SQLite SQL dialect
pub struct SqliteDialect;

impl SqlDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn array_contains(&self, array_col: &str, _param_idx: usize) -> String {
        // SQLite stores arrays as JSON text, use json_each to search
        format!(
            "EXISTS (SELECT 1 FROM json_each({}) WHERE value = ?)",
            array_col
        )
    }

    fn case_insensitive_like(&self) -> Option<&'static str> {
        // LIKE is already case-insensitive for ASCII
        None
    }
}
