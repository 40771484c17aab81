//! SQL dialect trait for multi-database support
//!
//! This trait defines the interface for generating database-specific SQL syntax.

use crate::core::constants::LIKE_ESCAPE_CHAR;
use crate::utils::sql::quote_identifier;

/// SQL dialect trait for generating database-specific SQL
///
/// Different databases have different syntax for:
/// - Parameter placeholders (? vs $1)
/// - Identifier quoting
/// - Array membership
/// - Case-insensitive pattern matching
pub trait SqlDialect: Send + Sync {
    /// Get the dialect name
    fn name(&self) -> &'static str;

    /// Generate a parameter placeholder for the given index (1-based)
    ///
    /// - SQLite/DuckDB: Always returns "?"
    /// - PostgreSQL: Returns "$1", "$2", etc.
    /// - ClickHouse: Returns "?"
    fn placeholder(&self, index: usize) -> String;

    /// Quote a table or column identifier
    fn quote_ident(&self, name: &str) -> String {
        quote_identifier(name, '"')
    }

    /// Generate SQL for checking if an array contains the bound value
    ///
    /// - DuckDB: `array_contains(col, ?)`
    /// - PostgreSQL: `$1 = ANY(col)`
    /// - ClickHouse: `has(col, ?)`
    /// - SQLite: `EXISTS (SELECT 1 FROM json_each(col) WHERE value = ?)`
    fn array_contains(&self, array_col: &str, param_idx: usize) -> String;

    /// Native case-insensitive LIKE operator, if the dialect has one
    fn case_insensitive_like(&self) -> Option<&'static str>;

    /// Suffix declaring the LIKE escape character
    fn like_escape(&self) -> String {
        format!(" ESCAPE '{}'", LIKE_ESCAPE_CHAR)
    }
}
