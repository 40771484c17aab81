// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display)
pub const APP_NAME: &str = "Sieve";

/// Library crate name, used as the tracing target prefix
pub const CRATE_TARGET: &str = "sieve_compiler";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".sieve";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "sieve.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "SIEVE_CONFIG";

// =============================================================================
// Environment Variables
// =============================================================================

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "SIEVE_LOG";

/// Environment variable for the default IANA timezone
pub const ENV_TIMEZONE: &str = "SIEVE_TIMEZONE";

/// Environment variable for the relational SQL dialect
pub const ENV_DIALECT: &str = "SIEVE_DIALECT";

// =============================================================================
// Calendar Defaults
// =============================================================================

/// Timezone used when neither config nor CLI names one
pub const DEFAULT_TIMEZONE: &str = "UTC";

/// Fiscal year starts on April 1
pub const DEFAULT_FISCAL_YEAR_START_MONTH: u32 = 4;

// =============================================================================
// Filter Limits
// =============================================================================

/// Maximum filter JSON size in bytes (64KB)
pub const MAX_FILTER_JSON_SIZE: usize = 64 * 1024;

/// Maximum number of conditions in one filter tree
pub const DEFAULT_MAX_CONDITIONS: usize = 200;

/// Maximum nesting depth of a filter tree
pub const DEFAULT_MAX_FILTER_DEPTH: usize = 16;

// =============================================================================
// Adapters
// =============================================================================

/// Prefix of document-store lookup aliases populated by the caller's join stage
pub const DOCUMENT_EXPAND_PREFIX: &str = "@expand";

/// Escape character for LIKE patterns
pub const LIKE_ESCAPE_CHAR: char = '\\';
