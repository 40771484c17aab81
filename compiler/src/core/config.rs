use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Weekday;
use serde::Deserialize;

use crate::dates::CalendarSettings;
use crate::filter::FilterLimits;
use crate::sql::Backend;
use crate::utils::file::expand_path;
use crate::utils::time::parse_timezone;

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_FISCAL_YEAR_START_MONTH, DEFAULT_TIMEZONE,
};

// =============================================================================
// File Config Types (all optional for merging)
// =============================================================================

/// Compiler configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CompilerFileConfig {
    pub timezone: Option<String>,
    pub week_start: Option<String>,
    pub fiscal_year_start_month: Option<u32>,
}

/// Relational adapter configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RelationalFileConfig {
    pub dialect: Option<String>,
}

/// Filter input limits section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct LimitsFileConfig {
    pub max_filter_bytes: Option<usize>,
    pub max_conditions: Option<usize>,
    pub max_depth: Option<usize>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub compiler: Option<CompilerFileConfig>,
    pub relational: Option<RelationalFileConfig>,
    pub limits: Option<LimitsFileConfig>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        if let Some(compiler) = other.compiler {
            let current = self.compiler.get_or_insert_with(CompilerFileConfig::default);
            if compiler.timezone.is_some() {
                tracing::trace!(timezone = ?compiler.timezone, "Merging compiler.timezone");
                current.timezone = compiler.timezone;
            }
            if compiler.week_start.is_some() {
                tracing::trace!(week_start = ?compiler.week_start, "Merging compiler.week_start");
                current.week_start = compiler.week_start;
            }
            if compiler.fiscal_year_start_month.is_some() {
                tracing::trace!(
                    month = ?compiler.fiscal_year_start_month,
                    "Merging compiler.fiscal_year_start_month"
                );
                current.fiscal_year_start_month = compiler.fiscal_year_start_month;
            }
        }

        if let Some(relational) = other.relational {
            let current = self
                .relational
                .get_or_insert_with(RelationalFileConfig::default);
            if relational.dialect.is_some() {
                tracing::trace!(dialect = ?relational.dialect, "Merging relational.dialect");
                current.dialect = relational.dialect;
            }
        }

        if let Some(limits) = other.limits {
            let current = self.limits.get_or_insert_with(LimitsFileConfig::default);
            if limits.max_filter_bytes.is_some() {
                current.max_filter_bytes = limits.max_filter_bytes;
            }
            if limits.max_conditions.is_some() {
                current.max_conditions = limits.max_conditions;
            }
            if limits.max_depth.is_some() {
                current.max_depth = limits.max_depth;
            }
        }
    }
}

// =============================================================================
// Final Config Types
// =============================================================================

/// Calendar and timezone settings for compilation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerConfig {
    pub timezone: String,
    pub week_start: Weekday,
    pub fiscal_year_start_month: u32,
}

impl CompilerConfig {
    pub fn calendar_settings(&self) -> CalendarSettings {
        CalendarSettings {
            week_start: self.week_start,
            fiscal_year_start_month: self.fiscal_year_start_month,
        }
    }
}

/// Relational adapter settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationalConfig {
    pub dialect: Backend,
}

/// Final merged application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub compiler: CompilerConfig,
    pub relational: RelationalConfig,
    pub limits: FilterLimits,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.sieve/sieve.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");
        tracing::trace!(cli = ?cli, "CLI config");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        if let Some(profile_path) = get_profile_config_path()
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand_path(&path.to_string_lossy());
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        Self::from_layers(file_config, cli)
    }

    /// Layer defaults, merged file config and CLI/env overrides
    pub(crate) fn from_layers(file_config: FileConfig, cli: &CliConfig) -> Result<Self> {
        let file_compiler = file_config.compiler.unwrap_or_default();
        let file_relational = file_config.relational.unwrap_or_default();
        let file_limits = file_config.limits.unwrap_or_default();

        let timezone = cli
            .timezone
            .clone()
            .or(file_compiler.timezone)
            .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());

        let week_start = match file_compiler.week_start {
            Some(name) => name.parse::<Weekday>().map_err(|_| {
                anyhow::anyhow!(
                    "Configuration error: compiler.week_start '{}' is not a weekday",
                    name
                )
            })?,
            None => CalendarSettings::default().week_start,
        };

        let dialect = match (cli.dialect, file_relational.dialect) {
            (Some(backend), _) => backend,
            (None, Some(name)) => name
                .parse::<Backend>()
                .map_err(|e| anyhow::anyhow!("Configuration error: relational.dialect: {}", e))?,
            (None, None) => Backend::default(),
        };

        let defaults = FilterLimits::default();
        let config = Self {
            compiler: CompilerConfig {
                timezone,
                week_start,
                fiscal_year_start_month: file_compiler
                    .fiscal_year_start_month
                    .unwrap_or(DEFAULT_FISCAL_YEAR_START_MONTH),
            },
            relational: RelationalConfig { dialect },
            limits: FilterLimits {
                max_filter_bytes: file_limits
                    .max_filter_bytes
                    .unwrap_or(defaults.max_filter_bytes),
                max_conditions: file_limits.max_conditions.unwrap_or(defaults.max_conditions),
                max_depth: file_limits.max_depth.unwrap_or(defaults.max_depth),
            },
        };

        config.validate()?;

        tracing::debug!(
            timezone = %config.compiler.timezone,
            week_start = %config.compiler.week_start,
            fiscal_year_start_month = config.compiler.fiscal_year_start_month,
            dialect = %config.relational.dialect,
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Validate the configuration for consistency and correctness
    fn validate(&self) -> Result<()> {
        if parse_timezone(&self.compiler.timezone).is_none() {
            anyhow::bail!(
                "Configuration error: '{}' is not a valid IANA timezone",
                self.compiler.timezone
            );
        }

        if !(1..=12).contains(&self.compiler.fiscal_year_start_month) {
            anyhow::bail!(
                "Configuration error: compiler.fiscal_year_start_month must be 1-12, got {}",
                self.compiler.fiscal_year_start_month
            );
        }

        if self.limits.max_filter_bytes == 0
            || self.limits.max_conditions == 0
            || self.limits.max_depth == 0
        {
            anyhow::bail!("Configuration error: limits must be greater than 0");
        }

        Ok(())
    }
}

/// Get the profile config path (~/.sieve/sieve.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}
