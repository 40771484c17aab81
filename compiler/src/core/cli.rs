use clap::{Args, Parser, Subcommand};

use std::path::PathBuf;

use chrono::{DateTime, Utc};

use super::constants::{ENV_CONFIG, ENV_DIALECT, ENV_TIMEZONE};
use crate::sql::Backend;

#[derive(Parser)]
#[command(name = "sieve")]
#[command(version, about = "Filter condition compiler", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// IANA timezone used for datetime attributes
    #[arg(long, short = 't', global = true, env = ENV_TIMEZONE)]
    pub timezone: Option<String>,

    /// SQL dialect for the relational adapter
    #[arg(long, short = 'd', global = true, env = ENV_DIALECT, value_parser = parse_backend)]
    pub dialect: Option<Backend>,
}

/// Predicate flavour to emit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AdapterKind {
    #[default]
    Document,
    Relational,
}

/// Parse SQL dialect from CLI/env string
fn parse_backend(s: &str) -> Result<Backend, String> {
    s.parse()
}

/// Parse adapter kind from CLI string
fn parse_adapter(s: &str) -> Result<AdapterKind, String> {
    match s.to_lowercase().as_str() {
        "document" | "doc" => Ok(AdapterKind::Document),
        "relational" | "sql" => Ok(AdapterKind::Relational),
        _ => Err(format!(
            "Invalid adapter '{}'. Valid options: document, relational",
            s
        )),
    }
}

/// Parse an RFC 3339 instant for `--now`
fn parse_now(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("Invalid instant '{}': {}", s, e))
}

#[derive(Args, Clone, Debug)]
pub struct CompileArgs {
    /// Schema document (`{ "schemas": [...] }`)
    #[arg(long, short = 's')]
    pub schemas: PathBuf,

    /// Logical name of the entity being filtered
    #[arg(long, short = 'e')]
    pub entity: String,

    /// Filter document
    #[arg(long, short = 'f')]
    pub filter: PathBuf,

    /// Predicate flavour (document or relational)
    #[arg(long, short = 'a', default_value = "document", value_parser = parse_adapter)]
    pub adapter: AdapterKind,

    /// Evaluate relative dates at this instant instead of the wall clock
    #[arg(long, value_parser = parse_now)]
    pub now: Option<DateTime<Utc>>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Compile a filter and print the predicate with its relations
    Compile(CompileArgs),
    /// List every operator key with its group
    Operators,
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub config: Option<PathBuf>,
    pub timezone: Option<String>,
    pub dialect: Option<Backend>,
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Commands) {
    let cli = Cli::parse();
    let config = CliConfig {
        config: cli.config,
        timezone: cli.timezone,
        dialect: cli.dialect,
    };
    (config, cli.command)
}
