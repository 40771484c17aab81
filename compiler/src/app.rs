//! Core application

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde_json::{Value as JsonValue, json};

use crate::adapters::relational::RenderedSql;
use crate::adapters::{Adapter, DocumentAdapter, RelationalAdapter};
use crate::core::cli::{self, AdapterKind, CliConfig, CompileArgs, Commands};
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME, CRATE_TARGET, ENV_LOG};
use crate::dates::FixedClock;
use crate::filter::{CompileOptions, FilterCompiler, FilterError, Operator, parse_filter};
use crate::schema::{InMemorySchemaStore, SchemaStore};
use crate::utils::file::read_input;

pub struct CoreApp {
    pub config: AppConfig,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!(
            app = APP_NAME,
            version = env!("CARGO_PKG_VERSION"),
            "Application starting"
        );

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        match command {
            Commands::Operators => {
                Self::print_operators();
                Ok(())
            }
            Commands::Compile(args) => {
                let app = Self::init(&cli_config)?;
                let output = app.compile(&args)?;
                println!("{}", serde_json::to_string_pretty(&output)?);
                Ok(())
            }
        }
    }

    fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;
        Ok(Self { config })
    }

    /// Read the input documents named by `args` and compile them
    pub fn compile(&self, args: &CompileArgs) -> Result<JsonValue> {
        let schemas = read_input(&args.schemas)?;
        let filter = read_input(&args.filter)?;
        self.compile_documents(&schemas, &filter, &args.entity, args.adapter, args.now)
    }

    /// Compile a filter document against `entity` from a schema document
    ///
    /// Document output is `{ predicate, relations }` with `{}` for match-all;
    /// relational output is `{ dialect, sql, params, relations }` with `1=1`.
    pub fn compile_documents(
        &self,
        schemas_json: &str,
        filter_json: &str,
        entity: &str,
        adapter: AdapterKind,
        now: Option<DateTime<Utc>>,
    ) -> Result<JsonValue> {
        let store = InMemorySchemaStore::from_json(schemas_json)
            .context("Failed to load schema document")?;
        let schema = store
            .get_schema(entity)
            .ok_or_else(|| FilterError::SchemaNotFound {
                name: entity.to_string(),
            })?;
        let filter =
            parse_filter(filter_json, &self.config.limits).context("Failed to parse filter")?;
        let options = CompileOptions::new(self.config.compiler.timezone.clone());
        let store: Arc<dyn SchemaStore> = Arc::new(store);

        match adapter {
            AdapterKind::Document => {
                let compiler = self.compiler(DocumentAdapter::new(), store, now);
                let plan = compiler
                    .plan_filter(&filter, &schema, &options)
                    .context("Failed to compile filter")?;
                Ok(json!({
                    "predicate": plan.predicate.unwrap_or_else(|| json!({})),
                    "relations": plan.relations,
                }))
            }
            AdapterKind::Relational => {
                let backend = self.config.relational.dialect;
                let compiler = self.compiler(RelationalAdapter::for_backend(backend), store, now);
                let plan = compiler
                    .plan_filter(&filter, &schema, &options)
                    .context("Failed to compile filter")?;
                let rendered = match &plan.predicate {
                    Some(clause) => RenderedSql::render(clause, backend.dialect()),
                    None => RenderedSql {
                        sql: "1=1".to_string(),
                        params: Vec::new(),
                    },
                };
                Ok(json!({
                    "dialect": backend.name(),
                    "sql": rendered.sql,
                    "params": rendered.params,
                    "relations": plan.relations,
                }))
            }
        }
    }

    fn compiler<A: Adapter>(
        &self,
        adapter: A,
        store: Arc<dyn SchemaStore>,
        now: Option<DateTime<Utc>>,
    ) -> FilterCompiler<A> {
        let compiler = FilterCompiler::new(adapter, store)
            .with_settings(self.config.compiler.calendar_settings());
        match now {
            Some(instant) => compiler.with_clock(Arc::new(FixedClock(instant))),
            None => compiler,
        }
    }

    fn print_operators() {
        for operator in Operator::known() {
            println!("{:<24} {}", operator.key(), operator.group().as_str());
        }
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", CRATE_TARGET);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        // stdout carries the compiled output
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }
}
