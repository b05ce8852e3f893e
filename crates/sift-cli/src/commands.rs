//! Subcommand implementations.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use serde_json::{json, Value};
use sift::{EngineError, FilterEngine, MemoryStore, SanitizeOptions};
use sift_proto::{QueryParams, SortDirection};

use crate::input::{load_filter, load_rows, write_json, CliError};

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check a filter against the schema without changing it
    Validate {
        /// Filter file (versioned document or bare condition list)
        filter: PathBuf,
    },

    /// Migrate, validate and compile a filter, optionally running it over rows
    Compile {
        /// Filter file
        filter: PathBuf,

        /// JSON array of rows to run the compiled filter against
        #[arg(long)]
        data: Option<PathBuf>,

        /// Page number (1-based)
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Page size (0 uses the configured default)
        #[arg(long, default_value_t = 0)]
        limit: u32,

        /// Sort field
        #[arg(long)]
        sort: Option<String>,

        /// Sort descending
        #[arg(long)]
        desc: bool,

        /// Free-text search across text and numeric fields
        #[arg(long)]
        search: Option<String>,
    },

    /// Bring a stored filter up to the current version
    Migrate {
        /// Filter file
        filter: PathBuf,

        /// Overwrite the filter file with the migrated document
        #[arg(long)]
        write: bool,
    },

    /// Remove conditions the schema no longer supports
    Sanitize {
        /// Filter file
        filter: PathBuf,

        /// Keep raw SQL conditions
        #[arg(long)]
        keep_raw_sql: bool,

        /// Overwrite the filter file with the sanitized document
        #[arg(long)]
        write: bool,
    },
}

/// Result of a command: the value to print and whether it succeeded.
#[derive(Debug)]
pub struct Outcome {
    pub output: Value,
    pub success: bool,
}

impl Outcome {
    fn ok(output: Value) -> Self {
        Self {
            output,
            success: true,
        }
    }

    fn failed(output: Value) -> Self {
        Self {
            output,
            success: false,
        }
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, CliError> {
    serde_json::to_value(value).map_err(CliError::Render)
}

/// Run a subcommand against an engine.
pub async fn execute(engine: &FilterEngine, command: &Command) -> Result<Outcome, CliError> {
    match command {
        Command::Validate { filter } => validate(engine, filter),
        Command::Compile {
            filter,
            data,
            page,
            limit,
            sort,
            desc,
            search,
        } => {
            let mut params = QueryParams::new(*page, *limit);
            if let Some(field) = sort {
                let direction = if *desc {
                    SortDirection::Desc
                } else {
                    SortDirection::Asc
                };
                params = params.with_sort(field.clone(), direction);
            }
            if let Some(search) = search {
                params = params.with_search(search.clone());
            }
            compile(engine, filter, data.as_deref(), params).await
        }
        Command::Migrate { filter, write } => migrate(engine, filter, *write),
        Command::Sanitize {
            filter,
            keep_raw_sql,
            write,
        } => sanitize(engine, filter, *keep_raw_sql, *write),
    }
}

fn validate(engine: &FilterEngine, filter: &Path) -> Result<Outcome, CliError> {
    let document = load_filter(filter)?;
    if engine.needs_migration(&document) {
        tracing::warn!(
            path = %filter.display(),
            version = document.version,
            "filter needs migration; validating as stored"
        );
    }
    tracing::debug!(
        conditions = document.conditions.len(),
        depth = sift_proto::condition::max_depth(&document.conditions),
        "validating filter"
    );
    let result = engine.validate(&document.conditions);
    let output = to_value(&result)?;
    Ok(if result.valid {
        Outcome::ok(output)
    } else {
        Outcome::failed(output)
    })
}

async fn compile(
    engine: &FilterEngine,
    filter: &Path,
    data: Option<&Path>,
    params: QueryParams,
) -> Result<Outcome, CliError> {
    let document = load_filter(filter)?;
    let prepared = match engine.prepare(document) {
        Ok(prepared) => prepared,
        Err(EngineError::Invalid(validation)) => return Ok(Outcome::failed(to_value(&validation)?)),
        Err(err) => return Err(err.into()),
    };

    let mut output = json!({
        "criteria": to_value(&prepared.criteria)?,
        "migrated": prepared.report.migrated,
        "warnings": prepared.warnings(),
    });

    if let Some(data) = data {
        let store = MemoryStore::from_json(load_rows(data)?)?;
        let params = params.with_filters(prepared.document().conditions.clone());
        let result = engine.query(&store, &params).await?;
        output["result"] = to_value(&result)?;
    } else if params.global_search.is_some() {
        let params = params.with_filters(prepared.document().conditions.clone());
        output["criteria"] = to_value(&engine.compile(&params)?)?;
    }

    Ok(Outcome::ok(output))
}

fn migrate(engine: &FilterEngine, filter: &Path, write: bool) -> Result<Outcome, CliError> {
    let document = load_filter(filter)?;
    let report = engine.migrate(document);
    if write && report.migrated {
        write_json(filter, &report.document)?;
        tracing::info!(path = %filter.display(), changes = report.changes.len(), "wrote migrated filter");
    }
    let valid = report.validation.as_ref().map_or(true, |v| v.valid);
    let output = to_value(&report)?;
    Ok(if valid {
        Outcome::ok(output)
    } else {
        Outcome::failed(output)
    })
}

fn sanitize(
    engine: &FilterEngine,
    filter: &Path,
    keep_raw_sql: bool,
    write: bool,
) -> Result<Outcome, CliError> {
    let document = load_filter(filter)?;
    let options = SanitizeOptions {
        remove_raw_sql: !keep_raw_sql,
        ..Default::default()
    };
    let report = engine.sanitize(&document.conditions, &options);
    if write && !report.removed.is_empty() {
        let sanitized = sift_proto::FilterDocument::with_version(document.version, report.conditions.clone());
        write_json(filter, &sanitized)?;
        tracing::info!(path = %filter.display(), removed = report.removed.len(), "wrote sanitized filter");
    }
    Ok(Outcome::ok(to_value(&report)?))
}
