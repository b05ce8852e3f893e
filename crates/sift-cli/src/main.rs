//! Sift Command-Line Tool
//!
//! Validates, compiles, migrates and sanitizes JSON filter documents against
//! an entity schema file.

mod commands;
mod formatter;
mod input;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use commands::Command;
use formatter::OutputFormat;
use input::{load_json, CliError};
use sift::{Dialect, EngineConfig, EntitySchema, FilterEngine};
use tracing_subscriber::EnvFilter;

/// Sift Command-Line Tool
#[derive(Parser, Debug)]
#[command(name = "sift")]
#[command(version, about = "Validate, compile and migrate filter documents")]
pub struct Args {
    /// Entity schema file (JSON: name, primaryKey, fields)
    #[arg(short, long)]
    pub schema: PathBuf,

    /// Engine configuration file (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Backend dialect, overriding the configuration
    #[arg(short, long)]
    pub dialect: Option<String>,

    /// Output format
    #[arg(long, default_value = "pretty", value_enum)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sift=info")),
        )
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}

async fn run(args: Args) -> Result<bool, CliError> {
    let engine = build_engine(&args)?;
    tracing::debug!(entity = %engine.schema().name, dialect = %engine.config().dialect, "engine ready");

    let outcome = commands::execute(&engine, &args.command).await?;
    let rendered = formatter::render(&outcome.output, args.format).map_err(CliError::Render)?;
    println!("{}", rendered);
    Ok(outcome.success)
}

fn build_engine(args: &Args) -> Result<FilterEngine, CliError> {
    let schema: EntitySchema = load_json(&args.schema)?;
    let mut config: EngineConfig = match &args.config {
        Some(path) => load_json(path)?,
        None => EngineConfig::default(),
    };
    if let Some(dialect) = &args.dialect {
        config = config.with_dialect(Dialect::new(dialect));
    }
    Ok(FilterEngine::new(schema).with_config(config))
}
