//! `frecent` command-line entry point.
//!
//! A thin shell over the library: it resolves configuration, opens a
//! file-backed engine and maps each subcommand onto one engine operation.
//!
//! # Configuration precedence
//!
//! 1. Command-line flags (`--resource-type`, `--data-dir`, `--trace-level`)
//! 2. The TOML file given with `--config`
//! 3. Built-in defaults
//!
//! # Subcommands
//!
//! - `record <query> <id>`: remember that `id` was picked for `query`
//! - `rank <query>`: reorder a JSON array of records read from `--input` or stdin
//! - `show`: print the stored history as JSON

#![allow(clippy::multiple_crate_versions)]

use clap::{Parser, Subcommand};
use frecent::{observability, Config};
use serde_json::Value as JsonValue;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "frecent")]
#[command(about = "Rank search results by how often and how recently they were picked", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Resource type whose history is used (e.g. products, users).
    #[arg(short, long, global = true)]
    resource_type: Option<String>,

    /// Directory holding the history files.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Tracing filter directive. Overridden by RUST_LOG.
    #[arg(long, global = true)]
    trace_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record that `id` was selected after searching for `query`.
    Record { query: String, id: String },

    /// Reorder a JSON array of records for `query`.
    Rank {
        query: String,
        /// Field holding each record's id.
        #[arg(long, default_value = "id")]
        id_field: String,
        /// Read records from this file instead of stdin.
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Pretty-print the output.
        #[arg(long)]
        pretty: bool,
    },

    /// Print the stored history.
    Show,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("frecent: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if cli.resource_type.is_some() {
        config.resource_type = cli.resource_type;
    }
    if cli.data_dir.is_some() {
        config.data_dir = cli.data_dir;
    }
    if cli.trace_level.is_some() {
        config.trace_level = cli.trace_level;
    }

    observability::init_tracing(&config);

    let mut frecency = frecent::initialize(&config)?;

    match cli.command {
        Command::Record { query, id } => {
            frecency.record(&query, &id)?;
            tracing::info!(query = %query, id = %id, "selection recorded");
            Ok(())
        }

        Command::Rank {
            query,
            id_field,
            input,
            pretty,
        } => {
            let raw = match input {
                Some(path) => std::fs::read_to_string(path)?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            let records: Vec<JsonValue> = serde_json::from_str(&raw)?;
            let ranked = frecency.rank_records(&query, records, &id_field);

            let out = if pretty {
                serde_json::to_string_pretty(&ranked)?
            } else {
                serde_json::to_string(&ranked)?
            };
            println!("{out}");
            Ok(())
        }

        Command::Show => {
            println!("{}", serde_json::to_string_pretty(frecency.snapshot())?);
            Ok(())
        }
    }
}
