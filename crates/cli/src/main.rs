//! Stratadoc CLI: one command per invocation against a database file.
//!
//! `stratadoc [--db FILE] [--config FILE] [-v..] [--json|--raw] COMMAND ...`

mod commands;
mod exec;
mod format;
mod parse;

use std::path::Path;
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::ArgMatches;
use stratadoc_engine::{Database, StoreConfig};
use tracing_subscriber::EnvFilter;

use commands::{build_cli, DEFAULT_DB_PATH};
use exec::execute;
use format::{format_error, format_output, OutputMode};
use parse::matches_to_action;

fn main() {
    let matches = build_cli().get_matches();

    init_logging(matches.get_count("verbose"));

    // Determine output mode
    let output_mode = if matches.get_flag("json") {
        OutputMode::Json
    } else if matches.get_flag("raw") {
        OutputMode::Raw
    } else {
        OutputMode::Human
    };

    process::exit(run(&matches, output_mode));
}

fn run(matches: &ArgMatches, mode: OutputMode) -> i32 {
    let result = open_database(matches).and_then(|db| {
        let action = matches_to_action(matches)?;
        execute(&db, action)
    });
    match result {
        Ok(output) => {
            let formatted = format_output(&output, mode);
            if !formatted.is_empty() {
                println!("{}", formatted);
            }
            0
        }
        Err(e) => {
            eprintln!("{}", format_error(&e, mode));
            1
        }
    }
}

/// Log to stderr; `RUST_LOG` wins over `-v`.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn open_database(matches: &ArgMatches) -> Result<Arc<Database>> {
    let config = match matches.get_one::<String>("config") {
        Some(path) => StoreConfig::from_file(Path::new(path))
            .with_context(|| format!("failed to load config '{}'", path))?,
        None => StoreConfig::default(),
    };
    let path = matches
        .get_one::<String>("db")
        .map(String::as_str)
        .unwrap_or(DEFAULT_DB_PATH);
    Database::open_with_config(path, config)
        .with_context(|| format!("failed to open database '{}'", path))
}
