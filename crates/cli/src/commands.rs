//! Clap command tree definition.
//!
//! Builds the full `clap::Command` tree for the `stratadoc` binary.

use clap::{Arg, ArgAction, Command};

/// Default database file
pub const DEFAULT_DB_PATH: &str = "stratadoc.db";

/// Build the complete CLI command tree.
pub fn build_cli() -> Command {
    Command::new("stratadoc")
        .about("Document store over SQLite JSON")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("db")
                .long("db")
                .help("Database file (default: stratadoc.db)")
                .default_value(DEFAULT_DB_PATH)
                .global(true),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("Path to a stratadoc.toml configuration file")
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Increase log verbosity (-v info, -vv debug, -vvv trace)")
                .action(ArgAction::Count)
                .global(true),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("JSON output mode")
                .action(ArgAction::SetTrue)
                .conflicts_with("raw")
                .global(true),
        )
        .arg(
            Arg::new("raw")
                .long("raw")
                .help("Raw output mode (no type prefixes, no quotes)")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("insert")
                .about("Insert a JSON document")
                .arg(collection_arg())
                .arg(
                    Arg::new("document")
                        .required(true)
                        .help("JSON object, @file to read a file, or - for stdin"),
                ),
        )
        .subcommand(
            Command::new("get")
                .about("Fetch a document by id")
                .arg(collection_arg())
                .arg(Arg::new("id").required(true).help("24-character hex id")),
        )
        .subcommand(
            Command::new("find")
                .about("List documents matching a filter")
                .arg(collection_arg())
                .arg(filter_arg(false))
                .arg(
                    Arg::new("skip")
                        .long("skip")
                        .value_parser(clap::value_parser!(u64))
                        .help("Skip the first N matches"),
                )
                .arg(
                    Arg::new("limit")
                        .long("limit")
                        .value_parser(clap::value_parser!(u64))
                        .help("Return at most N matches"),
                )
                .arg(
                    Arg::new("order")
                        .long("order")
                        .help("Sort field, optionally suffixed :asc or :desc"),
                ),
        )
        .subcommand(
            Command::new("count")
                .about("Count documents matching a filter")
                .arg(collection_arg())
                .arg(filter_arg(false)),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete every document matching a filter")
                .arg(collection_arg())
                .arg(filter_arg(true)),
        )
        .subcommand(
            Command::new("create-index")
                .about("Create an index on a field")
                .arg(collection_arg())
                .arg(path_arg())
                .arg(
                    Arg::new("unique")
                        .long("unique")
                        .help("Reject duplicate values")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("sparse")
                        .long("sparse")
                        .help("Skip documents where the field is null or missing")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("drop-index")
                .about("Drop the index on a field")
                .arg(collection_arg())
                .arg(path_arg()),
        )
        .subcommand(
            Command::new("indexes")
                .about("List indexes of a collection")
                .arg(collection_arg()),
        )
        .subcommand(Command::new("collections").about("List collections"))
        .subcommand(
            Command::new("drop-collection")
                .about("Drop a collection with its documents and indexes")
                .arg(collection_arg()),
        )
        .subcommand(
            Command::new("translate")
                .about("Show the SQL clause and parameters for a filter")
                .arg(filter_arg(true)),
        )
        .subcommand(Command::new("new-id").about("Generate a document id"))
}

fn collection_arg() -> Arg {
    Arg::new("collection")
        .required(true)
        .help("Collection name")
}

fn path_arg() -> Arg {
    Arg::new("path")
        .required(true)
        .help("Field path, e.g. address.city")
}

fn filter_arg(required: bool) -> Arg {
    Arg::new("filter")
        .required(required)
        .help("Filter expression, e.g. 'age >= 30 && name.startsWith(\"A\")'")
}
