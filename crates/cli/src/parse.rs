//! ArgMatches → CliAction conversion.
//!
//! Everything that can be checked without a database happens here: JSON
//! documents are parsed, filters are parsed into predicates, ids and field
//! paths are validated.

use std::io::Read;

use anyhow::{anyhow, bail, Context, Result};
use clap::ArgMatches;
use serde_json::Value;
use stratadoc_core::{DocumentId, FieldPath};
use stratadoc_engine::{FindOptions, IndexOptions, SortOrder};
use stratadoc_query::{parse, Expr};

/// The result of parsing the command line.
#[derive(Debug, Clone, PartialEq)]
pub enum CliAction {
    /// Insert one document
    Insert { collection: String, document: Value },
    /// Fetch by id
    Get { collection: String, id: DocumentId },
    /// Query with paging
    Find {
        collection: String,
        filter: Expr,
        options: FindOptions,
    },
    /// Count matches
    Count { collection: String, filter: Expr },
    /// Delete every match
    Delete { collection: String, filter: Expr },
    /// Create an index
    CreateIndex {
        collection: String,
        path: FieldPath,
        options: IndexOptions,
    },
    /// Drop an index
    DropIndex { collection: String, path: FieldPath },
    /// List indexes
    Indexes { collection: String },
    /// List collections
    Collections,
    /// Drop a collection
    DropCollection { collection: String },
    /// Show SQL for a filter
    Translate { filter: Expr },
    /// Print a fresh id
    NewId,
}

/// Convert clap ArgMatches into a CliAction.
pub fn matches_to_action(matches: &ArgMatches) -> Result<CliAction> {
    let (sub_name, m) = matches
        .subcommand()
        .ok_or_else(|| anyhow!("no command provided"))?;

    let action = match sub_name {
        "insert" => CliAction::Insert {
            collection: collection(m)?,
            document: read_document(required(m, "document")?)?,
        },
        "get" => {
            let text = required(m, "id")?;
            CliAction::Get {
                collection: collection(m)?,
                id: DocumentId::parse(text).with_context(|| format!("bad id '{}'", text))?,
            }
        }
        "find" => {
            let mut options = FindOptions::new();
            if let Some(skip) = m.get_one::<u64>("skip") {
                options = options.skip(*skip);
            }
            if let Some(limit) = m.get_one::<u64>("limit") {
                options = options.limit(*limit);
            }
            if let Some(order) = m.get_one::<String>("order") {
                let (path, direction) = parse_order(order)?;
                options = options.order_by(path, direction);
            }
            CliAction::Find {
                collection: collection(m)?,
                filter: filter(m)?,
                options,
            }
        }
        "count" => CliAction::Count {
            collection: collection(m)?,
            filter: filter(m)?,
        },
        "delete" => CliAction::Delete {
            collection: collection(m)?,
            filter: filter(m)?,
        },
        "create-index" => CliAction::CreateIndex {
            collection: collection(m)?,
            path: field_path(required(m, "path")?)?,
            options: IndexOptions::new()
                .with_unique(m.get_flag("unique"))
                .with_sparse(m.get_flag("sparse")),
        },
        "drop-index" => CliAction::DropIndex {
            collection: collection(m)?,
            path: field_path(required(m, "path")?)?,
        },
        "indexes" => CliAction::Indexes {
            collection: collection(m)?,
        },
        "collections" => CliAction::Collections,
        "drop-collection" => CliAction::DropCollection {
            collection: collection(m)?,
        },
        "translate" => CliAction::Translate { filter: filter(m)? },
        "new-id" => CliAction::NewId,
        other => bail!("unknown command '{}'", other),
    };
    Ok(action)
}

fn required<'a>(m: &'a ArgMatches, name: &str) -> Result<&'a str> {
    m.get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("missing argument <{}>", name))
}

fn collection(m: &ArgMatches) -> Result<String> {
    let name = required(m, "collection")?;
    stratadoc_engine::validate_name(name)?;
    Ok(name.to_string())
}

/// Optional filter; absent means every document
fn filter(m: &ArgMatches) -> Result<Expr> {
    match m.get_one::<String>("filter") {
        Some(text) => parse(text).with_context(|| format!("bad filter '{}'", text)),
        None => Ok(Expr::always()),
    }
}

fn field_path(text: &str) -> Result<FieldPath> {
    FieldPath::parse(text).with_context(|| format!("bad field path '{}'", text))
}

/// `field`, `field:asc` or `field:desc`
pub fn parse_order(text: &str) -> Result<(FieldPath, SortOrder)> {
    let (path, direction) = match text.rsplit_once(':') {
        Some((path, dir)) => {
            let direction = match dir.to_ascii_lowercase().as_str() {
                "asc" => SortOrder::Asc,
                "desc" => SortOrder::Desc,
                other => bail!("bad sort direction '{}'; expected asc or desc", other),
            };
            (path, direction)
        }
        None => (text, SortOrder::Asc),
    };
    Ok((field_path(path)?, direction))
}

// =========================================================================
// Document input
// =========================================================================

/// Read a JSON document from an inline literal, `@file`, or `-` (stdin).
fn read_document(source: &str) -> Result<Value> {
    let content = if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        buf
    } else if let Some(path) = source.strip_prefix('@') {
        std::fs::read_to_string(path).with_context(|| format!("failed to read '{}'", path))?
    } else {
        source.to_string()
    };

    let document: Value = serde_json::from_str(&content).context("invalid JSON document")?;
    if !document.is_object() {
        bail!("document must be a JSON object");
    }
    Ok(document)
}
