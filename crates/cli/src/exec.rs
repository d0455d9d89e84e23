//! CliAction → Output execution.
//!
//! The CLI stores untyped JSON documents, so field names are used exactly as
//! written (`FieldNaming::AsIs`) for both payloads and filters.

use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;
use stratadoc_core::{DocumentId, FieldNaming};
use stratadoc_engine::{
    Collection, CollectionInfo, Database, IndexInfo, JsonSerializer, StoredDocument,
};
use stratadoc_query::{Translation, Translator};
use tracing::debug;

use crate::parse::CliAction;

/// Result of one command, ready for formatting
#[derive(Debug)]
pub enum Output {
    /// An id (insert, new-id)
    Id(DocumentId),
    /// A document with metadata, or nothing
    Document(Option<StoredDocument<Value>>),
    /// A list of documents
    Documents(Vec<Value>),
    /// A count
    Count(u64),
    /// Whether something existed
    Bool(bool),
    /// One index
    Index(IndexInfo),
    /// Index list
    Indexes(Vec<IndexInfo>),
    /// Collection list
    Collections(Vec<CollectionInfo>),
    /// Translated filter
    Translation(Translation),
}

const NAMING: FieldNaming = FieldNaming::AsIs;

/// Open (creating if needed) a collection of untyped documents
fn open(db: &Arc<Database>, name: &str) -> Result<Collection<Value>> {
    Ok(db.collection_with::<Value, _>(name, JsonSerializer::new(NAMING))?)
}

/// Open a collection that must already exist
fn open_existing(db: &Arc<Database>, name: &str) -> Result<Collection<Value>> {
    db.catalog().lookup(name, None)?;
    open(db, name)
}

/// Run one action
pub fn execute(db: &Arc<Database>, action: CliAction) -> Result<Output> {
    debug!(target: "stratadoc::cli", ?action, "executing");
    let output = match action {
        CliAction::Insert {
            collection,
            mut document,
        } => Output::Id(open(db, &collection)?.insert(&mut document, None)?),
        CliAction::Get { collection, id } => {
            Output::Document(open_existing(db, &collection)?.get_stored(id, None)?)
        }
        CliAction::Find {
            collection,
            filter,
            options,
        } => Output::Documents(open_existing(db, &collection)?.find(&filter, &options, None)?),
        CliAction::Count { collection, filter } => {
            Output::Count(open_existing(db, &collection)?.count(&filter, None)?)
        }
        CliAction::Delete { collection, filter } => {
            let removed = open_existing(db, &collection)?.delete_many(&filter, None)?;
            Output::Count(removed as u64)
        }
        CliAction::CreateIndex {
            collection,
            path,
            options,
        } => {
            let docs = open(db, &collection)?;
            Output::Index(docs.create_index_with(&path.to_path_string(), options, None)?)
        }
        CliAction::DropIndex { collection, path } => Output::Bool(
            open_existing(db, &collection)?.drop_index(&path.to_path_string(), None)?,
        ),
        CliAction::Indexes { collection } => {
            Output::Indexes(open_existing(db, &collection)?.list_indexes(None)?)
        }
        CliAction::Collections => Output::Collections(db.catalog().list(None)?),
        CliAction::DropCollection { collection } => {
            Output::Bool(db.catalog().drop_collection(&collection, None)?)
        }
        CliAction::Translate { filter } => {
            Output::Translation(Translator::new(NAMING).translate(&filter)?)
        }
        CliAction::NewId => Output::Id(DocumentId::new()),
    };
    Ok(output)
}
