//! Shared test utilities for the integration test suites.
//!
//! Import via `mod common;` from any test's main.rs.

#![allow(dead_code)]
#![allow(unused_imports)]

use std::sync::Arc;

pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use serde_json::json;
pub use stratadoc::{
    field, parse, Collection, Database, Document, DocumentId, Error, FieldNaming, FindOptions,
    IdGenerator, IndexOptions, JsonSerializer, SortOrder, StoreConfig, Translator,
};
use tempfile::TempDir;

// ============================================================================
// Document types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub city: String,
    pub zip_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    #[serde(default)]
    pub id: DocumentId,
    pub name: String,
    pub age: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Person {
    pub fn new(name: &str, age: i64) -> Self {
        Person {
            id: DocumentId::EMPTY,
            name: name.to_string(),
            age,
            email: None,
            address: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }

    pub fn with_city(mut self, city: &str, zip_code: &str) -> Self {
        self.address = Some(Address {
            city: city.to_string(),
            zip_code: zip_code.to_string(),
        });
        self
    }
}

impl Document for Person {
    fn id(&self) -> DocumentId {
        self.id
    }

    fn set_id(&mut self, id: DocumentId) {
        self.id = id;
    }

    fn set_created_at(&mut self, at: DateTime<Utc>) {
        self.created_at = Some(at);
    }

    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = Some(at);
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// In-memory database with a `people` collection holding Alice (30),
/// Bob (25) and Carol (30).
pub fn seeded() -> (Arc<Database>, Collection<Person>) {
    let db = Database::open_in_memory().unwrap();
    let people = db.collection::<Person>("people").unwrap();
    for (name, age) in [("Alice", 30), ("Bob", 25), ("Carol", 30)] {
        people.insert(&mut Person::new(name, age), None).unwrap();
    }
    (db, people)
}

/// Sorted names, for order-insensitive comparisons
pub fn names(found: &[Person]) -> Vec<String> {
    let mut names: Vec<String> = found.iter().map(|p| p.name.clone()).collect();
    names.sort();
    names
}

/// File-backed database in a temporary directory
pub struct TestDb {
    pub dir: TempDir,
}

impl TestDb {
    pub fn new() -> Self {
        TestDb {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> std::path::PathBuf {
        self.dir.path().join("store.db")
    }

    pub fn open(&self) -> Arc<Database> {
        Database::open(self.path()).unwrap()
    }
}
