//! Persistence Tests
//!
//! File-backed databases: reopen, shared handles, configuration.

use crate::common::*;
use std::sync::Arc;

#[test]
fn documents_and_indexes_survive_reopen() {
    let test_db = TestDb::new();
    let id = {
        let db = test_db.open();
        let people = db.collection::<Person>("people").unwrap();
        people
            .create_index_with("email", IndexOptions::new().with_unique(true), None)
            .unwrap();
        people
            .insert(&mut Person::new("Ada", 36).with_email("ada@example.com"), None)
            .unwrap()
    };

    let db = test_db.open();
    let people = db.collection::<Person>("people").unwrap();
    assert_eq!(people.get(id, None).unwrap().unwrap().name, "Ada");
    assert_eq!(people.list_indexes(None).unwrap().len(), 1);

    let err = people
        .insert(&mut Person::new("Copy", 1).with_email("ada@example.com"), None)
        .unwrap_err();
    assert!(err.is_duplicate_key());
}

#[test]
fn same_path_shares_one_handle() {
    let test_db = TestDb::new();
    let a = test_db.open();
    let b = test_db.open();
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn collections_listed_by_name() {
    let test_db = TestDb::new();
    {
        let db = test_db.open();
        db.collection::<Person>("zebras").unwrap();
        db.collection::<Person>("ants").unwrap();
    }

    let db = test_db.open();
    let listed: Vec<String> = db
        .catalog()
        .list(None)
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(listed, vec!["ants", "zebras"]);
}

#[test]
fn invalid_config_is_rejected_before_open() {
    let test_db = TestDb::new();
    let config = StoreConfig {
        journal_mode: "sideways".into(),
        ..StoreConfig::default()
    };

    let err = Database::open_with_config(test_db.path(), config).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn insensitive_like_is_configurable() {
    let config = StoreConfig {
        case_sensitive_like: false,
        ..StoreConfig::default()
    };
    let db = Database::open_in_memory_with_config(config).unwrap();
    let people = db.collection::<Person>("people").unwrap();
    people.insert(&mut Person::new("Alice", 30), None).unwrap();

    assert_eq!(people.count(&field("name").starts_with("al"), None).unwrap(), 1);
}

#[test]
fn concurrent_writers_share_the_handle() {
    let test_db = TestDb::new();
    let db = test_db.open();
    let people = db.collection::<Person>("people").unwrap();

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let people = people.clone();
            std::thread::spawn(move || {
                for i in 0..25 {
                    people
                        .insert(&mut Person::new(&format!("t{}-{}", t, i), i), None)
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(people.count_all(None).unwrap(), 100);
}
