//! Transaction Tests
//!
//! Explicit transactions spanning several collections.

use crate::common::*;

#[test]
fn commit_makes_writes_visible() {
    let (db, people) = seeded();
    let pets = db.collection::<Person>("pets").unwrap();

    db.transaction(|txn| {
        people.insert(&mut Person::new("Dan", 40), Some(txn))?;
        pets.insert(&mut Person::new("Rex", 3), Some(txn))?;
        Ok(())
    })
    .unwrap();

    assert_eq!(people.count_all(None).unwrap(), 4);
    assert_eq!(pets.count_all(None).unwrap(), 1);
}

#[test]
fn error_rolls_back_every_write() {
    let (db, people) = seeded();

    let result: stratadoc::Result<()> = db.transaction(|txn| {
        people.insert(&mut Person::new("Dan", 40), Some(txn))?;
        people.delete_many(&field("age").eq(30), Some(txn))?;
        Err(Error::invalid_argument("abort"))
    });

    assert!(matches!(result, Err(Error::InvalidArgument(_))));
    assert_eq!(people.count_all(None).unwrap(), 3);
    assert_eq!(people.count(&field("name").eq("Dan"), None).unwrap(), 0);
}

#[test]
fn reads_inside_transaction_see_own_writes() {
    let (db, people) = seeded();

    let txn = db.begin().unwrap();
    people.insert(&mut Person::new("Dan", 30), Some(&txn)).unwrap();
    assert_eq!(people.count(&field("age").eq(30), Some(&txn)).unwrap(), 3);
    txn.rollback().unwrap();

    assert_eq!(people.count(&field("age").eq(30), None).unwrap(), 2);
}

#[test]
fn dropped_transaction_rolls_back() {
    let (db, people) = seeded();

    {
        let txn = db.begin().unwrap();
        people.delete_many(&stratadoc::Expr::always(), Some(&txn)).unwrap();
    }

    assert_eq!(people.count_all(None).unwrap(), 3);
}

#[test]
fn collection_created_in_rolled_back_transaction_is_gone() {
    let db = Database::open_in_memory().unwrap();

    let txn = db.begin().unwrap();
    db.catalog().resolve("scratch", Some(&txn)).unwrap();
    assert!(db.catalog().exists("scratch", Some(&txn)).unwrap());
    txn.rollback().unwrap();

    assert!(!db.catalog().exists("scratch", None).unwrap());
}

#[test]
fn failed_index_creation_inside_transaction_keeps_earlier_writes() {
    let (db, people) = seeded();

    let txn = db.begin().unwrap();
    people.insert(&mut Person::new("Dan", 30), Some(&txn)).unwrap();
    let err = people
        .create_index_with("age", IndexOptions::new().with_unique(true), Some(&txn))
        .unwrap_err();
    assert!(err.is_duplicate_key());
    txn.commit().unwrap();

    assert_eq!(people.count_all(None).unwrap(), 4);
    assert!(people.list_indexes(None).unwrap().is_empty());
}
