//! Index Tests
//!
//! Index lifecycle through the collection facade and the catalog.

use crate::common::*;

#[test]
fn create_index_is_idempotent() {
    let (_db, people) = seeded();

    let first = people.create_index("age", None).unwrap();
    let second = people.create_index("age", None).unwrap();

    assert_eq!(first.name, "people_age");
    assert_eq!(first.name, second.name);
    assert_eq!(first.native_name, second.native_name);
    assert_eq!(people.list_indexes(None).unwrap().len(), 1);
}

#[test]
fn queries_are_unchanged_by_indexes() {
    let (_db, people) = seeded();
    let before = people.count(&field("age").eq(30), None).unwrap();

    people.create_index("age", None).unwrap();
    assert_eq!(people.count(&field("age").eq(30), None).unwrap(), before);
}

#[test]
fn non_unique_index_allows_repeats() {
    let (_db, people) = seeded();
    people.create_index("age", None).unwrap();

    people.insert(&mut Person::new("Dora", 30), None).unwrap();
    assert_eq!(people.count(&field("age").eq(30), None).unwrap(), 3);
}

#[test]
fn unique_index_rejects_duplicates() {
    let db = Database::open_in_memory().unwrap();
    let people = db.collection::<Person>("people").unwrap();
    people
        .create_index_with("email", IndexOptions::new().with_unique(true), None)
        .unwrap();

    people
        .insert(&mut Person::new("Ada", 36).with_email("ada@example.com"), None)
        .unwrap();
    let err = people
        .insert(&mut Person::new("Imposter", 1).with_email("ada@example.com"), None)
        .unwrap_err();

    assert!(err.is_duplicate_key());
    match err {
        Error::DuplicateKey { collection, value } => {
            assert_eq!(collection, "people");
            assert_eq!(value, "\"ada@example.com\"");
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(people.count_all(None).unwrap(), 1);
}

#[test]
fn unique_index_ignores_missing_values() {
    let db = Database::open_in_memory().unwrap();
    let people = db.collection::<Person>("people").unwrap();
    people
        .create_index_with("email", IndexOptions::new().with_unique(true), None)
        .unwrap();

    people.insert(&mut Person::new("NoMail1", 1), None).unwrap();
    people.insert(&mut Person::new("NoMail2", 2), None).unwrap();
    assert_eq!(people.count_all(None).unwrap(), 2);
}

#[test]
fn unique_index_on_colliding_data_fails() {
    let (_db, people) = seeded();

    let err = people
        .create_index_with("age", IndexOptions::new().with_unique(true), None)
        .unwrap_err();
    assert!(err.is_duplicate_key());
    assert!(people.list_indexes(None).unwrap().is_empty());
}

#[test]
fn unique_index_is_scoped_to_collection() {
    let db = Database::open_in_memory().unwrap();
    let staff = db.collection::<Person>("staff").unwrap();
    let guests = db.collection::<Person>("guests").unwrap();
    staff
        .create_index_with("email", IndexOptions::new().with_unique(true), None)
        .unwrap();

    staff
        .insert(&mut Person::new("Ada", 36).with_email("ada@example.com"), None)
        .unwrap();
    guests
        .insert(&mut Person::new("Ada", 36).with_email("ada@example.com"), None)
        .unwrap();
}

#[test]
fn update_respects_unique_index() {
    let db = Database::open_in_memory().unwrap();
    let people = db.collection::<Person>("people").unwrap();
    people
        .create_index_with("email", IndexOptions::new().with_unique(true), None)
        .unwrap();
    people
        .insert(&mut Person::new("Ada", 36).with_email("ada@example.com"), None)
        .unwrap();
    let mut bob = Person::new("Bob", 30).with_email("bob@example.com");
    people.insert(&mut bob, None).unwrap();

    bob.email = Some("ada@example.com".into());
    assert!(people.update(&mut bob, None).unwrap_err().is_duplicate_key());
    assert_eq!(
        people.get(bob.id, None).unwrap().unwrap().email.as_deref(),
        Some("bob@example.com")
    );
}

#[test]
fn nested_and_sparse_indexes() {
    let (_db, people) = seeded();

    let info = people
        .create_index_with("address.city", IndexOptions::new().with_sparse(true), None)
        .unwrap();
    assert_eq!(info.name, "people_address.city");
    assert!(info.sparse);
    assert!(!info.unique);
    assert_eq!(info.field_path.to_path_string(), "address.city");
}

#[test]
fn drop_index_and_collection() {
    let (db, people) = seeded();
    people.create_index("age", None).unwrap();

    assert!(people.drop_index("age", None).unwrap());
    assert!(!people.drop_index("age", None).unwrap());

    people.create_index("name", None).unwrap();
    assert!(db.catalog().drop_collection("people", None).unwrap());
    assert!(!db.catalog().exists("people", None).unwrap());
    assert!(db.indexes().list_indexes("people", None).is_err());
}

#[test]
fn invalid_index_path_is_rejected() {
    let (_db, people) = seeded();

    assert!(people.create_index("", None).is_err());
    assert!(people.create_index("tags[0]", None).is_err());
}

#[test]
fn dotted_and_underscored_paths_are_distinct_indexes() {
    let db = Database::open_in_memory().unwrap();
    let docs = db
        .collection_with::<serde_json::Value, _>("flat", JsonSerializer::new(FieldNaming::AsIs))
        .unwrap();

    docs.create_index("a.b", None).unwrap();
    let unique = docs
        .create_index_with("a_b", IndexOptions::new().with_unique(true), None)
        .unwrap();
    assert!(unique.unique);
    assert_eq!(docs.list_indexes(None).unwrap().len(), 2);

    docs.insert(&mut json!({"a_b": 1}), None).unwrap();
    let err = docs.insert(&mut json!({"a_b": 1}), None).unwrap_err();
    assert!(err.is_duplicate_key());

    assert!(docs.drop_index("a_b", None).unwrap());
    let left = docs.list_indexes(None).unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].field_path.to_path_string(), "a.b");
}
