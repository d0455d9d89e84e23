//! Write Path Tests
//!
//! Insert, update and delete, including versions and timestamps.

use crate::common::*;

// ============================================================================
// Insert
// ============================================================================

#[test]
fn insert_then_get() {
    let db = Database::open_in_memory().unwrap();
    let people = db.collection::<Person>("people").unwrap();

    let mut ada = Person::new("Ada", 36).with_city("London", "N1");
    let id = people.insert(&mut ada, None).unwrap();

    let stored = people.get_stored(id, None).unwrap().unwrap();
    assert_eq!(stored.id, id);
    assert_eq!(stored.version, 1);
    assert_eq!(stored.created_at, stored.updated_at);
    assert_eq!(stored.document, ada);
    assert!(ada.created_at.is_some());
}

#[test]
fn get_unknown_id_is_none() {
    let (_db, people) = seeded();
    assert!(people.get(DocumentId::new(), None).unwrap().is_none());
}

#[test]
fn duplicate_id_is_rejected() {
    let (_db, people) = seeded();
    let alice = people.find_one(&field("name").eq("Alice"), None).unwrap().unwrap();

    let mut copy = Person::new("Impostor", 1);
    copy.id = alice.id;
    let err = people.insert(&mut copy, None).unwrap_err();

    assert!(err.is_duplicate_key());
    assert!(err.to_string().contains(&alice.id.to_hex()));
    assert_eq!(people.count_all(None).unwrap(), 3);
}

#[test]
fn insert_many_is_all_or_nothing() {
    let (_db, people) = seeded();
    let existing = people.find_one(&field("name").eq("Bob"), None).unwrap().unwrap();

    let mut clash = Person::new("Clash", 2);
    clash.id = existing.id;
    let mut batch = vec![Person::new("New", 1), clash];
    assert!(people.insert_many(&mut batch, None).unwrap_err().is_duplicate_key());
    assert_eq!(people.count(&field("name").eq("New"), None).unwrap(), 0);

    let mut batch = vec![Person::new("Dan", 40), Person::new("Eve", 41)];
    assert_eq!(people.insert_many(&mut batch, None).unwrap(), 2);
    assert_eq!(people.count_all(None).unwrap(), 5);
}

#[test]
fn untyped_documents() {
    let db = Database::open_in_memory().unwrap();
    let events = db.collection::<serde_json::Value>("events").unwrap();

    let mut event = json!({"kind": "login", "user": {"name": "ada"}});
    let id = events.insert(&mut event, None).unwrap();
    assert_eq!(event["id"], json!(id.to_hex()));

    let found = events
        .find(&field("user.name").eq("ada"), &FindOptions::new(), None)
        .unwrap();
    assert_eq!(found, vec![event]);
}

#[test]
fn non_object_payload_is_rejected() {
    let db = Database::open_in_memory().unwrap();
    let values = db.collection::<serde_json::Value>("values").unwrap();

    let err = values.insert(&mut json!([1, 2, 3]), None).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

// ============================================================================
// Update
// ============================================================================

#[test]
fn update_bumps_version() {
    let (_db, people) = seeded();
    let mut bob = people.find_one(&field("name").eq("Bob"), None).unwrap().unwrap();

    bob.age = 26;
    assert!(people.update(&mut bob, None).unwrap());
    bob.age = 27;
    assert!(people.update(&mut bob, None).unwrap());

    let stored = people.get_stored(bob.id, None).unwrap().unwrap();
    assert_eq!(stored.version, 3);
    assert_eq!(stored.document.age, 27);
    assert!(stored.updated_at >= stored.created_at);
}

#[test]
fn update_unknown_document_is_not_upsert() {
    let (_db, people) = seeded();

    let mut ghost = Person::new("Ghost", 1);
    assert!(!people.update(&mut ghost, None).unwrap());
    ghost.id = DocumentId::new();
    assert!(!people.update(&mut ghost, None).unwrap());
    assert_eq!(people.count_all(None).unwrap(), 3);
}

#[test]
fn update_many_applies_closure() {
    let (_db, people) = seeded();

    let updated = people
        .update_many(&field("age").eq(30), |p| p.age += 1, None)
        .unwrap();
    assert_eq!(updated, 2);
    assert_eq!(people.count(&field("age").eq(31), None).unwrap(), 2);
    assert_eq!(people.count(&field("age").eq(25), None).unwrap(), 1);
}

#[test]
fn update_one_keeps_id() {
    let (_db, people) = seeded();
    let alice = people.find_one(&field("name").eq("Alice"), None).unwrap().unwrap();

    let matched = people
        .update_one(
            &field("age").eq(30),
            |p| {
                p.id = DocumentId::new();
                p.name = "Alicia".into();
            },
            None,
        )
        .unwrap();
    assert!(matched);

    let reloaded = people.get(alice.id, None).unwrap().unwrap();
    assert_eq!(reloaded.name, "Alicia");
    assert_eq!(reloaded.id, alice.id);
    assert_eq!(people.count_all(None).unwrap(), 3);
}

// ============================================================================
// Delete
// ============================================================================

#[test]
fn delete_by_id() {
    let (_db, people) = seeded();
    let bob = people.find_one(&field("name").eq("Bob"), None).unwrap().unwrap();

    assert!(people.delete(bob.id, None).unwrap());
    assert!(!people.delete(bob.id, None).unwrap());
    assert!(people.get(bob.id, None).unwrap().is_none());
}

#[test]
fn delete_one_takes_first_match() {
    let (_db, people) = seeded();

    assert!(people.delete_one(&field("age").eq(30), None).unwrap());
    let left = people.all(None).unwrap();
    assert_eq!(names(&left), vec!["Bob", "Carol"]);
    assert!(!people.delete_one(&field("age").eq(99), None).unwrap());
}

#[test]
fn delete_many_reports_count() {
    let (_db, people) = seeded();

    assert_eq!(people.delete_many(&parse("age >= 30").unwrap(), None).unwrap(), 2);
    assert_eq!(people.count_all(None).unwrap(), 1);
}
