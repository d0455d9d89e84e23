//! Identifier Tests
//!
//! Ids as seen through the store: assignment, ordering, text form.

use crate::common::*;
use std::collections::HashSet;

#[test]
fn ids_are_time_ordered() {
    let gen = IdGenerator::new();
    let earlier = gen.id_at(1_700_000_000);
    let later = gen.id_at(1_700_000_001);

    assert!(earlier < later);
    assert_eq!(earlier.timestamp(), 1_700_000_000);
}

#[test]
fn same_second_ids_differ() {
    let gen = IdGenerator::with_seed(7);
    let a = gen.id_at(1_700_000_000);
    let b = gen.id_at(1_700_000_000);

    assert_ne!(a, b);
    assert_eq!(b.counter(), a.counter() + 1);
}

#[test]
fn text_form_round_trips() {
    let id = DocumentId::new();
    let text = id.to_hex();

    assert_eq!(text.len(), 24);
    assert_eq!(DocumentId::parse(&text).unwrap(), id);
    assert_eq!(text.parse::<DocumentId>().unwrap(), id);
    assert!(DocumentId::parse("not-an-id").is_err());
}

#[test]
fn insert_assigns_distinct_ids() {
    let db = Database::open_in_memory().unwrap();
    let people = db.collection::<Person>("people").unwrap();

    let mut seen = HashSet::new();
    for i in 0..50 {
        let mut person = Person::new(&format!("p{}", i), i);
        let id = people.insert(&mut person, None).unwrap();
        assert!(!id.is_empty());
        assert_eq!(person.id, id);
        assert!(seen.insert(id));
    }
}

#[test]
fn caller_supplied_id_is_kept() {
    let db = Database::open_in_memory().unwrap();
    let people = db.collection::<Person>("people").unwrap();

    let id = DocumentId::new();
    let mut person = Person::new("Eve", 28);
    person.id = id;
    assert_eq!(people.insert(&mut person, None).unwrap(), id);
    assert_eq!(people.get(id, None).unwrap().unwrap().name, "Eve");
}

#[test]
fn ids_are_queryable() {
    let (_db, people) = seeded();
    let bob = people.find_one(&field("name").eq("Bob"), None).unwrap().unwrap();

    let found = people.find_one(&field("id").eq(bob.id), None).unwrap().unwrap();
    assert_eq!(found.name, "Bob");
}
