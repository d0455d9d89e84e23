//! Query Tests
//!
//! Predicates built with the fluent builder and the text syntax, run against
//! a seeded collection.

use crate::common::*;
use proptest::prelude::*;

// ============================================================================
// Equality and counting
// ============================================================================

#[test]
fn equality_finds_matching_documents() {
    let (_db, people) = seeded();

    let found = people
        .find(&field("age").eq(30), &FindOptions::new(), None)
        .unwrap();

    assert_eq!(names(&found), vec!["Alice", "Carol"]);
    assert_eq!(people.count(&field("age").eq(30), None).unwrap(), 2);
}

#[test]
fn text_predicate_matches_builder() {
    let (_db, people) = seeded();

    let parsed = parse("age == 30").unwrap();
    assert_eq!(parsed, field("age").eq(30));
    assert_eq!(people.count(&parsed, None).unwrap(), 2);
}

#[test]
fn empty_result_is_not_an_error() {
    let (_db, people) = seeded();

    let found = people
        .find(&field("age").gt(100), &FindOptions::new(), None)
        .unwrap();

    assert!(found.is_empty());
    assert!(!people.any(&field("age").gt(100), None).unwrap());
    assert!(people.find_one(&field("age").gt(100), None).unwrap().is_none());
}

#[test]
fn logical_combinations() {
    let (_db, people) = seeded();

    let either = field("name").eq("Bob").or(field("name").eq("Carol"));
    assert_eq!(people.count(&either, None).unwrap(), 2);

    let both = parse(r#"age == 30 && name != "Alice""#).unwrap();
    let found = people.find(&both, &FindOptions::new(), None).unwrap();
    assert_eq!(names(&found), vec!["Carol"]);

    let negated = !field("age").eq(30);
    assert_eq!(people.count(&negated, None).unwrap(), 1);
}

#[test]
fn membership() {
    let (_db, people) = seeded();

    let found = people
        .find(
            &field("name").is_in(["Alice", "Bob", "Zed"]),
            &FindOptions::new(),
            None,
        )
        .unwrap();
    assert_eq!(names(&found), vec!["Alice", "Bob"]);
}

// ============================================================================
// String matching
// ============================================================================

#[test]
fn contains_matches_substring() {
    let (_db, people) = seeded();
    people.insert(&mut Person::new("Alicia", 22), None).unwrap();

    let found = people
        .find(&field("name").contains("Ali"), &FindOptions::new(), None)
        .unwrap();
    assert_eq!(names(&found), vec!["Alice", "Alicia"]);
}

#[test]
fn starts_and_ends_with() {
    let (_db, people) = seeded();

    assert_eq!(people.count(&field("name").starts_with("Ca"), None).unwrap(), 1);
    assert_eq!(people.count(&parse(r#"name.endsWith("b")"#).unwrap(), None).unwrap(), 1);
}

#[test]
fn like_is_case_sensitive_by_default() {
    let (_db, people) = seeded();

    assert_eq!(people.count(&field("name").starts_with("al"), None).unwrap(), 0);
    assert_eq!(people.count(&field("name").starts_with("Al"), None).unwrap(), 1);
}

#[test]
fn like_metacharacters_are_literal() {
    let db = Database::open_in_memory().unwrap();
    let tags = db.collection::<Person>("tags").unwrap();
    for name in ["50%", "50x", "a_b", "axb"] {
        tags.insert(&mut Person::new(name, 1), None).unwrap();
    }

    let found = tags
        .find(&field("name").contains("50%"), &FindOptions::new(), None)
        .unwrap();
    assert_eq!(names(&found), vec!["50%"]);

    let found = tags
        .find(&field("name").starts_with("a_"), &FindOptions::new(), None)
        .unwrap();
    assert_eq!(names(&found), vec!["a_b"]);
}

// ============================================================================
// Nested fields and nulls
// ============================================================================

#[test]
fn nested_field_translation_and_match() {
    let db = Database::open_in_memory().unwrap();
    let people = db.collection::<Person>("people").unwrap();
    people
        .insert(&mut Person::new("Ana", 41).with_city("Paris", "75001"), None)
        .unwrap();
    people
        .insert(&mut Person::new("Ben", 35).with_city("Lyon", "69001"), None)
        .unwrap();

    let predicate = field("address.city").eq("Paris");
    let translation = Translator::new(FieldNaming::CamelCase)
        .translate(&predicate)
        .unwrap();
    assert_eq!(translation.clause, "json_extract(data, '$.address.city') = ?");

    let found = people.find(&predicate, &FindOptions::new(), None).unwrap();
    assert_eq!(names(&found), vec!["Ana"]);

    // Member names follow the serializer's camelCase policy.
    let by_zip = people.count(&field("address.zip_code").eq("69001"), None).unwrap();
    assert_eq!(by_zip, 1);
}

#[test]
fn missing_and_null_fields_compare_as_null() {
    let (_db, people) = seeded();
    people
        .insert(&mut Person::new("Dave", 50).with_email("dave@example.com"), None)
        .unwrap();

    assert_eq!(people.count(&field("email").is_null(), None).unwrap(), 3);
    assert_eq!(people.count(&field("email").is_not_null(), None).unwrap(), 1);
    assert_eq!(people.count(&parse("email == null").unwrap(), None).unwrap(), 3);
}

#[test]
fn inequality_and_negation_skip_missing_fields() {
    let (_db, people) = seeded();
    people
        .insert(&mut Person::new("Dave", 50).with_email("dave@example.com"), None)
        .unwrap();

    // Comparisons against an absent member are unknown, and so are their
    // negations; only `== null` / `!= null` see the other three.
    let ne = people.count(&field("email").ne("x@example.com"), None).unwrap();
    let not_eq = people
        .count(&parse("!(email == \"x@example.com\")").unwrap(), None)
        .unwrap();
    assert_eq!(ne, 1);
    assert_eq!(not_eq, 1);

    let either = people
        .count(&parse("email != \"x@example.com\" || email == null").unwrap(), None)
        .unwrap();
    assert_eq!(either, 4);
}

#[test]
fn untranslatable_predicate_is_rejected() {
    let (_db, people) = seeded();

    let err = people.count(&parse("name.toUpper() == \"ALICE\"").unwrap(), None).unwrap_err();
    assert!(err.is_invalid_query());
    assert!(err.to_string().contains("toUpper"));
}

#[test]
fn unsupported_operand_behind_constant_is_rejected() {
    let (_db, people) = seeded();

    let predicate = parse("false && name.toUpper() == \"X\"").unwrap();
    let err = people.count(&predicate, None).unwrap_err();
    assert!(err.is_invalid_query());
    assert!(err.to_string().contains("toUpper"));
}

#[test]
fn deeply_nested_text_is_rejected() {
    let (_db, people) = seeded();

    let text = format!("{}age == 30{}", "(".repeat(50_000), ")".repeat(50_000));
    let err = parse(&text).unwrap_err();
    assert!(matches!(err, Error::Limit(_)));
    assert_eq!(people.count_all(None).unwrap(), 3);
}

// ============================================================================
// Paging and ordering
// ============================================================================

#[test]
fn default_order_is_insertion_order() {
    let (_db, people) = seeded();

    let all: Vec<String> = people.all(None).unwrap().into_iter().map(|p| p.name).collect();
    assert_eq!(all, vec!["Alice", "Bob", "Carol"]);
}

#[test]
fn skip_and_limit() {
    let (_db, people) = seeded();

    let page: Vec<String> = people
        .find(
            &stratadoc::Expr::always(),
            &FindOptions::new().skip(1).limit(1),
            None,
        )
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(page, vec!["Bob"]);

    let tail = people
        .find(&stratadoc::Expr::always(), &FindOptions::new().skip(2), None)
        .unwrap();
    assert_eq!(names(&tail), vec!["Carol"]);
}

#[test]
fn order_by_field_breaks_ties_by_insertion() {
    let (_db, people) = seeded();

    let options = FindOptions::new().order_by(
        stratadoc::FieldPath::parse("age").unwrap(),
        SortOrder::Desc,
    );
    let ordered: Vec<String> = people
        .find(&stratadoc::Expr::always(), &options, None)
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(ordered, vec!["Alice", "Carol", "Bob"]);
}

#[test]
fn collections_are_isolated() {
    let (db, people) = seeded();
    let others = db.collection::<Person>("others").unwrap();
    others.insert(&mut Person::new("Alice", 30), None).unwrap();

    assert_eq!(people.count(&field("name").eq("Alice"), None).unwrap(), 1);
    assert_eq!(others.count_all(None).unwrap(), 1);
    assert_eq!(people.count_all(None).unwrap(), 3);
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn find_length_equals_count(ages in proptest::collection::vec(0i64..10, 0..20), pivot in 0i64..10) {
        let db = Database::open_in_memory().unwrap();
        let people = db.collection::<Person>("people").unwrap();
        for (i, age) in ages.iter().enumerate() {
            people.insert(&mut Person::new(&format!("p{}", i), *age), None).unwrap();
        }

        for predicate in [field("age").lt(pivot), field("age").eq(pivot), field("age").ge(pivot)] {
            let found = people.find(&predicate, &FindOptions::new(), None).unwrap();
            let count = people.count(&predicate, None).unwrap();
            prop_assert_eq!(found.len() as u64, count);
        }

        let expected = ages.iter().filter(|a| **a >= pivot).count() as u64;
        prop_assert_eq!(people.count(&field("age").ge(pivot), None).unwrap(), expected);
    }
}
