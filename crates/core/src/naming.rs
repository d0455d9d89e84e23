//! Field naming rules shared by the serializer and the translator
//!
//! The serializer decides how a struct field is spelled inside the payload.
//! The translator has to spell the same field the same way when it renders a
//! JSON path, otherwise predicates silently match nothing. Both sides take
//! their rule from [`FieldNaming`].
//!
//! [`FieldNaming::CamelCase`] reproduces serde's `rename_all = "camelCase"`
//! transform character for character: underscores are removed, the
//! character after an underscore is upper-cased, and the first character is
//! lower-cased. `created_at` and `CreatedAt` both become `createdAt`.

use crate::path::{FieldPath, PathSegment};
use serde::{Deserialize, Serialize};

/// How field names are spelled in stored payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldNaming {
    /// Names are stored exactly as written
    AsIs,
    /// serde `camelCase` rule
    #[default]
    CamelCase,
}

impl FieldNaming {
    /// Apply the rule to one field name
    pub fn apply(&self, name: &str) -> String {
        match self {
            FieldNaming::AsIs => name.to_string(),
            FieldNaming::CamelCase => to_camel_case(name),
        }
    }

    /// Apply the rule to every key segment of a path
    ///
    /// Index segments are kept unchanged.
    pub fn apply_path(&self, path: &FieldPath) -> Vec<PathSegment> {
        path.segments()
            .iter()
            .map(|segment| match segment {
                PathSegment::Key(k) => PathSegment::Key(self.apply(k)),
                PathSegment::Index(i) => PathSegment::Index(*i),
            })
            .collect()
    }
}

fn to_pascal_case(name: &str) -> String {
    let mut pascal = String::with_capacity(name.len());
    let mut capitalize = true;
    for ch in name.chars() {
        if ch == '_' {
            capitalize = true;
        } else if capitalize {
            pascal.push(ch.to_ascii_uppercase());
            capitalize = false;
        } else {
            pascal.push(ch);
        }
    }
    pascal
}

fn to_camel_case(name: &str) -> String {
    let pascal = to_pascal_case(name);
    let mut chars = pascal.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => pascal,
    }
}
