//! Fluent predicate construction
//!
//! ```
//! use stratadoc_query::field;
//!
//! let adults_in_seattle = field("age")
//!     .ge(18)
//!     .and(field("address.city").eq("Seattle"))
//!     .and(!field("name").starts_with("Test"));
//! assert_eq!(
//!     adults_in_seattle.to_string(),
//!     "((age >= 18 && address.city == \"Seattle\") && !(name.startsWith(\"Test\")))"
//! );
//! ```

use crate::ast::{CompareOp, Expr, Literal, StringMatch};

/// Start a predicate on a field path
pub fn field(path: impl Into<String>) -> FieldRef {
    FieldRef(path.into())
}

/// Reference to a document field, the left side of a predicate
#[derive(Debug, Clone)]
pub struct FieldRef(String);

impl FieldRef {
    /// The path as written
    pub fn path(&self) -> &str {
        &self.0
    }

    /// The bare field as an expression (truthy test in boolean position)
    pub fn expr(self) -> Expr {
        Expr::Field(self.0)
    }

    fn compare(self, op: CompareOp, value: impl Into<Literal>) -> Expr {
        Expr::compare(op, Expr::Field(self.0), Expr::Const(value.into()))
    }

    /// `field == value`
    #[allow(clippy::should_implement_trait)]
    pub fn eq(self, value: impl Into<Literal>) -> Expr {
        self.compare(CompareOp::Eq, value)
    }

    /// `field != value`
    pub fn ne(self, value: impl Into<Literal>) -> Expr {
        self.compare(CompareOp::Ne, value)
    }

    /// `field < value`
    pub fn lt(self, value: impl Into<Literal>) -> Expr {
        self.compare(CompareOp::Lt, value)
    }

    /// `field <= value`
    pub fn le(self, value: impl Into<Literal>) -> Expr {
        self.compare(CompareOp::Le, value)
    }

    /// `field > value`
    pub fn gt(self, value: impl Into<Literal>) -> Expr {
        self.compare(CompareOp::Gt, value)
    }

    /// `field >= value`
    pub fn ge(self, value: impl Into<Literal>) -> Expr {
        self.compare(CompareOp::Ge, value)
    }

    /// `field == null`
    pub fn is_null(self) -> Expr {
        self.compare(CompareOp::Eq, Literal::Null)
    }

    /// `field != null`
    pub fn is_not_null(self) -> Expr {
        self.compare(CompareOp::Ne, Literal::Null)
    }

    /// Compare against another field
    pub fn cmp_field(self, op: CompareOp, other: FieldRef) -> Expr {
        Expr::compare(op, Expr::Field(self.0), Expr::Field(other.0))
    }

    fn string_match(self, kind: StringMatch, needle: impl Into<String>) -> Expr {
        Expr::StringMatch {
            kind,
            target: Box::new(Expr::Field(self.0)),
            pattern: Box::new(Expr::Const(Literal::Text(needle.into()))),
        }
    }

    /// Substring match
    pub fn contains(self, needle: impl Into<String>) -> Expr {
        self.string_match(StringMatch::Contains, needle)
    }

    /// Prefix match
    pub fn starts_with(self, prefix: impl Into<String>) -> Expr {
        self.string_match(StringMatch::StartsWith, prefix)
    }

    /// Suffix match
    pub fn ends_with(self, suffix: impl Into<String>) -> Expr {
        self.string_match(StringMatch::EndsWith, suffix)
    }

    /// Membership in a constant list
    pub fn is_in<I, V>(self, values: I) -> Expr
    where
        I: IntoIterator<Item = V>,
        V: Into<Literal>,
    {
        Expr::In {
            target: Box::new(Expr::Field(self.0)),
            values: values.into_iter().map(|v| Expr::Const(v.into())).collect(),
        }
    }
}

impl From<FieldRef> for Expr {
    fn from(f: FieldRef) -> Self {
        f.expr()
    }
}

/// `!field` for boolean fields
impl std::ops::Not for FieldRef {
    type Output = Expr;

    fn not(self) -> Expr {
        self.expr().negate()
    }
}
