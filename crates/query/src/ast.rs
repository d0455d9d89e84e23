//! Predicate AST
//!
//! Predicates are trees of tagged variants. The translatable subset is
//! constants, field paths, comparisons, `&&`/`||`/`!`, the three string
//! matches and `in` lists. [`Expr::Call`] and [`Expr::Index`] can be built
//! (the parser produces them for arbitrary method calls and element access)
//! but the translator always rejects them.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use stratadoc_core::DocumentId;

/// Constant operand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    /// JSON null
    Null,
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Floating point
    Float(f64),
    /// String
    Text(String),
}

impl Literal {
    /// True for [`Literal::Null`]
    pub fn is_null(&self) -> bool {
        matches!(self, Literal::Null)
    }

    /// Short type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Literal::Null => "null",
            Literal::Bool(_) => "bool",
            Literal::Int(_) => "int",
            Literal::Float(_) => "float",
            Literal::Text(_) => "string",
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => f.write_str("null"),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Int(i) => write!(f, "{}", i),
            Literal::Float(x) => write!(f, "{:?}", x),
            Literal::Text(s) => write!(f, "{:?}", s),
        }
    }
}

macro_rules! literal_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Literal {
            fn from(v: $t) -> Self {
                Literal::Int(i64::from(v))
            }
        })*
    };
}

literal_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Literal {
    fn from(v: f32) -> Self {
        Literal::Float(f64::from(v))
    }
}

impl From<f64> for Literal {
    fn from(v: f64) -> Self {
        Literal::Float(v)
    }
}

impl From<bool> for Literal {
    fn from(v: bool) -> Self {
        Literal::Bool(v)
    }
}

impl From<&str> for Literal {
    fn from(v: &str) -> Self {
        Literal::Text(v.to_string())
    }
}

impl From<String> for Literal {
    fn from(v: String) -> Self {
        Literal::Text(v)
    }
}

impl From<&String> for Literal {
    fn from(v: &String) -> Self {
        Literal::Text(v.clone())
    }
}

impl From<DocumentId> for Literal {
    fn from(v: DocumentId) -> Self {
        Literal::Text(v.to_hex())
    }
}

/// Timestamps compare as the RFC 3339 text chrono's serde impl writes
impl From<DateTime<Utc>> for Literal {
    fn from(v: DateTime<Utc>) -> Self {
        Literal::Text(v.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }
}

impl<T: Into<Literal>> From<Option<T>> for Literal {
    fn from(v: Option<T>) -> Self {
        v.map_or(Literal::Null, Into::into)
    }
}

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl CompareOp {
    /// Operator with operands swapped (`a < b` ⇔ `b > a`)
    pub fn flipped(self) -> Self {
        match self {
            CompareOp::Eq => CompareOp::Eq,
            CompareOp::Ne => CompareOp::Ne,
            CompareOp::Lt => CompareOp::Gt,
            CompareOp::Le => CompareOp::Ge,
            CompareOp::Gt => CompareOp::Lt,
            CompareOp::Ge => CompareOp::Le,
        }
    }

    /// True for `==` and `!=`
    pub fn is_equality(self) -> bool {
        matches!(self, CompareOp::Eq | CompareOp::Ne)
    }

    /// SQL spelling
    pub fn sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }

    /// Predicate syntax spelling
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// String match method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StringMatch {
    /// Substring
    Contains,
    /// Prefix
    StartsWith,
    /// Suffix
    EndsWith,
}

impl StringMatch {
    /// Look up a method by its predicate-syntax name
    pub fn from_method(name: &str) -> Option<Self> {
        match name {
            "contains" => Some(StringMatch::Contains),
            "startsWith" => Some(StringMatch::StartsWith),
            "endsWith" => Some(StringMatch::EndsWith),
            _ => None,
        }
    }

    /// Predicate-syntax method name
    pub fn method(self) -> &'static str {
        match self {
            StringMatch::Contains => "contains",
            StringMatch::StartsWith => "startsWith",
            StringMatch::EndsWith => "endsWith",
        }
    }
}

/// Predicate expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Constant
    Const(Literal),
    /// Field path as written by the caller, e.g. `address.city`
    Field(String),
    /// Binary comparison
    Compare {
        /// Operator
        op: CompareOp,
        /// Left operand
        lhs: Box<Expr>,
        /// Right operand
        rhs: Box<Expr>,
    },
    /// Conjunction
    And(Box<Expr>, Box<Expr>),
    /// Disjunction
    Or(Box<Expr>, Box<Expr>),
    /// Negation
    Not(Box<Expr>),
    /// `target.contains(pattern)` and friends
    StringMatch {
        /// Which match
        kind: StringMatch,
        /// String being searched
        target: Box<Expr>,
        /// Needle
        pattern: Box<Expr>,
    },
    /// `target in [values]`
    In {
        /// Value being tested
        target: Box<Expr>,
        /// Candidate values
        values: Vec<Expr>,
    },
    /// Arbitrary method call; never translatable
    Call {
        /// Receiver
        target: Box<Expr>,
        /// Method name
        method: String,
        /// Arguments
        args: Vec<Expr>,
    },
    /// Element access `target[index]`; never translatable
    Index {
        /// Collection being indexed
        target: Box<Expr>,
        /// Index expression
        index: Box<Expr>,
    },
}

impl Expr {
    /// Constant true
    pub fn always() -> Self {
        Expr::Const(Literal::Bool(true))
    }

    /// Constant false
    pub fn never() -> Self {
        Expr::Const(Literal::Bool(false))
    }

    /// Constant
    pub fn lit(value: impl Into<Literal>) -> Self {
        Expr::Const(value.into())
    }

    /// Comparison node
    pub fn compare(op: CompareOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Compare {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// `self && other`
    pub fn and(self, other: Expr) -> Self {
        Expr::And(Box::new(self), Box::new(other))
    }

    /// `self || other`
    pub fn or(self, other: Expr) -> Self {
        Expr::Or(Box::new(self), Box::new(other))
    }

    /// `!self`
    pub fn negate(self) -> Self {
        Expr::Not(Box::new(self))
    }

    /// Conjunction of every expression; `true` when empty
    pub fn and_all<I: IntoIterator<Item = Expr>>(exprs: I) -> Self {
        exprs
            .into_iter()
            .reduce(Expr::and)
            .unwrap_or_else(Expr::always)
    }

    /// Disjunction of every expression; `false` when empty
    pub fn or_any<I: IntoIterator<Item = Expr>>(exprs: I) -> Self {
        exprs
            .into_iter()
            .reduce(Expr::or)
            .unwrap_or_else(Expr::never)
    }

    /// Tree depth; a leaf is depth 1
    pub fn depth(&self) -> usize {
        match self {
            Expr::Const(_) | Expr::Field(_) => 1,
            Expr::Compare { lhs, rhs, .. } | Expr::And(lhs, rhs) | Expr::Or(lhs, rhs) => {
                1 + lhs.depth().max(rhs.depth())
            }
            Expr::Not(inner) => 1 + inner.depth(),
            Expr::StringMatch {
                target, pattern, ..
            } => 1 + target.depth().max(pattern.depth()),
            Expr::In { target, values } => {
                1 + values
                    .iter()
                    .map(Expr::depth)
                    .fold(target.depth(), usize::max)
            }
            Expr::Call { target, args, .. } => {
                1 + args.iter().map(Expr::depth).fold(target.depth(), usize::max)
            }
            Expr::Index { target, index } => 1 + target.depth().max(index.depth()),
        }
    }

    /// Number of literal operands, excluding nulls
    pub fn literal_count(&self) -> usize {
        match self {
            Expr::Const(Literal::Null) | Expr::Field(_) => 0,
            Expr::Const(_) => 1,
            Expr::Compare { lhs, rhs, .. } | Expr::And(lhs, rhs) | Expr::Or(lhs, rhs) => {
                lhs.literal_count() + rhs.literal_count()
            }
            Expr::Not(inner) => inner.literal_count(),
            Expr::StringMatch {
                target, pattern, ..
            } => target.literal_count() + pattern.literal_count(),
            Expr::In { target, values } => {
                target.literal_count() + values.iter().map(Expr::literal_count).sum::<usize>()
            }
            Expr::Call { target, args, .. } => {
                target.literal_count() + args.iter().map(Expr::literal_count).sum::<usize>()
            }
            Expr::Index { target, index } => target.literal_count() + index.literal_count(),
        }
    }
}

impl std::ops::Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        self.negate()
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

/// Renders in predicate syntax; used to name subexpressions in errors
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Const(lit) => write!(f, "{}", lit),
            Expr::Field(path) => f.write_str(path),
            Expr::Compare { op, lhs, rhs } => write!(f, "{} {} {}", lhs, op.symbol(), rhs),
            Expr::And(l, r) => write!(f, "({} && {})", l, r),
            Expr::Or(l, r) => write!(f, "({} || {})", l, r),
            Expr::Not(inner) => write!(f, "!({})", inner),
            Expr::StringMatch {
                kind,
                target,
                pattern,
            } => write!(f, "{}.{}({})", target, kind.method(), pattern),
            Expr::In { target, values } => {
                write!(f, "{} in [", target)?;
                write_list(f, values)?;
                f.write_str("]")
            }
            Expr::Call {
                target,
                method,
                args,
            } => {
                write!(f, "{}.{}(", target, method)?;
                write_list(f, args)?;
                f.write_str(")")
            }
            Expr::Index { target, index } => write!(f, "{}[{}]", target, index),
        }
    }
}
