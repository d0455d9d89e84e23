//! Predicate → SQL filter translation
//!
//! [`Translator::translate`] compiles an [`Expr`] into a SQL boolean clause
//! over the payload column plus the ordered list of values bound to its `?`
//! placeholders.
//!
//! ## Rendering
//!
//! | Predicate | Clause |
//! |-----------|--------|
//! | `address.city == "x"` | `json_extract(data, '$.address.city') = ?` |
//! | `nick == null` | `json_extract(data, '$.nick') IS NULL` |
//! | `a && b` | `(A) AND (B)` |
//! | `!a` | `NOT (A)` |
//! | `name.contains("x")` | `json_extract(data, '$.name') LIKE ? ESCAPE '\'` bound to `%x%` |
//! | `s in [1, 2]` | `json_extract(data, '$.s') IN (?, ?)` |
//! | `active` | `json_extract(data, '$.active') = 1` |
//!
//! User values only ever travel as parameters. Field paths are rendered
//! inline because their segments are restricted to `[A-Za-z0-9_-]`; that
//! keeps the accessor text identical to the one native expression indexes
//! are built on, which is what lets SQLite use those indexes.
//!
//! Parameters are numbered in visitation order (depth-first, left to right),
//! so two predicates with the same shape produce the same clause text.

use crate::ast::{CompareOp, Expr, Literal, StringMatch};
use crate::fold::fold;
use std::fmt;
use stratadoc_core::{
    Error, FieldNaming, FieldPath, LimitError, PathSegment, Result, MAX_PREDICATE_DEPTH,
};
use tracing::trace;

/// Default payload column
pub const DEFAULT_COLUMN: &str = "data";

/// Escape character used in LIKE patterns
pub const LIKE_ESCAPE: char = '\\';

/// A value bound to a `?` placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// Integer; booleans bind as 1/0, matching `json_extract` output
    Int(i64),
    /// Floating point
    Float(f64),
    /// Text
    Text(String),
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Int(i) => write!(f, "{}", i),
            Param::Float(x) => write!(f, "{:?}", x),
            Param::Text(s) => write!(f, "{:?}", s),
        }
    }
}

/// Output of a translation
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    /// SQL boolean expression with `?` placeholders
    pub clause: String,
    /// Values for the placeholders, in order
    pub params: Vec<Param>,
}

impl Translation {
    /// Clause that matches every row
    pub fn match_all() -> Self {
        Translation {
            clause: "1".to_string(),
            params: Vec::new(),
        }
    }
}

/// Compiles predicates against one payload column and naming rule
///
/// Stateless and `Send + Sync`; share one instance freely.
#[derive(Debug, Clone)]
pub struct Translator {
    naming: FieldNaming,
    column: String,
}

impl Default for Translator {
    fn default() -> Self {
        Self::new(FieldNaming::default())
    }
}

impl Translator {
    /// Translator over the default `data` column
    pub fn new(naming: FieldNaming) -> Self {
        Translator {
            naming,
            column: DEFAULT_COLUMN.to_string(),
        }
    }

    /// Use a different payload column (must be a plain SQL identifier)
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    /// Naming rule applied to path segments
    pub fn naming(&self) -> FieldNaming {
        self.naming
    }

    /// Compile a predicate
    ///
    /// # Errors
    ///
    /// `InvalidQuery` naming the first unsupported subexpression, or
    /// `Limit` when the tree is deeper than [`MAX_PREDICATE_DEPTH`].
    pub fn translate(&self, expr: &Expr) -> Result<Translation> {
        let depth = expr.depth();
        if depth > MAX_PREDICATE_DEPTH {
            return Err(LimitError::PredicateTooDeep {
                depth,
                max: MAX_PREDICATE_DEPTH,
            }
            .into());
        }

        // Folding may discard whole operands, so reject what can never
        // compile before it runs.
        self.check_supported(expr)?;
        let folded = fold(expr);
        let mut compiler = Compiler {
            translator: self,
            params: Vec::new(),
        };
        let clause = compiler.boolean(&folded)?;
        trace!(target: "stratadoc::query", %clause, params = compiler.params.len(), "translated predicate");
        Ok(Translation {
            clause,
            params: compiler.params,
        })
    }

    fn check_supported(&self, expr: &Expr) -> Result<()> {
        match expr {
            Expr::Const(_) => Ok(()),
            Expr::Field(raw) => self.field_accessor(expr, raw).map(|_| ()),
            Expr::Compare { lhs, rhs, .. } | Expr::And(lhs, rhs) | Expr::Or(lhs, rhs) => {
                self.check_supported(lhs)?;
                self.check_supported(rhs)
            }
            Expr::Not(inner) => self.check_supported(inner),
            Expr::StringMatch {
                target, pattern, ..
            } => {
                self.check_supported(target)?;
                self.check_supported(pattern)
            }
            Expr::In { target, values } => {
                self.check_supported(target)?;
                values.iter().try_for_each(|v| self.check_supported(v))
            }
            Expr::Call { method, .. } => Err(unsupported(
                expr,
                format!("method '{}' has no translation", method),
            )),
            Expr::Index { .. } => Err(unsupported(expr, "element indexing is not supported")),
        }
    }

    fn field_accessor(&self, expr: &Expr, raw: &str) -> Result<String> {
        let path = FieldPath::parse(raw)
            .map_err(|e| unsupported(expr, format!("invalid field path: {}", e)))?;
        if path.first_index().is_some() {
            return Err(unsupported(expr, "element indexing is not supported"));
        }
        self.accessor(&path).map_err(|e| unsupported(expr, e.to_string()))
    }

    /// JSON path for a field, e.g. `$.address.city`
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if the path does not parse or contains an index
    /// segment.
    pub fn json_path(&self, path: &FieldPath) -> Result<String> {
        if let Some(idx) = path.first_index() {
            return Err(Error::invalid_argument(format!(
                "field path '{}' indexes element [{}]; only member paths are supported",
                path, idx
            )));
        }
        let mut rendered = String::from("$");
        for segment in self.naming.apply_path(path) {
            if let PathSegment::Key(key) = segment {
                if key.is_empty() {
                    return Err(Error::invalid_argument(format!(
                        "field path '{}' has a segment that renames to nothing",
                        path
                    )));
                }
                rendered.push('.');
                if is_plain_label(&key) {
                    rendered.push_str(&key);
                } else {
                    rendered.push('"');
                    rendered.push_str(&key);
                    rendered.push('"');
                }
            }
        }
        Ok(rendered)
    }

    /// Accessor expression for a field, e.g. `json_extract(data, '$.age')`
    pub fn accessor(&self, path: &FieldPath) -> Result<String> {
        Ok(format!(
            "json_extract({}, '{}')",
            self.column,
            self.json_path(path)?
        ))
    }
}

fn is_plain_label(key: &str) -> bool {
    let mut chars = key.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Escape LIKE metacharacters so user text matches literally
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '%' || c == '_' || c == LIKE_ESCAPE {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

fn like_pattern(kind: StringMatch, needle: &str) -> String {
    let escaped = escape_like(needle);
    match kind {
        StringMatch::Contains => format!("%{}%", escaped),
        StringMatch::StartsWith => format!("{}%", escaped),
        StringMatch::EndsWith => format!("%{}", escaped),
    }
}

fn unsupported(expr: &Expr, reason: impl Into<String>) -> Error {
    Error::invalid_query(expr.to_string(), reason)
}

struct Compiler<'a> {
    translator: &'a Translator,
    params: Vec<Param>,
}

impl Compiler<'_> {
    /// Compile an expression that must yield a boolean
    fn boolean(&mut self, expr: &Expr) -> Result<String> {
        match expr {
            Expr::Const(Literal::Bool(b)) => Ok(if *b { "1" } else { "0" }.to_string()),
            Expr::Const(other) => Err(unsupported(
                expr,
                format!("{} constant used as a condition", other.type_name()),
            )),
            Expr::Field(_) => Ok(format!("{} = 1", self.value(expr)?)),
            Expr::Compare { op, lhs, rhs } => self.compare(expr, *op, lhs, rhs),
            Expr::And(l, r) => {
                let l = self.boolean(l)?;
                let r = self.boolean(r)?;
                Ok(format!("({}) AND ({})", l, r))
            }
            Expr::Or(l, r) => {
                let l = self.boolean(l)?;
                let r = self.boolean(r)?;
                Ok(format!("({}) OR ({})", l, r))
            }
            Expr::Not(inner) => Ok(format!("NOT ({})", self.boolean(inner)?)),
            Expr::StringMatch {
                kind,
                target,
                pattern,
            } => self.string_match(expr, *kind, target, pattern),
            Expr::In { target, values } => self.membership(expr, target, values),
            Expr::Call { method, .. } => Err(unsupported(
                expr,
                format!("method '{}' has no translation", method),
            )),
            Expr::Index { .. } => Err(unsupported(expr, "element indexing is not supported")),
        }
    }

    /// Compile an operand in value position
    fn value(&mut self, expr: &Expr) -> Result<String> {
        match expr {
            Expr::Field(raw) => self.translator.field_accessor(expr, raw),
            Expr::Const(Literal::Null) => {
                Err(unsupported(expr, "null can only be compared with == or !="))
            }
            Expr::Const(lit) => {
                self.bind(lit);
                Ok("?".to_string())
            }
            Expr::Index { .. } => Err(unsupported(expr, "element indexing is not supported")),
            Expr::Call { method, .. } => Err(unsupported(
                expr,
                format!("method '{}' has no translation", method),
            )),
            _ => Err(unsupported(expr, "condition used as a value")),
        }
    }

    fn bind(&mut self, lit: &Literal) {
        let param = match lit {
            Literal::Bool(b) => Param::Int(i64::from(*b)),
            Literal::Int(i) => Param::Int(*i),
            Literal::Float(x) => Param::Float(*x),
            Literal::Text(s) => Param::Text(s.clone()),
            Literal::Null => return,
        };
        self.params.push(param);
    }

    fn compare(&mut self, node: &Expr, op: CompareOp, lhs: &Expr, rhs: &Expr) -> Result<String> {
        // Keep the field on the left so null tests and binding read uniformly
        let (op, lhs, rhs) = match (lhs, rhs) {
            (Expr::Const(_), Expr::Const(_)) => {
                return Err(unsupported(node, "comparison between incompatible constants"));
            }
            (Expr::Const(_), _) => (op.flipped(), rhs, lhs),
            _ => (op, lhs, rhs),
        };

        if let Expr::Const(Literal::Null) = rhs {
            let accessor = self.value(lhs)?;
            return match op {
                CompareOp::Eq => Ok(format!("{} IS NULL", accessor)),
                CompareOp::Ne => Ok(format!("{} IS NOT NULL", accessor)),
                _ => Err(unsupported(node, "null can only be compared with == or !=")),
            };
        }

        let l = self.value(lhs)?;
        let r = self.value(rhs)?;
        Ok(format!("{} {} {}", l, op.sql(), r))
    }

    fn string_match(
        &mut self,
        node: &Expr,
        kind: StringMatch,
        target: &Expr,
        pattern: &Expr,
    ) -> Result<String> {
        if !matches!(target, Expr::Field(_)) {
            return Err(unsupported(
                node,
                format!("{} must be called on a field", kind.method()),
            ));
        }
        let needle = match pattern {
            Expr::Const(Literal::Text(s)) => s,
            _ => {
                return Err(unsupported(
                    node,
                    format!("{} takes a string constant", kind.method()),
                ))
            }
        };
        let accessor = self.value(target)?;
        self.params.push(Param::Text(like_pattern(kind, needle)));
        Ok(format!("{} LIKE ? ESCAPE '{}'", accessor, LIKE_ESCAPE))
    }

    fn membership(&mut self, node: &Expr, target: &Expr, values: &[Expr]) -> Result<String> {
        if !matches!(target, Expr::Field(_)) {
            return Err(unsupported(node, "in requires a field on the left"));
        }
        for value in values {
            match value {
                Expr::Const(Literal::Null) => {
                    return Err(unsupported(node, "null is not allowed in an in list"))
                }
                Expr::Const(_) => {}
                _ => return Err(unsupported(node, "in list must contain only constants")),
            }
        }
        let accessor = self.value(target)?;
        if values.is_empty() {
            return Ok("0".to_string());
        }
        let mut placeholders = Vec::with_capacity(values.len());
        for value in values {
            placeholders.push(self.value(value)?);
        }
        Ok(format!("{} IN ({})", accessor, placeholders.join(", ")))
    }
}
