//! Predicates and their SQL translation
//!
//! - [`Expr`]: tagged-variant predicate AST
//! - [`field`]: fluent builder (`field("age").ge(30)`)
//! - [`parse`]: textual predicate syntax
//! - [`Translator`]: compiles an `Expr` to a parameterized SQL clause
//!
//! Translation is pure: no I/O, no shared state.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ast;
pub mod builder;
pub mod fold;
pub mod parse;
pub mod translate;

pub use ast::{CompareOp, Expr, Literal, StringMatch};
pub use builder::{field, FieldRef};
pub use fold::fold;
pub use parse::parse;
pub use translate::{escape_like, Param, Translation, Translator, DEFAULT_COLUMN};
