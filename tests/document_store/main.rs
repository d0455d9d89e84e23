#[path = "../common/mod.rs"]
mod common;

mod identifiers;
mod indexes;
mod persistence;
mod queries;
mod transactions;
mod writes;
