//! Relational sink for extracted records.
//!
//! Extractors hand over [`Record`]s; the backend decides how they land.
//! The contract:
//!
//! - `insert` returns the generated id
//! - `bulk_insert` silently ignores rows that violate a unique key and
//!   reports how many were actually inserted
//! - `upsert` inserts or updates on the given conflict keys and returns the
//!   row id either way
//! - `delete` removes the rows matching every column of a key record and
//!   reports how many went
//! - `query` runs read SQL with positional parameters
//!
//! Schema provisioning is a separate setup step (see [`schema`]).

pub mod schema;
pub mod sqlite;

use crate::error::Result;
use crate::models::{FieldValue, Record};

pub use sqlite::SqliteStorage;

/// Trait for record storage backends.
pub trait Storage {
    fn insert(&mut self, table: &str, record: &Record) -> Result<i64>;

    fn bulk_insert(&mut self, table: &str, records: &[Record]) -> Result<usize>;

    fn upsert(&mut self, table: &str, record: &Record, conflict_keys: &[&str]) -> Result<i64>;

    fn delete(&mut self, table: &str, key: &Record) -> Result<usize>;

    fn query(&self, sql: &str, params: &[FieldValue]) -> Result<Vec<Record>>;
}
