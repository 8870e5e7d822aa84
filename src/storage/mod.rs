//! Run history kept in SQLite
//!
//! - `models`: ledger rows
//! - `schema`: connection and schema management
//! - `queries`: recording and reading runs

pub mod models;
pub mod queries;
pub mod schema;

#[cfg(test)]
mod tests;

pub use models::*;
pub use schema::RunLedger;
