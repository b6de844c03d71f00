//! mg-db - Database abstraction layer for mg
//!
//! This crate provides the `Database` capability traits used by the
//! migration engine and implementations for DuckDB, MySQL (feature
//! `mysql`) and an in-memory test double.

mod connect;
pub mod duckdb;
pub mod error;
pub mod memory;
#[cfg(feature = "mysql")]
pub mod mysql;
pub mod traits;

pub use connect::connect;
pub use duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
pub use memory::MemoryBackend;
#[cfg(feature = "mysql")]
pub use mysql::MySqlBackend;
pub use traits::{Database, DatabaseCore, DatabaseLedger, LedgerChange, LedgerRow};
