//! Database capability traits
//!
//! The migration engine needs very little from a database: run a block of
//! SQL, wipe every schema object, and read/write the ledger table. The
//! surface is split the same way backends implement it; `Database` is the
//! union the engine holds as `Arc<dyn Database>`.

use crate::error::DbResult;
use async_trait::async_trait;

/// One row of the ledger table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRow {
    /// Migration name (file stem)
    pub migration: String,

    /// Batch the migration was applied in
    pub batch: i64,
}

impl LedgerRow {
    pub fn new(migration: impl Into<String>, batch: i64) -> Self {
        Self {
            migration: migration.into(),
            batch,
        }
    }
}

/// Ledger write paired with a statement in [`DatabaseLedger::execute_with_ledger`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerChange<'a> {
    /// Insert `(migration, batch)`
    Record { migration: &'a str, batch: i64 },
    /// Delete the row for `migration`
    Remove { migration: &'a str },
}

/// Statement execution and schema-level operations
#[async_trait]
pub trait DatabaseCore: Send + Sync {
    /// Execute a block of SQL. The block may hold several statements.
    async fn execute(&self, sql: &str) -> DbResult<()>;

    /// Check if a table or view exists in the default schema
    async fn relation_exists(&self, name: &str) -> DbResult<bool>;

    /// Drop every table, view, sequence and user schema
    async fn wipe(&self) -> DbResult<()>;

    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;
}

/// Reads and writes of the migration ledger table.
///
/// `table` is always validated as a plain identifier before use. Names and
/// batch numbers are bound as parameters.
#[async_trait]
pub trait DatabaseLedger: Send + Sync {
    /// Create the ledger table if absent
    async fn ensure_ledger_table(&self, table: &str) -> DbResult<()>;

    /// All rows in insertion order
    async fn ledger_rows(&self, table: &str) -> DbResult<Vec<LedgerRow>>;

    /// Rows recorded under `batch`, in insertion order
    async fn ledger_rows_in_batch(&self, table: &str, batch: i64) -> DbResult<Vec<LedgerRow>>;

    /// Highest recorded batch, `None` when the ledger is empty
    async fn max_batch(&self, table: &str) -> DbResult<Option<i64>>;

    /// Insert one row
    async fn insert_ledger_row(&self, table: &str, migration: &str, batch: i64) -> DbResult<()>;

    /// Delete the row(s) for `migration`
    async fn delete_ledger_row(&self, table: &str, migration: &str) -> DbResult<()>;

    /// Execute `sql` and apply `change` in one transaction.
    ///
    /// An empty `sql` only applies the ledger change. On MySQL, DDL commits
    /// implicitly, so only the ledger write is rolled back on failure.
    async fn execute_with_ledger(
        &self,
        table: &str,
        sql: &str,
        change: LedgerChange<'_>,
    ) -> DbResult<()>;
}

/// Full capability set required by the migration engine
pub trait Database: DatabaseCore + DatabaseLedger {}

impl<T: DatabaseCore + DatabaseLedger> Database for T {}
