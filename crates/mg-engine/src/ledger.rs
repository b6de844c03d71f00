//! Typed access to the migration ledger table
//!
//! The ledger is the only persisted engine state: one row per applied
//! migration with the batch it was applied in. Every database error here is
//! surfaced as [`MigrateError::Ledger`]; an empty table is a valid state.

use crate::error::{MigrateError, MigrateResult};
use crate::report::LedgerEntry;
use mg_core::MigrationName;
use mg_db::{Database, DatabaseLedger, LedgerRow};
use std::collections::HashSet;

/// Ledger accessor bound to one database and table
#[derive(Clone, Copy)]
pub struct Ledger<'a> {
    db: &'a dyn Database,
    table: &'a str,
}

impl<'a> Ledger<'a> {
    pub fn new(db: &'a dyn Database, table: &'a str) -> Self {
        Self { db, table }
    }

    /// Ledger table name
    pub fn table(&self) -> &str {
        self.table
    }

    /// Create the ledger table if absent
    pub async fn ensure_table(&self) -> MigrateResult<()> {
        self.db
            .ensure_ledger_table(self.table)
            .await
            .map_err(MigrateError::Ledger)
    }

    /// Names of every applied migration
    pub async fn applied_names(&self) -> MigrateResult<HashSet<MigrationName>> {
        let rows = self
            .db
            .ledger_rows(self.table)
            .await
            .map_err(MigrateError::Ledger)?;
        Ok(names(rows))
    }

    /// Names recorded under `batch`
    pub async fn names_in_batch(&self, batch: i64) -> MigrateResult<HashSet<MigrationName>> {
        let rows = self
            .db
            .ledger_rows_in_batch(self.table, batch)
            .await
            .map_err(MigrateError::Ledger)?;
        Ok(names(rows))
    }

    /// Highest recorded batch, 0 for an empty ledger
    pub async fn current_batch(&self) -> MigrateResult<i64> {
        let max = self
            .db
            .max_batch(self.table)
            .await
            .map_err(MigrateError::Ledger)?;
        Ok(max.unwrap_or(0))
    }

    pub async fn record(&self, name: &MigrationName, batch: i64) -> MigrateResult<()> {
        self.db
            .insert_ledger_row(self.table, name.as_str(), batch)
            .await
            .map_err(MigrateError::Ledger)
    }

    pub async fn remove(&self, name: &MigrationName) -> MigrateResult<()> {
        self.db
            .delete_ledger_row(self.table, name.as_str())
            .await
            .map_err(MigrateError::Ledger)
    }

    /// Every row, in insertion order
    pub async fn entries(&self) -> MigrateResult<Vec<LedgerEntry>> {
        let rows = self
            .db
            .ledger_rows(self.table)
            .await
            .map_err(MigrateError::Ledger)?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let batch = row.batch;
                typed_name(row).map(|name| LedgerEntry { name, batch })
            })
            .collect())
    }
}

fn names(rows: Vec<LedgerRow>) -> HashSet<MigrationName> {
    rows.into_iter().filter_map(typed_name).collect()
}

fn typed_name(row: LedgerRow) -> Option<MigrationName> {
    let name = MigrationName::try_new(row.migration);
    if name.is_none() {
        log::warn!("Ignoring ledger row with an empty migration name (batch {})", row.batch);
    }
    name
}

#[cfg(test)]
#[path = "ledger_test.rs"]
mod tests;
