//! In-memory database backend
//!
//! Nothing is parsed or persisted: statements are recorded verbatim and the
//! ledger lives in a map keyed by table name. Used as the engine's test
//! double; failures can be injected by statement substring.

use crate::error::{check_ledger_table, DbError, DbResult};
use crate::traits::{DatabaseCore, DatabaseLedger, LedgerChange, LedgerRow};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemoryState {
    executed: Vec<String>,
    ledgers: HashMap<String, Vec<LedgerRow>>,
    fail_when_contains: Option<String>,
    ledger_unavailable: bool,
    wipes: usize,
}

impl MemoryState {
    fn check_statement(&self, sql: &str) -> DbResult<()> {
        match &self.fail_when_contains {
            Some(pattern) if sql.contains(pattern.as_str()) => Err(DbError::ExecutionError(
                format!("injected failure on statement containing '{}'", pattern),
            )),
            _ => Ok(()),
        }
    }

    fn ledger(&self, table: &str) -> DbResult<&Vec<LedgerRow>> {
        check_ledger_table(table)?;
        if self.ledger_unavailable {
            return Err(DbError::ExecutionError("ledger unavailable".to_string()));
        }
        self.ledgers
            .get(table)
            .ok_or_else(|| DbError::TableNotFound(table.to_string()))
    }

    fn ledger_mut(&mut self, table: &str) -> DbResult<&mut Vec<LedgerRow>> {
        check_ledger_table(table)?;
        if self.ledger_unavailable {
            return Err(DbError::ExecutionError("ledger unavailable".to_string()));
        }
        self.ledgers
            .get_mut(table)
            .ok_or_else(|| DbError::TableNotFound(table.to_string()))
    }

    fn apply(&mut self, table: &str, change: LedgerChange<'_>) -> DbResult<()> {
        let rows = self.ledger_mut(table)?;
        match change {
            LedgerChange::Record { migration, batch } => {
                rows.push(LedgerRow::new(migration, batch));
            }
            LedgerChange::Remove { migration } => {
                rows.retain(|row| row.migration != migration);
            }
        }
        Ok(())
    }
}

/// In-memory backend that records every statement it is given
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }

    /// Fail every later statement containing `pattern`
    pub fn fail_when_contains(&self, pattern: impl Into<String>) -> DbResult<()> {
        self.lock()?.fail_when_contains = Some(pattern.into());
        Ok(())
    }

    /// Stop injecting statement failures
    pub fn clear_failure(&self) -> DbResult<()> {
        self.lock()?.fail_when_contains = None;
        Ok(())
    }

    /// Make every ledger read and write fail
    pub fn set_ledger_unavailable(&self, unavailable: bool) -> DbResult<()> {
        self.lock()?.ledger_unavailable = unavailable;
        Ok(())
    }

    /// Statements executed so far, in order
    pub fn executed(&self) -> DbResult<Vec<String>> {
        Ok(self.lock()?.executed.clone())
    }

    /// Current rows of a ledger table (empty when the table does not exist)
    pub fn ledger(&self, table: &str) -> DbResult<Vec<LedgerRow>> {
        Ok(self.lock()?.ledgers.get(table).cloned().unwrap_or_default())
    }

    /// Number of completed wipes
    pub fn wipe_count(&self) -> DbResult<usize> {
        Ok(self.lock()?.wipes)
    }
}

#[async_trait]
impl DatabaseCore for MemoryBackend {
    async fn execute(&self, sql: &str) -> DbResult<()> {
        let mut state = self.lock()?;
        state.check_statement(sql)?;
        state.executed.push(sql.to_string());
        Ok(())
    }

    /// Only ledger tables are tracked as relations
    async fn relation_exists(&self, name: &str) -> DbResult<bool> {
        Ok(self.lock()?.ledgers.contains_key(name))
    }

    async fn wipe(&self) -> DbResult<()> {
        let mut state = self.lock()?;
        state.ledgers.clear();
        state.wipes += 1;
        Ok(())
    }

    fn db_type(&self) -> &'static str {
        "memory"
    }
}

#[async_trait]
impl DatabaseLedger for MemoryBackend {
    async fn ensure_ledger_table(&self, table: &str) -> DbResult<()> {
        check_ledger_table(table)?;
        let mut state = self.lock()?;
        if state.ledger_unavailable {
            return Err(DbError::ExecutionError("ledger unavailable".to_string()));
        }
        state.ledgers.entry(table.to_string()).or_default();
        Ok(())
    }

    async fn ledger_rows(&self, table: &str) -> DbResult<Vec<LedgerRow>> {
        Ok(self.lock()?.ledger(table)?.clone())
    }

    async fn ledger_rows_in_batch(&self, table: &str, batch: i64) -> DbResult<Vec<LedgerRow>> {
        Ok(self
            .lock()?
            .ledger(table)?
            .iter()
            .filter(|row| row.batch == batch)
            .cloned()
            .collect())
    }

    async fn max_batch(&self, table: &str) -> DbResult<Option<i64>> {
        Ok(self
            .lock()?
            .ledger(table)?
            .iter()
            .map(|row| row.batch)
            .max())
    }

    async fn insert_ledger_row(&self, table: &str, migration: &str, batch: i64) -> DbResult<()> {
        self.lock()?
            .apply(table, LedgerChange::Record { migration, batch })
    }

    async fn delete_ledger_row(&self, table: &str, migration: &str) -> DbResult<()> {
        self.lock()?
            .apply(table, LedgerChange::Remove { migration })
    }

    async fn execute_with_ledger(
        &self,
        table: &str,
        sql: &str,
        change: LedgerChange<'_>,
    ) -> DbResult<()> {
        let mut state = self.lock()?;
        // Validate both halves before mutating anything
        state.ledger(table)?;
        if !sql.trim().is_empty() {
            state.check_statement(sql)?;
            state.executed.push(sql.to_string());
        }
        state.apply(table, change)
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
