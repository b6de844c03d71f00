//! DuckDB database backend implementation

use crate::error::{check_ledger_table, DbError, DbResult};
use crate::traits::{DatabaseCore, DatabaseLedger, LedgerChange, LedgerRow};
use async_trait::async_trait;
use duckdb::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// DuckDB database backend
pub struct DuckDbBackend {
    conn: Mutex<Connection>,
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{}: {}", path.display(), e)))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }

    fn relation_exists_sync(&self, name: &str) -> DbResult<bool> {
        let conn = self.lock()?;

        let (schema, table) = match name.rfind('.') {
            Some(pos) => (&name[..pos], &name[pos + 1..]),
            None => ("main", name),
        };

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables \
             WHERE table_catalog = current_database() AND table_schema = ? AND table_name = ?",
            params![schema, table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn wipe_sync(&self) -> DbResult<()> {
        let conn = self.lock()?;

        for schema in query_names(
            &conn,
            "SELECT schema_name FROM information_schema.schemata \
             WHERE catalog_name = current_database() \
             AND schema_name NOT IN ('main', 'information_schema', 'pg_catalog')",
        )? {
            log::debug!("Dropping schema {}", schema);
            conn.execute_batch(&format!("DROP SCHEMA {} CASCADE", quote_ident(&schema)))?;
        }

        for view in query_names(
            &conn,
            "SELECT table_name FROM information_schema.tables \
             WHERE table_catalog = current_database() AND table_schema = 'main' \
             AND table_type = 'VIEW'",
        )? {
            log::debug!("Dropping view {}", view);
            conn.execute_batch(&format!("DROP VIEW IF EXISTS {}", quote_ident(&view)))?;
        }

        // Tables referenced by a foreign key refuse to drop until the
        // referencing table is gone, so drop in passes.
        let mut remaining = query_names(
            &conn,
            "SELECT table_name FROM information_schema.tables \
             WHERE table_catalog = current_database() AND table_schema = 'main' \
             AND table_type = 'BASE TABLE'",
        )?;
        while !remaining.is_empty() {
            let before = remaining.len();
            let mut last_error = None;
            remaining.retain(|table| {
                match conn.execute_batch(&format!("DROP TABLE IF EXISTS {}", quote_ident(table))) {
                    Ok(()) => {
                        log::debug!("Dropped table {}", table);
                        false
                    }
                    Err(e) => {
                        last_error = Some(e);
                        true
                    }
                }
            });
            if remaining.len() == before {
                let cause = last_error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "no progress".to_string());
                return Err(DbError::ExecutionError(format!(
                    "could not drop tables [{}]: {}",
                    remaining.join(", "),
                    cause
                )));
            }
        }

        for sequence in query_names(
            &conn,
            "SELECT sequence_name FROM duckdb_sequences() \
             WHERE database_name = current_database() AND schema_name = 'main'",
        )? {
            log::debug!("Dropping sequence {}", sequence);
            conn.execute_batch(&format!(
                "DROP SEQUENCE IF EXISTS {}",
                quote_ident(&sequence)
            ))?;
        }

        Ok(())
    }

    fn ensure_ledger_table_sync(&self, table: &str) -> DbResult<()> {
        check_ledger_table(table)?;
        let conn = self.lock()?;
        conn.execute_batch(&create_ledger_table_sql(table))?;
        Ok(())
    }

    fn ledger_rows_sync(&self, table: &str, batch: Option<i64>) -> DbResult<Vec<LedgerRow>> {
        check_ledger_table(table)?;
        let conn = self.lock()?;
        let map_row = |row: &duckdb::Row<'_>| -> duckdb::Result<LedgerRow> {
            Ok(LedgerRow {
                migration: row.get(0)?,
                batch: row.get(1)?,
            })
        };

        let rows = match batch {
            Some(batch) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT migration, batch FROM {} WHERE batch = ? ORDER BY id",
                    table
                ))?;
                let rows = stmt
                    .query_map(params![batch], map_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT migration, batch FROM {} ORDER BY id",
                    table
                ))?;
                let rows = stmt
                    .query_map([], map_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };
        Ok(rows)
    }

    fn max_batch_sync(&self, table: &str) -> DbResult<Option<i64>> {
        check_ledger_table(table)?;
        let conn = self.lock()?;
        let max: Option<i64> =
            conn.query_row(&format!("SELECT MAX(batch) FROM {}", table), [], |row| {
                row.get(0)
            })?;
        Ok(max)
    }

    fn apply_change_sync(&self, table: &str, change: LedgerChange<'_>) -> DbResult<()> {
        check_ledger_table(table)?;
        let conn = self.lock()?;
        apply_change(&conn, table, change)
    }

    fn execute_with_ledger_sync(
        &self,
        table: &str,
        sql: &str,
        change: LedgerChange<'_>,
    ) -> DbResult<()> {
        check_ledger_table(table)?;
        let conn = self.lock()?;
        transaction(&conn, |conn| {
            if !sql.trim().is_empty() {
                conn.execute_batch(sql)?;
            }
            apply_change(conn, table, change)
        })
    }
}

#[async_trait]
impl DatabaseCore for DuckDbBackend {
    async fn execute(&self, sql: &str) -> DbResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(sql)?;
        Ok(())
    }

    async fn relation_exists(&self, name: &str) -> DbResult<bool> {
        self.relation_exists_sync(name)
    }

    async fn wipe(&self) -> DbResult<()> {
        self.wipe_sync()
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }
}

#[async_trait]
impl DatabaseLedger for DuckDbBackend {
    async fn ensure_ledger_table(&self, table: &str) -> DbResult<()> {
        self.ensure_ledger_table_sync(table)
    }

    async fn ledger_rows(&self, table: &str) -> DbResult<Vec<LedgerRow>> {
        self.ledger_rows_sync(table, None)
    }

    async fn ledger_rows_in_batch(&self, table: &str, batch: i64) -> DbResult<Vec<LedgerRow>> {
        self.ledger_rows_sync(table, Some(batch))
    }

    async fn max_batch(&self, table: &str) -> DbResult<Option<i64>> {
        self.max_batch_sync(table)
    }

    async fn insert_ledger_row(&self, table: &str, migration: &str, batch: i64) -> DbResult<()> {
        self.apply_change_sync(table, LedgerChange::Record { migration, batch })
    }

    async fn delete_ledger_row(&self, table: &str, migration: &str) -> DbResult<()> {
        self.apply_change_sync(table, LedgerChange::Remove { migration })
    }

    async fn execute_with_ledger(
        &self,
        table: &str,
        sql: &str,
        change: LedgerChange<'_>,
    ) -> DbResult<()> {
        self.execute_with_ledger_sync(table, sql, change)
    }
}

/// Ledger DDL. DuckDB has no auto-increment, so a sequence feeds the id.
fn create_ledger_table_sql(table: &str) -> String {
    format!(
        "CREATE SEQUENCE IF NOT EXISTS {table}_id_seq; \
         CREATE TABLE IF NOT EXISTS {table} (\
         id BIGINT PRIMARY KEY DEFAULT nextval('{table}_id_seq'), \
         migration VARCHAR NOT NULL, \
         batch BIGINT NOT NULL)"
    )
}

fn apply_change(conn: &Connection, table: &str, change: LedgerChange<'_>) -> DbResult<()> {
    match change {
        LedgerChange::Record { migration, batch } => {
            conn.execute(
                &format!("INSERT INTO {} (migration, batch) VALUES (?, ?)", table),
                params![migration, batch],
            )?;
        }
        LedgerChange::Remove { migration } => {
            conn.execute(
                &format!("DELETE FROM {} WHERE migration = ?", table),
                params![migration],
            )?;
        }
    }
    Ok(())
}

/// Run `body` between BEGIN and COMMIT, rolling back on any error.
fn transaction<F>(conn: &Connection, body: F) -> DbResult<()>
where
    F: FnOnce(&Connection) -> DbResult<()>,
{
    conn.execute_batch("BEGIN TRANSACTION")
        .map_err(|e| DbError::ExecutionError(format!("BEGIN failed: {e}")))?;

    let result = body(conn);

    match &result {
        Ok(()) => {
            if let Err(commit_err) = conn.execute_batch("COMMIT") {
                let _ = conn.execute_batch("ROLLBACK");
                return Err(DbError::ExecutionError(format!(
                    "COMMIT failed: {commit_err}"
                )));
            }
        }
        Err(_) => {
            let _ = conn.execute_batch("ROLLBACK");
        }
    }
    result
}

fn query_names(conn: &Connection, sql: &str) -> DbResult<Vec<String>> {
    let mut stmt = conn.prepare(sql)?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
