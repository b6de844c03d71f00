//! Error types for mg-db

use thiserror::Error;

/// Database operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Query execution error (D002)
    #[error("[D002] SQL execution failed: {0}")]
    ExecutionError(String),

    /// Table not found (D003)
    #[error("[D003] Table or view not found: {0}")]
    TableNotFound(String),

    /// Ledger table misuse (D004)
    #[error("[D004] Ledger error: {0}")]
    Ledger(String),

    /// Not implemented (D005)
    #[error("[D005] Feature not implemented for {backend}: {feature}")]
    NotImplemented { backend: String, feature: String },

    /// Mutex poisoned (D006)
    #[error("[D006] Database mutex poisoned: {0}")]
    MutexPoisoned(String),
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl From<duckdb::Error> for DbError {
    fn from(err: duckdb::Error) -> Self {
        // duckdb::Error carries no structured catalog variants, only text.
        let msg = err.to_string();
        if msg.contains("Table with name")
            || msg.contains("View with name")
            || msg.contains("Table or view with name")
            || (msg.contains("Catalog Error") && msg.contains("Table") && msg.contains("not found"))
        {
            DbError::TableNotFound(msg)
        } else {
            DbError::ExecutionError(msg)
        }
    }
}

#[cfg(feature = "mysql")]
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            // SQLSTATE 42S02: ER_NO_SUCH_TABLE / ER_BAD_TABLE_ERROR
            sqlx::Error::Database(db) if db.code().as_deref() == Some("42S02") => {
                DbError::TableNotFound(db.message().to_string())
            }
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Configuration(_) => DbError::ConnectionError(err.to_string()),
            _ => DbError::ExecutionError(err.to_string()),
        }
    }
}

/// Reject ledger table names that are not plain identifiers.
///
/// The name is interpolated into SQL text, so this runs before every
/// ledger statement.
pub(crate) fn check_ledger_table(table: &str) -> DbResult<()> {
    if mg_core::config::is_valid_identifier(table) {
        Ok(())
    } else {
        Err(DbError::Ledger(format!(
            "'{}' is not a valid ledger table name",
            table
        )))
    }
}
