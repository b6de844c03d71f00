//! Error types for mg-engine

use mg_core::{CoreError, MigrationName};
use mg_db::DbError;
use thiserror::Error;

/// Migration engine errors
#[derive(Error, Debug)]
pub enum MigrateError {
    /// M001: The migration directory holds no migration files
    #[error("[M001] No migrations found in {path}")]
    NoMigrations { path: String },

    /// M002: Every discovered migration is already in the ledger
    #[error("[M002] Nothing to migrate")]
    NothingToMigrate,

    /// M003: A migration statement failed; the batch stops here
    #[error("[M003] Migration '{migration}' failed: {source}")]
    ExecutionFailed {
        migration: MigrationName,
        source: DbError,
    },

    /// M004: Reading or writing the ledger table failed
    #[error("[M004] Ledger access failed: {0}")]
    Ledger(#[source] DbError),

    /// M005: Dropping schema objects failed
    #[error("[M005] Wipe failed: {0}")]
    Wipe(#[source] DbError),

    /// Filesystem or config error from mg-core
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl MigrateError {
    /// True for the expected "nothing to do" outcomes, which callers report
    /// and then treat as success.
    pub fn is_nothing_to_do(&self) -> bool {
        matches!(
            self,
            MigrateError::NoMigrations { .. } | MigrateError::NothingToMigrate
        )
    }
}

/// Result type alias for MigrateError
pub type MigrateResult<T> = Result<T, MigrateError>;
