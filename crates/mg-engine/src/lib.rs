//! mg-engine - Migration engine for mg
//!
//! The engine diffs the migration directory against the ledger table,
//! applies pending migrations as one numbered batch, and reverses the most
//! recent batch on rollback. All database access goes through the
//! `mg_db::Database` capability handed to [`Migrator::new`].

pub mod error;
pub mod ledger;
pub mod migrator;
pub mod report;

pub use error::{MigrateError, MigrateResult};
pub use ledger::Ledger;
pub use migrator::Migrator;
pub use report::{LedgerEntry, MigrateReport, MigrationState, RollbackReport, StatusEntry};
