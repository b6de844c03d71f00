//! Results returned by engine operations

use mg_core::MigrationName;
use serde::Serialize;

/// One ledger row with a typed name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    pub name: MigrationName,
    pub batch: i64,
}

/// Outcome of a successful `migrate`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrateReport {
    /// Batch number every applied migration was recorded under
    pub batch: i64,

    /// Applied migrations, in application order
    pub applied: Vec<MigrationName>,
}

/// Outcome of a `rollback`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RollbackReport {
    /// Batch that was rolled back; `None` when the ledger was empty
    pub batch: Option<i64>,

    /// Reverted migrations, newest first
    pub rolled_back: Vec<MigrationName>,

    /// Ledger entries of the batch with no file on disk. They stay in the
    /// ledger, so the batch remains current until they are resolved.
    pub skipped: Vec<MigrationName>,
}

impl RollbackReport {
    /// True when there was nothing to roll back
    pub fn is_empty(&self) -> bool {
        self.rolled_back.is_empty()
    }
}

/// Where a migration stands relative to the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum MigrationState {
    /// File present and recorded
    Applied { batch: i64 },
    /// File present, not recorded
    Pending,
    /// Recorded, but the file is gone
    Missing { batch: i64 },
}

impl std::fmt::Display for MigrationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationState::Applied { batch } => write!(f, "applied (batch {})", batch),
            MigrationState::Pending => write!(f, "pending"),
            MigrationState::Missing { batch } => write!(f, "missing (batch {})", batch),
        }
    }
}

/// One line of `status` output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEntry {
    pub name: MigrationName,
    #[serde(flatten)]
    pub state: MigrationState,

    /// False when the file lacks the section markers; always true for
    /// missing files
    pub well_formed: bool,
}
