//! Migration engine
//!
//! `Migrator` ties a migration directory to a database. Every operation
//! runs sequentially: each statement and its ledger write complete before
//! the next migration starts. On failure the engine stops at the failing
//! migration and leaves everything before it recorded, so a fixed file can
//! be picked up by the next `migrate`.

use crate::error::{MigrateError, MigrateResult};
use crate::ledger::Ledger;
use crate::report::{MigrateReport, MigrationState, RollbackReport, StatusEntry};
use mg_core::config::DEFAULT_LEDGER_TABLE;
use mg_core::{Config, MigrationDirectory, MigrationFile, MigrationName};
use mg_db::{Database, DatabaseCore, DatabaseLedger, LedgerChange};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Runs migrations from one directory against one database
pub struct Migrator {
    directory: MigrationDirectory,
    db: Arc<dyn Database>,
    ledger_table: String,
    transactional: bool,
}

impl Migrator {
    /// Create a migrator using the default ledger table, non-transactional
    pub fn new(directory: MigrationDirectory, db: Arc<dyn Database>) -> Self {
        Self {
            directory,
            db,
            ledger_table: DEFAULT_LEDGER_TABLE.to_string(),
            transactional: false,
        }
    }

    /// Build a migrator from project config rooted at `root`
    pub fn from_config(config: &Config, root: &Path, db: Arc<dyn Database>) -> Self {
        Self::new(
            MigrationDirectory::new(config.migrations_path_absolute(root)),
            db,
        )
        .with_ledger_table(config.ledger_table.clone())
        .with_transactional(config.transactional)
    }

    pub fn with_ledger_table(mut self, table: impl Into<String>) -> Self {
        self.ledger_table = table.into();
        self
    }

    /// Run each statement and its ledger write in one transaction
    pub fn with_transactional(mut self, transactional: bool) -> Self {
        self.transactional = transactional;
        self
    }

    pub fn directory(&self) -> &MigrationDirectory {
        &self.directory
    }

    pub fn database(&self) -> &Arc<dyn Database> {
        &self.db
    }

    pub fn ledger(&self) -> Ledger<'_> {
        Ledger::new(self.db.as_ref(), &self.ledger_table)
    }

    /// Migration files in filename order; fails with `NoMigrations` when there are none
    pub fn discover(&self) -> MigrateResult<Vec<MigrationFile>> {
        let files = self.directory.list()?;
        if files.is_empty() {
            return Err(MigrateError::NoMigrations {
                path: self.directory.path().display().to_string(),
            });
        }
        Ok(files)
    }

    /// [`discover`](Self::discover), newest first
    pub fn discover_reverse(&self) -> MigrateResult<Vec<MigrationFile>> {
        let mut files = self.discover()?;
        files.reverse();
        Ok(files)
    }

    /// Discovered migrations not yet in the ledger, in filename order
    pub async fn pending(&self) -> MigrateResult<Vec<MigrationFile>> {
        let ledger = self.ledger();
        ledger.ensure_table().await?;
        self.pending_in(&ledger).await
    }

    async fn pending_in(&self, ledger: &Ledger<'_>) -> MigrateResult<Vec<MigrationFile>> {
        let files = self.discover()?;
        let applied = ledger.applied_names().await?;
        Ok(files
            .into_iter()
            .filter(|file| !applied.contains(file.name()))
            .collect())
    }

    /// Apply every pending migration under a new batch number.
    ///
    /// Fails with `NothingToMigrate` when the ledger is already up to date.
    pub async fn migrate(&self) -> MigrateResult<MigrateReport> {
        let ledger = self.ledger();
        ledger.ensure_table().await?;

        let pending = self.pending_in(&ledger).await?;
        if pending.is_empty() {
            return Err(MigrateError::NothingToMigrate);
        }

        let batch = ledger.current_batch().await? + 1;
        log::debug!(
            "Applying {} migration(s) as batch {} on {}",
            pending.len(),
            batch,
            self.db.db_type()
        );

        let mut applied = Vec::with_capacity(pending.len());
        for file in &pending {
            let up = self.statement(file, Direction::Up);
            self.apply(
                &ledger,
                file.name(),
                &up,
                LedgerChange::Record {
                    migration: file.name().as_str(),
                    batch,
                },
            )
            .await?;
            log::info!("Migrated: {}", file.name());
            applied.push(file.name().clone());
        }

        Ok(MigrateReport { batch, applied })
    }

    /// Reverse the most recent batch.
    ///
    /// An empty ledger is not an error; the report then has no batch.
    pub async fn rollback(&self) -> MigrateResult<RollbackReport> {
        let ledger = self.ledger();
        ledger.ensure_table().await?;

        let batch = ledger.current_batch().await?;
        if batch == 0 {
            return Ok(RollbackReport::default());
        }

        let in_batch = ledger.names_in_batch(batch).await?;
        let files = self.discover_reverse()?;

        let found: HashSet<&MigrationName> = files.iter().map(|f| f.name()).collect();
        let mut skipped: Vec<MigrationName> = in_batch
            .iter()
            .filter(|n| !found.contains(n))
            .cloned()
            .collect();
        skipped.sort();
        for name in &skipped {
            log::warn!(
                "{} is recorded in batch {} but has no file; leaving its ledger entry",
                name,
                batch
            );
        }

        let mut rolled_back = Vec::new();
        for file in files.iter().filter(|f| in_batch.contains(f.name())) {
            let down = self.statement(file, Direction::Down);
            self.apply(
                &ledger,
                file.name(),
                &down,
                LedgerChange::Remove {
                    migration: file.name().as_str(),
                },
            )
            .await?;
            log::info!("Rolled back: {}", file.name());
            rolled_back.push(file.name().clone());
        }

        Ok(RollbackReport {
            batch: Some(batch),
            rolled_back,
            skipped,
        })
    }

    /// Drop every schema object, then migrate from scratch
    pub async fn fresh(&self) -> MigrateResult<MigrateReport> {
        log::debug!("Wiping {} database", self.db.db_type());
        self.db.wipe().await.map_err(MigrateError::Wipe)?;
        self.migrate().await
    }

    /// Scaffold a new migration file and return its path
    pub fn create_migration(&self, name: &str) -> MigrateResult<PathBuf> {
        let path = self.directory.create_migration(name)?;
        log::info!("Created migration: {}", path.display());
        Ok(path)
    }

    /// Every migration file with its ledger state, followed by ledger
    /// entries whose file is gone. Nothing is written to the database.
    pub async fn status(&self) -> MigrateResult<Vec<StatusEntry>> {
        let files = self.directory.list()?;

        let ledger = self.ledger();
        let table_exists = self
            .db
            .relation_exists(ledger.table())
            .await
            .map_err(MigrateError::Ledger)?;
        let entries = if table_exists {
            ledger.entries().await?
        } else {
            Vec::new()
        };

        let mut statuses = Vec::with_capacity(files.len());
        let mut seen = HashSet::new();
        for file in &files {
            let state = match entries.iter().find(|e| &e.name == file.name()) {
                Some(entry) => MigrationState::Applied { batch: entry.batch },
                None => MigrationState::Pending,
            };
            seen.insert(file.name().clone());
            statuses.push(StatusEntry {
                name: file.name().clone(),
                state,
                well_formed: file.sections().is_well_formed(),
            });
        }

        for entry in entries {
            if seen.contains(&entry.name) {
                continue;
            }
            statuses.push(StatusEntry {
                name: entry.name,
                state: MigrationState::Missing { batch: entry.batch },
                well_formed: true,
            });
        }

        Ok(statuses)
    }

    fn statement(&self, file: &MigrationFile, direction: Direction) -> String {
        let sql = match direction {
            Direction::Up => file.up_statement(),
            Direction::Down => file.down_statement(),
        };
        if sql.is_empty() && !file.sections().is_well_formed() {
            log::warn!(
                "{} is missing the '-- UP --' / '-- DOWN --' markers; treating it as empty",
                file.path().display()
            );
        }
        sql
    }

    /// Execute one statement and write its ledger change
    async fn apply(
        &self,
        ledger: &Ledger<'_>,
        name: &MigrationName,
        sql: &str,
        change: LedgerChange<'_>,
    ) -> MigrateResult<()> {
        if sql.is_empty() {
            log::debug!("{}: empty statement, nothing to execute", name);
        }

        if self.transactional {
            return self
                .db
                .execute_with_ledger(ledger.table(), sql, change)
                .await
                .map_err(|source| MigrateError::ExecutionFailed {
                    migration: name.clone(),
                    source,
                });
        }

        if !sql.is_empty() {
            self.db
                .execute(sql)
                .await
                .map_err(|source| MigrateError::ExecutionFailed {
                    migration: name.clone(),
                    source,
                })?;
        }
        match change {
            LedgerChange::Record { batch, .. } => ledger.record(name, batch).await,
            LedgerChange::Remove { .. } => ledger.remove(name).await,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Up,
    Down,
}

#[cfg(test)]
#[path = "migrator_test.rs"]
mod tests;
