//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use mg_core::{Config, CoreError, MigrationDirectory};
use mg_engine::{MigrateError, MigrateReport, MigrateResult, Migrator};
use std::path::{Path, PathBuf};

use crate::cli::GlobalArgs;

/// A loaded project: its root directory and parsed config
pub(crate) struct Project {
    pub(crate) root: PathBuf,
    pub(crate) config: Config,
}

impl Project {
    pub(crate) fn migrations(&self) -> MigrationDirectory {
        MigrationDirectory::new(self.config.migrations_path_absolute(&self.root))
    }
}

/// Config file to use: `--config` when given, else the first match in the project dir
pub(crate) fn config_path(global: &GlobalArgs) -> Option<PathBuf> {
    match &global.config {
        Some(path) => Some(PathBuf::from(path)),
        None => Config::find_in_dir(Path::new(&global.project_dir)),
    }
}

/// Load the project config.
///
/// A missing config is an expected state: it is reported and `None` is
/// returned so the command can exit successfully.
pub(crate) fn load_project(global: &GlobalArgs) -> Result<Option<Project>> {
    let root = PathBuf::from(&global.project_dir);
    let Some(path) = config_path(global) else {
        println!(
            "No migrate.yml found in {}. Run `mg init` to create one.",
            root.display()
        );
        return Ok(None);
    };

    match Config::load(&path) {
        Ok(config) => {
            log::debug!("Loaded config from {}", path.display());
            Ok(Some(Project { root, config }))
        }
        Err(CoreError::ConfigNotFound { path }) => {
            println!("Config file not found: {}. Run `mg init` to create one.", path);
            Ok(None)
        }
        Err(e) => Err(e).context("Failed to load config"),
    }
}

/// Connect to the configured database and build a migrator over it
pub(crate) async fn create_migrator(project: &Project) -> Result<Migrator> {
    let db_config = project.config.database_for_root(&project.root);
    let db = mg_db::connect(&db_config)
        .await
        .with_context(|| format!("Failed to connect to {} database", db_config.driver))?;
    Ok(Migrator::from_config(&project.config, &project.root, db))
}

/// Report the expected "nothing to do" outcomes and turn them into `None`.
///
/// Any other error is returned with `context` attached.
pub(crate) fn nothing_to_do_is_ok<T>(result: MigrateResult<T>, context: &str) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(MigrateError::NothingToMigrate) => {
            println!("Nothing to migrate");
            Ok(None)
        }
        Err(MigrateError::NoMigrations { path }) => {
            println!("No migrations found in {}", path);
            Ok(None)
        }
        Err(e) => Err(e).context(context.to_string()),
    }
}

pub(crate) fn print_migrate_report(report: &MigrateReport) {
    println!(
        "Batch {}: applied {} migration(s)",
        report.batch,
        report.applied.len()
    );
    for name in &report.applied {
        println!("  {}", name);
    }
}

// ---------------------------------------------------------------------------
// Table-printing utilities
// ---------------------------------------------------------------------------

/// Calculate column widths for a table given headers and row data.
pub(crate) fn calculate_column_widths(headers: &[&str], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.len());
        }
    }
    widths
}

/// Print a left-aligned table with a dashed separator under the header.
pub(crate) fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let widths = calculate_column_widths(headers, rows);
    let render = |cells: Vec<String>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{:<width$}", cell, width = w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    println!("{}", render(headers.iter().map(|h| h.to_string()).collect()));
    println!("{}", render(widths.iter().map(|&w| "-".repeat(w)).collect()));
    for row in rows {
        println!("{}", render(row.clone()));
    }
}
