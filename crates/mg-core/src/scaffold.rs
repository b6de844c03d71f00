//! Migration file scaffolding

use crate::directory::MigrationDirectory;
use crate::error::{CoreError, CoreResult};
use crate::migration::{MIGRATION_EXTENSION, MIGRATION_TEMPLATE};
use chrono::{Local, NaiveDateTime};
use std::io::Write;
use std::path::PathBuf;

/// Timestamp layout of scaffolded file names (second resolution)
pub const TIMESTAMP_FORMAT: &str = "%Y_%m_%d_%H%M%S";

/// Reject names that would escape the migration directory or produce a
/// file that discovery skips (dotfiles) or a shell splits (whitespace).
pub fn validate_migration_name(name: &str) -> CoreResult<()> {
    let reason = if name.is_empty() {
        Some("must not be empty")
    } else if name.contains('/') || name.contains('\\') || name.contains("..") {
        Some("must not contain '/', '\\' or '..'")
    } else if name.starts_with('.') || name.starts_with('-') {
        Some("must not start with '.' or '-'")
    } else if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        Some("must not contain whitespace")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(CoreError::InvalidMigrationName {
            name: name.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

/// `{timestamp}_{name}.sql` for the given local time
pub fn migration_file_name(name: &str, at: NaiveDateTime) -> String {
    format!(
        "{}_{}.{}",
        at.format(TIMESTAMP_FORMAT),
        name,
        MIGRATION_EXTENSION
    )
}

impl MigrationDirectory {
    /// Create a new migration stamped with the current local time
    pub fn create_migration(&self, name: &str) -> CoreResult<PathBuf> {
        self.create_migration_at(name, Local::now().naive_local())
    }

    /// Create a new migration file stamped with `at`.
    ///
    /// Parent directories are created as needed. An existing file with the
    /// same name (same second, same name) is never overwritten.
    pub fn create_migration_at(&self, name: &str, at: NaiveDateTime) -> CoreResult<PathBuf> {
        validate_migration_name(name)?;

        std::fs::create_dir_all(self.path()).map_err(|e| CoreError::IoWithPath {
            path: self.path().display().to_string(),
            source: e,
        })?;

        let path = self.path().join(migration_file_name(name, at));
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => CoreError::MigrationExists {
                    path: path.display().to_string(),
                },
                _ => CoreError::IoWithPath {
                    path: path.display().to_string(),
                    source: e,
                },
            })?;
        file.write_all(MIGRATION_TEMPLATE.as_bytes())
            .map_err(|e| CoreError::IoWithPath {
                path: path.display().to_string(),
                source: e,
            })?;

        log::debug!("Created migration {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
#[path = "scaffold_test.rs"]
mod tests;
