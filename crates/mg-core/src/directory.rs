//! Migration directory discovery
//!
//! The directory is the source of truth for which migrations exist. Files
//! are ordered by file name; scaffolded names start with a sortable
//! timestamp, so this is also creation order. Two files sharing a timestamp
//! fall back to byte order of the rest of the name.

use crate::error::{CoreError, CoreResult};
use crate::migration::{MigrationFile, MIGRATION_EXTENSION};
use std::path::{Path, PathBuf};

/// A directory of `*.sql` migration files
#[derive(Debug, Clone)]
pub struct MigrationDirectory {
    root: PathBuf,
}

impl MigrationDirectory {
    /// Wrap a directory path. Nothing is touched on disk.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory path
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// List migration files in ascending file-name order.
    ///
    /// A directory that cannot be read, including one that does not exist,
    /// is an error. Subdirectories, dotfiles and files without the `.sql`
    /// extension are skipped.
    pub fn list(&self) -> CoreResult<Vec<MigrationFile>> {
        let entries = std::fs::read_dir(&self.root).map_err(|e| self.io_error(e))?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| self.io_error(e))?;
            let file_type = entry.file_type().map_err(|e| self.io_error(e))?;
            if file_type.is_dir() {
                continue;
            }
            let path = entry.path();
            if !is_migration_file(&path) {
                log::debug!("Skipping non-migration file {}", path.display());
                continue;
            }
            paths.push(path);
        }
        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        paths.into_iter().map(MigrationFile::from_path).collect()
    }

    fn io_error(&self, source: std::io::Error) -> CoreError {
        CoreError::IoWithPath {
            path: self.root.display().to_string(),
            source,
        }
    }
}

fn is_migration_file(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .map_or(true, |n| n.starts_with('.'));
    !hidden && path.extension().is_some_and(|ext| ext == MIGRATION_EXTENSION)
}

#[cfg(test)]
#[path = "directory_test.rs"]
mod tests;
