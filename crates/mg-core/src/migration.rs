//! Migration file representation and up/down section parsing
//!
//! A migration file holds two sections delimited by literal markers:
//!
//! ```sql
//! -- UP --
//! CREATE TABLE users (id INT);
//!
//! -- DOWN --
//! DROP TABLE users;
//! ```
//!
//! The up statement is the text between the markers and the down statement
//! is the text after `-- DOWN --`. Nothing is split on semicolons; each
//! section is handed to the database as one block.

use crate::error::{CoreError, CoreResult};
use crate::migration_name::MigrationName;
use std::path::{Path, PathBuf};

/// Marker opening the forward section
pub const UP_MARKER: &str = "-- UP --";

/// Marker opening the reverse section
pub const DOWN_MARKER: &str = "-- DOWN --";

/// File extension of migration files
pub const MIGRATION_EXTENSION: &str = "sql";

/// Body written into freshly scaffolded migrations
pub const MIGRATION_TEMPLATE: &str = "-- UP --\n\n-- DOWN --";

/// The two statement blocks of a migration file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationSections {
    /// Forward statement, trimmed; empty when the file is malformed
    pub up: String,

    /// Reverse statement, trimmed; empty when the file is malformed
    pub down: String,

    well_formed: bool,
}

impl MigrationSections {
    /// True when both markers were found, UP before DOWN.
    pub fn is_well_formed(&self) -> bool {
        self.well_formed
    }
}

/// Split migration text into its up and down statements.
///
/// If either marker is missing (or DOWN precedes UP) both statements are
/// empty rather than an error.
pub fn parse_sections(content: &str) -> MigrationSections {
    let Some(up_at) = content.find(UP_MARKER) else {
        return MigrationSections::default();
    };
    let after_up = &content[up_at + UP_MARKER.len()..];
    let Some(down_at) = after_up.find(DOWN_MARKER) else {
        return MigrationSections::default();
    };

    MigrationSections {
        up: after_up[..down_at].trim().to_string(),
        down: after_up[down_at + DOWN_MARKER.len()..].trim().to_string(),
        well_formed: true,
    }
}

/// One migration file on disk.
///
/// Only the path is held; content is read on every statement access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    path: PathBuf,
    name: MigrationName,
}

impl MigrationFile {
    /// Create a record for the file at `path`
    ///
    /// The name is the file stem (`.sql` removed). Paths without a UTF-8
    /// stem are rejected.
    pub fn from_path(path: impl Into<PathBuf>) -> CoreResult<Self> {
        let path = path.into();
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(MigrationName::try_new)
            .ok_or_else(|| CoreError::InvalidMigrationPath {
                path: path.display().to_string(),
            })?;
        Ok(Self { path, name })
    }

    /// Location of the file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stable identifier recorded in the ledger
    pub fn name(&self) -> &MigrationName {
        &self.name
    }

    /// Read the raw file content
    pub fn content(&self) -> std::io::Result<String> {
        std::fs::read_to_string(&self.path)
    }

    /// Read and parse both sections.
    ///
    /// An unreadable file yields empty sections.
    pub fn sections(&self) -> MigrationSections {
        match self.content() {
            Ok(content) => parse_sections(&content),
            Err(e) => {
                log::warn!("Cannot read {}: {}", self.path.display(), e);
                MigrationSections::default()
            }
        }
    }

    /// Forward statement (empty if unreadable or malformed)
    pub fn up_statement(&self) -> String {
        self.sections().up
    }

    /// Reverse statement (empty if unreadable or malformed)
    pub fn down_statement(&self) -> String {
        self.sections().down
    }
}

#[cfg(test)]
#[path = "migration_test.rs"]
mod tests;
