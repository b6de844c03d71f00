//! mg-core - Core library for mg
//!
//! This crate provides configuration parsing, migration file discovery and
//! parsing, and scaffolding of new migration files. It never talks to a
//! database; see `mg-db` and `mg-engine` for that.

pub mod config;
pub mod directory;
pub mod error;
pub mod migration;
pub mod migration_name;
pub mod scaffold;

pub use config::{Config, DatabaseConfig, DbDriver};
pub use directory::MigrationDirectory;
pub use error::{CoreError, CoreResult};
pub use migration::{
    parse_sections, MigrationFile, MigrationSections, DOWN_MARKER, MIGRATION_TEMPLATE, UP_MARKER,
};
pub use migration_name::MigrationName;
pub use scaffold::{migration_file_name, validate_migration_name};
