//! Error types for mg-core

use thiserror::Error;

/// Core error type for mg
#[derive(Error, Debug)]
pub enum CoreError {
    /// E001: Configuration file not found
    #[error("[E001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// E002: Failed to parse configuration file
    #[error("[E002] Failed to parse config: {message}")]
    ConfigParseError { message: String },

    /// E003: Invalid configuration value
    #[error("[E003] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// E004: Migration name rejected by scaffolding
    #[error("[E004] Invalid migration name '{name}': {reason}")]
    InvalidMigrationName { name: String, reason: String },

    /// E005: Scaffolding would overwrite an existing migration file
    #[error("[E005] Migration file already exists: {path}")]
    MigrationExists { path: String },

    /// E006: Migration file path has no usable stem
    #[error("[E006] Invalid migration file name: {path}")]
    InvalidMigrationPath { path: String },

    /// E007: IO error with file path context
    #[error("[E007] Failed to access '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
