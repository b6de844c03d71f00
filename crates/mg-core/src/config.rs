//! Configuration types and parsing for migrate.yml

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file names searched in a project directory, in priority order.
pub const CONFIG_FILE_NAMES: &[&str] = &["migrate.yml", "migrate.yaml"];

/// Environment variable consulted when `database.password` is not set.
pub const PASSWORD_ENV_VAR: &str = "MG_DB_PASSWORD";

/// Ledger table used when the config does not name one
pub const DEFAULT_LEDGER_TABLE: &str = "migrations";

/// Starter config written by `mg init`
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# mg configuration
migrations_path: "database/migrations"
ledger_table: migrations

# Run each migration and its ledger write in one transaction.
# MySQL commits DDL implicitly, so this is best effort there.
transactional: false

database:
  # duckdb | mysql | memory
  driver: duckdb
  # DuckDB file path, or the schema name for mysql
  database: "migrate.duckdb"
  # Used by mysql only
  host: localhost
  port: 3306
  username: user
  # password: pass   # or set MG_DB_PASSWORD
"#;

/// Main project configuration from migrate.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Directory holding the `*.sql` migration files
    #[serde(default = "default_migrations_path")]
    pub migrations_path: String,

    /// Name of the table that records applied migrations
    #[serde(default = "default_ledger_table")]
    pub ledger_table: String,

    /// Run each statement and its ledger write inside one transaction
    #[serde(default)]
    pub transactional: bool,

    /// Database connection configuration
    #[serde(default)]
    pub database: DatabaseConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            migrations_path: default_migrations_path(),
            ledger_table: default_ledger_table(),
            transactional: false,
            database: DatabaseConfig::default(),
        }
    }
}

/// Database driver selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DbDriver {
    /// Embedded DuckDB file (default)
    #[default]
    DuckDb,
    /// Networked MySQL server
    MySql,
    /// In-process test double, nothing is persisted
    Memory,
}

impl std::fmt::Display for DbDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbDriver::DuckDb => write!(f, "duckdb"),
            DbDriver::MySql => write!(f, "mysql"),
            DbDriver::Memory => write!(f, "memory"),
        }
    }
}

/// Database connection configuration.
///
/// A flat set of fields shared by every driver. Networked drivers use
/// host/port/credentials; embedded drivers only read `database`, which
/// holds the file path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Which backend to connect to
    #[serde(default)]
    pub driver: DbDriver,

    /// Server host (networked drivers)
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port (networked drivers)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Login user (networked drivers)
    #[serde(default)]
    pub username: String,

    /// Login password; falls back to `MG_DB_PASSWORD` when unset
    #[serde(default)]
    pub password: Option<String>,

    /// Schema name for networked drivers, file path (or `:memory:`) for DuckDB
    #[serde(default = "default_database")]
    pub database: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DbDriver::default(),
            host: default_host(),
            port: default_port(),
            username: String::new(),
            password: None,
            database: default_database(),
        }
    }
}

impl DatabaseConfig {
    /// Resolve the password, preferring the config value over `MG_DB_PASSWORD`.
    pub fn resolve_password(&self) -> Option<String> {
        self.password
            .clone()
            .or_else(|| std::env::var(PASSWORD_ENV_VAR).ok())
    }

    /// Validate the fields the selected driver needs
    pub fn validate(&self) -> CoreResult<()> {
        match self.driver {
            DbDriver::DuckDb => {
                if self.database.trim().is_empty() {
                    return Err(CoreError::ConfigInvalid {
                        message: "database.database must name a DuckDB file or ':memory:'"
                            .to_string(),
                    });
                }
            }
            DbDriver::MySql => {
                let missing: Vec<&str> = [
                    ("host", self.host.as_str()),
                    ("username", self.username.as_str()),
                    ("database", self.database.as_str()),
                ]
                .iter()
                .filter(|(_, value)| value.trim().is_empty())
                .map(|(field, _)| *field)
                .collect();
                if !missing.is_empty() {
                    return Err(CoreError::ConfigInvalid {
                        message: format!(
                            "mysql driver requires database.{}",
                            missing.join(", database.")
                        ),
                    });
                }
            }
            DbDriver::Memory => {}
        }
        Ok(())
    }
}

fn default_migrations_path() -> String {
    "database/migrations".to_string()
}

fn default_ledger_table() -> String {
    DEFAULT_LEDGER_TABLE.to_string()
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    3306
}

fn default_database() -> String {
    "migrate.duckdb".to_string()
}

/// Returns true if `name` is a bare SQL identifier (`[A-Za-z_][A-Za-z0-9_]*`).
///
/// The ledger table name is interpolated into SQL text, so anything else is rejected.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| CoreError::ConfigParseError {
                message: format!("{}: {}", path.display(), e),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a project directory
    /// Looks for migrate.yml or migrate.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        match Self::find_in_dir(dir) {
            Some(path) => Self::load(&path),
            None => Err(CoreError::ConfigNotFound {
                path: dir.join(CONFIG_FILE_NAMES[0]).display().to_string(),
            }),
        }
    }

    /// Return the first existing config file in `dir`, if any
    pub fn find_in_dir(dir: &Path) -> Option<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.exists())
    }

    /// Validate the configuration
    pub fn validate(&self) -> CoreResult<()> {
        if self.migrations_path.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "migrations_path cannot be empty".to_string(),
            });
        }

        if !is_valid_identifier(&self.ledger_table) {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "ledger_table '{}' must be a plain identifier ([A-Za-z_][A-Za-z0-9_]*)",
                    self.ledger_table
                ),
            });
        }

        self.database.validate()
    }

    /// Get the migrations directory relative to a project root
    pub fn migrations_path_absolute(&self, root: &Path) -> PathBuf {
        root.join(&self.migrations_path)
    }

    /// Resolve a relative DuckDB file path against a project root.
    ///
    /// Networked drivers and `:memory:` are returned unchanged.
    pub fn database_for_root(&self, root: &Path) -> DatabaseConfig {
        let mut db = self.database.clone();
        if db.driver == DbDriver::DuckDb
            && db.database != ":memory:"
            && Path::new(&db.database).is_relative()
        {
            db.database = root.join(&db.database).display().to_string();
        }
        db
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
