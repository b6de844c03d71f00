//! Backend selection from configuration

use crate::duckdb::DuckDbBackend;
use crate::error::DbResult;
use crate::memory::MemoryBackend;
use crate::traits::Database;
use mg_core::{DatabaseConfig, DbDriver};
use std::sync::Arc;

/// Open the backend named by `config.driver`.
///
/// DuckDB paths are used as given; resolve them against the project root
/// first (see `Config::database_for_root`).
pub async fn connect(config: &DatabaseConfig) -> DbResult<Arc<dyn Database>> {
    log::debug!("Opening {} database", config.driver);
    match config.driver {
        DbDriver::DuckDb => Ok(Arc::new(DuckDbBackend::new(&config.database)?)),
        DbDriver::MySql => connect_mysql(config).await,
        DbDriver::Memory => Ok(Arc::new(MemoryBackend::new())),
    }
}

#[cfg(feature = "mysql")]
async fn connect_mysql(config: &DatabaseConfig) -> DbResult<Arc<dyn Database>> {
    Ok(Arc::new(crate::mysql::MySqlBackend::connect(config).await?))
}

#[cfg(not(feature = "mysql"))]
async fn connect_mysql(_config: &DatabaseConfig) -> DbResult<Arc<dyn Database>> {
    Err(crate::error::DbError::NotImplemented {
        backend: "mysql".to_string(),
        feature: "this build was compiled without the `mysql` feature".to_string(),
    })
}
