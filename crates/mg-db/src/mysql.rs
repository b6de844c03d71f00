//! MySQL database backend implementation
//!
//! Statements run through a sqlx pool. Migration bodies are sent with the
//! text protocol (`raw_sql`) so one block may contain several statements.
//! Wipe and transactional steps pin a single connection.

use crate::error::{check_ledger_table, DbError, DbResult};
use crate::traits::{DatabaseCore, DatabaseLedger, LedgerChange, LedgerRow};
use async_trait::async_trait;
use mg_core::DatabaseConfig;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlPool, MySqlPoolOptions};
use sqlx::Executor;
use std::time::Duration;

const MAX_CONNECTIONS: u32 = 10;
const MAX_LIFETIME: Duration = Duration::from_secs(180);

/// MySQL database backend
pub struct MySqlBackend {
    pool: MySqlPool,
}

impl MySqlBackend {
    /// Connect using host/port/credentials from the config
    pub async fn connect(config: &DatabaseConfig) -> DbResult<Self> {
        let mut options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.username)
            .database(&config.database);
        if let Some(password) = config.resolve_password() {
            options = options.password(&password);
        }

        let pool = MySqlPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .max_lifetime(MAX_LIFETIME)
            .connect_with(options)
            .await
            .map_err(|e| {
                DbError::ConnectionError(format!(
                    "{}@{}:{}/{}: {}",
                    config.username, config.host, config.port, config.database, e
                ))
            })?;

        log::debug!(
            "Connected to MySQL at {}:{}/{}",
            config.host,
            config.port,
            config.database
        );
        Ok(Self { pool })
    }
}

#[async_trait]
impl DatabaseCore for MySqlBackend {
    async fn execute(&self, sql: &str) -> DbResult<()> {
        sqlx::raw_sql(sql).execute(&self.pool).await?;
        Ok(())
    }

    async fn relation_exists(&self, name: &str) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar(RELATION_EXISTS_SQL)
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn wipe(&self) -> DbResult<()> {
        let mut pool_conn = self.pool.acquire().await?;
        wipe_schema(&mut pool_conn).await
    }

    fn db_type(&self) -> &'static str {
        "mysql"
    }
}

#[async_trait]
impl DatabaseLedger for MySqlBackend {
    async fn ensure_ledger_table(&self, table: &str) -> DbResult<()> {
        check_ledger_table(table)?;
        sqlx::raw_sql(&create_ledger_table_sql(table))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn ledger_rows(&self, table: &str) -> DbResult<Vec<LedgerRow>> {
        check_ledger_table(table)?;
        let rows: Vec<(String, i64)> = sqlx::query_as(&select_rows_sql(table))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(migration, batch)| LedgerRow { migration, batch })
            .collect())
    }

    async fn ledger_rows_in_batch(&self, table: &str, batch: i64) -> DbResult<Vec<LedgerRow>> {
        check_ledger_table(table)?;
        let rows: Vec<(String, i64)> = sqlx::query_as(&select_rows_in_batch_sql(table))
            .bind(batch)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(migration, batch)| LedgerRow { migration, batch })
            .collect())
    }

    async fn max_batch(&self, table: &str) -> DbResult<Option<i64>> {
        check_ledger_table(table)?;
        let max: Option<i64> = sqlx::query_scalar(&max_batch_sql(table))
            .fetch_one(&self.pool)
            .await?;
        Ok(max)
    }

    async fn insert_ledger_row(&self, table: &str, migration: &str, batch: i64) -> DbResult<()> {
        check_ledger_table(table)?;
        sqlx::query(&insert_sql(table))
            .bind(migration)
            .bind(batch)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_ledger_row(&self, table: &str, migration: &str) -> DbResult<()> {
        check_ledger_table(table)?;
        sqlx::query(&delete_sql(table))
            .bind(migration)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn execute_with_ledger(
        &self,
        table: &str,
        sql: &str,
        change: LedgerChange<'_>,
    ) -> DbResult<()> {
        check_ledger_table(table)?;
        // Dropping the transaction without commit rolls it back
        let mut tx = self.pool.begin().await?;
        apply_with_ledger(&mut tx, table, sql, change).await?;
        tx.commit().await?;
        Ok(())
    }
}

async fn wipe_schema(conn: &mut MySqlConnection) -> DbResult<()> {
    conn.execute(sqlx::raw_sql("SET FOREIGN_KEY_CHECKS = 0"))
        .await?;
    let dropped = drop_all_relations(&mut *conn).await;
    let restored = conn
        .execute(sqlx::raw_sql("SET FOREIGN_KEY_CHECKS = 1"))
        .await;

    dropped?;
    restored?;
    Ok(())
}

async fn apply_with_ledger(
    conn: &mut MySqlConnection,
    table: &str,
    sql: &str,
    change: LedgerChange<'_>,
) -> DbResult<()> {
    if !sql.trim().is_empty() {
        conn.execute(sqlx::raw_sql(sql)).await?;
    }
    match change {
        LedgerChange::Record { migration, batch } => {
            let insert = insert_sql(table);
            conn.execute(sqlx::query(&insert).bind(migration).bind(batch))
                .await?;
        }
        LedgerChange::Remove { migration } => {
            let delete = delete_sql(table);
            conn.execute(sqlx::query(&delete).bind(migration)).await?;
        }
    }
    Ok(())
}

async fn drop_all_relations(conn: &mut MySqlConnection) -> DbResult<()> {
    let relations: Vec<(String, String)> = sqlx::query_as(LIST_RELATIONS_SQL)
        .fetch_all(&mut *conn)
        .await?;

    for (name, kind) in relations {
        let sql = drop_relation_sql(&name, &kind);
        log::debug!("{}", sql);
        conn.execute(sqlx::raw_sql(&sql)).await?;
    }
    Ok(())
}

const RELATION_EXISTS_SQL: &str = "SELECT COUNT(*) FROM information_schema.tables \
     WHERE table_schema = DATABASE() AND table_name = ?";

const LIST_RELATIONS_SQL: &str =
    "SELECT CAST(table_name AS CHAR), CAST(table_type AS CHAR) FROM information_schema.tables \
     WHERE table_schema = DATABASE()";

fn create_ledger_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\
         id INT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY, \
         migration VARCHAR(255) NOT NULL, \
         batch INT NOT NULL)",
        table
    )
}

fn select_rows_sql(table: &str) -> String {
    format!(
        "SELECT migration, CAST(batch AS SIGNED) FROM {} ORDER BY id",
        table
    )
}

fn select_rows_in_batch_sql(table: &str) -> String {
    format!(
        "SELECT migration, CAST(batch AS SIGNED) FROM {} WHERE batch = ? ORDER BY id",
        table
    )
}

fn max_batch_sql(table: &str) -> String {
    format!("SELECT CAST(MAX(batch) AS SIGNED) FROM {}", table)
}

fn insert_sql(table: &str) -> String {
    format!("INSERT INTO {} (migration, batch) VALUES (?, ?)", table)
}

fn delete_sql(table: &str) -> String {
    format!("DELETE FROM {} WHERE migration = ?", table)
}

fn drop_relation_sql(name: &str, kind: &str) -> String {
    let object = if kind.eq_ignore_ascii_case("VIEW") {
        "VIEW"
    } else {
        "TABLE"
    };
    format!("DROP {} IF EXISTS {}", object, quote_ident(name))
}

fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

#[cfg(test)]
#[path = "mysql_test.rs"]
mod tests;
