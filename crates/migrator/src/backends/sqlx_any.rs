//! sqlx backend
//!
//! Implements the backend traits over `sqlx::AnyPool`, so one binary can talk
//! to PostgreSQL, MySQL and SQLite with the driver chosen at runtime.

use async_trait::async_trait;
use sqlx::any::{AnyArguments, AnyPoolOptions, AnyRow};
use sqlx::query::Query;
use sqlx::{Any, AnyPool, Executor, Row, Transaction};

use super::core::{DatabasePool, DatabaseRow, DatabaseTransaction, DatabaseValue, Driver};
use crate::error::{MigratorError, MigratorResult};

/// `DatabasePool` implementation backed by an sqlx `AnyPool`
#[derive(Debug, Clone)]
pub struct SqlxPool {
    pool: AnyPool,
    driver: Driver,
}

impl SqlxPool {
    pub fn new(pool: AnyPool, driver: Driver) -> Self {
        Self { pool, driver }
    }

    /// Connect with a single connection; the migrator never runs statements
    /// in parallel, and in-memory SQLite databases live per connection.
    pub async fn connect(database_url: &str, driver: Driver) -> MigratorResult<Self> {
        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(database_url)
            .await
            .map_err(|e| {
                MigratorError::persistence(format!("failed to connect to database: {}", e))
            })?;

        tracing::debug!(driver = %driver, "connected to database");
        Ok(Self::new(pool, driver))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn bind_params<'q>(
    sql: &'q str,
    params: &'q [DatabaseValue],
) -> MigratorResult<Query<'q, Any, AnyArguments<'q>>> {
    let mut query = sqlx::query(sql);
    for param in params {
        query = match param {
            DatabaseValue::Integer(v) => query.bind(*v),
            DatabaseValue::Text(s) => query.bind(s.as_str()),
            DatabaseValue::Null => {
                return Err(MigratorError::persistence(
                    "null bind parameters are not supported",
                ))
            }
        };
    }
    Ok(query)
}

fn convert_row(row: &AnyRow) -> MigratorResult<DatabaseRow> {
    let mut values = Vec::with_capacity(row.len());
    for index in 0..row.len() {
        values.push(decode_column(row, index)?);
    }
    Ok(DatabaseRow::new(values))
}

fn decode_column(row: &AnyRow, index: usize) -> MigratorResult<DatabaseValue> {
    if let Ok(value) = row.try_get::<Option<i64>, _>(index) {
        return Ok(value.map_or(DatabaseValue::Null, DatabaseValue::Integer));
    }

    let value: Option<String> = row.try_get(index).map_err(|e| {
        MigratorError::persistence(format!("failed to decode column {}: {}", index, e))
    })?;
    Ok(value.map_or(DatabaseValue::Null, DatabaseValue::Text))
}

#[async_trait]
impl DatabasePool for SqlxPool {
    fn driver(&self) -> Driver {
        self.driver
    }

    async fn execute(&self, sql: &str, params: &[DatabaseValue]) -> MigratorResult<u64> {
        let result = if params.is_empty() {
            Executor::execute(&self.pool, sql).await?
        } else {
            bind_params(sql, params)?.execute(&self.pool).await?
        };
        Ok(result.rows_affected())
    }

    async fn fetch_all(
        &self,
        sql: &str,
        params: &[DatabaseValue],
    ) -> MigratorResult<Vec<DatabaseRow>> {
        let rows = bind_params(sql, params)?.fetch_all(&self.pool).await?;
        rows.iter().map(convert_row).collect()
    }

    async fn begin_transaction(&self) -> MigratorResult<Box<dyn DatabaseTransaction>> {
        let inner = self.pool.begin().await.map_err(|e| {
            MigratorError::persistence(format!("failed to start transaction: {}", e))
        })?;
        Ok(Box::new(SqlxTransaction { inner }))
    }
}

struct SqlxTransaction {
    inner: Transaction<'static, Any>,
}

#[async_trait]
impl DatabaseTransaction for SqlxTransaction {
    async fn execute(&mut self, sql: &str, params: &[DatabaseValue]) -> MigratorResult<u64> {
        let result = if params.is_empty() {
            Executor::execute(&mut *self.inner, sql).await?
        } else {
            bind_params(sql, params)?.execute(&mut *self.inner).await?
        };
        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> MigratorResult<()> {
        self.inner.commit().await.map_err(|e| {
            MigratorError::persistence(format!("failed to commit transaction: {}", e))
        })
    }

    async fn rollback(self: Box<Self>) -> MigratorResult<()> {
        self.inner.rollback().await.map_err(|e| {
            MigratorError::persistence(format!("failed to roll back transaction: {}", e))
        })
    }
}
