//! Migration Store - Owner of the bookkeeping table
//!
//! All reads and writes of migration state go through [`MigrationStore`].
//! A batch is applied inside exactly one transaction: either every script
//! runs and every bookkeeping row changes, or nothing does.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};

use super::definitions::{MigrationDirection, MigrationRecord};
use crate::backends::{DatabasePool, DatabaseRow, DatabaseTransaction, DatabaseValue};
use crate::error::{MigratorError, MigratorResult};

/// Persistence contract the migration engine depends on
#[async_trait]
pub trait MigrationStore: Send + Sync {
    /// Driver name used to pick the bootstrap script
    fn driver_name(&self) -> &str;

    /// Name of the bookkeeping table
    fn table_name(&self) -> &str;

    /// Execute the bookkeeping table DDL; no existence check
    async fn create_bookkeeping_table(&self, ddl: &str) -> MigratorResult<()>;

    /// Every applied record, most recent first
    async fn list_all(&self) -> MigratorResult<Vec<MigrationRecord>>;

    /// Applied records of one version, most recent first
    async fn list_by_version(&self, version: u64) -> MigratorResult<Vec<MigrationRecord>>;

    /// Highest stored version, `0` when nothing is applied
    async fn latest_version(&self) -> MigratorResult<u64>;

    /// Run each record's SQL and insert its row, in one transaction
    async fn apply_up(&self, batch: &[MigrationRecord]) -> MigratorResult<()>;

    /// Run each record's SQL and delete the row matching its path, in one transaction
    async fn apply_down(&self, batch: &[MigrationRecord]) -> MigratorResult<()>;
}

/// SQL implementation of the store over any [`DatabasePool`]
pub struct SqlMigrationStore {
    pool: Arc<dyn DatabasePool>,
    table: String,
}

impl SqlMigrationStore {
    pub fn new(pool: Arc<dyn DatabasePool>, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
        }
    }

    pub fn pool(&self) -> &Arc<dyn DatabasePool> {
        &self.pool
    }

    fn select_sql(&self, filter: Option<&str>) -> String {
        let driver = self.pool.driver();
        let mut sql = format!(
            "SELECT id, migration, version, {} FROM {}",
            driver.timestamp_as_text("created_at"),
            self.table
        );
        if let Some(filter) = filter {
            sql.push_str(" WHERE ");
            sql.push_str(filter);
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC");
        sql
    }

    fn insert_sql(&self) -> String {
        let driver = self.pool.driver();
        format!(
            "INSERT INTO {} (migration, version) VALUES ({}, {})",
            self.table,
            driver.placeholder(1),
            driver.placeholder(2)
        )
    }

    fn delete_sql(&self) -> String {
        format!(
            "DELETE FROM {} WHERE migration = {}",
            self.table,
            self.pool.driver().placeholder(1)
        )
    }

    fn latest_version_sql(&self) -> String {
        format!(
            "SELECT version FROM {} ORDER BY version DESC LIMIT 1",
            self.table
        )
    }

    async fn fetch_records(
        &self,
        sql: &str,
        params: &[DatabaseValue],
    ) -> MigratorResult<Vec<MigrationRecord>> {
        let rows = self.pool.fetch_all(sql, params).await.map_err(|e| {
            MigratorError::persistence(format!(
                "failed to query applied migrations: {}",
                e.detail()
            ))
        })?;
        rows.iter().map(record_from_row).collect()
    }

    async fn apply_batch(
        &self,
        batch: &[MigrationRecord],
        direction: MigrationDirection,
    ) -> MigratorResult<()> {
        let mut transaction = self.pool.begin_transaction().await?;

        for record in batch {
            if let Err(err) = self
                .apply_record(transaction.as_mut(), record, direction)
                .await
            {
                if let Err(rollback_err) = transaction.rollback().await {
                    tracing::error!(
                        error = %rollback_err,
                        "failed to roll back migration batch"
                    );
                }
                return Err(err);
            }
        }

        transaction.commit().await
    }

    async fn apply_record(
        &self,
        transaction: &mut dyn DatabaseTransaction,
        record: &MigrationRecord,
        direction: MigrationDirection,
    ) -> MigratorResult<()> {
        if !record.sql.trim().is_empty() {
            transaction.execute(&record.sql, &[]).await.map_err(|e| {
                let script = match direction {
                    MigrationDirection::Up => record.path.clone(),
                    MigrationDirection::Down => record.down_path(),
                };
                MigratorError::persistence(format!(
                    "failed to execute {} script {}: {}",
                    direction_label(direction),
                    script,
                    e.detail()
                ))
            })?;
        }

        match direction {
            MigrationDirection::Up => {
                let params = [
                    DatabaseValue::from(record.path.as_str()),
                    version_param(record.version)?,
                ];
                transaction
                    .execute(&self.insert_sql(), &params)
                    .await
                    .map_err(|e| {
                        MigratorError::persistence(format!(
                            "failed to record migration {}: {}",
                            record.path,
                            e.detail()
                        ))
                    })?;
            }
            MigrationDirection::Down => {
                let params = [DatabaseValue::from(record.path.as_str())];
                transaction
                    .execute(&self.delete_sql(), &params)
                    .await
                    .map_err(|e| {
                        MigratorError::persistence(format!(
                            "failed to remove migration record {}: {}",
                            record.path,
                            e.detail()
                        ))
                    })?;
            }
        }

        tracing::debug!(
            path = %record.path,
            version = record.version,
            ?direction,
            "bookkeeping updated"
        );
        Ok(())
    }
}

#[async_trait]
impl MigrationStore for SqlMigrationStore {
    fn driver_name(&self) -> &str {
        self.pool.driver().name()
    }

    fn table_name(&self) -> &str {
        &self.table
    }

    async fn create_bookkeeping_table(&self, ddl: &str) -> MigratorResult<()> {
        self.pool.execute(ddl, &[]).await.map_err(|e| {
            MigratorError::persistence(format!("failed to create migrations table: {}", e.detail()))
        })?;
        Ok(())
    }

    async fn list_all(&self) -> MigratorResult<Vec<MigrationRecord>> {
        self.fetch_records(&self.select_sql(None), &[]).await
    }

    async fn list_by_version(&self, version: u64) -> MigratorResult<Vec<MigrationRecord>> {
        let filter = format!("version = {}", self.pool.driver().placeholder(1));
        self.fetch_records(&self.select_sql(Some(&filter)), &[version_param(version)?])
            .await
    }

    async fn latest_version(&self) -> MigratorResult<u64> {
        let rows = self
            .pool
            .fetch_all(&self.latest_version_sql(), &[])
            .await
            .map_err(|e| {
                MigratorError::persistence(format!("failed to get latest version: {}", e.detail()))
            })?;

        match rows.first() {
            Some(row) => version_from_i64(row.get_i64(0)?),
            None => Ok(0),
        }
    }

    async fn apply_up(&self, batch: &[MigrationRecord]) -> MigratorResult<()> {
        self.apply_batch(batch, MigrationDirection::Up).await
    }

    async fn apply_down(&self, batch: &[MigrationRecord]) -> MigratorResult<()> {
        self.apply_batch(batch, MigrationDirection::Down).await
    }
}

fn direction_label(direction: MigrationDirection) -> &'static str {
    match direction {
        MigrationDirection::Up => "up",
        MigrationDirection::Down => "down",
    }
}

fn version_param(version: u64) -> MigratorResult<DatabaseValue> {
    i64::try_from(version)
        .map(DatabaseValue::Integer)
        .map_err(|_| MigratorError::persistence(format!("version {} out of range", version)))
}

fn version_from_i64(version: i64) -> MigratorResult<u64> {
    u64::try_from(version)
        .map_err(|_| MigratorError::persistence(format!("invalid stored version {}", version)))
}

fn record_from_row(row: &DatabaseRow) -> MigratorResult<MigrationRecord> {
    let created_at = match row.get_optional_text(3)? {
        Some(text) => Some(parse_timestamp(&text)?),
        None => None,
    };

    Ok(MigrationRecord {
        id: Some(row.get_i64(0)?),
        path: row.get_text(1)?,
        sql: String::new(),
        version: version_from_i64(row.get_i64(2)?)?,
        created_at,
    })
}

/// Parse `created_at` as rendered by the supported drivers
fn parse_timestamp(text: &str) -> MigratorResult<DateTime<Utc>> {
    let text = text.trim();

    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(DateTime::from_naive_utc_and_offset(naive, Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Ok(dt.with_timezone(&Utc));
    }

    Err(MigratorError::persistence(format!(
        "unrecognised created_at value: {}",
        text
    )))
}
