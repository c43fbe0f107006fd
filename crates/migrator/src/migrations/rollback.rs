//! Migration Rollback - Reverses applied migrations
//!
//! Down scripts are located by naming convention from the recorded up path
//! and run as a single batch through the store.

use super::definitions::MigrationRecord;
use super::engine::MigrationEngine;
use super::files;
use super::store::MigrationStore;
use crate::error::MigratorResult;

impl<S: MigrationStore> MigrationEngine<S> {
    /// Roll back the latest version; returns the down scripts that ran
    pub async fn apply_down(&self) -> MigratorResult<Vec<String>> {
        let version = self.store().latest_version().await?;
        if version == 0 {
            tracing::debug!("nothing to roll back");
            return Ok(Vec::new());
        }

        let records = self.store().list_by_version(version).await?;
        self.roll_back(records).await
    }

    /// Roll back every applied migration, most recent first, in one batch
    pub async fn apply_all_down(&self) -> MigratorResult<Vec<String>> {
        let records = self.store().list_all().await?;
        self.roll_back(records).await
    }

    async fn roll_back(&self, records: Vec<MigrationRecord>) -> MigratorResult<Vec<String>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        // Read every down script before touching the database
        let mut down_paths = Vec::with_capacity(records.len());
        let mut batch = Vec::with_capacity(records.len());
        for record in records {
            let down_path = record.down_path();
            let sql = files::read_script(&down_path)?;
            batch.push(MigrationRecord::pending(record.path, sql, record.version));
            down_paths.push(down_path);
        }

        self.store().apply_down(&batch).await?;

        for (path, record) in down_paths.iter().zip(&batch) {
            tracing::info!(path = %path, version = record.version, "rolled back");
        }
        Ok(down_paths)
    }
}
