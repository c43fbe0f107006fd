//! Migration Engine - Turns files on disk into batches for the store
//!
//! Diffs discovered up scripts against applied records, assigns the next
//! version and hands one batch per call to the [`MigrationStore`].

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use super::bootstrap::render_bootstrap_script;
use super::definitions::{MigrationConfig, MigrationRecord, MigrationStatus, StatusEntry};
use super::files;
use super::store::MigrationStore;
use crate::error::MigratorResult;

/// Migration engine over a bookkeeping store
pub struct MigrationEngine<S> {
    store: S,
    config: MigrationConfig,
}

impl<S: MigrationStore> MigrationEngine<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, MigrationConfig::default())
    }

    pub fn with_config(store: S, config: MigrationConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn migrations_dir(&self) -> &Path {
        &self.config.migrations_dir
    }

    /// Create the migrations directory and the bookkeeping table
    pub async fn bootstrap(&self) -> MigratorResult<Vec<String>> {
        let ddl = render_bootstrap_script(self.store.driver_name(), self.store.table_name())?;

        let dir = files::create_migrations_dir(self.migrations_dir())?;
        let mut messages = vec![format!("created directory {}", dir.display())];

        self.store.create_bookkeeping_table(&ddl).await?;
        messages.push(format!("created table {}", self.store.table_name()));

        tracing::info!(
            dir = %dir.display(),
            table = self.store.table_name(),
            driver = self.store.driver_name(),
            "migrator initialised"
        );
        Ok(messages)
    }

    /// Create an empty up/down script pair stamped with the current UTC time
    pub fn create_migration_pair(&self, name: &str) -> MigratorResult<(PathBuf, PathBuf)> {
        self.create_migration_pair_at(name, Utc::now())
    }

    /// Create an empty up/down script pair stamped with `timestamp`
    pub fn create_migration_pair_at(
        &self,
        name: &str,
        timestamp: DateTime<Utc>,
    ) -> MigratorResult<(PathBuf, PathBuf)> {
        files::create_pair(self.migrations_dir(), name, timestamp)
    }

    /// Up scripts on disk that are not recorded yet, in discovery order
    pub async fn pending_migrations(&self) -> MigratorResult<Vec<String>> {
        let applied = self.store.list_all().await?;
        let discovered = files::discover_up_scripts(self.migrations_dir())?;
        Ok(filter_pending(&applied, discovered))
    }

    /// Apply every pending up script as one new version
    pub async fn apply_up(&self) -> MigratorResult<Vec<String>> {
        let pending = self.pending_migrations().await?;
        if pending.is_empty() {
            tracing::debug!("no pending migrations");
            return Ok(Vec::new());
        }

        let version = self.store.latest_version().await? + 1;

        let mut batch = Vec::with_capacity(pending.len());
        for path in &pending {
            let sql = files::read_script(path)?;
            batch.push(MigrationRecord::pending(path.clone(), sql, version));
        }

        self.store.apply_up(&batch).await?;

        for path in &pending {
            tracing::info!(path = %path, version, "migrated");
        }
        Ok(pending)
    }

    /// Roll back everything, then apply every up script again.
    ///
    /// The two phases are separate transactions; when the second fails the
    /// database is left with nothing applied.
    pub async fn refresh(&self) -> MigratorResult<Vec<String>> {
        let rolled_back = self.apply_all_down().await?;

        let migrated = self.apply_up().await.map_err(|err| {
            tracing::warn!(
                error = %err,
                "re-applying migrations failed after a full rollback; nothing is applied"
            );
            err
        })?;

        let mut messages = Vec::with_capacity(rolled_back.len() + migrated.len());
        messages.extend(rolled_back.iter().map(|path| format!("rolled back: {}", path)));
        messages.extend(migrated.iter().map(|path| format!("migrated: {}", path)));
        Ok(messages)
    }

    /// Every up script on disk with its state, followed by records whose
    /// up script no longer exists
    pub async fn status(&self) -> MigratorResult<Vec<StatusEntry>> {
        let applied = self.store.list_all().await?;
        let discovered = files::discover_up_scripts(self.migrations_dir())?;

        let by_path: HashMap<&str, &MigrationRecord> =
            applied.iter().map(|r| (r.path.as_str(), r)).collect();
        let on_disk: HashSet<&str> = discovered.iter().map(String::as_str).collect();

        let mut entries: Vec<StatusEntry> = discovered
            .iter()
            .map(|path| {
                let status = match by_path.get(path.as_str()) {
                    Some(record) => MigrationStatus::Applied {
                        version: record.version,
                        applied_at: record.created_at,
                    },
                    None => MigrationStatus::Pending,
                };
                StatusEntry {
                    path: path.clone(),
                    status,
                }
            })
            .collect();

        // list_all is most recent first; report missing files oldest first
        entries.extend(
            applied
                .iter()
                .rev()
                .filter(|r| !on_disk.contains(r.path.as_str()))
                .map(|r| StatusEntry {
                    path: r.path.clone(),
                    status: MigrationStatus::Missing { version: r.version },
                }),
        );

        Ok(entries)
    }
}

/// Discovered paths not among the applied records, keeping discovery order
pub fn filter_pending(applied: &[MigrationRecord], discovered: Vec<String>) -> Vec<String> {
    let applied: HashSet<&str> = applied.iter().map(|r| r.path.as_str()).collect();
    discovered
        .into_iter()
        .filter(|path| !applied.contains(path.as_str()))
        .collect()
}
