//! Shared helpers for engine integration tests

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sql_migrator::{MigrationRecord, MigrationStore, MigratorError, MigratorResult};

#[derive(Debug, Default)]
struct State {
    rows: Vec<MigrationRecord>,
    next_id: i64,
    executed: Vec<String>,
    ddl: Vec<String>,
    down_batches: usize,
}

/// In-memory bookkeeping store. A batch is staged on a copy of the rows and
/// only swapped in when every record succeeds; scripts containing the
/// failure marker are rejected like a database syntax error.
pub struct MemoryStore {
    driver: String,
    table: String,
    fail_marker: Mutex<Option<String>>,
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_driver("sqlite3")
    }

    pub fn with_driver(driver: &str) -> Self {
        Self {
            driver: driver.to_string(),
            table: "schema_migrations".to_string(),
            fail_marker: Mutex::new(None),
            state: Mutex::new(State {
                next_id: 1,
                ..State::default()
            }),
        }
    }

    pub fn fail_on(&self, marker: &str) {
        *self.fail_marker.lock().unwrap() = Some(marker.to_string());
    }

    pub fn rows(&self) -> Vec<MigrationRecord> {
        self.state.lock().unwrap().rows.clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.rows().into_iter().map(|r| r.path).collect()
    }

    pub fn executed(&self) -> Vec<String> {
        self.state.lock().unwrap().executed.clone()
    }

    pub fn ddl(&self) -> Vec<String> {
        self.state.lock().unwrap().ddl.clone()
    }

    pub fn down_batches(&self) -> usize {
        self.state.lock().unwrap().down_batches
    }

    fn check(&self, record: &MigrationRecord) -> MigratorResult<()> {
        match self.fail_marker.lock().unwrap().as_deref() {
            Some(marker) if record.sql.contains(marker) => Err(MigratorError::persistence(
                format!("failed to execute migration {}: syntax error", record.path),
            )),
            _ => Ok(()),
        }
    }

    fn sorted(mut rows: Vec<MigrationRecord>) -> Vec<MigrationRecord> {
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        rows
    }
}

fn clock(id: i64) -> DateTime<Utc> {
    "2024-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap() + Duration::seconds(id)
}

#[async_trait]
impl MigrationStore for MemoryStore {
    fn driver_name(&self) -> &str {
        &self.driver
    }

    fn table_name(&self) -> &str {
        &self.table
    }

    async fn create_bookkeeping_table(&self, ddl: &str) -> MigratorResult<()> {
        self.state.lock().unwrap().ddl.push(ddl.to_string());
        Ok(())
    }

    async fn list_all(&self) -> MigratorResult<Vec<MigrationRecord>> {
        Ok(Self::sorted(self.rows()))
    }

    async fn list_by_version(&self, version: u64) -> MigratorResult<Vec<MigrationRecord>> {
        Ok(Self::sorted(
            self.rows().into_iter().filter(|r| r.version == version).collect(),
        ))
    }

    async fn latest_version(&self) -> MigratorResult<u64> {
        Ok(self.rows().iter().map(|r| r.version).max().unwrap_or(0))
    }

    async fn apply_up(&self, batch: &[MigrationRecord]) -> MigratorResult<()> {
        let mut state = self.state.lock().unwrap();
        let mut staged = state.rows.clone();
        let mut next_id = state.next_id;
        let mut executed = Vec::new();

        for record in batch {
            self.check(record)?;
            if staged.iter().any(|r| r.path == record.path) {
                return Err(MigratorError::persistence(format!(
                    "duplicate migration {}",
                    record.path
                )));
            }
            executed.push(record.sql.clone());
            staged.push(MigrationRecord {
                id: Some(next_id),
                path: record.path.clone(),
                sql: String::new(),
                version: record.version,
                created_at: Some(clock(next_id)),
            });
            next_id += 1;
        }

        state.rows = staged;
        state.next_id = next_id;
        state.executed.extend(executed);
        Ok(())
    }

    async fn apply_down(&self, batch: &[MigrationRecord]) -> MigratorResult<()> {
        let mut state = self.state.lock().unwrap();
        let mut staged = state.rows.clone();
        let mut executed = Vec::new();

        for record in batch {
            self.check(record)?;
            executed.push(record.sql.clone());
            staged.retain(|r| r.path != record.path);
        }

        state.rows = staged;
        state.executed.extend(executed);
        state.down_batches += 1;
        Ok(())
    }
}

/// Write an up/down pair into `dir`, returning the up path as the engine reports it
pub fn write_pair(dir: &Path, stem: &str, up_sql: &str, down_sql: &str) -> String {
    let up = dir.join(format!("{}-up.sql", stem));
    fs::write(&up, up_sql).unwrap();
    fs::write(dir.join(format!("{}-down.sql", stem)), down_sql).unwrap();
    up.to_string_lossy().into_owned()
}

pub fn down_of(up: &str) -> String {
    up.replace("-up.sql", "-down.sql")
}
