//! Migration Definitions - Core types shared by the engine and the store
//!
//! Defines the bookkeeping record, the engine configuration and the naming
//! convention tying an up script to its down script.

use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Suffix identifying forward scripts
pub const UP_SUFFIX: &str = "-up.sql";

/// Suffix identifying reverse scripts
pub const DOWN_SUFFIX: &str = "-down.sql";

/// Timestamp prefix format; second precision keeps lexical and
/// chronological order identical
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// One row of bookkeeping state, or one item of a batch about to be applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRecord {
    /// Surrogate key, `None` until persisted
    pub id: Option<i64>,
    /// Path of the up script; the bookkeeping key
    pub path: String,
    /// SQL to execute; only populated for batch items
    pub sql: String,
    /// Batch number, starting at 1
    pub version: u64,
    /// When the row was written, `None` until persisted
    pub created_at: Option<DateTime<Utc>>,
}

impl MigrationRecord {
    /// Create a batch item that has not been persisted yet
    pub fn pending(path: impl Into<String>, sql: impl Into<String>, version: u64) -> Self {
        Self {
            id: None,
            path: path.into(),
            sql: sql.into(),
            version,
            created_at: None,
        }
    }

    /// Path of the paired down script
    pub fn down_path(&self) -> String {
        down_path_for(&self.path)
    }
}

/// Derive the down script path from an up script path.
///
/// Plain substitution of the first `-up.sql`; a name that itself contains
/// `-up.sql` resolves to the wrong file.
pub fn down_path_for(up_path: &str) -> String {
    up_path.replacen(UP_SUFFIX, DOWN_SUFFIX, 1)
}

/// Whether a file name follows the up script convention
pub fn is_up_script(file_name: &str) -> bool {
    file_name.ends_with(UP_SUFFIX)
}

/// Configuration for the migration engine
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Directory where migration files are stored
    pub migrations_dir: PathBuf,
}

impl MigrationConfig {
    pub fn new(migrations_dir: impl Into<PathBuf>) -> Self {
        Self {
            migrations_dir: migrations_dir.into(),
        }
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self::new("migrations")
    }
}

/// Direction a batch is applied in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationDirection {
    /// Run up scripts and insert bookkeeping rows
    Up,
    /// Run down scripts and delete bookkeeping rows
    Down,
}

/// State of a single migration as reported by `status`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationStatus {
    /// Up script on disk, not recorded
    Pending,
    /// Up script on disk and recorded
    Applied {
        version: u64,
        applied_at: Option<DateTime<Utc>>,
    },
    /// Recorded, but the up script is gone
    Missing { version: u64 },
}

/// One line of the status report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub path: String,
    pub status: MigrationStatus,
}
