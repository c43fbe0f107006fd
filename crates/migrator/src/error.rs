//! Error types for the migrator
//!
//! Every failure falls into one of three kinds: the filesystem (migration
//! directory and script files), the database (bookkeeping table and script
//! execution) or the configuration supplied by the caller.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for migrator operations
pub type MigratorResult<T> = Result<T, MigratorError>;

#[derive(Debug, Error)]
pub enum MigratorError {
    /// Directory or file creation/read failure, including a missing down script
    #[error("filesystem error at {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Database execution, transaction, connection or scan failure
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Missing bootstrap script, invalid migration name or invalid settings
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl MigratorError {
    pub fn filesystem(path: impl AsRef<Path>, source: io::Error) -> Self {
        MigratorError::Filesystem {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        MigratorError::Persistence(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        MigratorError::Configuration(msg.into())
    }

    pub fn is_filesystem(&self) -> bool {
        matches!(self, MigratorError::Filesystem { .. })
    }

    pub fn is_persistence(&self) -> bool {
        matches!(self, MigratorError::Persistence(_))
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, MigratorError::Configuration(_))
    }

    /// Message without the kind prefix, for wrapping in a more specific error
    pub fn detail(&self) -> String {
        match self {
            MigratorError::Persistence(msg) | MigratorError::Configuration(msg) => msg.clone(),
            MigratorError::Filesystem { .. } => self.to_string(),
        }
    }
}

impl From<sqlx::Error> for MigratorError {
    fn from(err: sqlx::Error) -> Self {
        MigratorError::Persistence(err.to_string())
    }
}

impl From<serde_yaml::Error> for MigratorError {
    fn from(err: serde_yaml::Error) -> Self {
        MigratorError::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filesystem_error_mentions_path() {
        let err = MigratorError::filesystem(
            "migrations/20240101000000-init-down.sql",
            io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
        );

        assert!(err.is_filesystem());
        let msg = err.to_string();
        assert!(msg.contains("migrations/20240101000000-init-down.sql"));
        assert!(msg.contains("No such file or directory"));
    }

    #[test]
    fn test_detail_drops_kind_prefix() {
        let err = MigratorError::persistence("no such table: users");
        assert_eq!(err.to_string(), "persistence error: no such table: users");
        assert_eq!(err.detail(), "no such table: users");
    }

    #[test]
    fn test_yaml_error_is_configuration() {
        let yaml_err = serde_yaml::from_str::<u32>("not: [a number").unwrap_err();
        let err: MigratorError = yaml_err.into();
        assert!(err.is_configuration());
    }
}
