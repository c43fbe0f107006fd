//! Migrator configuration
//!
//! Layered as defaults, then an optional YAML file, then environment
//! variables. Command line flags are applied on top by the caller.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::backends::Driver;
use crate::error::{MigratorError, MigratorResult};
use crate::migrations::MigrationConfig;

pub const DEFAULT_CONFIG_FILE: &str = "migrator.yaml";
pub const DEFAULT_MIGRATIONS_DIR: &str = "migrations";
pub const DEFAULT_MIGRATIONS_TABLE: &str = "schema_migrations";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MigratorConfig {
    pub migrations_dir: PathBuf,
    pub migrations_table: String,
    pub database_url: Option<String>,
    pub driver: Option<String>,
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self {
            migrations_dir: PathBuf::from(DEFAULT_MIGRATIONS_DIR),
            migrations_table: DEFAULT_MIGRATIONS_TABLE.to_string(),
            database_url: None,
            driver: None,
        }
    }
}

impl MigratorConfig {
    pub fn load(path: &Path) -> MigratorResult<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| MigratorError::filesystem(path, e))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> MigratorResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load `path` if given, else `migrator.yaml` when present, else defaults;
    /// environment variables are applied last
    pub fn discover(path: Option<&Path>) -> MigratorResult<Self> {
        let config = match path {
            Some(path) => Self::load(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.is_file() {
                    Self::load(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        Ok(config.with_env_overrides())
    }

    /// Apply `DATABASE_URL`, `MIGRATOR_DRIVER`, `MIGRATOR_DIR` and `MIGRATOR_TABLE`
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database_url = Some(url);
        }
        if let Ok(driver) = std::env::var("MIGRATOR_DRIVER") {
            self.driver = Some(driver);
        }
        if let Ok(dir) = std::env::var("MIGRATOR_DIR") {
            self.migrations_dir = PathBuf::from(dir);
        }
        if let Ok(table) = std::env::var("MIGRATOR_TABLE") {
            self.migrations_table = table;
        }
        self
    }

    /// The table name is interpolated into SQL, so only plain identifiers
    /// (optionally schema-qualified) are accepted
    pub fn validate(&self) -> MigratorResult<()> {
        let valid = !self.migrations_table.is_empty()
            && self.migrations_table.split('.').all(|part| {
                !part.is_empty()
                    && !part.starts_with(|c: char| c.is_ascii_digit())
                    && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            });
        if !valid {
            return Err(MigratorError::configuration(format!(
                "invalid migrations table name: '{}'",
                self.migrations_table
            )));
        }

        if self.migrations_dir.as_os_str().is_empty() {
            return Err(MigratorError::configuration(
                "migrations directory must not be empty",
            ));
        }
        Ok(())
    }

    pub fn database_url(&self) -> MigratorResult<&str> {
        self.database_url.as_deref().ok_or_else(|| {
            MigratorError::configuration(
                "no database URL configured; set DATABASE_URL or pass --database-url",
            )
        })
    }

    /// Explicit driver if configured, else detected from the database URL
    pub fn resolve_driver(&self) -> MigratorResult<Driver> {
        match &self.driver {
            Some(name) => name.parse(),
            None => Driver::from_url(self.database_url()?),
        }
    }

    pub fn migration_config(&self) -> MigrationConfig {
        MigrationConfig::new(self.migrations_dir.clone())
    }
}
