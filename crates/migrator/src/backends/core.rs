//! Core Database Backend Traits
//!
//! The bookkeeping store only needs a narrow capability set from a database:
//! run a statement, fetch rows, and open a transaction. These traits describe
//! that set so the store can run against a real pool or a test double.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

use crate::error::{MigratorError, MigratorResult};

/// Supported database drivers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Driver {
    Postgres,
    MySql,
    Sqlite,
}

impl Driver {
    /// Canonical driver name, also the key of the bootstrap script
    pub fn name(&self) -> &'static str {
        match self {
            Driver::Postgres => "postgres",
            Driver::MySql => "mysql",
            Driver::Sqlite => "sqlite3",
        }
    }

    /// Detect the driver from a database URL scheme
    pub fn from_url(url: &str) -> MigratorResult<Self> {
        if url.starts_with("postgresql://") || url.starts_with("postgres://") {
            Ok(Driver::Postgres)
        } else if url.starts_with("mysql://") || url.starts_with("mariadb://") {
            Ok(Driver::MySql)
        } else if url.starts_with("sqlite:") {
            Ok(Driver::Sqlite)
        } else {
            Err(MigratorError::configuration(format!(
                "unable to detect database driver from URL: {}",
                url
            )))
        }
    }

    /// Bind parameter placeholder for the given 1-based position
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Driver::Postgres => format!("${}", index),
            Driver::MySql | Driver::Sqlite => "?".to_string(),
        }
    }

    /// Expression reading a timestamp column back as text
    pub fn timestamp_as_text(&self, column: &str) -> String {
        match self {
            Driver::MySql => format!("CAST({} AS CHAR)", column),
            Driver::Postgres | Driver::Sqlite => format!("CAST({} AS TEXT)", column),
        }
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Driver {
    type Err = MigratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Driver::Postgres),
            "mysql" | "mariadb" => Ok(Driver::MySql),
            "sqlite3" | "sqlite" => Ok(Driver::Sqlite),
            other => Err(MigratorError::configuration(format!(
                "unsupported database driver: {}",
                other
            ))),
        }
    }
}

/// A bound parameter or a fetched column value
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseValue {
    Null,
    Integer(i64),
    Text(String),
}

impl From<i64> for DatabaseValue {
    fn from(value: i64) -> Self {
        DatabaseValue::Integer(value)
    }
}

impl From<String> for DatabaseValue {
    fn from(value: String) -> Self {
        DatabaseValue::Text(value)
    }
}

impl From<&str> for DatabaseValue {
    fn from(value: &str) -> Self {
        DatabaseValue::Text(value.to_string())
    }
}

/// A fetched row, columns in select order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatabaseRow {
    values: Vec<DatabaseValue>,
}

impl DatabaseRow {
    pub fn new(values: Vec<DatabaseValue>) -> Self {
        Self { values }
    }

    pub fn column_count(&self) -> usize {
        self.values.len()
    }

    pub fn get(&self, index: usize) -> MigratorResult<&DatabaseValue> {
        self.values.get(index).ok_or_else(|| {
            MigratorError::persistence(format!(
                "column {} out of range ({} columns)",
                index,
                self.values.len()
            ))
        })
    }

    pub fn get_i64(&self, index: usize) -> MigratorResult<i64> {
        match self.get(index)? {
            DatabaseValue::Integer(v) => Ok(*v),
            DatabaseValue::Text(s) => s.trim().parse().map_err(|_| {
                MigratorError::persistence(format!("column {} is not an integer: {}", index, s))
            }),
            DatabaseValue::Null => Err(MigratorError::persistence(format!(
                "column {} is null",
                index
            ))),
        }
    }

    pub fn get_text(&self, index: usize) -> MigratorResult<String> {
        match self.get(index)? {
            DatabaseValue::Text(s) => Ok(s.clone()),
            DatabaseValue::Integer(v) => Ok(v.to_string()),
            DatabaseValue::Null => Err(MigratorError::persistence(format!(
                "column {} is null",
                index
            ))),
        }
    }

    pub fn get_optional_text(&self, index: usize) -> MigratorResult<Option<String>> {
        match self.get(index)? {
            DatabaseValue::Null => Ok(None),
            _ => self.get_text(index).map(Some),
        }
    }
}

/// Abstract database pool
#[async_trait]
pub trait DatabasePool: Send + Sync {
    /// Driver behind this pool
    fn driver(&self) -> Driver;

    /// Execute a statement outside of any transaction and return affected rows.
    /// An empty parameter list runs the text unprepared, so it may hold
    /// several statements.
    async fn execute(&self, sql: &str, params: &[DatabaseValue]) -> MigratorResult<u64>;

    /// Execute a query and return all result rows
    async fn fetch_all(&self, sql: &str, params: &[DatabaseValue])
        -> MigratorResult<Vec<DatabaseRow>>;

    /// Begin a transaction
    async fn begin_transaction(&self) -> MigratorResult<Box<dyn DatabaseTransaction>>;
}

/// Abstract database transaction
#[async_trait]
pub trait DatabaseTransaction: Send {
    /// Execute a statement within the transaction, same parameter rules as
    /// [`DatabasePool::execute`]
    async fn execute(&mut self, sql: &str, params: &[DatabaseValue]) -> MigratorResult<u64>;

    async fn commit(self: Box<Self>) -> MigratorResult<()>;

    async fn rollback(self: Box<Self>) -> MigratorResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_detection_from_url() {
        assert_eq!(Driver::from_url("postgres://localhost/app").unwrap(), Driver::Postgres);
        assert_eq!(Driver::from_url("postgresql://u:p@db:5432/app").unwrap(), Driver::Postgres);
        assert_eq!(Driver::from_url("mysql://root@localhost/app").unwrap(), Driver::MySql);
        assert_eq!(Driver::from_url("sqlite::memory:").unwrap(), Driver::Sqlite);
        assert_eq!(Driver::from_url("sqlite://data.db").unwrap(), Driver::Sqlite);

        let err = Driver::from_url("oracle://db").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_driver_names_round_trip() {
        for driver in [Driver::Postgres, Driver::MySql, Driver::Sqlite] {
            assert_eq!(driver.name().parse::<Driver>().unwrap(), driver);
        }
        assert!("mssql".parse::<Driver>().is_err());
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(Driver::Postgres.placeholder(2), "$2");
        assert_eq!(Driver::MySql.placeholder(2), "?");
        assert_eq!(Driver::Sqlite.placeholder(1), "?");
    }

    #[test]
    fn test_row_accessors() {
        let row = DatabaseRow::new(vec![
            DatabaseValue::Integer(7),
            DatabaseValue::Text("42".to_string()),
            DatabaseValue::Null,
        ]);

        assert_eq!(row.column_count(), 3);
        assert_eq!(row.get_i64(0).unwrap(), 7);
        assert_eq!(row.get_i64(1).unwrap(), 42);
        assert_eq!(row.get_text(0).unwrap(), "7");
        assert_eq!(row.get_optional_text(2).unwrap(), None);
        assert!(row.get_i64(2).is_err());
        assert!(row.get(3).is_err());
    }
}
