//! Bootstrap scripts creating the bookkeeping table, one per driver

use crate::error::{MigratorError, MigratorResult};

const POSTGRES: &str = include_str!("../../bootstrap/postgres.sql");
const MYSQL: &str = include_str!("../../bootstrap/mysql.sql");
const SQLITE: &str = include_str!("../../bootstrap/sqlite3.sql");

/// Look up the raw bootstrap script for a driver name
pub fn bootstrap_script(driver: &str) -> MigratorResult<&'static str> {
    match driver {
        "postgres" => Ok(POSTGRES),
        "mysql" => Ok(MYSQL),
        "sqlite3" => Ok(SQLITE),
        other => Err(MigratorError::configuration(format!(
            "no bootstrap script for driver '{}'",
            other
        ))),
    }
}

/// Bootstrap DDL for a driver with the table name filled in
pub fn render_bootstrap_script(driver: &str, table: &str) -> MigratorResult<String> {
    Ok(bootstrap_script(driver)?.replace("{table}", table))
}
