//! # sql-migrator
//!
//! Versioned, reversible schema migrations driven by pairs of SQL files.
//!
//! Up scripts named `<YYYYMMDDhhmmss>-<name>-up.sql` are discovered in a
//! migrations directory, diffed against a bookkeeping table and applied as
//! one numbered batch inside a single transaction. Rolling back runs the
//! paired `-down.sql` scripts for the latest batch, or for everything.

pub mod backends;
pub mod config;
pub mod error;
pub mod migrations;

pub use backends::{DatabasePool, DatabaseRow, DatabaseTransaction, DatabaseValue, Driver, SqlxPool};
pub use config::MigratorConfig;
pub use error::{MigratorError, MigratorResult};
pub use migrations::*;
