//! Migration System
//!
//! Engine, store and file conventions for SQL script migrations.

pub mod bootstrap;
pub mod definitions;
pub mod engine;
pub mod files;
pub mod rollback;
pub mod store;

pub use bootstrap::{bootstrap_script, render_bootstrap_script};
pub use definitions::*;
pub use engine::{filter_pending, MigrationEngine};
pub use store::{MigrationStore, SqlMigrationStore};
