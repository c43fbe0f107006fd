//! Database Backend Abstractions
//!
//! Capability traits the bookkeeping store depends on, plus the sqlx
//! implementation used by the command line tool.

pub mod core;
pub mod sqlx_any;

pub use core::*;
pub use sqlx_any::SqlxPool;
