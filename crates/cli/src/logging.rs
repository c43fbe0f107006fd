//! Diagnostic logging for the command line tool
//!
//! Logs go to stderr so that stdout only carries the one-line command
//! results.

use std::io;
use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level filter used when `RUST_LOG` is not set
    pub level: String,
    /// Include the module path of each event
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            include_target: false,
        }
    }
}

impl LoggingConfig {
    pub fn verbose() -> Self {
        Self {
            level: "sql_migrator=debug,info".to_string(),
            include_target: true,
        }
    }

    pub fn from_verbosity(verbose: bool) -> Self {
        if verbose {
            Self::verbose()
        } else {
            Self::default()
        }
    }
}

pub fn init_logging(
    config: &LoggingConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            Layer::new()
                .with_writer(io::stderr)
                .with_target(config.include_target),
        )
        .try_init()?;

    Ok(())
}
