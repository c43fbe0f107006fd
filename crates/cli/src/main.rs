mod commands;
mod logging;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use commands::migrate;
use sql_migrator::{MigratorConfig, MigratorResult};

#[derive(Parser)]
#[command(name = "sql-migrator")]
#[command(about = "Versioned, reversible SQL migrations from up/down script pairs")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Default)]
struct GlobalArgs {
    /// Configuration file (defaults to migrator.yaml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database URL, overrides DATABASE_URL
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Database driver: postgres, mysql or sqlite3 (detected from the URL if omitted)
    #[arg(long, global = true)]
    driver: Option<String>,

    /// Migrations directory
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Bookkeeping table name
    #[arg(long, global = true)]
    table: Option<String>,

    /// Show debug logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the migrations directory and the bookkeeping table
    Init,

    /// Create an empty up/down migration pair
    Create {
        /// Migration name, or the migrations directory when NAME follows
        first: String,

        /// Migration name
        name: Option<String>,
    },

    /// Apply all pending migrations as one new version
    Up,

    /// Roll back the latest version
    Down {
        /// Roll back every applied migration
        #[arg(long)]
        all: bool,
    },

    /// Roll back everything, then apply all migrations again
    Refresh,

    /// Show applied, pending and missing migrations
    Status,
}

impl GlobalArgs {
    fn apply(&self, mut config: MigratorConfig) -> MigratorConfig {
        if let Some(url) = &self.database_url {
            config.database_url = Some(url.clone());
        }
        if let Some(driver) = &self.driver {
            config.driver = Some(driver.clone());
        }
        if let Some(dir) = &self.dir {
            config.migrations_dir = dir.clone();
        }
        if let Some(table) = &self.table {
            config.migrations_table = table.clone();
        }
        config
    }
}

async fn run(cli: Cli) -> MigratorResult<Vec<String>> {
    let mut config = cli
        .global
        .apply(MigratorConfig::discover(cli.global.config.as_deref())?);

    match cli.command {
        Commands::Init => migrate::init(&config).await,
        Commands::Create { first, name } => {
            let name = match name {
                Some(name) => {
                    config.migrations_dir = PathBuf::from(first);
                    name
                }
                None => first,
            };
            migrate::create(&config, &name)
        }
        Commands::Up => migrate::up(&config).await,
        Commands::Down { all } => migrate::down(&config, all).await,
        Commands::Refresh => migrate::refresh(&config).await,
        Commands::Status => migrate::status(&config).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let logging_config = logging::LoggingConfig::from_verbosity(cli.global.verbose);
    if let Err(e) = logging::init_logging(&logging_config) {
        output::print_error(&format!("failed to initialise logging: {}", e));
    }

    match run(cli).await {
        Ok(messages) => {
            output::print_lines(&messages);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            output::print_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
