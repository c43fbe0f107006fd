use std::sync::Arc;

use chrono::Utc;
use sql_migrator::{
    files, MigrationEngine, MigrationStatus, MigratorConfig, MigratorResult, SqlMigrationStore,
    SqlxPool, StatusEntry,
};

type Engine = MigrationEngine<SqlMigrationStore>;

async fn connect(config: &MigratorConfig) -> MigratorResult<Engine> {
    config.validate()?;
    let driver = config.resolve_driver()?;
    let pool = SqlxPool::connect(config.database_url()?, driver).await?;
    let store = SqlMigrationStore::new(Arc::new(pool), config.migrations_table.clone());
    Ok(MigrationEngine::with_config(store, config.migration_config()))
}

pub async fn init(config: &MigratorConfig) -> MigratorResult<Vec<String>> {
    let engine = connect(config).await?;
    let mut messages = engine.bootstrap().await?;
    messages.push("migrator was initialized".to_string());
    Ok(messages)
}

/// Needs no database connection
pub fn create(config: &MigratorConfig, name: &str) -> MigratorResult<Vec<String>> {
    let (up, down) = files::create_pair(&config.migrations_dir, name, Utc::now())?;
    Ok(vec![
        format!("created migration {}", up.display()),
        format!("created migration {}", down.display()),
    ])
}

pub async fn up(config: &MigratorConfig) -> MigratorResult<Vec<String>> {
    let engine = connect(config).await?;
    let migrated = engine.apply_up().await?;
    Ok(report(&migrated, "migrated", "nothing to migrate"))
}

pub async fn down(config: &MigratorConfig, all: bool) -> MigratorResult<Vec<String>> {
    let engine = connect(config).await?;
    let rolled_back = if all {
        engine.apply_all_down().await?
    } else {
        engine.apply_down().await?
    };
    Ok(report(&rolled_back, "rolled back", "nothing to roll back"))
}

pub async fn refresh(config: &MigratorConfig) -> MigratorResult<Vec<String>> {
    let engine = connect(config).await?;
    let messages = engine.refresh().await?;
    if messages.is_empty() {
        return Ok(vec!["nothing to refresh".to_string()]);
    }
    Ok(messages)
}

pub async fn status(config: &MigratorConfig) -> MigratorResult<Vec<String>> {
    let engine = connect(config).await?;
    let entries = engine.status().await?;
    if entries.is_empty() {
        return Ok(vec!["no migrations found".to_string()]);
    }
    Ok(entries.iter().map(status_line).collect())
}

fn report(paths: &[String], verb: &str, empty: &str) -> Vec<String> {
    if paths.is_empty() {
        return vec![empty.to_string()];
    }
    paths.iter().map(|path| format!("{}: {}", verb, path)).collect()
}

fn status_line(entry: &StatusEntry) -> String {
    match &entry.status {
        MigrationStatus::Pending => format!("pending: {}", entry.path),
        MigrationStatus::Applied { version, .. } => {
            format!("applied (version {}): {}", version, entry.path)
        }
        MigrationStatus::Missing { version } => {
            format!("missing file (version {}): {}", version, entry.path)
        }
    }
}
