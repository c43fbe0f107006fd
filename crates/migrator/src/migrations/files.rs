//! Migration Files - File system operations for migrations
//!
//! Discovers up scripts, reads script contents and creates new script pairs.

use chrono::{DateTime, Utc};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use super::definitions::{is_up_script, DOWN_SUFFIX, TIMESTAMP_FORMAT, UP_SUFFIX};
use crate::error::{MigratorError, MigratorResult};

/// List up scripts in `dir`, sorted by file name.
///
/// A missing directory yields an empty list.
pub fn discover_up_scripts(dir: &Path) -> MigratorResult<Vec<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(MigratorError::filesystem(dir, e)),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| MigratorError::filesystem(dir, e))?;
        let file_type = entry
            .file_type()
            .map_err(|e| MigratorError::filesystem(entry.path(), e))?;
        if !file_type.is_file() {
            continue;
        }

        let file_name = entry.file_name();
        if !is_up_script(&file_name.to_string_lossy()) {
            continue;
        }
        match file_name.to_str() {
            Some(name) => names.push(name.to_string()),
            None => {
                return Err(MigratorError::filesystem(
                    entry.path(),
                    io::Error::new(io::ErrorKind::InvalidData, "file name is not valid UTF-8"),
                ))
            }
        }
    }

    names.sort();
    Ok(names
        .into_iter()
        .map(|name| dir.join(name).to_string_lossy().into_owned())
        .collect())
}

/// Read a script as text
pub fn read_script(path: &str) -> MigratorResult<String> {
    fs::read_to_string(path).map_err(|e| MigratorError::filesystem(path, e))
}

/// Validate and normalise a migration name for use in a file name.
///
/// Surrounding whitespace is trimmed and inner whitespace becomes `_`.
pub fn sanitize_name(name: &str) -> MigratorResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(MigratorError::configuration("migration name is required"));
    }
    if trimmed.contains(['/', '\\']) {
        return Err(MigratorError::configuration(format!(
            "migration name must not contain path separators: {}",
            trimmed
        )));
    }

    Ok(trimmed.split_whitespace().collect::<Vec<_>>().join("_"))
}

/// File names of the script pair created at `timestamp`
pub fn pair_file_names(timestamp: DateTime<Utc>, name: &str) -> (String, String) {
    let prefix = format!("{}-{}", timestamp.format(TIMESTAMP_FORMAT), name);
    (
        format!("{}{}", prefix, UP_SUFFIX),
        format!("{}{}", prefix, DOWN_SUFFIX),
    )
}

/// Create an empty up/down script pair in `dir`.
///
/// Both names share one timestamp. The up file is kept if creating the down
/// file fails.
pub fn create_pair(
    dir: &Path,
    name: &str,
    timestamp: DateTime<Utc>,
) -> MigratorResult<(PathBuf, PathBuf)> {
    let name = sanitize_name(name)?;
    let (up_name, down_name) = pair_file_names(timestamp, &name);

    let up_path = dir.join(up_name);
    create_empty(&up_path)?;
    let down_path = dir.join(down_name);
    create_empty(&down_path)?;

    tracing::debug!(
        up = %up_path.display(),
        down = %down_path.display(),
        "created migration pair"
    );
    Ok((up_path, down_path))
}

/// Create an empty file, failing if it already exists
pub fn create_empty(path: &Path) -> MigratorResult<()> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map(|_| ())
        .map_err(|e| MigratorError::filesystem(path, e))
}

/// Create the migrations directory; an existing directory is an error
pub fn create_migrations_dir(dir: &Path) -> MigratorResult<PathBuf> {
    fs::create_dir(dir).map_err(|e| MigratorError::filesystem(dir, e))?;
    Ok(dir.to_path_buf())
}
