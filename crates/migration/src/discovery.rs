use crate::error::MigrationDiscoveryError;
use crate::model::{sort_migrations, Migration};
use std::fs;
use std::path::{Path, PathBuf};

const SQL_EXTENSION: &str = ".sql";

/// Loads every `*.sql` file in `dir` as a migration, sorted by id.
///
/// The id is the filename without the `.sql` extension. Other files and
/// subdirectories are ignored.
pub fn discover_migrations(dir: impl AsRef<Path>) -> Result<Vec<Migration>, MigrationDiscoveryError> {
    let dir = dir.as_ref();
    let dir_display = dir.display().to_string();

    let entries = fs::read_dir(dir).map_err(|e| MigrationDiscoveryError::Io {
        path: dir_display.clone(),
        message: e.to_string(),
    })?;

    let mut files: Vec<(String, PathBuf)> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| MigrationDiscoveryError::Io {
            path: dir_display.clone(),
            message: e.to_string(),
        })?;

        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let filename = entry.file_name().to_string_lossy().to_string();
        if let Some(id) = migration_id_from_filename(&filename) {
            files.push((id.to_string(), path));
        }
    }

    if files.is_empty() {
        return Err(MigrationDiscoveryError::EmptyMigrationsDir { dir: dir_display });
    }

    let mut out = Vec::with_capacity(files.len());
    for (id, path) in files {
        let bytes = fs::read(&path).map_err(|e| MigrationDiscoveryError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let script = String::from_utf8(bytes).map_err(|e| MigrationDiscoveryError::Io {
            path: path.display().to_string(),
            message: format!("file is not valid UTF-8: {e}"),
        })?;

        out.push(Migration::new(id, script));
    }

    sort_migrations(&mut out);
    Ok(out)
}

/// `2019-09-23 Create Artists.sql` becomes `2019-09-23 Create Artists`.
/// Returns `None` for names that do not end in `.sql` or are only the extension.
pub fn migration_id_from_filename(filename: &str) -> Option<&str> {
    let id = filename.strip_suffix(SQL_EXTENSION)?;
    if id.is_empty() {
        return None;
    }
    Some(id)
}
