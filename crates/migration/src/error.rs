use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MigrationDiscoveryError {
    #[error("no .sql migrations found in {dir}")]
    EmptyMigrationsDir { dir: String },

    #[error("I/O error while reading '{path}': {message}")]
    Io { path: String, message: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MigrationValidationError {
    #[error("duplicate migration id '{id}'")]
    DuplicateId { id: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MigrationDriftError {
    #[error("migration drift detected: checksum mismatch for '{id}' (db={expected}, script={actual})")]
    ChecksumMismatch {
        id: String,
        expected: String,
        actual: String,
    },
}
