use core::fmt;
use strata_migration::{MigrationDriftError, MigrationValidationError};

/// Coarse classification of a [`MigratorError`], for callers that only need
/// to decide how to react (exit code, retry, alert).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The requested migration set is malformed. Nothing touched the database.
    Validation,
    /// An applied migration's script changed since it ran.
    Drift,
    Lock,
    Execution,
    HistoryRead,
    /// The configured deadline elapsed before the operation finished.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigratorError {
    DuplicateMigrationId {
        id: String,
    },
    ChecksumMismatch {
        id: String,
        expected: String,
        actual: String,
    },
    LockUnavailable {
        timeout_ms: u64,
    },
    LockAcquireFailed {
        message: String,
    },
    LockReleaseFailed {
        message: String,
    },
    TableCreateFailed {
        table: String,
        message: String,
    },
    HistoryReadFailed {
        table: String,
        message: String,
    },
    ScriptExecutionFailed {
        id: String,
        execution_time_ms: i32,
        message: String,
    },
    HistoryInsertFailed {
        id: String,
        message: String,
    },
    TransactionBeginFailed {
        id: String,
        message: String,
    },
    TransactionCommitFailed {
        id: String,
        message: String,
    },
    TransactionRollbackFailed {
        id: String,
        message: String,
        original_error: String,
    },
    DeadlineExceeded {
        timeout_ms: u64,
    },
}

impl MigratorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MigratorError::DuplicateMigrationId { .. } => ErrorKind::Validation,
            MigratorError::ChecksumMismatch { .. } => ErrorKind::Drift,
            MigratorError::LockUnavailable { .. }
            | MigratorError::LockAcquireFailed { .. }
            | MigratorError::LockReleaseFailed { .. } => ErrorKind::Lock,
            MigratorError::HistoryReadFailed { .. } | MigratorError::TableCreateFailed { .. } => {
                ErrorKind::HistoryRead
            }
            MigratorError::ScriptExecutionFailed { .. }
            | MigratorError::HistoryInsertFailed { .. }
            | MigratorError::TransactionBeginFailed { .. }
            | MigratorError::TransactionCommitFailed { .. }
            | MigratorError::TransactionRollbackFailed { .. } => ErrorKind::Execution,
            MigratorError::DeadlineExceeded { .. } => ErrorKind::Cancelled,
        }
    }

    /// The migration the error is about, when there is one.
    pub fn migration_id(&self) -> Option<&str> {
        match self {
            MigratorError::DuplicateMigrationId { id }
            | MigratorError::ChecksumMismatch { id, .. }
            | MigratorError::ScriptExecutionFailed { id, .. }
            | MigratorError::HistoryInsertFailed { id, .. }
            | MigratorError::TransactionBeginFailed { id, .. }
            | MigratorError::TransactionCommitFailed { id, .. }
            | MigratorError::TransactionRollbackFailed { id, .. } => Some(id.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for MigratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigratorError::DuplicateMigrationId { id } => {
                write!(f, "duplicate migration id '{id}'")
            }
            MigratorError::ChecksumMismatch {
                id,
                expected,
                actual,
            } => write!(
                f,
                "checksum mismatch for migration '{id}' (db={expected}, script={actual})"
            ),
            MigratorError::LockUnavailable { timeout_ms } => {
                write!(f, "migration lock unavailable (timeout_ms={timeout_ms})")
            }
            MigratorError::LockAcquireFailed { message } => {
                write!(f, "lock acquire failed: {message}")
            }
            MigratorError::LockReleaseFailed { message } => {
                write!(f, "lock release failed: {message}")
            }
            MigratorError::TableCreateFailed { table, message } => {
                write!(f, "failed to create migrations table {table}: {message}")
            }
            MigratorError::HistoryReadFailed { message, .. } => write!(f, "{message}"),
            MigratorError::ScriptExecutionFailed {
                id,
                execution_time_ms,
                message,
            } => write!(
                f,
                "migration '{id}' failed after {execution_time_ms}ms: {message}"
            ),
            MigratorError::HistoryInsertFailed { id, message } => {
                write!(f, "recording migration '{id}' failed: {message}")
            }
            MigratorError::TransactionBeginFailed { id, message } => {
                write!(f, "transaction begin failed (id={id}): {message}")
            }
            MigratorError::TransactionCommitFailed { id, message } => {
                write!(f, "transaction commit failed (id={id}): {message}")
            }
            MigratorError::TransactionRollbackFailed {
                id,
                message,
                original_error,
            } => write!(
                f,
                "transaction rollback failed (id={id}): {message}; original_error={original_error}"
            ),
            MigratorError::DeadlineExceeded { timeout_ms } => {
                write!(f, "migration deadline exceeded (timeout_ms={timeout_ms})")
            }
        }
    }
}

impl std::error::Error for MigratorError {}

impl From<MigrationValidationError> for MigratorError {
    fn from(err: MigrationValidationError) -> Self {
        match err {
            MigrationValidationError::DuplicateId { id } => {
                MigratorError::DuplicateMigrationId { id }
            }
        }
    }
}

impl From<MigrationDriftError> for MigratorError {
    fn from(err: MigrationDriftError) -> Self {
        match err {
            MigrationDriftError::ChecksumMismatch {
                id,
                expected,
                actual,
            } => MigratorError::ChecksumMismatch {
                id,
                expected,
                actual,
            },
        }
    }
}
