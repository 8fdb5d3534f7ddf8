use core::fmt;
use strata_executor::{ErrorKind, MigratorError};
use strata_migration::MigrationDiscoveryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    UserError = 1,
    MigrationFailed = 2,
    LockUnavailable = 3,
    DriftDetected = 4,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

/// An error shaped for the terminal: a one-line title plus optional
/// explanation blocks rendered by [`crate::error_view::print`].
#[derive(Debug, Clone)]
pub struct CliError {
    code: ExitCode,
    title: String,
    reason: Option<String>,
    meaning: Option<String>,
    action: Option<String>,
}

impl CliError {
    fn new(code: ExitCode, title: impl Into<String>) -> Self {
        Self {
            code,
            title: title.into(),
            reason: None,
            meaning: None,
            action: None,
        }
    }

    pub fn user_error(title: impl Into<String>) -> Self {
        Self::new(ExitCode::UserError, title)
    }

    pub fn migration_failed(title: impl Into<String>) -> Self {
        Self::new(ExitCode::MigrationFailed, title)
    }

    pub fn lock_unavailable(title: impl Into<String>) -> Self {
        Self::new(ExitCode::LockUnavailable, title)
    }

    pub fn drift_detected(title: impl Into<String>) -> Self {
        Self::new(ExitCode::DriftDetected, title)
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_meaning(mut self, meaning: impl Into<String>) -> Self {
        self.meaning = Some(meaning.into());
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn meaning(&self) -> Option<&str> {
        self.meaning.as_deref()
    }

    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    pub fn code(&self) -> ExitCode {
        self.code
    }

    pub fn exit_code(&self) -> i32 {
        self.code.as_i32()
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

impl std::error::Error for CliError {}

impl From<MigrationDiscoveryError> for CliError {
    fn from(err: MigrationDiscoveryError) -> Self {
        let action = match &err {
            MigrationDiscoveryError::EmptyMigrationsDir { .. } => {
                "Add at least one .sql file or point --migrations-dir at the right directory."
            }
            MigrationDiscoveryError::Io { .. } => {
                "Check that the directory exists and its files are readable UTF-8."
            }
        };

        CliError::user_error("Migration discovery failed")
            .with_reason(err.to_string())
            .with_action(action)
    }
}

impl From<MigratorError> for CliError {
    fn from(err: MigratorError) -> Self {
        let reason = err.to_string();
        match (err.kind(), &err) {
            (ErrorKind::Validation, _) => CliError::user_error("Invalid migration set")
                .with_reason(reason)
                .with_action("Give every migration file a unique name."),
            (ErrorKind::Drift, MigratorError::ChecksumMismatch { id, .. }) => {
                CliError::drift_detected(format!("Migration {id} was changed after it was applied"))
                    .with_reason(reason)
                    .with_meaning(
                        "The database ran a different version of this script. Nothing was applied.",
                    )
                    .with_action(
                        "Restore the original script and put the change in a new migration.",
                    )
            }
            (ErrorKind::Lock, MigratorError::LockUnavailable { .. }) => {
                CliError::lock_unavailable("Another migration process is currently running")
                    .with_reason(reason)
                    .with_action("Wait for it to finish, or raise --timeout-secs.")
            }
            (ErrorKind::Lock, _) => CliError::migration_failed("Migration lock error")
                .with_reason(reason),
            (ErrorKind::HistoryRead, _) => {
                CliError::migration_failed("Could not read the migrations table")
                    .with_reason(reason)
            }
            (ErrorKind::Cancelled, _) => CliError::migration_failed("Migration timed out")
                .with_reason(reason)
                .with_meaning("Migrations committed before the deadline remain applied.")
                .with_action("Re-run to continue, or raise --timeout-secs."),
            _ => {
                let title = match err.migration_id() {
                    Some(id) => format!("Migration failed at {id}"),
                    None => "Migration failed".to_string(),
                };
                CliError::migration_failed(title)
                    .with_reason(reason)
                    .with_meaning("Migrations before this one were committed; this one was rolled back.")
                    .with_action("Fix the cause and run `strata migrate` again to resume.")
            }
        }
    }
}
