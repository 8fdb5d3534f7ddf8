use crate::error::{ErrorKind, MigratorError};
use crate::lock::{self, Deadline};
use crate::transaction;
use core::future::Future;
use core::time::Duration;
use strata_dialect::{DbConnection, Dialect};
use strata_migration::{plan, sort_migrations, validate_unique_ids, AppliedMigration, Migration};
use tokio::time::Instant;
use tracing::{info, warn};

pub const DEFAULT_TABLE_NAME: &str = "schema_migrations";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyReport {
    /// Ids applied by this call, in the order they ran.
    pub applied: Vec<String>,
    /// Requested migrations that were already recorded.
    pub skipped: usize,
}

/// Applies migrations to one database through a [`Dialect`].
///
/// Every operation takes the dialect's cooperative lock for the tracking
/// table, so migrators pointed at the same table serialize while migrators
/// using different tables do not interfere.
///
/// The lock is released before an operation's future completes. If that
/// future is dropped early instead, for example by an outer timeout or
/// `select!`, the lock stays held for as long as the connection lives; close
/// the connection rather than reusing it.
#[derive(Debug, Clone)]
pub struct Migrator<D: Dialect> {
    dialect: D,
    schema_name: Option<String>,
    table_name: String,
    timeout: Option<Duration>,
}

impl<D: Dialect> Migrator<D> {
    pub fn new(dialect: D) -> Self {
        Self {
            dialect,
            schema_name: None,
            table_name: DEFAULT_TABLE_NAME.to_string(),
            timeout: None,
        }
    }

    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.schema_name = None;
        self.table_name = table_name.into();
        self
    }

    pub fn with_schema_table(
        mut self,
        schema_name: impl Into<String>,
        table_name: impl Into<String>,
    ) -> Self {
        self.schema_name = Some(schema_name.into());
        self.table_name = table_name.into();
        self
    }

    /// Bounds each operation, lock wait included. Past the deadline the
    /// in-flight work is abandoned and any open transaction rolls back.
    ///
    /// On dialects with a statement timeout the server also stops a running
    /// script at the deadline. Elsewhere a statement already sent runs to
    /// completion before the connection can be used again.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn dialect(&self) -> &D {
        &self.dialect
    }

    pub fn quoted_table_name(&self) -> String {
        self.dialect
            .quoted_table_name(self.schema_name.as_deref(), &self.table_name)
    }

    /// Creates the tracking table if it does not exist. Safe to call
    /// concurrently from several processes.
    pub async fn create_migrations_table(
        &self,
        conn: &mut DbConnection<D>,
    ) -> Result<(), MigratorError> {
        let table = self.quoted_table_name();
        let deadline = self.deadline();

        let locked = lock::acquire(&self.dialect, conn, &table, deadline).await?;
        let result = within(deadline, self.ensure_table(conn, &table)).await;
        self.finish(conn, &table, locked, result).await
    }

    /// Applies every migration in `migrations` that is not yet recorded, in
    /// ascending id order, each in its own transaction.
    ///
    /// The request is validated before the database is touched, and drift
    /// in already-applied migrations is detected before anything runs.
    pub async fn apply(
        &self,
        conn: &mut DbConnection<D>,
        migrations: &[Migration],
    ) -> Result<ApplyReport, MigratorError> {
        validate_unique_ids(migrations)?;
        let mut sorted = migrations.to_vec();
        sort_migrations(&mut sorted);

        let table = self.quoted_table_name();
        let deadline = self.deadline();

        let locked = lock::acquire(&self.dialect, conn, &table, deadline).await?;
        let result = within(deadline, self.apply_locked(conn, &table, &sorted, deadline)).await;
        self.finish(conn, &table, locked, result).await
    }

    /// The tracking table's rows, ascending by id. Creates the table first
    /// so a fresh database reads as empty history.
    pub async fn get_applied_migrations(
        &self,
        conn: &mut DbConnection<D>,
    ) -> Result<Vec<AppliedMigration>, MigratorError> {
        let table = self.quoted_table_name();
        let deadline = self.deadline();

        let locked = lock::acquire(&self.dialect, conn, &table, deadline).await?;
        let result = within(deadline, async {
            self.ensure_table(conn, &table).await?;
            self.read_history(conn, &table).await
        })
        .await;
        self.finish(conn, &table, locked, result).await
    }

    fn deadline(&self) -> Option<Deadline> {
        self.timeout.map(Deadline::after)
    }

    async fn apply_locked(
        &self,
        conn: &mut DbConnection<D>,
        table: &str,
        sorted: &[Migration],
        deadline: Option<Deadline>,
    ) -> Result<ApplyReport, MigratorError> {
        self.ensure_table(conn, table).await?;
        let history = self.read_history(conn, table).await?;
        let plan = plan(sorted, &history)?;

        if !plan.unknown.is_empty() {
            info!(
                table,
                count = plan.unknown.len(),
                "tracking table has migrations that were not requested"
            );
        }
        info!(
            dialect = self.dialect.name(),
            table,
            pending = plan.pending.len(),
            already_applied = plan.already_applied,
            "migration plan computed"
        );

        let mut applied = Vec::with_capacity(plan.pending.len());
        for migration in plan.pending {
            transaction::apply_one(&self.dialect, conn, table, migration, deadline).await?;
            applied.push(migration.id.clone());
        }

        Ok(ApplyReport {
            applied,
            skipped: plan.already_applied,
        })
    }

    async fn ensure_table(
        &self,
        conn: &mut DbConnection<D>,
        table: &str,
    ) -> Result<(), MigratorError> {
        let sql = self.dialect.create_sql(table);
        self.dialect
            .execute(conn, &sql)
            .await
            .map_err(|e| MigratorError::TableCreateFailed {
                table: table.to_string(),
                message: e.to_string(),
            })
    }

    async fn read_history(
        &self,
        conn: &mut DbConnection<D>,
        table: &str,
    ) -> Result<Vec<AppliedMigration>, MigratorError> {
        self.dialect
            .get_applied_migrations(conn, table)
            .await
            .map_err(|e| MigratorError::HistoryReadFailed {
                table: table.to_string(),
                message: e.to_string(),
            })
    }

    /// Releases the lock if one was taken. A release failure after a
    /// successful body is the result. After a failed body the body's error
    /// is kept and the release failure is only logged.
    async fn finish<T>(
        &self,
        conn: &mut DbConnection<D>,
        table: &str,
        locked: bool,
        result: Result<T, MigratorError>,
    ) -> Result<T, MigratorError> {
        if !locked {
            return result;
        }

        match (lock::release(&self.dialect, conn, table).await, result) {
            (Ok(()), result) => result,
            (Err(release_err), Ok(_)) => {
                warn!(table, error = %release_err, "migration lock release failed");
                Err(release_err)
            }
            (Err(release_err), Err(err)) => {
                warn!(
                    table,
                    error = %release_err,
                    original_error = %err,
                    "migration lock release failed after an earlier error"
                );
                Err(err)
            }
        }
    }
}

/// Runs `fut` until `deadline`. A statement the server cancelled for running
/// past the deadline is reported as the deadline, not as a failed script.
async fn within<T, F>(deadline: Option<Deadline>, fut: F) -> Result<T, MigratorError>
where
    F: Future<Output = Result<T, MigratorError>>,
{
    let Some(deadline) = deadline else {
        return fut.await;
    };

    let exceeded = MigratorError::DeadlineExceeded {
        timeout_ms: deadline.timeout_ms(),
    };
    match tokio::time::timeout_at(deadline.at, fut).await {
        Ok(Err(e)) if e.kind() == ErrorKind::Execution && Instant::now() >= deadline.at => {
            warn!(error = %e, "migration stopped at the deadline");
            Err(exceeded)
        }
        Ok(result) => result,
        Err(_) => Err(exceeded),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Scripted;
    use sqlx::{Connection, SqliteConnection};
    use strata_dialect::{MySql, Postgres, Sqlite};

    #[test]
    fn default_table() {
        let m = Migrator::new(Postgres);
        assert_eq!(m.quoted_table_name(), "\"schema_migrations\"");
    }

    #[test]
    fn schema_qualified_table() {
        let m = Migrator::new(Postgres).with_schema_table("public", "schema_migrations");
        assert_eq!(m.quoted_table_name(), "\"public\".\"schema_migrations\"");

        let m = m.with_table_name("seeds");
        assert_eq!(m.quoted_table_name(), "\"seeds\"");
    }

    #[test]
    fn quoting_follows_the_dialect() {
        assert_eq!(
            Migrator::new(MySql).with_table_name("my table").quoted_table_name(),
            "`mytable`"
        );
        assert_eq!(
            Migrator::new(Sqlite).with_table_name("a\"b").quoted_table_name(),
            "\"a\"\"b\""
        );
    }

    #[tokio::test]
    async fn within_without_deadline_passes_through() {
        let out: Result<u8, MigratorError> = within(None, async { Ok(7) }).await;
        assert_eq!(out, Ok(7));
    }

    #[tokio::test]
    async fn within_reports_the_deadline() {
        let deadline = Deadline::after(Duration::from_millis(10));
        let out: Result<(), MigratorError> = within(Some(deadline), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert_eq!(out, Err(MigratorError::DeadlineExceeded { timeout_ms: 10 }));
    }

    #[tokio::test]
    async fn failed_unlock_does_not_hide_drift() {
        let mut conn = SqliteConnection::connect("sqlite::memory:").await.unwrap();
        Migrator::new(Sqlite)
            .apply(&mut conn, &[Migration::new("001", "CREATE TABLE a (id INTEGER)")])
            .await
            .unwrap();

        let flaky = Migrator::new(Scripted {
            fail_unlock: true,
            ..Scripted::default()
        });
        let err = flaky
            .apply(&mut conn, &[Migration::new("001", "CREATE TABLE b (id INTEGER)")])
            .await
            .unwrap_err();

        assert!(matches!(err, MigratorError::ChecksumMismatch { ref id, .. } if id == "001"));
        assert_eq!(err.kind(), ErrorKind::Drift);
    }

    #[tokio::test]
    async fn failed_unlock_after_success_is_reported() {
        let mut conn = SqliteConnection::connect("sqlite::memory:").await.unwrap();
        let flaky = Migrator::new(Scripted {
            fail_unlock: true,
            ..Scripted::default()
        });

        let err = flaky
            .apply(&mut conn, &[Migration::new("001", "CREATE TABLE a (id INTEGER)")])
            .await
            .unwrap_err();

        assert!(matches!(err, MigratorError::LockReleaseFailed { .. }));
        assert_eq!(err.kind(), ErrorKind::Lock);
    }

    #[tokio::test]
    async fn script_error_after_the_deadline_reports_the_deadline() {
        let deadline = Deadline::after(Duration::from_millis(10));
        let out: Result<(), MigratorError> = within(Some(deadline), async {
            tokio::time::sleep_until(deadline.at).await;
            Err(MigratorError::ScriptExecutionFailed {
                id: "001".into(),
                execution_time_ms: 10,
                message: "canceling statement due to statement timeout".into(),
            })
        })
        .await;
        assert_eq!(out, Err(MigratorError::DeadlineExceeded { timeout_ms: 10 }));
    }

    #[tokio::test]
    async fn script_error_before_the_deadline_is_kept() {
        let deadline = Deadline::after(Duration::from_secs(30));
        let failed = MigratorError::ScriptExecutionFailed {
            id: "001".into(),
            execution_time_ms: 1,
            message: "syntax error".into(),
        };
        let out: Result<(), MigratorError> =
            within(Some(deadline), async { Err(failed.clone()) }).await;
        assert_eq!(out, Err(failed));
    }
}
