use crate::error::MigratorError;
use crate::lock::Deadline;
use chrono::Utc;
use core::time::Duration;
use sqlx::{Connection, Transaction};
use strata_dialect::{DbConnection, Dialect};
use strata_migration::{AppliedMigration, Migration};
use tracing::{info, warn};

pub(crate) fn duration_ms(d: Duration) -> i32 {
    i32::try_from(d.as_millis()).unwrap_or(i32::MAX)
}

pub async fn begin<'c, D: Dialect>(
    conn: &'c mut DbConnection<D>,
    id: &str,
) -> Result<Transaction<'c, D::Database>, MigratorError> {
    conn.begin()
        .await
        .map_err(|e| MigratorError::TransactionBeginFailed {
            id: id.to_string(),
            message: e.to_string(),
        })
}

pub async fn commit<D: Dialect>(
    tx: Transaction<'_, D::Database>,
    id: &str,
) -> Result<(), MigratorError> {
    tx.commit()
        .await
        .map_err(|e| MigratorError::TransactionCommitFailed {
            id: id.to_string(),
            message: e.to_string(),
        })
}

pub async fn rollback<D: Dialect>(
    tx: Transaction<'_, D::Database>,
    id: &str,
    original_error: &MigratorError,
) -> Result<(), MigratorError> {
    tx.rollback()
        .await
        .map_err(|e| MigratorError::TransactionRollbackFailed {
            id: id.to_string(),
            message: e.to_string(),
            original_error: original_error.to_string(),
        })
}

/// Runs one migration script and records it in the tracking table, both in
/// the same transaction. On failure the transaction is rolled back and the
/// script's error is returned, unless the rollback itself fails.
///
/// With a deadline, the dialect's statement timeout is set for the rest of
/// the transaction so the server stops the script when time runs out.
pub(crate) async fn apply_one<D: Dialect>(
    dialect: &D,
    conn: &mut DbConnection<D>,
    table_name: &str,
    migration: &Migration,
    deadline: Option<Deadline>,
) -> Result<AppliedMigration, MigratorError> {
    let id = migration.id.as_str();
    info!(id, "applying migration");

    let mut tx = begin::<D>(conn, id).await?;

    let limit = deadline.and_then(|d| dialect.statement_timeout_sql(d.remaining()));
    if let Some(sql) = limit {
        if let Err(e) = dialect.execute(&mut *tx, &sql).await {
            let err = MigratorError::TransactionBeginFailed {
                id: id.to_string(),
                message: e.to_string(),
            };
            rollback::<D>(tx, id, &err).await?;
            return Err(err);
        }
    }

    let started = std::time::Instant::now();

    if let Err(e) = dialect.execute(&mut *tx, &migration.script).await {
        let err = MigratorError::ScriptExecutionFailed {
            id: id.to_string(),
            execution_time_ms: duration_ms(started.elapsed()),
            message: e.to_string(),
        };
        warn!(id, error = %err, "migration failed, rolling back");
        rollback::<D>(tx, id, &err).await?;
        return Err(err);
    }

    let record = AppliedMigration {
        id: id.to_string(),
        checksum: migration.checksum(),
        execution_time_in_millis: duration_ms(started.elapsed()),
        applied_at: Utc::now(),
    };

    if let Err(e) = dialect
        .insert_applied_migration(&mut *tx, table_name, &record)
        .await
    {
        let err = MigratorError::HistoryInsertFailed {
            id: id.to_string(),
            message: e.to_string(),
        };
        warn!(id, error = %err, "recording migration failed, rolling back");
        rollback::<D>(tx, id, &err).await?;
        return Err(err);
    }

    commit::<D>(tx, id).await?;
    info!(
        id,
        execution_time_ms = record.execution_time_in_millis,
        "migration applied"
    );

    Ok(record)
}
