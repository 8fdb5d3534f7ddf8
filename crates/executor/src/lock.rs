use crate::error::MigratorError;
use core::time::Duration;
use strata_dialect::{DbConnection, Dialect};
use tokio::time::{sleep, timeout_at, Instant};
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Point in time by which a locked operation must have finished.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadline {
    pub(crate) at: Instant,
    pub(crate) timeout: Duration,
}

impl Deadline {
    pub(crate) fn after(timeout: Duration) -> Self {
        Self {
            at: Instant::now() + timeout,
            timeout,
        }
    }

    /// Time left, never less than a millisecond.
    pub(crate) fn remaining(&self) -> Duration {
        self.at
            .saturating_duration_since(Instant::now())
            .max(Duration::from_millis(1))
    }

    pub(crate) fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Takes the dialect's lock for `table_name` on `conn`.
///
/// Without a deadline the blocking lock statement is used when the dialect
/// has one. Otherwise the non-blocking form is polled until it succeeds or
/// the deadline passes. Every poll round trip is itself bounded by the
/// deadline.
///
/// Returns `false` when the dialect has no lock, in which case there is
/// nothing to release later.
pub(crate) async fn acquire<D: Dialect>(
    dialect: &D,
    conn: &mut DbConnection<D>,
    table_name: &str,
    deadline: Option<Deadline>,
) -> Result<bool, MigratorError> {
    if deadline.is_none() {
        if let Some(sql) = dialect.lock_sql(table_name) {
            debug!(dialect = dialect.name(), table = table_name, "waiting for migration lock");
            dialect
                .execute(conn, &sql)
                .await
                .map_err(|e| MigratorError::LockAcquireFailed {
                    message: e.to_string(),
                })?;
            debug!(dialect = dialect.name(), table = table_name, "migration lock acquired");
            return Ok(true);
        }
    }

    if dialect.try_lock_sql(table_name).is_none() {
        return Ok(false);
    }

    loop {
        if try_lock_once(dialect, conn, table_name, deadline).await? {
            debug!(dialect = dialect.name(), table = table_name, "migration lock acquired");
            return Ok(true);
        }

        let wait = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline.at {
                    return Err(MigratorError::LockUnavailable {
                        timeout_ms: deadline.timeout_ms(),
                    });
                }
                POLL_INTERVAL.min(deadline.at - now)
            }
            None => POLL_INTERVAL,
        };

        debug!(table = table_name, "migration lock busy, retrying");
        sleep(wait).await;
    }
}

async fn try_lock_once<D: Dialect>(
    dialect: &D,
    conn: &mut DbConnection<D>,
    table_name: &str,
    deadline: Option<Deadline>,
) -> Result<bool, MigratorError> {
    let attempt = dialect.try_lock(conn, table_name);
    let result = match deadline {
        Some(deadline) => match timeout_at(deadline.at, attempt).await {
            Ok(result) => result,
            Err(_) => {
                return Err(MigratorError::LockUnavailable {
                    timeout_ms: deadline.timeout_ms(),
                })
            }
        },
        None => attempt.await,
    };

    result.map_err(|e| MigratorError::LockAcquireFailed {
        message: e.to_string(),
    })
}

/// Releases the lock taken by [`acquire`].
pub(crate) async fn release<D: Dialect>(
    dialect: &D,
    conn: &mut DbConnection<D>,
    table_name: &str,
) -> Result<(), MigratorError> {
    let message = match dialect.unlock(conn, table_name).await {
        Ok(true) => {
            debug!(dialect = dialect.name(), table = table_name, "migration lock released");
            return Ok(());
        }
        Ok(false) => "unlock reported the lock was not held".to_string(),
        Err(e) => e.to_string(),
    };

    Err(MigratorError::LockReleaseFailed { message })
}
