use crate::error::DialectError;
use crate::quote::{quote_ident, quote_table_name};
use async_trait::async_trait;
use core::time::Duration;
use strata_migration::AppliedMigration;

/// The connection type a dialect operates on, e.g. `PgConnection` for
/// [`Postgres`](crate::Postgres).
pub type DbConnection<D> = <<D as Dialect>::Database as sqlx::Database>::Connection;

/// Everything backend-specific the migrator needs: SQL text for the lock and
/// the tracking table, identifier quoting, and the few round trips whose
/// row shapes differ per backend.
///
/// Every `table_name` argument is the already-quoted tracking table name as
/// produced by [`Dialect::quoted_table_name`].
#[async_trait]
pub trait Dialect: Send + Sync + Sized {
    type Database: sqlx::Database;

    fn name(&self) -> &'static str;

    /// Blocking acquisition of the cooperative lock for `table_name`.
    /// `None` when the backend has no blocking form; the lock is then taken
    /// by polling [`Dialect::try_lock`].
    fn lock_sql(&self, table_name: &str) -> Option<String>;

    /// Non-blocking acquisition; the statement yields whether the lock was taken.
    fn try_lock_sql(&self, table_name: &str) -> Option<String>;

    fn unlock_sql(&self, table_name: &str) -> Option<String>;

    /// Creates the tracking table unless it already exists.
    fn create_sql(&self, table_name: &str) -> String;

    /// Inserts one `(id, checksum, execution_time_in_millis, applied_at)` row.
    fn insert_sql(&self, table_name: &str) -> String;

    fn quote_char(&self) -> char;

    /// Bounds every following statement of the current transaction to
    /// `timeout`, so a deadline also stops work already running on the
    /// server. `None` when the backend cannot do that.
    fn statement_timeout_sql(&self, _timeout: Duration) -> Option<String> {
        None
    }

    fn quoted_ident(&self, ident: &str) -> String {
        quote_ident(ident, self.quote_char())
    }

    fn quoted_table_name(&self, schema: Option<&str>, table: &str) -> String {
        quote_table_name(schema, table, self.quote_char())
    }

    /// Runs `sql` as-is. Scripts with several statements are accepted.
    async fn execute(&self, conn: &mut DbConnection<Self>, sql: &str) -> Result<(), sqlx::Error>;

    /// Runs [`Dialect::try_lock_sql`]. Backends without a lock report `true`.
    async fn try_lock(&self, conn: &mut DbConnection<Self>, table_name: &str) -> Result<bool, sqlx::Error>;

    /// Runs [`Dialect::unlock_sql`] and reports whether a held lock was
    /// released. Backends without a lock report `true`.
    async fn unlock(&self, conn: &mut DbConnection<Self>, table_name: &str) -> Result<bool, sqlx::Error>;

    async fn insert_applied_migration(
        &self,
        conn: &mut DbConnection<Self>,
        table_name: &str,
        migration: &AppliedMigration,
    ) -> Result<(), sqlx::Error>;

    /// All history rows, ascending by id.
    async fn get_applied_migrations(
        &self,
        conn: &mut DbConnection<Self>,
        table_name: &str,
    ) -> Result<Vec<AppliedMigration>, DialectError>;
}

pub(crate) fn select_applied_sql(table_name: &str) -> String {
    format!(
        "SELECT id, checksum, execution_time_in_millis, applied_at FROM {table_name} ORDER BY id ASC"
    )
}
