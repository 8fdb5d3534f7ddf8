//! A SQLite dialect whose lock round trips can be made slow or failing.

use async_trait::async_trait;
use core::time::Duration;
use sqlx::SqliteConnection;
use strata_dialect::{Dialect, DialectError, Sqlite};
use strata_migration::AppliedMigration;

#[derive(Debug, Clone, Default)]
pub(crate) struct Scripted {
    /// Sleep this long before every try-lock round trip.
    pub(crate) try_lock_delay: Option<Duration>,
    /// Make every unlock fail with a connection error.
    pub(crate) fail_unlock: bool,
}

#[async_trait]
impl Dialect for Scripted {
    type Database = sqlx::Sqlite;

    fn name(&self) -> &'static str {
        "scripted"
    }

    fn lock_sql(&self, table_name: &str) -> Option<String> {
        Sqlite.lock_sql(table_name)
    }

    fn try_lock_sql(&self, table_name: &str) -> Option<String> {
        Sqlite.try_lock_sql(table_name)
    }

    fn unlock_sql(&self, table_name: &str) -> Option<String> {
        Sqlite.unlock_sql(table_name)
    }

    fn create_sql(&self, table_name: &str) -> String {
        Sqlite.create_sql(table_name)
    }

    fn insert_sql(&self, table_name: &str) -> String {
        Sqlite.insert_sql(table_name)
    }

    fn quote_char(&self) -> char {
        Sqlite.quote_char()
    }

    async fn execute(&self, conn: &mut SqliteConnection, sql: &str) -> Result<(), sqlx::Error> {
        Sqlite.execute(conn, sql).await
    }

    async fn try_lock(&self, conn: &mut SqliteConnection, table_name: &str) -> Result<bool, sqlx::Error> {
        if let Some(delay) = self.try_lock_delay {
            tokio::time::sleep(delay).await;
        }
        Sqlite.try_lock(conn, table_name).await
    }

    async fn unlock(&self, conn: &mut SqliteConnection, table_name: &str) -> Result<bool, sqlx::Error> {
        if self.fail_unlock {
            return Err(sqlx::Error::PoolClosed);
        }
        Sqlite.unlock(conn, table_name).await
    }

    async fn insert_applied_migration(
        &self,
        conn: &mut SqliteConnection,
        table_name: &str,
        migration: &AppliedMigration,
    ) -> Result<(), sqlx::Error> {
        Sqlite.insert_applied_migration(conn, table_name, migration).await
    }

    async fn get_applied_migrations(
        &self,
        conn: &mut SqliteConnection,
        table_name: &str,
    ) -> Result<Vec<AppliedMigration>, DialectError> {
        Sqlite.get_applied_migrations(conn, table_name).await
    }
}
