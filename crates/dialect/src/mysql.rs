use crate::dialect::{select_applied_sql, Dialect};
use crate::error::DialectError;
use crate::lock::lock_token;
use async_trait::async_trait;
use sqlx::mysql::MySqlRow;
use sqlx::{Executor, MySqlConnection, Row};
use strata_migration::AppliedMigration;

/// MySQL and MariaDB. Locks are named user locks (`GET_LOCK`).
///
/// DDL statements commit implicitly on these servers, so a failing script
/// can leave the statements before the failure applied even though its
/// history row is rolled back. There is no server-side statement timeout
/// for DDL, so a deadline cannot interrupt a statement already running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MySql;

#[async_trait]
impl Dialect for MySql {
    type Database = sqlx::MySql;

    fn name(&self) -> &'static str {
        "mysql"
    }

    fn lock_sql(&self, table_name: &str) -> Option<String> {
        Some(format!("SELECT GET_LOCK('{}', -1)", lock_token(table_name)))
    }

    fn try_lock_sql(&self, table_name: &str) -> Option<String> {
        Some(format!("SELECT GET_LOCK('{}', 0)", lock_token(table_name)))
    }

    fn unlock_sql(&self, table_name: &str) -> Option<String> {
        Some(format!("SELECT RELEASE_LOCK('{}')", lock_token(table_name)))
    }

    fn create_sql(&self, table_name: &str) -> String {
        format!(
            "
CREATE TABLE IF NOT EXISTS {table_name} (
    id VARCHAR(255) NOT NULL,
    checksum VARCHAR(64) NOT NULL DEFAULT '',
    execution_time_in_millis INTEGER NOT NULL DEFAULT 0,
    applied_at TIMESTAMP NOT NULL
)
"
        )
    }

    fn insert_sql(&self, table_name: &str) -> String {
        format!(
            "
INSERT INTO {table_name} (id, checksum, execution_time_in_millis, applied_at)
VALUES (?, ?, ?, ?)
"
        )
    }

    fn quote_char(&self) -> char {
        '`'
    }

    async fn execute(&self, conn: &mut MySqlConnection, sql: &str) -> Result<(), sqlx::Error> {
        (&mut *conn).execute(sql).await?;
        Ok(())
    }

    async fn try_lock(&self, conn: &mut MySqlConnection, table_name: &str) -> Result<bool, sqlx::Error> {
        let Some(sql) = self.try_lock_sql(table_name) else {
            return Ok(true);
        };

        // NULL means the server hit an error acquiring the lock.
        let row: (Option<i64>,) = sqlx::query_as(&sql).fetch_one(&mut *conn).await?;
        Ok(row.0 == Some(1))
    }

    async fn unlock(&self, conn: &mut MySqlConnection, table_name: &str) -> Result<bool, sqlx::Error> {
        let Some(sql) = self.unlock_sql(table_name) else {
            return Ok(true);
        };

        let row: (Option<i64>,) = sqlx::query_as(&sql).fetch_one(&mut *conn).await?;
        Ok(row.0 == Some(1))
    }

    async fn insert_applied_migration(
        &self,
        conn: &mut MySqlConnection,
        table_name: &str,
        migration: &AppliedMigration,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(&self.insert_sql(table_name))
            .bind(&migration.id)
            .bind(&migration.checksum)
            .bind(migration.execution_time_in_millis)
            .bind(migration.applied_at)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    async fn get_applied_migrations(
        &self,
        conn: &mut MySqlConnection,
        table_name: &str,
    ) -> Result<Vec<AppliedMigration>, DialectError> {
        let rows = sqlx::query(&select_applied_sql(table_name))
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| DialectError::query(table_name, e))?;

        rows.iter()
            .map(|row| scan(row).map_err(|e| DialectError::scan(table_name, e)))
            .collect()
    }
}

fn scan(row: &MySqlRow) -> Result<AppliedMigration, sqlx::Error> {
    Ok(AppliedMigration {
        id: row.try_get("id")?,
        checksum: row.try_get("checksum")?,
        execution_time_in_millis: row.try_get("execution_time_in_millis")?,
        applied_at: row.try_get("applied_at")?,
    })
}
