use crate::dialect::{select_applied_sql, Dialect};
use crate::error::DialectError;
use crate::lock::lock_token;
use async_trait::async_trait;
use core::time::Duration;
use sqlx::postgres::PgRow;
use sqlx::{Executor, PgConnection, Row};
use strata_migration::AppliedMigration;

/// PostgreSQL and wire-compatible databases. Locks are session-level
/// advisory locks keyed on the tracking table name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Postgres;

#[async_trait]
impl Dialect for Postgres {
    type Database = sqlx::Postgres;

    fn name(&self) -> &'static str {
        "postgres"
    }

    fn lock_sql(&self, table_name: &str) -> Option<String> {
        Some(format!("SELECT pg_advisory_lock({})", lock_token(table_name)))
    }

    fn try_lock_sql(&self, table_name: &str) -> Option<String> {
        Some(format!("SELECT pg_try_advisory_lock({})", lock_token(table_name)))
    }

    fn unlock_sql(&self, table_name: &str) -> Option<String> {
        Some(format!("SELECT pg_advisory_unlock({})", lock_token(table_name)))
    }

    fn create_sql(&self, table_name: &str) -> String {
        format!(
            "
CREATE TABLE IF NOT EXISTS {table_name} (
    id VARCHAR(255) NOT NULL,
    checksum VARCHAR(64) NOT NULL DEFAULT '',
    execution_time_in_millis INTEGER NOT NULL DEFAULT 0,
    applied_at TIMESTAMP WITH TIME ZONE NOT NULL
)
"
        )
    }

    fn insert_sql(&self, table_name: &str) -> String {
        format!(
            "
INSERT INTO {table_name} (id, checksum, execution_time_in_millis, applied_at)
VALUES ($1, $2, $3, $4)
"
        )
    }

    fn quote_char(&self) -> char {
        '"'
    }

    fn statement_timeout_sql(&self, timeout: Duration) -> Option<String> {
        // 0 would disable the limit.
        let ms = timeout.as_millis().clamp(1, i32::MAX as u128);
        Some(format!("SET LOCAL statement_timeout = {ms}"))
    }

    async fn execute(&self, conn: &mut PgConnection, sql: &str) -> Result<(), sqlx::Error> {
        (&mut *conn).execute(sql).await?;
        Ok(())
    }

    async fn try_lock(&self, conn: &mut PgConnection, table_name: &str) -> Result<bool, sqlx::Error> {
        let Some(sql) = self.try_lock_sql(table_name) else {
            return Ok(true);
        };

        let row: (bool,) = sqlx::query_as(&sql).fetch_one(&mut *conn).await?;
        Ok(row.0)
    }

    async fn unlock(&self, conn: &mut PgConnection, table_name: &str) -> Result<bool, sqlx::Error> {
        let Some(sql) = self.unlock_sql(table_name) else {
            return Ok(true);
        };

        let row: (bool,) = sqlx::query_as(&sql).fetch_one(&mut *conn).await?;
        Ok(row.0)
    }

    async fn insert_applied_migration(
        &self,
        conn: &mut PgConnection,
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
        conn: &mut PgConnection,
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

fn scan(row: &PgRow) -> Result<AppliedMigration, sqlx::Error> {
    Ok(AppliedMigration {
        id: row.try_get("id")?,
        checksum: row.try_get("checksum")?,
        execution_time_in_millis: row.try_get("execution_time_in_millis")?,
        applied_at: row.try_get("applied_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::Postgres;
    use crate::dialect::Dialect;
    use core::time::Duration;

    const TABLE: &str = "\"schema_migrations\"";

    #[test]
    fn lock_and_unlock_share_a_token() {
        let lock = Postgres.lock_sql(TABLE).unwrap();
        let unlock = Postgres.unlock_sql(TABLE).unwrap();
        assert_eq!(lock, "SELECT pg_advisory_lock(7784294272570278499)");
        assert_eq!(unlock, "SELECT pg_advisory_unlock(7784294272570278499)");
    }

    #[test]
    fn try_lock_uses_the_same_token() {
        let sql = Postgres.try_lock_sql(TABLE).unwrap();
        assert_eq!(sql, "SELECT pg_try_advisory_lock(7784294272570278499)");
    }

    #[test]
    fn lock_token_is_fixed_per_name() {
        assert_eq!(
            Postgres.lock_sql("\"seeds\"").unwrap(),
            "SELECT pg_advisory_lock(6179227329230408502)"
        );
        let qualified = Postgres.quoted_table_name(Some("public"), "schema_migrations");
        assert_eq!(
            Postgres.try_lock_sql(&qualified).unwrap(),
            "SELECT pg_try_advisory_lock(-4853518893867931448)"
        );
    }

    #[test]
    fn statement_timeout_is_transaction_local() {
        assert_eq!(
            Postgres.statement_timeout_sql(Duration::from_millis(1500)).unwrap(),
            "SET LOCAL statement_timeout = 1500"
        );
        assert_eq!(
            Postgres.statement_timeout_sql(Duration::ZERO).unwrap(),
            "SET LOCAL statement_timeout = 1"
        );
    }

    #[test]
    fn create_is_idempotent_ddl() {
        let sql = Postgres.create_sql(TABLE);
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS \"schema_migrations\""));
        assert!(sql.contains("applied_at TIMESTAMP WITH TIME ZONE NOT NULL"));
    }

    #[test]
    fn insert_is_parameterized() {
        let sql = Postgres.insert_sql(TABLE);
        assert!(sql.contains("INSERT INTO \"schema_migrations\""));
        assert!(sql.contains("($1, $2, $3, $4)"));
    }

    #[test]
    fn quoting() {
        assert_eq!(Postgres.quoted_ident("my table"), "\"mytable\"");
        assert_eq!(Postgres.quoted_ident("a\"b"), "\"a\"\"b\"");
        assert_eq!(Postgres.quoted_ident(";drop"), "\"drop\"");
        assert_eq!(Postgres.quoted_ident(""), "");
        assert_eq!(
            Postgres.quoted_table_name(Some("public"), "schema_migrations"),
            "\"public\".\"schema_migrations\""
        );
    }
}
