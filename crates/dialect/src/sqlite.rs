use crate::dialect::{select_applied_sql, Dialect};
use crate::error::DialectError;
use crate::lock::lock_token;
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, SqliteConnection};
use strata_migration::AppliedMigration;

/// Table holding one row per held migration lock, keyed by lock token.
pub const LOCK_TABLE: &str = "strata_migration_locks";

/// SQLite. It has no advisory locks, so the lock is a row in
/// [`LOCK_TABLE`]: inserting it takes the lock, deleting it releases it.
/// There is no blocking form; the migrator polls [`Dialect::try_lock`].
///
/// The row is not tied to a session. A process that dies while holding the
/// lock leaves it behind, and it must be deleted by hand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sqlite;

#[async_trait]
impl Dialect for Sqlite {
    type Database = sqlx::Sqlite;

    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn lock_sql(&self, _table_name: &str) -> Option<String> {
        None
    }

    fn try_lock_sql(&self, table_name: &str) -> Option<String> {
        Some(format!(
            "INSERT OR IGNORE INTO {LOCK_TABLE} (token) VALUES ('{}')",
            lock_token(table_name)
        ))
    }

    fn unlock_sql(&self, table_name: &str) -> Option<String> {
        Some(format!(
            "DELETE FROM {LOCK_TABLE} WHERE token = '{}'",
            lock_token(table_name)
        ))
    }

    fn create_sql(&self, table_name: &str) -> String {
        format!(
            "
CREATE TABLE IF NOT EXISTS {table_name} (
    id VARCHAR(255) NOT NULL,
    checksum VARCHAR(64) NOT NULL DEFAULT '',
    execution_time_in_millis INTEGER NOT NULL DEFAULT 0,
    applied_at DATETIME NOT NULL
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
        '"'
    }

    async fn execute(&self, conn: &mut SqliteConnection, sql: &str) -> Result<(), sqlx::Error> {
        (&mut *conn).execute(sql).await?;
        Ok(())
    }

    async fn try_lock(&self, conn: &mut SqliteConnection, table_name: &str) -> Result<bool, sqlx::Error> {
        let Some(sql) = self.try_lock_sql(table_name) else {
            return Ok(true);
        };

        (&mut *conn).execute(create_lock_table_sql().as_str()).await?;
        let done = sqlx::query(&sql).execute(&mut *conn).await?;
        Ok(done.rows_affected() == 1)
    }

    async fn unlock(&self, conn: &mut SqliteConnection, table_name: &str) -> Result<bool, sqlx::Error> {
        let Some(sql) = self.unlock_sql(table_name) else {
            return Ok(true);
        };

        let done = sqlx::query(&sql).execute(&mut *conn).await?;
        Ok(done.rows_affected() == 1)
    }

    async fn insert_applied_migration(
        &self,
        conn: &mut SqliteConnection,
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
        conn: &mut SqliteConnection,
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

fn create_lock_table_sql() -> String {
    format!("CREATE TABLE IF NOT EXISTS {LOCK_TABLE} (token VARCHAR(32) NOT NULL PRIMARY KEY)")
}

fn scan(row: &SqliteRow) -> Result<AppliedMigration, sqlx::Error> {
    Ok(AppliedMigration {
        id: row.try_get("id")?,
        checksum: row.try_get("checksum")?,
        execution_time_in_millis: row.try_get("execution_time_in_millis")?,
        applied_at: row.try_get("applied_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::Sqlite;
    use crate::dialect::Dialect;
    use chrono::{TimeZone, Utc};
    use sqlx::{Connection, SqliteConnection};
    use strata_migration::AppliedMigration;

    const TABLE: &str = "\"schema_migrations\"";

    async fn connect() -> SqliteConnection {
        SqliteConnection::connect("sqlite::memory:").await.unwrap()
    }

    #[test]
    fn lock_is_a_row_keyed_by_token() {
        assert_eq!(Sqlite.lock_sql(TABLE), None);
        assert_eq!(
            Sqlite.try_lock_sql(TABLE).unwrap(),
            "INSERT OR IGNORE INTO strata_migration_locks (token) VALUES ('7784294272570278499')"
        );
        assert_eq!(
            Sqlite.unlock_sql(TABLE).unwrap(),
            "DELETE FROM strata_migration_locks WHERE token = '7784294272570278499'"
        );
    }

    #[tokio::test]
    async fn lock_is_exclusive_per_table() {
        let mut conn = connect().await;

        assert!(Sqlite.try_lock(&mut conn, TABLE).await.unwrap());
        assert!(!Sqlite.try_lock(&mut conn, TABLE).await.unwrap());
        assert!(Sqlite.try_lock(&mut conn, "\"seeds\"").await.unwrap());

        assert!(Sqlite.unlock(&mut conn, TABLE).await.unwrap());
        assert!(!Sqlite.unlock(&mut conn, TABLE).await.unwrap());
        assert!(Sqlite.try_lock(&mut conn, TABLE).await.unwrap());
    }

    #[tokio::test]
    async fn create_twice_is_not_an_error() {
        let mut conn = connect().await;
        Sqlite.execute(&mut conn, &Sqlite.create_sql(TABLE)).await.unwrap();
        Sqlite.execute(&mut conn, &Sqlite.create_sql(TABLE)).await.unwrap();
    }

    #[tokio::test]
    async fn history_round_trips_ordered_by_id() {
        let mut conn = connect().await;
        Sqlite.execute(&mut conn, &Sqlite.create_sql(TABLE)).await.unwrap();

        let applied_at = Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap();
        for id in ["b", "a"] {
            let row = AppliedMigration {
                id: id.to_string(),
                checksum: format!("sum-{id}"),
                execution_time_in_millis: 7,
                applied_at,
            };
            Sqlite.insert_applied_migration(&mut conn, TABLE, &row).await.unwrap();
        }

        let history = Sqlite.get_applied_migrations(&mut conn, TABLE).await.unwrap();
        let ids: Vec<&str> = history.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(history[0].checksum, "sum-a");
        assert_eq!(history[0].execution_time_in_millis, 7);
        assert_eq!(history[0].applied_at, applied_at);
    }

    #[tokio::test]
    async fn altered_table_gets_a_hint() {
        let mut conn = connect().await;
        Sqlite
            .execute(
                &mut conn,
                "CREATE TABLE \"schema_migrations\" (id VARCHAR(255), checksum VARCHAR(64), execution_time_in_millis INTEGER, applied_at DATETIME);
                 INSERT INTO \"schema_migrations\" VALUES ('a', NULL, 0, '2020-01-01T00:00:00Z');",
            )
            .await
            .unwrap();

        let err = Sqlite.get_applied_migrations(&mut conn, TABLE).await.unwrap_err();
        assert!(err.to_string().contains("Did somebody change the structure"));
    }

    #[tokio::test]
    async fn missing_table_is_a_query_error() {
        let mut conn = connect().await;
        let err = Sqlite.get_applied_migrations(&mut conn, TABLE).await.unwrap_err();
        assert!(matches!(err, crate::error::DialectError::HistoryQuery { .. }));
    }

    #[tokio::test]
    async fn multi_statement_scripts_run() {
        let mut conn = connect().await;
        Sqlite
            .execute(&mut conn, "CREATE TABLE a (id INTEGER); CREATE TABLE b (id INTEGER);")
            .await
            .unwrap();
        Sqlite.execute(&mut conn, "INSERT INTO b VALUES (1)").await.unwrap();
    }
}
