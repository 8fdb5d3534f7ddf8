use crate::checksum::sha256_hex;
use chrono::{DateTime, Local, Utc};

/// One unit of schema change.
///
/// The `id` orders migrations: they run in ascending byte-wise order of their
/// ids, so ids are conventionally prefixed with a sortable timestamp such as
/// `2024-03-01T10:00 create users`. The `script` may hold several statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub id: String,
    pub script: String,
}

impl Migration {
    pub fn new(id: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            script: script.into(),
        }
    }

    /// Digest of the script. Computed on every call; nothing is cached.
    pub fn checksum(&self) -> String {
        sha256_hex(self.script.as_bytes())
    }
}

/// A row of the tracking table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMigration {
    pub id: String,
    pub checksum: String,
    pub execution_time_in_millis: i32,
    pub applied_at: DateTime<Utc>,
}

impl AppliedMigration {
    /// `applied_at` in the host's local timezone, for display only.
    pub fn applied_at_local(&self) -> DateTime<Local> {
        self.applied_at.with_timezone(&Local)
    }
}

/// Sorts migrations ascending by id.
pub fn sort_migrations(migrations: &mut [Migration]) {
    migrations.sort_by(|a, b| a.id.cmp(&b.id));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn checksum_follows_script() {
        let a = Migration::new("2020-01-01", "CREATE TABLE a (id INT);");
        let b = Migration::new("2020-01-01", "CREATE TABLE b (id INT);");
        assert_eq!(a.checksum(), a.clone().checksum());
        assert_ne!(a.checksum(), b.checksum());
    }

    #[test]
    fn checksum_ignores_id() {
        let a = Migration::new("one", "SELECT 1;");
        let b = Migration::new("two", "SELECT 1;");
        assert_eq!(a.checksum(), b.checksum());
    }

    #[test]
    fn sort_is_by_id_regardless_of_input_order() {
        let mut migrations = vec![
            Migration::new("b", "SELECT 2;"),
            Migration::new("a", "SELECT 1;"),
            Migration::new("c", "SELECT 3;"),
        ];
        sort_migrations(&mut migrations);
        let ids: Vec<&str> = migrations.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn sort_is_lexicographic_not_numeric() {
        let mut migrations = vec![Migration::new("10", ""), Migration::new("9", "")];
        sort_migrations(&mut migrations);
        assert_eq!(migrations[0].id, "10");
    }

    #[test]
    fn local_time_is_same_instant() {
        let applied = AppliedMigration {
            id: "x".to_string(),
            checksum: String::new(),
            execution_time_in_millis: 0,
            applied_at: Utc.with_ymd_and_hms(2021, 6, 1, 12, 0, 0).unwrap(),
        };
        assert_eq!(applied.applied_at_local().with_timezone(&Utc), applied.applied_at);
    }
}
