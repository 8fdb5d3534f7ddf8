use crate::args::Cli;
use crate::error::CliError;
use core::time::Duration;
use std::path::PathBuf;
use strata_dialect::Dialect;
use strata_executor::Migrator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Postgres,
    MySql,
    Sqlite,
}

impl Backend {
    pub fn from_url(url: &str) -> Result<Self, CliError> {
        let scheme = url.split(':').next().unwrap_or("").to_ascii_lowercase();
        match scheme.as_str() {
            "postgres" | "postgresql" => Ok(Backend::Postgres),
            "mysql" | "mariadb" => Ok(Backend::MySql),
            "sqlite" => Ok(Backend::Sqlite),
            _ => Err(CliError::user_error("Unsupported database URL")
                .with_reason(format!("unknown scheme '{scheme}'"))
                .with_action("Use a postgres://, mysql://, mariadb:// or sqlite: URL.")),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Backend::Postgres => "postgres",
            Backend::MySql => "mysql",
            Backend::Sqlite => "sqlite",
        }
    }
}

/// Everything a command needs, resolved from flags and environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub backend: Backend,
    pub migrations_dir: PathBuf,
    pub table: String,
    pub schema: Option<String>,
    pub timeout: Option<Duration>,
}

impl Settings {
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let database_url = match cli.database_url.as_deref().map(str::trim) {
            Some(v) if !v.is_empty() => v.to_string(),
            _ => {
                return Err(CliError::user_error("DATABASE_URL is required")
                    .with_action("Pass --database-url or set DATABASE_URL (a .env file works too)."))
            }
        };

        let table = cli.table.trim();
        if table.is_empty() {
            return Err(CliError::user_error("Tracking table name must not be empty"));
        }

        if cli.timeout_secs == Some(0) {
            return Err(CliError::user_error("--timeout-secs must be greater than zero"));
        }

        Ok(Self {
            backend: Backend::from_url(&database_url)?,
            database_url,
            migrations_dir: cli.migrations_dir.clone(),
            table: table.to_string(),
            schema: cli
                .schema
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            timeout: cli.timeout_secs.map(Duration::from_secs),
        })
    }

    pub fn migrator<D: Dialect>(&self, dialect: D) -> Migrator<D> {
        let migrator = match &self.schema {
            Some(schema) => Migrator::new(dialect).with_schema_table(schema, &self.table),
            None => Migrator::new(dialect).with_table_name(&self.table),
        };

        match self.timeout {
            Some(timeout) => migrator.with_timeout(timeout),
            None => migrator,
        }
    }
}
