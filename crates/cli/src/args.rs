use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "strata", version, about = "Apply SQL migrations under a cooperative lock")]
pub struct Cli {
    /// postgres://, mysql://, mariadb:// or sqlite: URL of the target database.
    #[arg(long, global = true, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Directory holding the `*.sql` migration files.
    #[arg(long, global = true, env = "STRATA_MIGRATIONS_DIR", default_value = "migrations")]
    pub migrations_dir: PathBuf,

    /// Name of the tracking table.
    #[arg(long, global = true, env = "STRATA_TABLE", default_value = strata_executor::DEFAULT_TABLE_NAME)]
    pub table: String,

    /// Schema qualifying the tracking table.
    #[arg(long, global = true, env = "STRATA_SCHEMA")]
    pub schema: Option<String>,

    /// Give up when the lock or the run takes longer than this.
    #[arg(long, global = true, env = "STRATA_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    #[arg(long, global = true, env = "STRATA_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply every pending migration.
    Migrate(MigrateArgs),
    /// Show which migrations are applied, pending or changed.
    Status(StatusArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct MigrateArgs {}

#[derive(Parser, Debug, Clone)]
pub struct StatusArgs {}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}
