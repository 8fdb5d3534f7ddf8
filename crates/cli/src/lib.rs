//! The `strata` command line: flag/env configuration, logging, and the
//! `migrate` and `status` commands on top of [`strata_executor::Migrator`].

pub mod args;
pub mod config;
mod connection;
pub mod error;
pub mod error_view;
pub mod logging;
pub mod migrate;
pub mod output;
pub mod status;
pub mod style;
pub mod ui;

pub use args::{Cli, Command, LogFormat, MigrateArgs, StatusArgs};
pub use config::{Backend, Settings};
pub use error::{CliError, ExitCode};

pub async fn run(cli: Cli) -> Result<(), CliError> {
    let settings = Settings::from_cli(&cli)?;

    match &cli.command {
        Command::Migrate(args) => migrate::run(args, &settings).await,
        Command::Status(args) => status::run(args, &settings).await,
    }
}
