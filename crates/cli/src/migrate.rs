use crate::args::MigrateArgs;
use crate::config::{Backend, Settings};
use crate::connection;
use crate::error::CliError;
use crate::output;
use crate::style::Style;
use crate::ui::Ui;
use strata_dialect::{DbConnection, Dialect, MySql, Postgres, Sqlite};
use strata_executor::ApplyReport;
use strata_migration::{discover_migrations, Migration};
use tracing::info;

pub async fn run(_args: &MigrateArgs, settings: &Settings) -> Result<(), CliError> {
    let migrations = discover_migrations(&settings.migrations_dir)?;
    info!(
        backend = settings.backend.as_str(),
        dir = %settings.migrations_dir.display(),
        count = migrations.len(),
        "migrations discovered"
    );

    let report = match settings.backend {
        Backend::Postgres => apply_with(settings, Postgres, &migrations).await?,
        Backend::MySql => apply_with(settings, MySql, &migrations).await?,
        Backend::Sqlite => apply_with(settings, Sqlite, &migrations).await?,
    };

    let ui = Ui::new(Style::detect());
    output::lines(render(&ui, &report));
    Ok(())
}

async fn apply_with<D: Dialect>(
    settings: &Settings,
    dialect: D,
    migrations: &[Migration],
) -> Result<ApplyReport, CliError> {
    let migrator = settings.migrator(dialect);
    let mut conn = connection::connect::<DbConnection<D>>(&settings.database_url).await?;
    let result = migrator.apply(&mut conn, migrations).await;
    connection::close(conn).await;

    Ok(result?)
}

fn render(ui: &Ui, report: &ApplyReport) -> Vec<String> {
    let mut lines = Vec::with_capacity(report.applied.len() + 3);
    for id in &report.applied {
        lines.push(ui.ok_line(id));
    }

    if report.applied.is_empty() {
        lines.push(ui.info_line("database is up to date"));
    }

    lines.push(ui.kv("applied", &report.applied.len().to_string()));
    lines.push(ui.kv("skipped", &report.skipped.to_string()));
    lines
}
