use crate::args::StatusArgs;
use crate::config::{Backend, Settings};
use crate::connection;
use crate::error::CliError;
use crate::output;
use crate::style::{Color, Style};
use crate::ui::Ui;
use std::collections::{BTreeMap, HashMap};
use strata_dialect::{DbConnection, Dialect, MySql, Postgres, Sqlite};
use strata_migration::{discover_migrations, AppliedMigration, Migration};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationState {
    /// Recorded with a matching checksum. Carries the local-time stamp.
    Applied(String),
    Pending,
    /// Recorded, but the file no longer matches what ran.
    Changed,
    /// Recorded, but there is no file for it.
    Missing(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRow {
    pub id: String,
    pub state: MigrationState,
}

pub async fn run(_args: &StatusArgs, settings: &Settings) -> Result<(), CliError> {
    let local = discover_migrations(&settings.migrations_dir)?;

    let history = match settings.backend {
        Backend::Postgres => history_with(settings, Postgres).await?,
        Backend::MySql => history_with(settings, MySql).await?,
        Backend::Sqlite => history_with(settings, Sqlite).await?,
    };

    let rows = status_rows(&local, &history);
    let ui = Ui::new(Style::detect());
    output::lines(render(&ui, &rows));

    Ok(())
}

async fn history_with<D: Dialect>(
    settings: &Settings,
    dialect: D,
) -> Result<Vec<AppliedMigration>, CliError> {
    let migrator = settings.migrator(dialect);
    let mut conn = connection::connect::<DbConnection<D>>(&settings.database_url).await?;
    let result = migrator.get_applied_migrations(&mut conn).await;
    connection::close(conn).await;

    Ok(result?)
}

/// One row per migration file and per history entry without a file,
/// ascending by id.
pub fn status_rows(local: &[Migration], history: &[AppliedMigration]) -> Vec<StatusRow> {
    let recorded: HashMap<&str, &AppliedMigration> =
        history.iter().map(|a| (a.id.as_str(), a)).collect();

    let mut rows: BTreeMap<&str, MigrationState> = BTreeMap::new();
    for m in local {
        let state = match recorded.get(m.id.as_str()) {
            Some(applied) if applied.checksum == m.checksum() => {
                MigrationState::Applied(local_time(applied))
            }
            Some(_) => MigrationState::Changed,
            None => MigrationState::Pending,
        };
        rows.insert(m.id.as_str(), state);
    }

    for applied in history {
        rows.entry(applied.id.as_str())
            .or_insert_with(|| MigrationState::Missing(local_time(applied)));
    }

    rows.into_iter()
        .map(|(id, state)| StatusRow {
            id: id.to_string(),
            state,
        })
        .collect()
}

fn local_time(applied: &AppliedMigration) -> String {
    applied
        .applied_at_local()
        .format("%Y-%m-%d %H:%M:%S %:z")
        .to_string()
}

fn render(ui: &Ui, rows: &[StatusRow]) -> Vec<String> {
    let mut applied = 0usize;
    let mut pending = 0usize;
    let mut lines = Vec::with_capacity(rows.len() + 3);

    for row in rows {
        let line = match &row.state {
            MigrationState::Applied(at) => {
                applied += 1;
                ui.list_item(&row.id, "applied", Color::Green, Some(at))
            }
            MigrationState::Pending => {
                pending += 1;
                ui.list_item(&row.id, "pending", Color::Yellow, None)
            }
            MigrationState::Changed => {
                applied += 1;
                ui.list_item(&row.id, "changed", Color::Red, Some("(checksum differs)"))
            }
            MigrationState::Missing(at) => {
                applied += 1;
                ui.list_item(&row.id, "no file", Color::Dim, Some(at))
            }
        };
        lines.push(line);
    }

    lines.push(ui.rule());
    lines.push(ui.kv("applied", &applied.to_string()));
    lines.push(ui.kv("pending", &pending.to_string()));
    lines
}
