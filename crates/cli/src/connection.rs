use crate::error::CliError;
use sqlx::Connection;
use tracing::debug;

pub async fn connect<C: Connection>(database_url: &str) -> Result<C, CliError> {
    C::connect(database_url).await.map_err(|e| {
        CliError::user_error("Database connection failed")
            .with_reason(e.to_string())
            .with_action("Check --database-url / DATABASE_URL and that the server is reachable.")
    })
}

/// Closes cleanly so the server drops the session (and any lock it held)
/// right away.
pub async fn close<C: Connection>(conn: C) {
    if let Err(e) = conn.close().await {
        debug!(error = %e, "closing database connection failed");
    }
}
