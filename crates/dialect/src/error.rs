use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DialectError {
    #[error("failed to query applied migrations from {table}: {message}")]
    HistoryQuery { table: String, message: String },

    #[error("failed to read applied migrations. Did somebody change the structure of the {table} table?: {message}")]
    HistoryScan { table: String, message: String },
}

impl DialectError {
    pub(crate) fn query(table: &str, err: sqlx::Error) -> Self {
        DialectError::HistoryQuery {
            table: table.to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn scan(table: &str, err: sqlx::Error) -> Self {
        DialectError::HistoryScan {
            table: table.to_string(),
            message: err.to_string(),
        }
    }
}
