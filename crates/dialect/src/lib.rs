//! SQL dialects for the strata migration engine.
//!
//! A dialect owns every piece of backend-specific syntax: the cooperative
//! lock, the tracking table DDL and insert, history retrieval and identifier
//! quoting. The engine picks one dialect at construction and never inspects
//! which one it has.

mod dialect;
pub mod error;
mod lock;
pub mod mysql;
pub mod postgres;
pub mod quote;
pub mod sqlite;

pub use dialect::{DbConnection, Dialect};
pub use error::DialectError;
pub use lock::LOCK_KEY_SALT;
pub use mysql::MySql;
pub use postgres::Postgres;
pub use sqlite::Sqlite;
