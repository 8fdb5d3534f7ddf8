//! The migration engine: a lock-protected, per-migration transactional
//! [`Migrator`] generic over a [`strata_dialect::Dialect`].

pub mod error;
mod lock;
pub mod migrator;
#[cfg(test)]
mod testing;
mod transaction;

pub use error::{ErrorKind, MigratorError};
pub use migrator::{ApplyReport, Migrator, DEFAULT_TABLE_NAME};
