//! Migration value types and the pure logic around them: checksums, id
//! validation, drift planning against the tracking table, and loading
//! migrations from a directory.

pub mod checksum;
pub mod discovery;
pub mod drift;
pub mod error;
pub mod model;

pub use checksum::sha256_hex;
pub use discovery::{discover_migrations, migration_id_from_filename};
pub use drift::{plan, validate_unique_ids, MigrationPlan};
pub use error::{MigrationDiscoveryError, MigrationDriftError, MigrationValidationError};
pub use model::{sort_migrations, AppliedMigration, Migration};
