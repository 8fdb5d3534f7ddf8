use crate::error::{MigrationDriftError, MigrationValidationError};
use crate::model::{AppliedMigration, Migration};
use std::collections::{HashMap, HashSet};

/// Result of merging the requested migrations with the tracking table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPlan<'a> {
    /// Migrations without a history row, ascending by id.
    pub pending: Vec<&'a Migration>,
    /// Requested migrations that are already recorded with a matching checksum.
    pub already_applied: usize,
    /// History ids that were not part of the request.
    pub unknown: Vec<String>,
}

pub fn validate_unique_ids(migrations: &[Migration]) -> Result<(), MigrationValidationError> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(migrations.len());
    for m in migrations {
        if !seen.insert(m.id.as_str()) {
            return Err(MigrationValidationError::DuplicateId { id: m.id.clone() });
        }
    }

    Ok(())
}

/// Walks `migrations` (already sorted) against `history`.
///
/// Every requested migration that has a history row must still carry the
/// recorded checksum; the first mismatch in id order is returned and nothing
/// is planned.
pub fn plan<'a>(
    migrations: &'a [Migration],
    history: &[AppliedMigration],
) -> Result<MigrationPlan<'a>, MigrationDriftError> {
    let mut db_by_id: HashMap<&str, &AppliedMigration> = HashMap::with_capacity(history.len());
    for applied in history {
        db_by_id.insert(applied.id.as_str(), applied);
    }

    let mut pending = Vec::new();
    let mut already_applied = 0usize;
    let mut requested: HashSet<&str> = HashSet::with_capacity(migrations.len());

    for m in migrations {
        requested.insert(m.id.as_str());

        let Some(applied) = db_by_id.get(m.id.as_str()) else {
            pending.push(m);
            continue;
        };

        let checksum = m.checksum();
        if applied.checksum != checksum {
            return Err(MigrationDriftError::ChecksumMismatch {
                id: m.id.clone(),
                expected: applied.checksum.clone(),
                actual: checksum,
            });
        }

        already_applied += 1;
    }

    let mut unknown: Vec<String> = history
        .iter()
        .filter(|a| !requested.contains(a.id.as_str()))
        .map(|a| a.id.clone())
        .collect();
    unknown.sort();

    Ok(MigrationPlan {
        pending,
        already_applied,
        unknown,
    })
}
