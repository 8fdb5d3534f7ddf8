/// Mixed into every lock key so strata's keys do not line up with advisory
/// locks other tools derive from the same table name. ASCII "STRATALK".
pub const LOCK_KEY_SALT: u64 = 0x5354_5241_5441_4c4b;

/// FNV-1a of `table_name`, salted. Equal names always give equal keys, in any
/// process; distinct names may collide, which only costs some serialization.
pub(crate) fn lock_key(table_name: &str) -> i64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for b in table_name.as_bytes() {
        hash ^= *b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }

    let mixed = hash ^ LOCK_KEY_SALT;
    mixed as i64
}

/// The key as it is embedded in lock statements.
pub(crate) fn lock_token(table_name: &str) -> String {
    lock_key(table_name).to_string()
}
