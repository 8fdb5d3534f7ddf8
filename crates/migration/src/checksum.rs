use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `bytes`. This is the value recorded in the
/// tracking table's `checksum` column.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    hex::encode(digest)
}
