use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of a rule document, used to tie a run to its rules.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
