//! Content fingerprinting for the result caches.

use sha2::{Digest, Sha256};

/// Fingerprint uploaded bytes as a lowercase hex SHA-256 digest.
pub fn fingerprint(content: &[u8]) -> String {
    format!("{:x}", Sha256::digest(content))
}
