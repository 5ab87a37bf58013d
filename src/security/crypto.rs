//! Random tokens and digests.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Hex string of `len` random bytes from the OS-seeded thread RNG.
pub fn generate_secure_random(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// SHA-256 of `data`, hex-encoded.
pub fn hash_data(data: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    hex::encode(hasher.finalize())
}
