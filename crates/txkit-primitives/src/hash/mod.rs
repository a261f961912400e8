//! Hash function primitives.
//!
//! Provides SHA-256 and double SHA-256 for transaction identifiers and
//! legacy/witness signature digests, plus personalized BLAKE2b-256 for
//! Sapling signature digests.

use sha2::{Digest, Sha256};

/// Length in bytes of a BLAKE2b personalization string.
pub const BLAKE2B_PERSONAL_SIZE: usize = 16;

/// Compute SHA-256 hash of the input data.
///
/// # Arguments
/// * `data` - Byte slice to hash.
///
/// # Returns
/// A 32-byte SHA-256 digest.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute double SHA-256 (SHA-256d) hash of the input data.
///
/// This is the standard Bitcoin hash function used for transaction IDs
/// and signature digests. Computes SHA-256(SHA-256(data)).
///
/// # Arguments
/// * `data` - Byte slice to hash.
///
/// # Returns
/// A 32-byte double-SHA-256 digest.
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// Compute a 32-byte BLAKE2b digest under a personalization string.
///
/// The personalization is exactly [`BLAKE2B_PERSONAL_SIZE`] bytes; an
/// all-zero value gives the unpersonalized digest.
///
/// # Arguments
/// * `personal` - Personalization bytes (e.g. `b"ZcashPrevoutHash"`).
/// * `data` - Byte slice to hash.
///
/// # Returns
/// A 32-byte BLAKE2b-256 digest.
pub fn blake2b_256(personal: &[u8; BLAKE2B_PERSONAL_SIZE], data: &[u8]) -> [u8; 32] {
    let hash = blake2b_simd::Params::new()
        .hash_length(32)
        .personal(personal)
        .to_state()
        .update(data)
        .finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(hash.as_bytes());
    output
}
