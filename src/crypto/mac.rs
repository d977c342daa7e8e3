//! Keccak-256 integrity tag.
//!
//! The tag uses Keccak-256 with pre-NIST padding, not SHA3-256.

use sha3::{Digest, Keccak256};
use subtle::ConstantTimeEq;

use super::MAC_LEN;

/// `keccak256(mac_key || ciphertext)`
pub fn compute_mac(mac_key: &[u8], ciphertext: &[u8]) -> [u8; MAC_LEN] {
    let mut hasher = Keccak256::new();
    hasher.update(mac_key);
    hasher.update(ciphertext);
    hasher.finalize().into()
}

/// Recompute the tag and compare it to `expected` in constant time.
pub fn verify_mac(mac_key: &[u8], ciphertext: &[u8], expected: &[u8]) -> bool {
    let actual = compute_mac(mac_key, ciphertext);
    expected.len() == MAC_LEN && bool::from(actual.as_slice().ct_eq(expected))
}
