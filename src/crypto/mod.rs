//! Cryptographic primitives for keyfile envelopes.
//!
//! Provides PBKDF2 key derivation, AES-128-CTR encryption and the Keccak-256 MAC.

pub mod cipher;
pub mod kdf;
pub mod mac;

pub use cipher::{
    Cipher, IvEncoding, counter_block, decrypt, encode_iv, encrypt, generate_iv, generate_salt,
};
pub use kdf::{DEFAULT_WORK_FACTOR, DerivedKey, KdfParams, derive_key};
pub use mac::{compute_mac, verify_mac};

/// Length of the salt (16 bytes).
pub const SALT_LEN: usize = 16;
/// Length of the AES-CTR initial counter block (16 bytes).
pub const IV_LEN: usize = 16;
/// Length of the derived key (32 bytes), split into encryption and MAC halves.
pub const DKLEN: usize = 32;
/// Length of the AES-128 encryption key, the first half of the derived key.
pub const ENC_KEY_LEN: usize = 16;
/// Length of the Keccak-256 MAC (32 bytes).
pub const MAC_LEN: usize = 32;
