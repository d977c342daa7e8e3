use aes::Aes128;
use ctr::Ctr128BE;
use ctr::cipher::{KeyIvInit, StreamCipher};
use getrandom::fill;

use super::{ENC_KEY_LEN, IV_LEN, SALT_LEN};
use crate::error::{CryptoError, CryptoResult};

type Aes128Ctr = Ctr128BE<Aes128>;

/// Identifier written to `crypto.cipher`.
pub const AES_128_CTR_ID: &str = "aes-128-ctr";

/// Symmetric ciphers understood by the envelope codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cipher {
    #[default]
    Aes128Ctr,
}

impl Cipher {
    pub fn id(&self) -> &'static str {
        match self {
            Cipher::Aes128Ctr => AES_128_CTR_ID,
        }
    }

    pub fn from_id(id: &str) -> CryptoResult<Self> {
        match id {
            AES_128_CTR_ID => Ok(Cipher::Aes128Ctr),
            other => Err(CryptoError::Format(format!("unsupported cipher: {other}"))),
        }
    }
}

/// How the initial counter block is written to `cipherparams.iv`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IvEncoding {
    /// Minimal big-endian integer bytes: leading zero bytes are dropped, at least one byte is kept.
    /// This is what the keyfile ecosystem writes.
    #[default]
    Minimal,
    /// Always the full 16 bytes.
    FixedWidth,
}

/// Fill buffer with cryptographically secure random bytes
fn secure_random(buf: &mut [u8]) -> CryptoResult<()> {
    fill(buf).map_err(|_| CryptoError::Random)
}

/// Generate salt
pub fn generate_salt() -> CryptoResult<[u8; SALT_LEN]> {
    let mut salt = [0u8; SALT_LEN];
    secure_random(&mut salt)?;
    Ok(salt)
}

/// Generate the initial counter block
pub fn generate_iv() -> CryptoResult<[u8; IV_LEN]> {
    let mut iv = [0u8; IV_LEN];
    secure_random(&mut iv)?;
    Ok(iv)
}

/// Encode a counter block for `cipherparams.iv`.
pub fn encode_iv(iv: &[u8; IV_LEN], encoding: IvEncoding) -> Vec<u8> {
    match encoding {
        IvEncoding::FixedWidth => iv.to_vec(),
        IvEncoding::Minimal => {
            let start = iv
                .iter()
                .position(|b| *b != 0)
                .unwrap_or(IV_LEN - 1);
            iv[start..].to_vec()
        }
    }
}

/// Rebuild the 16-byte counter block from stored IV bytes, left-padding with zeros.
pub fn counter_block(iv: &[u8]) -> CryptoResult<[u8; IV_LEN]> {
    if iv.is_empty() || iv.len() > IV_LEN {
        return Err(CryptoError::Format(format!(
            "IV must be 1 to {IV_LEN} bytes, got {}",
            iv.len()
        )));
    }

    let mut block = [0u8; IV_LEN];
    block[IV_LEN - iv.len()..].copy_from_slice(iv);
    Ok(block)
}

fn apply_keystream(key: &[u8; ENC_KEY_LEN], iv: &[u8; IV_LEN], data: &[u8]) -> Vec<u8> {
    let mut cipher = Aes128Ctr::new(&(*key).into(), &(*iv).into());
    let mut out = data.to_vec();
    cipher.apply_keystream(&mut out);
    out
}

/// Encrypt plaintext with AES-128-CTR. The output has the plaintext's length.
pub fn encrypt(key: &[u8; ENC_KEY_LEN], iv: &[u8; IV_LEN], plaintext: &[u8]) -> Vec<u8> {
    apply_keystream(key, iv, plaintext)
}

/// Decrypt ciphertext with AES-128-CTR.
pub fn decrypt(key: &[u8; ENC_KEY_LEN], iv: &[u8; IV_LEN], ciphertext: &[u8]) -> Vec<u8> {
    apply_keystream(key, iv, ciphertext)
}
