//! Envelope configuration.

use crate::crypto::{Cipher, IvEncoding, KdfParams};
use crate::error::CryptoResult;

/// Value written to the top-level `alias` field.
pub const ALIAS: &str = "";

/// Parameters used when producing new envelopes.
///
/// Decryption never consults this: every envelope carries its own parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyfileConfig {
    cipher: Cipher,
    kdf: KdfParams,
    iv_encoding: IvEncoding,
}

impl KeyfileConfig {
    pub fn new(cipher: Cipher, kdf: KdfParams, iv_encoding: IvEncoding) -> CryptoResult<Self> {
        kdf.validate()?;
        Ok(Self {
            cipher,
            kdf,
            iv_encoding,
        })
    }

    /// Default config with a different pbkdf2 work factor.
    pub fn with_work_factor(iterations: u32) -> CryptoResult<Self> {
        Ok(Self {
            kdf: KdfParams::pbkdf2(iterations)?,
            ..Self::default()
        })
    }

    pub fn with_iv_encoding(mut self, iv_encoding: IvEncoding) -> Self {
        self.iv_encoding = iv_encoding;
        self
    }

    pub fn cipher(&self) -> Cipher {
        self.cipher
    }

    pub fn kdf(&self) -> KdfParams {
        self.kdf
    }

    pub fn iv_encoding(&self) -> IvEncoding {
        self.iv_encoding
    }
}
