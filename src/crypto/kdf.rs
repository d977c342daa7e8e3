use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroize;

use super::{DKLEN, ENC_KEY_LEN};
use crate::error::{CryptoError, CryptoResult};

/// Default pbkdf2 work factor used by the keyfile ecosystem.
pub const DEFAULT_WORK_FACTOR: u32 = 1_000_000;

/// Identifier written to `crypto.kdf`.
pub const PBKDF2_ID: &str = "pbkdf2";
/// Identifier written to `crypto.kdfparams.prf`.
pub const HMAC_SHA256_ID: &str = "hmac-sha256";

/// Key derivation parameters recorded in the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdfParams {
    /// PBKDF2 with HMAC-SHA256 as the PRF.
    Pbkdf2 { iterations: u32 },
}

impl Default for KdfParams {
    fn default() -> Self {
        KdfParams::Pbkdf2 {
            iterations: DEFAULT_WORK_FACTOR,
        }
    }
}

impl KdfParams {
    pub fn pbkdf2(iterations: u32) -> CryptoResult<Self> {
        let params = KdfParams::Pbkdf2 { iterations };
        params.validate()?;
        Ok(params)
    }

    pub fn id(&self) -> &'static str {
        match self {
            KdfParams::Pbkdf2 { .. } => PBKDF2_ID,
        }
    }

    pub fn prf(&self) -> &'static str {
        match self {
            KdfParams::Pbkdf2 { .. } => HMAC_SHA256_ID,
        }
    }

    pub fn iterations(&self) -> u32 {
        match self {
            KdfParams::Pbkdf2 { iterations } => *iterations,
        }
    }

    pub fn validate(&self) -> CryptoResult<()> {
        if self.iterations() < 1 {
            return Err(CryptoError::InvalidParams(
                "pbkdf2 iteration count must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// A 32-byte derived key.
///
/// Bytes `[0, 16)` key the cipher, bytes `[16, 32)` key the MAC.
pub struct DerivedKey {
    encryption_key: [u8; ENC_KEY_LEN],
    mac_key: [u8; DKLEN - ENC_KEY_LEN],
}

impl DerivedKey {
    fn from_bytes(bytes: &[u8; DKLEN]) -> Self {
        let mut encryption_key = [0u8; ENC_KEY_LEN];
        let mut mac_key = [0u8; DKLEN - ENC_KEY_LEN];
        encryption_key.copy_from_slice(&bytes[..ENC_KEY_LEN]);
        mac_key.copy_from_slice(&bytes[ENC_KEY_LEN..]);
        Self {
            encryption_key,
            mac_key,
        }
    }

    pub fn encryption_key(&self) -> &[u8; ENC_KEY_LEN] {
        &self.encryption_key
    }

    pub fn mac_key(&self) -> &[u8] {
        &self.mac_key
    }
}

impl Drop for DerivedKey {
    fn drop(&mut self) {
        self.encryption_key.zeroize();
        self.mac_key.zeroize();
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Derive the 32-byte envelope key from a password.
pub fn derive_key(password: &str, salt: &[u8], kdf: KdfParams) -> CryptoResult<DerivedKey> {
    kdf.validate()?;
    if salt.is_empty() {
        return Err(CryptoError::InvalidParams("salt must not be empty".to_string()));
    }

    let mut bytes = [0u8; DKLEN];
    match kdf {
        KdfParams::Pbkdf2 { iterations } => {
            pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut bytes);
        }
    }

    let key = DerivedKey::from_bytes(&bytes);
    bytes.zeroize();
    Ok(key)
}
