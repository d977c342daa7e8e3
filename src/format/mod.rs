//! Keyfile envelope codec.
//!
//! An encrypted value travels as `hex(utf8(json))`, where the JSON is a
//! keyfile envelope. Parsing is dispatched on the envelope's `version` field.

use std::fmt;

use serde_json::Value;

use crate::crypto::{Cipher, KdfParams, DKLEN};
use crate::error::{CryptoError, CryptoResult};

pub mod v3;

/// Latest envelope version
pub const CURRENT_VERSION: u64 = v3::VERSION_V3;

/// A parsed keyfile envelope.
///
/// `iv` holds the bytes exactly as stored in `cipherparams.iv`, which may be
/// shorter than a full counter block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyfile {
    version: u64,
    cipher: Cipher,
    iv: Vec<u8>,
    ciphertext: Vec<u8>,
    kdf: KdfParams,
    salt: Vec<u8>,
    mac: Vec<u8>,
}

impl Keyfile {
    /// Assembles an envelope from its components.
    pub fn new(
        cipher: Cipher,
        iv: Vec<u8>,
        ciphertext: Vec<u8>,
        kdf: KdfParams,
        salt: Vec<u8>,
        mac: Vec<u8>,
    ) -> Self {
        Self {
            version: CURRENT_VERSION,
            cipher,
            iv,
            ciphertext,
            kdf,
            salt,
            mac,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn cipher(&self) -> Cipher {
        self.cipher
    }

    pub fn iv(&self) -> &[u8] {
        &self.iv
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn kdf(&self) -> KdfParams {
        self.kdf
    }

    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    pub fn mac(&self) -> &[u8] {
        &self.mac
    }
}

impl fmt::Display for Keyfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "version:    {}", self.version)?;
        writeln!(f, "cipher:     {}", self.cipher.id())?;
        writeln!(f, "iv:         {}", hex::encode(&self.iv))?;
        writeln!(
            f,
            "kdf:        {} (prf={}, c={}, dklen={DKLEN})",
            self.kdf.id(),
            self.kdf.prf(),
            self.kdf.iterations()
        )?;
        writeln!(f, "salt:       {}", hex::encode(&self.salt))?;
        writeln!(f, "ciphertext: {} bytes", self.ciphertext.len())?;
        write!(f, "mac:        {}", hex::encode(&self.mac))
    }
}

/// Parses envelope JSON into a [`Keyfile`].
///
/// # Errors
///
/// Returns a format error if the JSON is malformed, the `version` field is
/// missing, or the version is not supported.
pub fn parse(json: &[u8]) -> CryptoResult<Keyfile> {
    let value: Value = serde_json::from_slice(json)
        .map_err(|e| CryptoError::Format(format!("invalid JSON: {e}")))?;

    let version = value
        .get("version")
        .ok_or_else(|| CryptoError::Format("missing version".to_string()))?;
    let version = version
        .as_u64()
        .ok_or_else(|| CryptoError::Format(format!("version must be an integer, got {version}")))?;

    match version {
        v3::VERSION_V3 => v3::parse(value),
        other => Err(CryptoError::UnsupportedVersion(other)),
    }
}

/// Serializes a [`Keyfile`] to envelope JSON.
pub fn serialize(file: &Keyfile) -> CryptoResult<Vec<u8>> {
    match file.version() {
        v3::VERSION_V3 => v3::serialize(file),
        other => Err(CryptoError::UnsupportedVersion(other)),
    }
}

/// Serializes a [`Keyfile`] and hex-encodes the JSON text.
pub fn encode(file: &Keyfile) -> CryptoResult<String> {
    Ok(hex::encode(serialize(file)?))
}

/// Inverse of [`encode`].
pub fn decode(token: &str) -> CryptoResult<Keyfile> {
    let json = hex::decode(token)
        .map_err(|e| CryptoError::Format(format!("token is not valid hex: {e}")))?;
    parse(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::v3::GOLDEN_JSON;

    #[test]
    fn decode_inverts_encode() {
        let file = parse(GOLDEN_JSON.as_bytes()).unwrap();
        let token = encode(&file).unwrap();

        assert_eq!(token, hex::encode(GOLDEN_JSON));
        assert_eq!(decode(&token).unwrap(), file);
    }

    #[test]
    fn unsupported_version_fails() {
        let json = GOLDEN_JSON.replace("\"version\": 3", "\"version\": 4");
        assert!(matches!(
            parse(json.as_bytes()),
            Err(CryptoError::UnsupportedVersion(4))
        ));
    }

    #[test]
    fn missing_version_fails() {
        let json = GOLDEN_JSON.replace("\"version\": 3, ", "");
        let err = parse(json.as_bytes()).unwrap_err();
        assert!(matches!(err, CryptoError::Format(_)), "{err:?}");
    }

    #[test]
    fn string_version_fails() {
        let json = GOLDEN_JSON.replace("\"version\": 3", "\"version\": \"3\"");
        assert!(parse(json.as_bytes()).unwrap_err().is_format_error());
    }

    #[test]
    fn non_json_fails() {
        assert!(parse(b"not json").unwrap_err().is_format_error());
        assert!(parse(b"[3]").unwrap_err().is_format_error());
    }

    #[test]
    fn non_hex_token_fails() {
        assert!(decode("zz").unwrap_err().is_format_error());
        assert!(decode("abc").unwrap_err().is_format_error());
    }

    #[test]
    fn display_lists_public_parameters() {
        let file = parse(GOLDEN_JSON.as_bytes()).unwrap();
        let text = file.to_string();

        assert!(text.contains("aes-128-ctr"));
        assert!(text.contains("pbkdf2 (prf=hmac-sha256, c=1000, dklen=32)"));
        assert!(text.contains("0102030405060708090a0b0c0d0e0f10"));
    }
}
