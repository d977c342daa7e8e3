//! Keyfile v3 JSON layout.
//!
//! ```text
//! {"crypto": {"cipher": "aes-128-ctr", "cipherparams": {"iv": HEX}, "ciphertext": HEX,
//!             "kdf": "pbkdf2", "kdfparams": {"c": N, "dklen": 32, "prf": "hmac-sha256", "salt": HEX},
//!             "mac": HEX},
//!  "version": 3, "alias": ""}
//! ```
//!
//! Output uses `", "` and `": "` separators in exactly this key order so the
//! hex-encoded text matches what the keyfile ecosystem produces. Input accepts
//! any layout, the legacy `"Crypto"` key, and `0x`-prefixed hex.

use std::io;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json::ser::Formatter;

use super::Keyfile;
use crate::config::ALIAS;
use crate::crypto::kdf::{HMAC_SHA256_ID, PBKDF2_ID};
use crate::crypto::{Cipher, DKLEN, KdfParams, MAC_LEN, counter_block};
use crate::error::{CryptoError, CryptoResult};

/// Envelope version handled by this module.
pub const VERSION_V3: u64 = 3;

#[derive(Serialize, Deserialize)]
struct KeyfileJson<P> {
    #[serde(alias = "Crypto")]
    crypto: CryptoJson<P>,
    version: u64,
    #[serde(default)]
    alias: String,
}

#[derive(Serialize, Deserialize)]
struct CryptoJson<P> {
    cipher: String,
    cipherparams: CipherParamsJson,
    ciphertext: String,
    kdf: String,
    kdfparams: P,
    mac: String,
}

#[derive(Serialize, Deserialize)]
struct CipherParamsJson {
    iv: String,
}

#[derive(Serialize, Deserialize)]
struct Pbkdf2ParamsJson {
    c: u32,
    dklen: usize,
    prf: String,
    salt: String,
}

/// JSON formatter emitting `", "` between items and `": "` after keys.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

fn decode_hex(field: &str, value: &str) -> CryptoResult<Vec<u8>> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(digits).map_err(|e| CryptoError::Format(format!("invalid {field} hex: {e}")))
}

fn invalid(e: serde_json::Error) -> CryptoError {
    CryptoError::Format(e.to_string())
}

fn parse_pbkdf2(params: Value) -> CryptoResult<(KdfParams, Vec<u8>)> {
    let params: Pbkdf2ParamsJson = serde_json::from_value(params).map_err(invalid)?;

    if params.prf != HMAC_SHA256_ID {
        return Err(CryptoError::Format(format!(
            "unsupported pbkdf2 prf: {}",
            params.prf
        )));
    }
    if params.dklen != DKLEN {
        return Err(CryptoError::Format(format!(
            "dklen must be {DKLEN}, got {}",
            params.dklen
        )));
    }
    if params.c == 0 {
        return Err(CryptoError::Format(
            "pbkdf2 iteration count must be >= 1".to_string(),
        ));
    }

    let salt = decode_hex("salt", &params.salt)?;
    if salt.is_empty() {
        return Err(CryptoError::Format("salt is empty".to_string()));
    }

    Ok((KdfParams::Pbkdf2 { iterations: params.c }, salt))
}

/// Parses a v3 envelope.
///
/// # Errors
///
/// Returns [`CryptoError::UnsupportedKdf`] when `kdf` is not `pbkdf2`, and
/// [`CryptoError::Format`] for missing fields, bad hex or unusable parameters.
pub fn parse(value: Value) -> CryptoResult<Keyfile> {
    let json: KeyfileJson<Value> = serde_json::from_value(value).map_err(invalid)?;
    let crypto = json.crypto;

    let cipher = Cipher::from_id(&crypto.cipher)?;

    let (kdf, salt) = match crypto.kdf.as_str() {
        PBKDF2_ID => parse_pbkdf2(crypto.kdfparams)?,
        other => return Err(CryptoError::UnsupportedKdf(other.to_string())),
    };

    let iv = decode_hex("iv", &crypto.cipherparams.iv)?;
    counter_block(&iv)?;

    let ciphertext = decode_hex("ciphertext", &crypto.ciphertext)?;

    let mac = decode_hex("mac", &crypto.mac)?;
    if mac.len() != MAC_LEN {
        return Err(CryptoError::Format(format!(
            "mac must be {MAC_LEN} bytes, got {}",
            mac.len()
        )));
    }

    Ok(Keyfile::new(cipher, iv, ciphertext, kdf, salt, mac))
}

/// Serializes a v3 envelope.
pub fn serialize(file: &Keyfile) -> CryptoResult<Vec<u8>> {
    if file.version() != VERSION_V3 {
        return Err(CryptoError::UnsupportedVersion(file.version()));
    }

    let kdfparams = match file.kdf() {
        KdfParams::Pbkdf2 { iterations } => Pbkdf2ParamsJson {
            c: iterations,
            dklen: DKLEN,
            prf: HMAC_SHA256_ID.to_string(),
            salt: hex::encode(file.salt()),
        },
    };

    let json = KeyfileJson {
        crypto: CryptoJson {
            cipher: file.cipher().id().to_string(),
            cipherparams: CipherParamsJson {
                iv: hex::encode(file.iv()),
            },
            ciphertext: hex::encode(file.ciphertext()),
            kdf: file.kdf().id().to_string(),
            kdfparams,
            mac: hex::encode(file.mac()),
        },
        version: VERSION_V3,
        alias: ALIAS.to_string(),
    };

    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
    json.serialize(&mut ser).map_err(invalid)?;
    Ok(buf)
}

/// Envelope for `"HummingBot"` under password `"test_password"`, salt `01..10`,
/// counter block `00a1a2..af`, c = 1000, as written by the keyfile ecosystem.
#[cfg(test)]
pub(crate) const GOLDEN_JSON: &str = r#"{"crypto": {"cipher": "aes-128-ctr", "cipherparams": {"iv": "a1a2a3a4a5a6a7a8a9aaabacadaeaf"}, "ciphertext": "8279ca48a04cd43e8999", "kdf": "pbkdf2", "kdfparams": {"c": 1000, "dklen": 32, "prf": "hmac-sha256", "salt": "0102030405060708090a0b0c0d0e0f10"}, "mac": "69f70084e2e43ef540c99d95a3dde1e825196502f98a18ac59cda1edb1ebe35a"}, "version": 3, "alias": ""}"#;
