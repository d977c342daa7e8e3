//! Password-based secret encryption in the keyfile v3 format.
//!
//! A secret is encrypted with AES-128-CTR under a PBKDF2-HMAC-SHA256 key,
//! tagged with Keccak-256, wrapped in a keyfile v3 JSON envelope and finally
//! hex-encoded:
//!
//! ```no_run
//! use credcrypt::CryptoManager;
//!
//! let manager = CryptoManager::new("test_password");
//! let token = manager.encrypt("HummingBot")?;
//! assert_eq!(manager.decrypt(&token)?, "HummingBot");
//! # Ok::<(), credcrypt::CryptoError>(())
//! ```

mod config;
pub mod crypto;
mod error;
pub mod format;
mod storage;
pub mod verification;

pub use crate::config::KeyfileConfig;
pub use crate::crypto::{Cipher, IvEncoding, KdfParams};
pub use crate::error::{CryptoError, CryptoResult};
pub use crate::format::Keyfile;
pub use crate::verification::PasswordVerificationStore;

use anyhow::Context;
use directories::ProjectDirs;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::crypto::{IV_LEN, SALT_LEN};

/// Plaintext of every password verification token.
pub const SENTINEL: &str = "HummingBot";

/// Encrypts and decrypts secrets under one password.
///
/// The password lives only in memory and is zeroized on drop. Every call is
/// independent: each encryption draws a fresh salt and IV.
pub struct CryptoManager {
    password: Option<Zeroizing<String>>,
    config: KeyfileConfig,
}

impl fmt::Debug for CryptoManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CryptoManager")
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("config", &self.config)
            .finish()
    }
}

impl CryptoManager {
    pub fn new(password: impl Into<String>) -> Self {
        Self::with_config(password, KeyfileConfig::default())
    }

    pub fn with_config(password: impl Into<String>, config: KeyfileConfig) -> Self {
        Self {
            password: Some(Zeroizing::new(password.into())),
            config,
        }
    }

    /// A manager that can only report [`CryptoError::MissingPassword`].
    pub fn without_password() -> Self {
        Self {
            password: None,
            config: KeyfileConfig::default(),
        }
    }

    pub fn config(&self) -> &KeyfileConfig {
        &self.config
    }

    fn password(&self) -> CryptoResult<&str> {
        self.password
            .as_deref()
            .map(String::as_str)
            .ok_or(CryptoError::MissingPassword)
    }

    /// Encrypts `plaintext` into a hex token.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::MissingPassword`] if the manager has no password.
    pub fn encrypt(&self, plaintext: &str) -> CryptoResult<String> {
        let password = self.password()?;
        let salt = crypto::generate_salt()?;
        let iv = crypto::generate_iv()?;

        let file = self.seal(password, plaintext.as_bytes(), &salt, &iv)?;
        format::encode(&file)
    }

    /// Decrypts a hex token produced by [`encrypt`](Self::encrypt) or by any
    /// compatible keyfile v3 writer.
    ///
    /// # Errors
    ///
    /// - [`CryptoError::MissingPassword`] if the manager has no password
    /// - a format error if the token is not a supported envelope
    /// - [`CryptoError::MacMismatch`] if the password is wrong or the data was altered
    pub fn decrypt(&self, token: &str) -> CryptoResult<String> {
        let password = self.password()?;
        let file = format::decode(token)?;

        let plaintext = Self::open(password, &file)?;
        String::from_utf8(plaintext.to_vec())
            .map_err(|_| CryptoError::Format("decrypted secret is not valid UTF-8".to_string()))
    }

    /// Encrypts [`SENTINEL`].
    pub fn create_password_verification(&self) -> CryptoResult<String> {
        self.encrypt(SENTINEL)
    }

    /// Like [`validate_password`](Self::validate_password) but keeps the error.
    ///
    /// `Ok(false)` means the token decrypted cleanly to something other than
    /// the sentinel.
    pub fn check_password(&self, token: &str) -> CryptoResult<bool> {
        Ok(self.decrypt(token)? == SENTINEL)
    }

    /// Returns `true` iff `token` decrypts to [`SENTINEL`] under this
    /// manager's password. Never fails: every error is logged and reported
    /// as `false`.
    pub fn validate_password(&self, token: &str) -> bool {
        match self.check_password(token) {
            Ok(valid) => valid,
            Err(CryptoError::MacMismatch) => {
                debug!("password verification failed: MAC mismatch");
                false
            }
            Err(err) => {
                warn!(error = %err, "password verification failed");
                false
            }
        }
    }

    fn seal(
        &self,
        password: &str,
        plaintext: &[u8],
        salt: &[u8; SALT_LEN],
        iv: &[u8; IV_LEN],
    ) -> CryptoResult<Keyfile> {
        let kdf = self.config.kdf();
        debug!(
            kdf = kdf.id(),
            iterations = kdf.iterations(),
            len = plaintext.len(),
            "encrypting secret"
        );

        let key = crypto::derive_key(password, salt, kdf)?;
        let ciphertext = crypto::encrypt(key.encryption_key(), iv, plaintext);
        let mac = crypto::compute_mac(key.mac_key(), &ciphertext);

        Ok(Keyfile::new(
            self.config.cipher(),
            crypto::encode_iv(iv, self.config.iv_encoding()),
            ciphertext,
            kdf,
            salt.to_vec(),
            mac.to_vec(),
        ))
    }

    fn open(password: &str, file: &Keyfile) -> CryptoResult<Zeroizing<Vec<u8>>> {
        debug!(
            kdf = file.kdf().id(),
            iterations = file.kdf().iterations(),
            len = file.ciphertext().len(),
            "decrypting secret"
        );

        let key = crypto::derive_key(password, file.salt(), file.kdf())?;
        if !crypto::verify_mac(key.mac_key(), file.ciphertext(), file.mac()) {
            return Err(CryptoError::MacMismatch);
        }

        let iv = crypto::counter_block(file.iv())?;
        Ok(Zeroizing::new(crypto::decrypt(
            key.encryption_key(),
            &iv,
            file.ciphertext(),
        )))
    }
}

/// Encrypts one credential with a fresh manager for `password`.
///
/// An empty credential stays empty instead of becoming an envelope.
pub fn encrypt_credential(password: &str, value: &str) -> CryptoResult<String> {
    if value.is_empty() {
        return Ok(String::new());
    }
    CryptoManager::new(password).encrypt(value)
}

/// Decodes a token's envelope without a password, for inspection.
pub fn inspect(token: &str) -> CryptoResult<Keyfile> {
    format::decode(token)
}

/// `<platform data dir>/credcrypt/.password_verification`
pub fn default_verification_path() -> anyhow::Result<PathBuf> {
    let project_dirs = ProjectDirs::from("", "", "credcrypt")
        .context("could not determine platform directories")?;

    Ok(project_dirs
        .data_dir()
        .join(verification::VERIFICATION_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::v3::GOLDEN_JSON;
    use serde_json::Value;

    fn fast(password: &str) -> CryptoManager {
        CryptoManager::with_config(password, KeyfileConfig::with_work_factor(64).unwrap())
    }

    fn envelope(token: &str) -> Value {
        serde_json::from_slice(&hex::decode(token).unwrap()).unwrap()
    }

    fn golden_salt() -> [u8; 16] {
        std::array::from_fn(|i| i as u8 + 1)
    }

    fn golden_iv() -> [u8; 16] {
        let mut iv: [u8; 16] = std::array::from_fn(|i| 0xa0 + i as u8);
        iv[0] = 0;
        iv
    }

    #[test]
    fn seal_matches_ecosystem_bytes() {
        let manager = CryptoManager::with_config(
            "test_password",
            KeyfileConfig::with_work_factor(1000).unwrap(),
        );

        let file = manager
            .seal("test_password", b"HummingBot", &golden_salt(), &golden_iv())
            .unwrap();

        assert_eq!(format::encode(&file).unwrap(), hex::encode(GOLDEN_JSON));
    }

    #[test]
    fn fixed_width_iv_keeps_leading_zero() {
        let config = KeyfileConfig::with_work_factor(1000)
            .unwrap()
            .with_iv_encoding(IvEncoding::FixedWidth);
        let manager = CryptoManager::with_config("test_password", config);

        let file = manager
            .seal("test_password", b"HummingBot", &golden_salt(), &golden_iv())
            .unwrap();

        assert_eq!(file.iv(), golden_iv());
        // Same keystream either way, so the same ciphertext and MAC.
        let golden = format::parse(GOLDEN_JSON.as_bytes()).unwrap();
        assert_eq!(file.ciphertext(), golden.ciphertext());
        assert_eq!(file.mac(), golden.mac());
    }

    #[test]
    fn decrypts_ecosystem_token() {
        let token = hex::encode(GOLDEN_JSON);

        assert_eq!(fast("test_password").decrypt(&token).unwrap(), "HummingBot");
        assert!(matches!(
            fast("wrong_password").decrypt(&token),
            Err(CryptoError::MacMismatch)
        ));
    }

    #[test]
    fn roundtrip_including_empty_and_unicode() {
        let manager = fast("pw");
        let long = "x".repeat(1000);
        for secret in ["", "HummingBot", "api-key-0123456789", "秘密のキー 🔑", long.as_str()] {
            let token = manager.encrypt(secret).unwrap();
            assert_eq!(manager.decrypt(&token).unwrap(), secret);
        }
    }

    #[test]
    fn envelope_shape() {
        let token = fast("test_password").encrypt("HummingBot").unwrap();
        let json = envelope(&token);

        assert_eq!(json["version"], 3);
        assert_eq!(json["alias"], "");
        assert_eq!(json["crypto"]["cipher"], "aes-128-ctr");
        assert_eq!(json["crypto"]["kdf"], "pbkdf2");
        assert_eq!(json["crypto"]["kdfparams"]["c"], 64);
        assert_eq!(json["crypto"]["kdfparams"]["dklen"], 32);
        assert_eq!(json["crypto"]["kdfparams"]["prf"], "hmac-sha256");
        assert_eq!(json["crypto"]["kdfparams"]["salt"].as_str().unwrap().len(), 32);
        assert_eq!(json["crypto"]["mac"].as_str().unwrap().len(), 64);
        assert_eq!(
            json["crypto"]["ciphertext"].as_str().unwrap().len(),
            "HummingBot".len() * 2
        );
    }

    #[test]
    fn encryptions_differ_but_both_decrypt() {
        let manager = fast("pw");
        let a = manager.encrypt("same").unwrap();
        let b = manager.encrypt("same").unwrap();

        assert_ne!(a, b);
        let (ea, eb) = (envelope(&a), envelope(&b));
        assert_ne!(ea["crypto"]["kdfparams"]["salt"], eb["crypto"]["kdfparams"]["salt"]);
        assert_eq!(manager.decrypt(&a).unwrap(), "same");
        assert_eq!(manager.decrypt(&b).unwrap(), "same");
    }

    #[test]
    fn wrong_password_is_mac_mismatch() {
        let token = fast("test_password").encrypt("HummingBot").unwrap();
        assert!(matches!(
            fast("wrong_password").decrypt(&token),
            Err(CryptoError::MacMismatch)
        ));
    }

    #[test]
    fn flipped_bits_are_detected() {
        let manager = fast("pw");
        let token = manager.encrypt("some secret").unwrap();
        let file = format::decode(&token).unwrap();

        for i in 0..file.ciphertext().len() {
            for bit in [0x01u8, 0x80] {
                let mut ciphertext = file.ciphertext().to_vec();
                ciphertext[i] ^= bit;
                let tampered = Keyfile::new(
                    file.cipher(),
                    file.iv().to_vec(),
                    ciphertext,
                    file.kdf(),
                    file.salt().to_vec(),
                    file.mac().to_vec(),
                );
                let tampered = format::encode(&tampered).unwrap();
                assert!(matches!(manager.decrypt(&tampered), Err(CryptoError::MacMismatch)));
            }
        }

        for i in 0..file.mac().len() {
            let mut mac = file.mac().to_vec();
            mac[i] ^= 0x10;
            let tampered = Keyfile::new(
                file.cipher(),
                file.iv().to_vec(),
                file.ciphertext().to_vec(),
                file.kdf(),
                file.salt().to_vec(),
                mac,
            );
            let tampered = format::encode(&tampered).unwrap();
            assert!(matches!(manager.decrypt(&tampered), Err(CryptoError::MacMismatch)));
        }
    }

    #[test]
    fn unsupported_envelopes_are_format_errors() {
        let manager = fast("pw");
        let json = String::from_utf8(hex::decode(manager.encrypt("x").unwrap()).unwrap()).unwrap();

        let scrypt = hex::encode(json.replace("\"pbkdf2\"", "\"scrypt\""));
        assert!(matches!(manager.decrypt(&scrypt), Err(CryptoError::UnsupportedKdf(_))));

        let v4 = hex::encode(json.replace("\"version\": 3", "\"version\": 4"));
        assert!(matches!(manager.decrypt(&v4), Err(CryptoError::UnsupportedVersion(4))));

        assert!(manager.decrypt("not hex").unwrap_err().is_format_error());
    }

    #[test]
    fn missing_password() {
        let manager = CryptoManager::without_password();
        assert!(matches!(manager.encrypt("x"), Err(CryptoError::MissingPassword)));
        assert!(matches!(
            manager.decrypt(&hex::encode(GOLDEN_JSON)),
            Err(CryptoError::MissingPassword)
        ));
        assert!(!manager.validate_password(&hex::encode(GOLDEN_JSON)));
    }

    #[test]
    fn password_verification() {
        let token = fast("test_password").create_password_verification().unwrap();

        assert!(fast("test_password").validate_password(&token));
        assert!(!fast("wrong_password").validate_password(&token));
        assert!(!fast("").validate_password(&token));
    }

    #[test]
    fn validate_password_collapses_every_failure() {
        let manager = fast("pw");
        assert!(!manager.validate_password(""));
        assert!(!manager.validate_password("zz"));
        assert!(!manager.validate_password(&hex::encode("{\"version\": 3}")));

        let other_word = manager.encrypt("NotTheSentinel").unwrap();
        assert!(!manager.validate_password(&other_word));
        assert!(!manager.check_password(&other_word).unwrap());
    }

    #[test]
    fn check_password_keeps_the_cause() {
        let token = fast("a").create_password_verification().unwrap();

        assert!(fast("a").check_password(&token).unwrap());
        assert!(matches!(fast("b").check_password(&token), Err(CryptoError::MacMismatch)));
        assert!(fast("a").check_password("zz").unwrap_err().is_format_error());
    }

    #[test]
    fn encrypt_credential_skips_empty_values() {
        assert_eq!(encrypt_credential("pw", "").unwrap(), "");
    }

    #[test]
    fn inspect_needs_no_password() {
        let token = fast("pw").encrypt("x").unwrap();
        let file = inspect(&token).unwrap();

        assert_eq!(file.kdf().iterations(), 64);
        assert_eq!(file.salt().len(), 16);
        assert_eq!(file.ciphertext().len(), 1);
    }

    #[test]
    fn debug_redacts_password() {
        let rendered = format!("{:?}", CryptoManager::new("hunter2"));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("REDACTED"));
    }

    #[test]
    fn default_manager_records_default_work_factor() {
        assert_eq!(CryptoManager::new("pw").config().kdf().iterations(), 1_000_000);
    }
}
