//! File-backed password verification.
//!
//! A verification file holds a single token produced by
//! [`CryptoManager::create_password_verification`]. Checking a password
//! decrypts it and compares against [`SENTINEL`](crate::SENTINEL); the
//! password itself is never written anywhere.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::CryptoManager;
use crate::error::CryptoResult;
use crate::storage::Storage;

/// Conventional name of the verification file inside a config directory.
pub const VERIFICATION_FILE_NAME: &str = ".password_verification";

/// A verification token persisted at a fixed path.
#[derive(Clone, Debug)]
pub struct PasswordVerificationStore {
    storage: Storage,
}

impl PasswordVerificationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            storage: Storage::new(path),
        }
    }

    /// Store for `<dir>/.password_verification`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(VERIFICATION_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        self.storage.path()
    }

    pub fn exists(&self) -> bool {
        self.storage.exists()
    }

    /// Writes a fresh verification token, overwriting any existing file.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::MissingPassword`](crate::CryptoError::MissingPassword)
    /// if the manager has no password, or a storage error if the file cannot
    /// be written.
    pub fn store(&self, manager: &CryptoManager) -> CryptoResult<()> {
        let token = manager.create_password_verification()?;
        self.storage.save(&token)?;
        debug!(path = %self.path().display(), "stored password verification");
        Ok(())
    }

    /// Returns `true` iff the file holds a token that decrypts to the sentinel
    /// under the manager's password.
    ///
    /// A missing or unreadable file yields `false`; the cause is logged.
    pub fn validate(&self, manager: &CryptoManager) -> bool {
        let token = match self.storage.load() {
            Ok(token) => token,
            Err(err) => {
                warn!(
                    path = %self.path().display(),
                    error = %format_args!("{err:#}"),
                    "password verification file unavailable"
                );
                return false;
            }
        };
        manager.validate_password(&token)
    }
}

/// Writes `manager`'s verification token to `path`.
pub fn store(manager: &CryptoManager, path: impl AsRef<Path>) -> CryptoResult<()> {
    PasswordVerificationStore::new(path.as_ref()).store(manager)
}

/// Checks `manager`'s password against the token at `path`.
pub fn validate(manager: &CryptoManager, path: impl AsRef<Path>) -> bool {
    PasswordVerificationStore::new(path.as_ref()).validate(manager)
}
