use thiserror::Error;

/// Result type for keyfile operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors raised while encrypting, decrypting or persisting keyfiles.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The manager was built without a password.
    #[error("could not process secret because no password was provided")]
    MissingPassword,

    /// The envelope is malformed or carries parameters this crate cannot use.
    #[error("invalid keyfile: {0}")]
    Format(String),

    /// The envelope names a key derivation function other than pbkdf2.
    #[error("unsupported kdf: {0}")]
    UnsupportedKdf(String),

    /// The envelope version is not 3.
    #[error("unsupported keyfile version: {0}")]
    UnsupportedVersion(u64),

    /// The recomputed MAC differs from the stored one: wrong password or tampered data.
    #[error("MAC mismatch")]
    MacMismatch,

    /// Caller supplied parameters that can never produce a key (empty salt, zero iterations).
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("OS random generator unavailable")]
    Random,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl CryptoError {
    /// Returns `true` for every kind of malformed or incompatible envelope.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            CryptoError::Format(_) | CryptoError::UnsupportedKdf(_) | CryptoError::UnsupportedVersion(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_kinds_are_grouped() {
        assert!(CryptoError::Format("x".into()).is_format_error());
        assert!(CryptoError::UnsupportedKdf("scrypt".into()).is_format_error());
        assert!(CryptoError::UnsupportedVersion(4).is_format_error());
        assert!(!CryptoError::MacMismatch.is_format_error());
        assert!(!CryptoError::MissingPassword.is_format_error());
    }

    #[test]
    fn mac_mismatch_message_matches_ecosystem() {
        assert_eq!(CryptoError::MacMismatch.to_string(), "MAC mismatch");
    }
}
