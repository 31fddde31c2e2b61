//! Error types for fluree-ledger-crypto

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CryptoError>;

/// Crypto error type
///
/// Signature failures are intentionally vague; callers get no oracle for
/// why verification failed.
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("signature verification failed")]
    InvalidSignature,

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("not an encrypted object")]
    InvalidFormat,

    #[error("decryption failed")]
    DecryptFailed,

    #[error("encryption failed")]
    EncryptFailed,
}

impl From<CryptoError> for fluree_ledger_core::Error {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::InvalidSignature => {
                fluree_ledger_core::Error::invalid_tx("signature verification failed")
            }
            other => fluree_ledger_core::Error::storage_io(other.to_string()),
        }
    }
}
