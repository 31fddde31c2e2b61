//! At-rest encryption keys
//!
//! A 32-byte AES-256 key with zeroization on drop. Keys are derived from
//! the configured passphrase (`fdb-encryption-secret`) by hashing it to
//! 32 bytes, or supplied directly as base64.

use crate::error::{CryptoError, Result};
use base64::prelude::*;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const KEY_LEN: usize = 32;

/// A 32-byte AES-256 encryption key, zeroized on drop.
///
/// No `Debug` exposure of key material.
#[derive(Clone)]
pub struct EncryptionKey {
    bytes: KeyBytes,
}

#[derive(Clone, Zeroize, ZeroizeOnDrop)]
struct KeyBytes([u8; KEY_LEN]);

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

impl EncryptionKey {
    /// Create a key from raw bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self {
            bytes: KeyBytes(bytes),
        }
    }

    /// Derive a key from a passphrase by hashing it to 32 bytes (SHA-256).
    pub fn from_passphrase(passphrase: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(passphrase.as_bytes());
        Self::new(hasher.finalize().into())
    }

    /// Decode a base64 key (standard or URL-safe alphabet).
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let decoded = BASE64_STANDARD
            .decode(encoded.trim())
            .or_else(|_| BASE64_URL_SAFE.decode(encoded.trim()))
            .map_err(|e| CryptoError::InvalidKey(format!("base64 decode failed: {}", e)))?;
        let bytes: [u8; KEY_LEN] = decoded
            .try_into()
            .map_err(|_| CryptoError::InvalidKey("key must be exactly 32 bytes".to_string()))?;
        Ok(Self::new(bytes))
    }

    /// Expose the raw key material for cipher construction.
    pub fn expose_secret(&self) -> &[u8; KEY_LEN] {
        &self.bytes.0
    }
}
