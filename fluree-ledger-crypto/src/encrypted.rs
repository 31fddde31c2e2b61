//! Encrypted storage wrapper
//!
//! [`EncryptedStorage`] wraps any storage backend and applies transparent
//! AES-256-GCM encryption on `write` and decryption on `read`. Rename,
//! delete and existence checks pass through untouched - the wrapped
//! backend only ever sees ciphertext.
//!
//! ## Envelope
//!
//! ```text
//! | magic "FLE1" (4) | nonce (12) | ciphertext + GCM tag |
//! ```
//!
//! Each write draws a fresh random nonce, so encrypting the same
//! plaintext twice yields different ciphertext. Reading a blob that does
//! not carry the magic fails with an invalid-format error: when
//! encryption is configured, every stored blob must be encrypted.

use crate::error::CryptoError;
use crate::key::EncryptionKey;
use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use async_trait::async_trait;
use fluree_ledger_core::{Error, Result, Storage, StorageRead, StorageWrite};
use rand_core::{OsRng, RngCore};
use std::fmt::{self, Debug};

const MAGIC: &[u8; 4] = b"FLE1";
const NONCE_LEN: usize = 12;
const HEADER_LEN: usize = MAGIC.len() + NONCE_LEN;

/// Storage wrapper encrypting on write and decrypting on read.
pub struct EncryptedStorage<S> {
    inner: S,
    cipher: Aes256Gcm,
}

impl<S> EncryptedStorage<S> {
    pub fn new(inner: S, key: &EncryptionKey) -> Self {
        let cipher = Aes256Gcm::new_from_slice(key.expose_secret())
            .expect("AES-256 key is always 32 bytes");
        Self { inner, cipher }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn encrypt(&self, plaintext: &[u8]) -> std::result::Result<Vec<u8>, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| CryptoError::EncryptFailed)?;

        let mut out = Vec::with_capacity(HEADER_LEN + ciphertext.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn decrypt(&self, blob: &[u8]) -> std::result::Result<Vec<u8>, CryptoError> {
        if blob.len() < HEADER_LEN || &blob[..MAGIC.len()] != MAGIC {
            return Err(CryptoError::InvalidFormat);
        }
        let nonce = Nonce::from_slice(&blob[MAGIC.len()..HEADER_LEN]);
        self.cipher
            .decrypt(nonce, &blob[HEADER_LEN..])
            .map_err(|_| CryptoError::DecryptFailed)
    }
}

impl<S: Debug> Debug for EncryptedStorage<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedStorage")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<S: Storage> StorageRead for EncryptedStorage<S> {
    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        let blob = self.inner.read(key).await?;
        self.decrypt(&blob)
            .map_err(|e| Error::storage_io(format!("{}: {}", key, e)))
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.inner.exists(key).await
    }
}

#[async_trait]
impl<S: Storage> StorageWrite for EncryptedStorage<S> {
    async fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let blob = self
            .encrypt(bytes)
            .map_err(|e| Error::storage_io(format!("{}: {}", key, e)))?;
        self.inner.write(key, &blob).await
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        self.inner.rename(from, to).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(key).await
    }
}

impl<S: Storage> Storage for EncryptedStorage<S> {
    fn close(&self) {
        self.inner.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluree_ledger_core::MemoryStorage;

    fn encrypted() -> EncryptedStorage<MemoryStorage> {
        EncryptedStorage::new(
            MemoryStorage::new(),
            &EncryptionKey::from_passphrase("test-secret"),
        )
    }

    #[tokio::test]
    async fn test_encrypt_decrypt_round_trip() {
        let storage = encrypted();
        storage.write("k", b"plaintext data").await.unwrap();
        assert_eq!(storage.read("k").await.unwrap(), b"plaintext data");
    }

    #[tokio::test]
    async fn test_ciphertext_not_plaintext() {
        let storage = encrypted();
        storage.write("k", b"plaintext data").await.unwrap();

        let raw = storage.inner().read("k").await.unwrap();
        assert_ne!(raw, b"plaintext data");
        assert_eq!(&raw[..4], b"FLE1");
    }

    #[tokio::test]
    async fn test_fresh_nonce_per_write() {
        let storage = encrypted();
        storage.write("a", b"same").await.unwrap();
        storage.write("b", b"same").await.unwrap();
        let a = storage.inner().read("a").await.unwrap();
        let b = storage.inner().read("b").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_wrong_key_fails() {
        let inner = MemoryStorage::new();
        let writer = EncryptedStorage::new(inner.clone(), &EncryptionKey::from_passphrase("a"));
        writer.write("k", b"secret").await.unwrap();

        let reader = EncryptedStorage::new(inner, &EncryptionKey::from_passphrase("b"));
        assert!(reader.read("k").await.is_err());
    }

    #[tokio::test]
    async fn test_unencrypted_blob_rejected() {
        let inner = MemoryStorage::new();
        inner.write("k", b"not encrypted").await.unwrap();
        let storage = EncryptedStorage::new(inner, &EncryptionKey::from_passphrase("x"));
        assert!(storage.read("k").await.is_err());
    }

    #[tokio::test]
    async fn test_rename_passthrough() {
        let storage = encrypted();
        storage.write("old", b"data").await.unwrap();
        storage.rename("old", "new").await.unwrap();
        assert_eq!(storage.read("new").await.unwrap(), b"data");
    }
}
