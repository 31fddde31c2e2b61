//! Storage facade - pluggable blob stores
//!
//! Every backend is a pure blob KV with five operations plus an idempotent
//! `close`. Keys are unix-style paths derived from
//! `(network, dbid, block-or-index-key)`.
//!
//! ## Traits
//!
//! - `StorageRead`: `read`, `exists`
//! - `StorageWrite`: `write`, `rename`, `delete`
//! - `Storage`: marker combining both
//!
//! `read` distinguishes a missing key (`Error::StorageNotFound`) from an
//! I/O failure (`Error::StorageIo`); callers that treat absence as normal
//! match on [`Error::is_not_found`].
//!
//! ## Retries
//!
//! Transient I/O failures are retried at the facade by [`RetryStorage`],
//! up to a backend-specified budget with linear backoff. Not-found is
//! never retried.
//!
//! ## Implementations
//!
//! - [`MemoryStorage`]: process-local map, used by tests and the
//!   in-memory consensus mode
//! - [`FileStorage`]: base directory + `tokio::fs`; at-rest encryption is
//!   layered on by the crypto crate's wrapper
//!
//! The S3 and vault backends live in their own crates and implement the
//! same traits.

use crate::error::{Error, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

// ============================================================================
// Keys
// ============================================================================

/// Storage key for a block blob.
pub fn block_key(network: &str, dbid: &str, block: u64) -> String {
    format!("ledger/{}/{}/block/{}", network, dbid, block)
}

/// Storage key for an index segment or index pointer file.
pub fn index_key(network: &str, dbid: &str, name: &str) -> String {
    format!("ledger/{}/{}/index/{}", network, dbid, name)
}

// ============================================================================
// Traits
// ============================================================================

/// Read-only storage operations
#[async_trait]
pub trait StorageRead: Debug + Send + Sync {
    /// Read the blob at `key`.
    ///
    /// Returns `Error::StorageNotFound` when the key does not exist.
    async fn read(&self, key: &str) -> Result<Vec<u8>>;

    /// Check whether `key` exists.
    async fn exists(&self, key: &str) -> Result<bool>;
}

/// Mutating storage operations
#[async_trait]
pub trait StorageWrite: Debug + Send + Sync {
    /// Write `bytes` at `key`, replacing any existing blob.
    async fn write(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Move the blob at `from` to `to`, replacing any existing blob at `to`.
    ///
    /// Returns `Error::StorageNotFound` when `from` does not exist.
    async fn rename(&self, from: &str, to: &str) -> Result<()>;

    /// Delete the blob at `key`.
    ///
    /// Idempotent: deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Full storage capability marker
pub trait Storage: StorageRead + StorageWrite {
    /// Release backend resources. Idempotent; further calls are no-ops.
    fn close(&self) {}
}

// ============================================================================
// MemoryStorage
// ============================================================================

/// Process-local in-memory storage
///
/// Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    data: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

#[async_trait]
impl StorageRead for MemoryStorage {
    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        self.data
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| Error::not_found(key))
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.data.read().contains_key(key))
    }
}

#[async_trait]
impl StorageWrite for MemoryStorage {
    async fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.data.write().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let mut data = self.data.write();
        match data.remove(from) {
            Some(bytes) => {
                data.insert(to.to_string(), bytes);
                Ok(())
            }
            None => Err(Error::not_found(from)),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.data.write().remove(key);
        Ok(())
    }
}

impl Storage for MemoryStorage {}

// ============================================================================
// FileStorage
// ============================================================================

/// File-based storage under a base directory
///
/// Keys resolve to relative paths below the base; absolute paths and `..`
/// components are rejected.
#[derive(Debug, Clone)]
pub struct FileStorage {
    base_path: std::path::PathBuf,
}

impl FileStorage {
    pub fn new(base_path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &std::path::Path {
        &self.base_path
    }

    fn resolve(&self, key: &str) -> Result<std::path::PathBuf> {
        use std::path::Component;
        let p = std::path::Path::new(key);
        if p.is_absolute()
            || p.components()
                .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
        {
            return Err(Error::storage_io(format!(
                "invalid storage key '{}': must be a relative path without '..'",
                key
            )));
        }
        Ok(self.base_path.join(p))
    }
}

#[async_trait]
impl StorageRead for FileStorage {
    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.resolve(key)?;
        tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::not_found(key)
            } else {
                Error::storage_io(format!("failed to read {}: {}", path.display(), e))
            }
        })
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let path = self.resolve(key)?;
        match tokio::fs::metadata(&path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::storage_io(format!(
                "failed to stat {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

#[async_trait]
impl StorageWrite for FileStorage {
    async fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::storage_io(format!(
                    "failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| Error::storage_io(format!("failed to write {}: {}", path.display(), e)))
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let from_path = self.resolve(from)?;
        let to_path = self.resolve(to)?;
        if let Some(parent) = to_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::storage_io(format!(
                    "failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        tokio::fs::rename(&from_path, &to_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::not_found(from)
            } else {
                Error::storage_io(format!(
                    "failed to rename {} -> {}: {}",
                    from_path.display(),
                    to_path.display(),
                    e
                ))
            }
        })
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::storage_io(format!(
                "failed to delete {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

impl Storage for FileStorage {}

// ============================================================================
// RetryStorage
// ============================================================================

/// Facade wrapper retrying transient I/O failures.
///
/// Retries only `Error::StorageIo`; not-found and every other error kind
/// surface immediately. Backoff is linear: `base_delay * attempt`.
#[derive(Debug, Clone)]
pub struct RetryStorage<S> {
    inner: S,
    /// Retries after the initial attempt.
    budget: u32,
    base_delay: std::time::Duration,
}

impl<S> RetryStorage<S> {
    pub fn new(inner: S, budget: u32, base_delay: std::time::Duration) -> Self {
        Self {
            inner,
            budget,
            base_delay,
        }
    }

    /// Default budget: 2 retries, 50 ms base delay.
    pub fn with_defaults(inner: S) -> Self {
        Self::new(inner, 2, std::time::Duration::from_millis(50))
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn run<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut attempt = 0u32;
        loop {
            match op().await {
                Err(Error::StorageIo(msg)) if attempt < self.budget => {
                    attempt += 1;
                    tracing::warn!(attempt, budget = self.budget, error = %msg, "retrying storage operation");
                    tokio::time::sleep(self.base_delay * attempt).await;
                }
                other => return other,
            }
        }
    }
}

#[async_trait]
impl<S: Storage> StorageRead for RetryStorage<S> {
    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        self.run(|| self.inner.read(key)).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.run(|| self.inner.exists(key)).await
    }
}

#[async_trait]
impl<S: Storage> StorageWrite for RetryStorage<S> {
    async fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.run(|| self.inner.write(key, bytes)).await
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        self.run(|| self.inner.rename(from, to)).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.run(|| self.inner.delete(key)).await
    }
}

impl<S: Storage> Storage for RetryStorage<S> {
    fn close(&self) {
        self.inner.close()
    }
}

// ============================================================================
// Tests
// ============================================================================
