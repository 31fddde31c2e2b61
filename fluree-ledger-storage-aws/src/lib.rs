//! S3-compatible object-store backend
//!
//! Implements the storage facade traits against Amazon S3 (or any
//! S3-compatible endpoint such as MinIO). Keys map directly onto object
//! keys below an optional prefix. S3 has no native rename, so `rename`
//! is copy-then-delete; both halves are idempotent.
//!
//! ## Timeouts and retries
//!
//! `timeout_ms` is the total operation timeout, including SDK retry
//! time. `max_retries` counts retries *after* the initial attempt. On
//! expiry the operation surfaces as a storage error and the transaction
//! is aborted.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use aws_smithy_types::retry::RetryConfig;
use aws_smithy_types::timeout::TimeoutConfig;
use fluree_ledger_core::{Error, Result, Storage, StorageRead, StorageWrite};
use std::fmt::Debug;
use std::time::Duration;

/// S3 backend configuration.
#[derive(Debug, Clone, Default)]
pub struct S3Config {
    /// Bucket name (`fdb-storage-s3-bucket`)
    pub bucket: String,
    /// Optional key prefix inside the bucket
    pub prefix: Option<String>,
    /// Optional endpoint override (MinIO, LocalStack)
    pub endpoint: Option<String>,
    /// Total operation timeout in milliseconds
    pub timeout_ms: Option<u64>,
    /// Retries after the initial attempt
    pub max_retries: Option<u32>,
}

/// S3-backed storage.
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
    prefix: Option<String>,
}

impl Debug for S3Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Storage")
            .field("bucket", &self.bucket)
            .field("prefix", &self.prefix)
            .finish()
    }
}

impl S3Storage {
    /// Build a backend from the shared AWS SDK config plus S3 options.
    pub async fn new(sdk_config: &aws_config::SdkConfig, config: S3Config) -> Result<Self> {
        if sdk_config.region().is_none() {
            return Err(Error::invalid_configuration("S3 storage requires an AWS region"));
        }

        let mut builder = aws_sdk_s3::config::Builder::from(sdk_config);

        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        if let Some(retries) = config.max_retries {
            builder = builder.retry_config(
                RetryConfig::standard().with_max_attempts(retries.saturating_add(1).max(1)),
            );
        }
        if let Some(timeout_ms) = config.timeout_ms {
            builder = builder.timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(Duration::from_millis(timeout_ms))
                    .build(),
            );
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket,
            prefix: config.prefix,
        })
    }

    /// Build from a pre-constructed client (tests).
    pub fn from_client(client: Client, bucket: String, prefix: Option<String>) -> Self {
        Self {
            client,
            bucket,
            prefix,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn object_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}/{}", prefix.trim_end_matches('/'), key),
            None => key.to_string(),
        }
    }
}

fn map_sdk_error<E, R>(err: aws_sdk_s3::error::SdkError<E, R>, key: &str) -> Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    Error::storage_io(format!("s3 operation on {} failed: {}", key, err))
}

#[async_trait]
impl StorageRead for S3Storage {
    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        let object_key = self.object_key(key);
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .send()
            .await
            .map_err(|e| {
                if matches!(&e, aws_sdk_s3::error::SdkError::ServiceError(se)
                    if se.err().is_no_such_key())
                {
                    Error::not_found(key)
                } else {
                    map_sdk_error(e, key)
                }
            })?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| Error::storage_io(format!("failed to read s3 body for {}: {}", key, e)))?;
        Ok(bytes.into_bytes().to_vec())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let object_key = self.object_key(key);
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(aws_sdk_s3::error::SdkError::ServiceError(se)) if se.err().is_not_found() => {
                Ok(false)
            }
            Err(e) => Err(map_sdk_error(e, key)),
        }
    }
}

#[async_trait]
impl StorageWrite for S3Storage {
    async fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let object_key = self.object_key(key);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .body(ByteStream::from(bytes.to_vec()))
            .send()
            .await
            .map_err(|e| map_sdk_error(e, key))?;
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        if !self.exists(from).await? {
            return Err(Error::not_found(from));
        }
        let source = format!("{}/{}", self.bucket, self.object_key(from));
        self.client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(&source)
            .key(self.object_key(to))
            .send()
            .await
            .map_err(|e| map_sdk_error(e, from))?;
        self.delete(from).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let object_key = self.object_key(key);
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, key))?;
        Ok(())
    }
}

impl Storage for S3Storage {}
