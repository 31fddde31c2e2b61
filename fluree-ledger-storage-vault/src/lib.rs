//! Vault-style HTTP KV backend
//!
//! Talks to a vault-style secrets service over HTTP: blobs live at
//! `{base}/v1/{mount}/{key}`, authenticated with a bearer token.
//!
//! ## Error envelope
//!
//! Failures are typed, never sniffed: any non-success response must carry
//! a JSON body `{"code": <int>, "message": <string>}` which is
//! deserialized and mapped onto the storage error kinds (404 maps to the
//! explicit not-found signal). A body that fails to parse is reported as
//! a malformed envelope with the HTTP status - the body content is never
//! pattern-matched.
//!
//! The service exposes no rename, so `rename` is read, write, delete.

use async_trait::async_trait;
use fluree_ledger_core::{Error, Result, Storage, StorageRead, StorageWrite};
use serde::Deserialize;

/// Typed error envelope every vault failure response carries.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    code: i64,
    message: String,
}

/// Vault backend configuration.
#[derive(Clone, Debug)]
pub struct VaultConfig {
    /// Service base URL, e.g. `https://vault.internal:8200`
    pub base_url: String,
    /// KV mount below `/v1/`
    pub mount: String,
    /// Bearer token
    pub token: Option<String>,
    /// Per-request timeout
    pub timeout: std::time::Duration,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8200".to_string(),
            mount: "fluree".to_string(),
            token: None,
            timeout: std::time::Duration::from_secs(10),
        }
    }
}

/// Vault-style storage backend.
#[derive(Clone, Debug)]
pub struct VaultStorage {
    client: reqwest::Client,
    config: VaultConfig,
}

impl VaultStorage {
    pub fn new(config: VaultConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::invalid_configuration(format!("vault client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn url(&self, key: &str) -> String {
        format!(
            "{}/v1/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.mount,
            key
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Map a failure response through the typed error envelope.
    async fn envelope_error(&self, key: &str, response: reqwest::Response) -> Error {
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Error::not_found(key);
        }
        match response.json::<ErrorEnvelope>().await {
            Ok(envelope) => Error::storage_io(format!(
                "vault error {} on {}: {}",
                envelope.code, key, envelope.message
            )),
            Err(_) => Error::storage_io(format!(
                "vault returned {} on {} with a malformed error envelope",
                status, key
            )),
        }
    }
}

#[async_trait]
impl StorageRead for VaultStorage {
    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        let response = self
            .authorize(self.client.get(self.url(key)))
            .send()
            .await
            .map_err(|e| Error::storage_io(format!("vault read {}: {}", key, e)))?;
        if !response.status().is_success() {
            return Err(self.envelope_error(key, response).await);
        }
        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| Error::storage_io(format!("vault read body {}: {}", key, e)))
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let response = self
            .authorize(self.client.head(self.url(key)))
            .send()
            .await
            .map_err(|e| Error::storage_io(format!("vault head {}: {}", key, e)))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !response.status().is_success() {
            return Err(self.envelope_error(key, response).await);
        }
        Ok(true)
    }
}

#[async_trait]
impl StorageWrite for VaultStorage {
    async fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let response = self
            .authorize(self.client.put(self.url(key)))
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| Error::storage_io(format!("vault write {}: {}", key, e)))?;
        if !response.status().is_success() {
            return Err(self.envelope_error(key, response).await);
        }
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let bytes = self.read(from).await?;
        self.write(to, &bytes).await?;
        self.delete(from).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let response = self
            .authorize(self.client.delete(self.url(key)))
            .send()
            .await
            .map_err(|e| Error::storage_io(format!("vault delete {}: {}", key, e)))?;
        // Idempotent: deleting a missing key succeeds.
        if response.status() == reqwest::StatusCode::NOT_FOUND || response.status().is_success() {
            return Ok(());
        }
        Err(self.envelope_error(key, response).await)
    }
}

impl Storage for VaultStorage {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_layout() {
        let storage = VaultStorage::new(VaultConfig {
            base_url: "https://vault:8200/".to_string(),
            mount: "fluree".to_string(),
            token: Some("tok".to_string()),
            timeout: std::time::Duration::from_secs(1),
        })
        .unwrap();
        assert_eq!(
            storage.url("ledger/net/db/block/1"),
            "https://vault:8200/v1/fluree/ledger/net/db/block/1"
        );
    }

    #[test]
    fn test_error_envelope_shape() {
        let envelope: ErrorEnvelope =
            serde_json::from_str(r#"{"code":503,"message":"sealed"}"#).unwrap();
        assert_eq!(envelope.code, 503);
        assert_eq!(envelope.message, "sealed");
    }
}
