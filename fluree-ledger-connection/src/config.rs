//! Configuration environment
//!
//! A typed view over the `fdb-*` key-value environment. Parsing failures
//! are fatal at startup: the embedding binary reports the
//! `invalid-configuration` error and exits non-zero.
//!
//! Size strings parse as `([0-9.]+)(b|k|kb|m|mb|g|gb)?` with default unit
//! `b` (decimal multipliers). Time strings parse as
//! `([0-9.]+)([smhdy]{0,2})` case-insensitive with default unit `ms`.

use fluree_ledger_core::{Error, Result};
use fluree_ledger_crypto::EncryptionKey;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;

static SIZE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9.]+)\s*([a-zA-Z]{0,2})$").expect("static regex"));

/// Parse a size string like `100kb`, `1mb`, `512` (bytes) into bytes.
pub fn parse_size(input: &str) -> Result<u64> {
    let caps = SIZE_RE
        .captures(input.trim())
        .ok_or_else(|| Error::invalid_configuration(format!("invalid size string: {:?}", input)))?;
    let value: f64 = caps[1]
        .parse()
        .map_err(|_| Error::invalid_configuration(format!("invalid size number: {:?}", input)))?;
    let multiplier: u64 = match caps[2].to_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" => 1_000,
        "m" | "mb" => 1_000_000,
        "g" | "gb" => 1_000_000_000,
        other => {
            return Err(Error::invalid_configuration(format!(
                "unknown size unit {:?} in {:?}",
                other, input
            )))
        }
    };
    Ok((value * multiplier as f64) as u64)
}

/// Parse a time string like `2000`, `2s`, `5m`, `1h` into a duration.
/// The default unit is milliseconds.
pub fn parse_time(input: &str) -> Result<Duration> {
    let caps = SIZE_RE
        .captures(input.trim())
        .ok_or_else(|| Error::invalid_configuration(format!("invalid time string: {:?}", input)))?;
    let value: f64 = caps[1]
        .parse()
        .map_err(|_| Error::invalid_configuration(format!("invalid time number: {:?}", input)))?;
    let millis: f64 = match caps[2].to_lowercase().as_str() {
        "" | "ms" => value,
        "s" => value * 1_000.0,
        "m" => value * 60_000.0,
        "h" => value * 3_600_000.0,
        "d" => value * 86_400_000.0,
        "y" => value * 31_536_000_000.0,
        other => {
            return Err(Error::invalid_configuration(format!(
                "unknown time unit {:?} in {:?}",
                other, input
            )))
        }
    };
    Ok(Duration::from_millis(millis as u64))
}

/// Which subsystems start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Dev,
    Query,
    Ledger,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsensusType {
    Raft,
    InMemory,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageType {
    File,
    Memory,
    S3,
    Stash,
}

/// One `id@host:port` entry from `fdb-group-servers`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerAddress {
    pub id: String,
    pub host: String,
    pub port: u16,
}

impl std::str::FromStr for ServerAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (id, rest) = s
            .split_once('@')
            .ok_or_else(|| Error::invalid_configuration(format!("server must be id@host:port: {:?}", s)))?;
        let (host, port) = rest
            .split_once(':')
            .ok_or_else(|| Error::invalid_configuration(format!("server must be id@host:port: {:?}", s)))?;
        let port: u16 = port
            .parse()
            .map_err(|_| Error::invalid_configuration(format!("invalid port in {:?}", s)))?;
        if id.is_empty() || host.is_empty() {
            return Err(Error::invalid_configuration(format!(
                "server must be id@host:port: {:?}",
                s
            )));
        }
        Ok(ServerAddress {
            id: id.to_string(),
            host: host.to_string(),
            port,
        })
    }
}

/// Typed configuration, parsed from the key-value environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub mode: Mode,
    pub consensus_type: ConsensusType,
    pub storage_type: StorageType,
    pub storage_file_directory: Option<String>,
    pub storage_s3_bucket: Option<String>,
    /// Index cache budget in bytes (`fdb-memory-cache`)
    pub memory_cache_bytes: u64,
    /// Novelty soft threshold (`fdb-memory-reindex`)
    pub memory_reindex_bytes: u64,
    /// Novelty hard threshold (`fdb-memory-reindex-max`)
    pub memory_reindex_max_bytes: u64,
    pub group_servers: Vec<ServerAddress>,
    pub group_this_server: Option<String>,
    /// Consensus group timeout (`fdb-group-timeout`, default 2000 ms)
    pub group_timeout: Duration,
    /// At-rest encryption passphrase (`fdb-encryption-secret`)
    encryption_secret: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::Dev,
            consensus_type: ConsensusType::InMemory,
            storage_type: StorageType::Memory,
            storage_file_directory: None,
            storage_s3_bucket: None,
            memory_cache_bytes: 200_000_000,
            memory_reindex_bytes: 100_000,
            memory_reindex_max_bytes: 1_000_000,
            group_servers: Vec::new(),
            group_this_server: None,
            group_timeout: Duration::from_millis(2000),
            encryption_secret: None,
        }
    }
}

impl Config {
    /// Parse the recognized `fdb-*` keys from an environment map.
    ///
    /// Every error here is startup-fatal.
    pub fn from_env(env: &HashMap<String, String>) -> Result<Self> {
        let mut config = Config::default();

        if let Some(mode) = env.get("fdb-mode") {
            config.mode = match mode.as_str() {
                "dev" => Mode::Dev,
                "query" => Mode::Query,
                "ledger" => Mode::Ledger,
                other => {
                    return Err(Error::invalid_configuration(format!(
                        "fdb-mode must be dev, query or ledger; got {:?}",
                        other
                    )))
                }
            };
        }

        if let Some(consensus) = env.get("fdb-consensus-type") {
            config.consensus_type = match consensus.as_str() {
                "raft" => ConsensusType::Raft,
                "in-memory" => ConsensusType::InMemory,
                other => {
                    return Err(Error::invalid_configuration(format!(
                        "fdb-consensus-type must be raft or in-memory; got {:?}",
                        other
                    )))
                }
            };
        }

        if let Some(storage) = env.get("fdb-storage-type") {
            config.storage_type = match storage.as_str() {
                "file" => StorageType::File,
                "memory" => StorageType::Memory,
                "s3" => StorageType::S3,
                "stash" => StorageType::Stash,
                other => {
                    return Err(Error::invalid_configuration(format!(
                        "fdb-storage-type must be file, memory, s3 or stash; got {:?}",
                        other
                    )))
                }
            };
        }

        config.storage_file_directory = env.get("fdb-storage-file-directory").cloned();
        config.storage_s3_bucket = env.get("fdb-storage-s3-bucket").cloned();

        if let Some(cache) = env.get("fdb-memory-cache") {
            config.memory_cache_bytes = parse_size(cache)?;
        }
        if let Some(reindex) = env.get("fdb-memory-reindex") {
            config.memory_reindex_bytes = parse_size(reindex)?;
        }
        if let Some(reindex_max) = env.get("fdb-memory-reindex-max") {
            config.memory_reindex_max_bytes = parse_size(reindex_max)?;
        }

        if let Some(servers) = env.get("fdb-group-servers") {
            config.group_servers = servers
                .split(',')
                .map(|s| s.trim().parse())
                .collect::<Result<Vec<_>>>()?;
        }
        config.group_this_server = env.get("fdb-group-this-server").cloned();

        if let Some(timeout) = env.get("fdb-group-timeout") {
            config.group_timeout = parse_time(timeout)?;
        }

        config.encryption_secret = env.get("fdb-encryption-secret").cloned();

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.storage_type == StorageType::File && self.storage_file_directory.is_none() {
            return Err(Error::invalid_configuration(
                "fdb-storage-type=file requires fdb-storage-file-directory",
            ));
        }
        if self.storage_type == StorageType::S3 && self.storage_s3_bucket.is_none() {
            return Err(Error::invalid_configuration(
                "fdb-storage-type=s3 requires fdb-storage-s3-bucket",
            ));
        }
        if self.memory_reindex_bytes > self.memory_reindex_max_bytes {
            return Err(Error::invalid_configuration(
                "fdb-memory-reindex must not exceed fdb-memory-reindex-max",
            ));
        }
        if let Some(this) = &self.group_this_server {
            if !self.group_servers.iter().any(|s| &s.id == this) {
                return Err(Error::invalid_configuration(format!(
                    "fdb-group-this-server {:?} does not appear in fdb-group-servers",
                    this
                )));
            }
        }
        if self.consensus_type == ConsensusType::Raft && self.group_servers.is_empty() {
            return Err(Error::invalid_configuration(
                "fdb-consensus-type=raft requires fdb-group-servers",
            ));
        }
        Ok(())
    }

    /// Derive the at-rest encryption key from the configured passphrase.
    pub fn encryption_key(&self) -> Option<EncryptionKey> {
        self.encryption_secret
            .as_deref()
            .map(EncryptionKey::from_passphrase)
    }

    /// Reindex thresholds as a novelty config.
    pub fn index_config(&self) -> fluree_ledger_transact::IndexConfig {
        fluree_ledger_transact::IndexConfig {
            reindex_min_bytes: self.memory_reindex_bytes,
            reindex_max_bytes: self.memory_reindex_max_bytes,
        }
    }
}
