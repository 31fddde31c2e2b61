//! Consensus seam
//!
//! The replication layer is an external collaborator: it elects a leader,
//! appends serialized block references to the group log and snapshots.
//! This module defines the seam the transactor talks to, plus the
//! in-memory implementation used by single-node and dev deployments.
//!
//! Every append carries the configured group timeout (default 2000 ms);
//! on expiry the operation surfaces as a `consensus-timeout` error and
//! the transaction is aborted.

use fluree_ledger_core::{Error, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;

/// A replicated reference to a sealed block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockRef {
    pub network: String,
    pub dbid: String,
    pub block: u64,
    pub hash: String,
}

/// The consensus log the transactor appends sealed blocks to.
#[async_trait]
pub trait ConsensusLog: Send + Sync {
    /// Append a block reference; resolves with the log index once the
    /// group has accepted the entry.
    async fn append(&self, entry: BlockRef) -> Result<u64>;
}

/// Single-node in-memory consensus log.
#[derive(Debug, Default)]
pub struct InMemoryConsensus {
    log: Mutex<Vec<BlockRef>>,
    timeout: Option<Duration>,
}

impl InMemoryConsensus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            log: Mutex::new(Vec::new()),
            timeout: Some(timeout),
        }
    }

    /// Entries accepted so far.
    pub fn entries(&self) -> Vec<BlockRef> {
        self.log.lock().clone()
    }
}

#[async_trait]
impl ConsensusLog for InMemoryConsensus {
    async fn append(&self, entry: BlockRef) -> Result<u64> {
        let append = async {
            let mut log = self.log.lock();
            log.push(entry);
            Ok(log.len() as u64 - 1)
        };
        match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, append)
                .await
                .map_err(|_| Error::consensus_timeout("group append timed out"))?,
            None => append.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_ref(n: u64) -> BlockRef {
        BlockRef {
            network: "net".to_string(),
            dbid: "db".to_string(),
            block: n,
            hash: format!("hash-{}", n),
        }
    }

    #[tokio::test]
    async fn test_append_returns_index() {
        let consensus = InMemoryConsensus::new();
        assert_eq!(consensus.append(block_ref(1)).await.unwrap(), 0);
        assert_eq!(consensus.append(block_ref(2)).await.unwrap(), 1);
        assert_eq!(consensus.entries().len(), 2);
    }

    #[tokio::test]
    async fn test_append_within_timeout() {
        let consensus = InMemoryConsensus::with_timeout(Duration::from_millis(2000));
        assert!(consensus.append(block_ref(1)).await.is_ok());
    }
}
