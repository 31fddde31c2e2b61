//! Ledger registry
//!
//! The process-wide mapping `network/dbid -> ledger handle`, created at
//! startup and torn down at shutdown. Each handle serializes writes
//! through an async mutex (the consensus leader is the single writer);
//! readers clone cheap snapshots without taking the write lock.

use fluree_ledger_transact::LedgerState;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared handle to one ledger.
pub type LedgerHandle = Arc<Mutex<LedgerState>>;

/// Process-wide ledger registry.
#[derive(Debug, Default)]
pub struct LedgerRegistry {
    ledgers: RwLock<HashMap<String, LedgerHandle>>,
}

impl LedgerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(network: &str, dbid: &str) -> String {
        format!("{}/{}", network, dbid)
    }

    /// Register a ledger, returning its handle. Replaces any previous
    /// registration for the same `network/dbid`.
    pub fn register(&self, ledger: LedgerState) -> LedgerHandle {
        let key = Self::key(&ledger.network, &ledger.dbid);
        let handle = Arc::new(Mutex::new(ledger));
        self.ledgers.write().insert(key.clone(), Arc::clone(&handle));
        tracing::info!(ledger = %key, "ledger registered");
        handle
    }

    /// Look up a ledger handle.
    pub fn get(&self, network: &str, dbid: &str) -> Option<LedgerHandle> {
        self.ledgers.read().get(&Self::key(network, dbid)).cloned()
    }

    /// Remove one ledger from the registry.
    pub fn remove(&self, network: &str, dbid: &str) -> Option<LedgerHandle> {
        self.ledgers.write().remove(&Self::key(network, dbid))
    }

    /// Registered ledger keys.
    pub fn list(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.ledgers.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Drop every handle. Ledgers are never destroyed, only unregistered;
    /// their persisted blocks remain in storage.
    pub fn shutdown(&self) {
        let count = {
            let mut ledgers = self.ledgers.write();
            let count = ledgers.len();
            ledgers.clear();
            count
        };
        tracing::info!(count, "ledger registry shut down");
    }
}
