//! # Fluree Ledger Connection
//!
//! Node-level plumbing around the transaction core:
//!
//! - [`config`]: the `fdb-*` key-value environment, size/time-string
//!   grammars, startup-fatal validation
//! - [`consensus`]: the replication seam ([`ConsensusLog`]) and its
//!   in-memory single-node implementation
//! - [`registry`]: the process-wide `network/dbid -> ledger handle` map

pub mod config;
pub mod consensus;
pub mod registry;

pub use config::{parse_size, parse_time, Config, ConsensusType, Mode, ServerAddress, StorageType};
pub use consensus::{BlockRef, ConsensusLog, InMemoryConsensus};
pub use registry::{LedgerHandle, LedgerRegistry};
