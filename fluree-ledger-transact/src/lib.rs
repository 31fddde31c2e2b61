//! # Fluree Ledger Transact
//!
//! The transaction pipeline end-to-end:
//!
//! - [`command`]: signed command parsing and signature recovery
//! - [`generate`]: statement-graph materialization into flakes
//! - [`stage`]: the transactor pipeline (backpressure, validation, specs)
//! - [`block`]: hash-chained block sealing
//! - [`ledger`]: per-ledger state, atomic commit, persistence
//!
//! The consensus leader serializes transactions; this crate assumes one
//! writer per ledger and gives readers immutable snapshots.

pub mod block;
pub mod command;
pub mod error;
pub mod generate;
pub mod ledger;
pub mod stage;

pub use block::{seal_block, Block};
pub use command::{verify, CommandType, SignedCommand, VerifiedCommand};
pub use error::{Result, TransactError};
pub use generate::{coerce_literal, FlakeGenerator};
pub use ledger::{read_block, LedgerSnapshot, LedgerState, LedgerStats, TxReceipt};
pub use stage::{stage, NoopSpecEvaluator, SpecEvaluator, StageOptions, StagedTx};

// Re-exported so embedders configure backpressure without a direct
// novelty dependency.
pub use fluree_ledger_novelty::IndexConfig;
