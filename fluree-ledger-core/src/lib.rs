//! # Fluree Ledger Core
//!
//! Core library for the transactional, immutable, time-travel graph
//! ledger. This crate provides:
//!
//! - Core types: [`SubjectId`], [`FlakeValue`], [`Flake`]
//! - Index comparators for all 5 orderings (spot, psot, post, opst, tspo)
//! - The immutable [`Schema`] cache (collections, predicates, tags)
//! - Storage facade traits plus memory and file backends
//!
//! ## Design principles
//!
//! 1. **Append-only**: flakes are never mutated; retractions are new flakes
//! 2. **Strict total ordering**: no nil-as-wildcard; use explicit
//!    first/last bounds
//! 3. **Async at the I/O seam only**: pure in-memory operations are
//!    synchronous

pub mod comparator;
pub mod error;
pub mod flake;
pub mod ids;
pub mod schema;
pub mod storage;
pub mod subject_id;
pub mod value;

pub use comparator::{cmp_opst, cmp_post, cmp_psot, cmp_spot, cmp_tspo, FlakeOrd, IndexOrder};
pub use error::{Error, Result};
pub use flake::{size_flakes_estimate, Flake};
pub use schema::{
    valid_collection_name, valid_predicate_name, Collection, Predicate, PredicateType, Schema,
};
pub use storage::{
    block_key, index_key, FileStorage, MemoryStorage, RetryStorage, Storage, StorageRead,
    StorageWrite,
};
pub use subject_id::SubjectId;
pub use value::FlakeValue;
