//! SHA3-256 hashing for blocks and transactions
//!
//! Block and transaction identity hashes use SHA3-256 over canonical JSON.
//! The canonical form of a flake set is the JSON array of tuple forms
//! `[s, p, o, t, op, m?]` in **spot** order, with `m` elided when absent -
//! see `Flake::canonical_tuple`. Two nodes serializing the same flake set
//! therefore produce byte-identical hash input.

use fluree_ledger_core::Flake;
use sha3::{Digest, Sha3_256};

/// SHA3-256 of raw bytes.
pub fn sha3_256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// SHA3-256 of raw bytes as a lowercase hex string.
pub fn sha3_256_hex(bytes: &[u8]) -> String {
    hex::encode(sha3_256(bytes))
}

/// Transaction id: SHA3-256 over the canonical command bytes.
pub fn tx_id(cmd: &str) -> String {
    sha3_256_hex(cmd.as_bytes())
}

/// Canonical JSON serialization of a flake sequence.
///
/// The caller supplies the flakes already sorted in spot order; this
/// function preserves the given order.
pub fn canonical_json(flakes: &[Flake]) -> String {
    let tuples: Vec<serde_json::Value> = flakes.iter().map(Flake::canonical_tuple).collect();
    serde_json::Value::Array(tuples).to_string()
}

/// Hash a spot-sorted flake sequence: SHA3-256 over its canonical JSON.
pub fn hash_flakes(flakes: &[Flake]) -> String {
    sha3_256_hex(canonical_json(flakes).as_bytes())
}
