//! # Fluree Ledger Crypto
//!
//! Hashing, signature recovery and at-rest encryption:
//!
//! - SHA3-256 block/tx hashing over canonical JSON ([`hash`])
//! - secp256k1 ECDSA recovery of the authority account from a signed
//!   command ([`recover`])
//! - AES-256-GCM [`EncryptedStorage`] wrapper for file backends

pub mod encrypted;
pub mod error;
pub mod hash;
pub mod key;
pub mod recover;

pub use encrypted::EncryptedStorage;
pub use error::{CryptoError, Result};
pub use hash::{canonical_json, hash_flakes, sha3_256, sha3_256_hex, tx_id};
pub use key::{EncryptionKey, KEY_LEN};
pub use recover::{account_id, recover_auth_id, recover_public_key, sign_command};

// Re-exported for callers that generate or load signing keys.
pub use k256::ecdsa::{SigningKey, VerifyingKey};
