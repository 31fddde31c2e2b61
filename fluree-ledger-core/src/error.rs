//! Error types for fluree-ledger-core
//!
//! The variants map one-to-one onto the ledger's user-visible error kinds.
//! Validation-style errors (`invalid-*`) surface as HTTP 400; everything
//! else is a 500. Variant helpers keep call sites terse.

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    /// Bad configuration value; fatal at startup
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Illegal collection definition or mutation
    #[error("Invalid collection: {0}")]
    InvalidCollection(String),

    /// Illegal predicate definition or mutation
    #[error("Invalid predicate: {0}")]
    InvalidPredicate(String),

    /// Transaction rejected
    #[error("Invalid transaction: {0}")]
    InvalidTx(String),

    /// Storage I/O failure (after the facade's retry budget)
    #[error("Storage error: {0}")]
    StorageIo(String),

    /// Key not present in storage
    #[error("Not found: {0}")]
    StorageNotFound(String),

    /// Consensus group operation timed out
    #[error("Consensus timeout: {0}")]
    ConsensusTimeout(String),

    /// JSON encode/decode failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Anything that should not happen; fatal for the current operation
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Error::InvalidConfiguration(msg.into())
    }

    pub fn invalid_collection(msg: impl Into<String>) -> Self {
        Error::InvalidCollection(msg.into())
    }

    pub fn invalid_predicate(msg: impl Into<String>) -> Self {
        Error::InvalidPredicate(msg.into())
    }

    pub fn invalid_tx(msg: impl Into<String>) -> Self {
        Error::InvalidTx(msg.into())
    }

    pub fn storage_io(msg: impl Into<String>) -> Self {
        Error::StorageIo(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::StorageNotFound(msg.into())
    }

    pub fn consensus_timeout(msg: impl Into<String>) -> Self {
        Error::ConsensusTimeout(msg.into())
    }

    pub fn unexpected(msg: impl Into<String>) -> Self {
        Error::Unexpected(msg.into())
    }

    /// Stable kind identifier for the user-visible error surface.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidConfiguration(_) => "invalid-configuration",
            Error::InvalidCollection(_) => "invalid-collection",
            Error::InvalidPredicate(_) => "invalid-predicate",
            Error::InvalidTx(_) => "invalid-tx",
            Error::StorageIo(_) => "storage-io",
            Error::StorageNotFound(_) => "storage-not-found",
            Error::ConsensusTimeout(_) => "consensus-timeout",
            Error::Json(_) => "unexpected-error",
            Error::Unexpected(_) => "unexpected-error",
        }
    }

    /// HTTP status for the user-visible error surface.
    pub fn status(&self) -> u16 {
        match self {
            Error::InvalidConfiguration(_)
            | Error::InvalidCollection(_)
            | Error::InvalidPredicate(_)
            | Error::InvalidTx(_) => 400,
            _ => 500,
        }
    }

    /// Whether this is the explicit not-found signal.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::StorageNotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_status() {
        assert_eq!(Error::invalid_tx("x").kind(), "invalid-tx");
        assert_eq!(Error::invalid_tx("x").status(), 400);
        assert_eq!(Error::storage_io("x").status(), 500);
        assert_eq!(Error::not_found("k").kind(), "storage-not-found");
        assert!(Error::not_found("k").is_not_found());
        assert!(!Error::storage_io("k").is_not_found());
    }
}
