//! Error types for fluree-ledger-transact

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TransactError>;

#[derive(Error, Debug)]
pub enum TransactError {
    /// Command bytes or signature malformed, or recovery failed
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// Command JSON malformed
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// A statement referenced an unknown predicate name
    #[error("unknown predicate: {0}")]
    UnknownPredicate(String),

    /// A tempid referenced an unknown collection
    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    /// A literal could not be coerced to the predicate's declared type
    #[error("cannot coerce {value} to {ptype}: {reason}")]
    Coercion {
        value: String,
        ptype: String,
        reason: String,
    },

    /// Novelty reached the hard threshold; transient, retry after flush
    #[error("ledger overloaded: novelty at maximum size, reindex in progress")]
    Overloaded,

    /// Schema validation failed (collected violations)
    #[error("schema validation failed: {0}")]
    Validation(String),

    /// A user spec function rejected the transaction
    #[error("spec failed: {0}")]
    SpecFailed(String),

    /// Storage or consensus failure below the pipeline
    #[error(transparent)]
    Core(#[from] fluree_ledger_core::Error),

    #[error(transparent)]
    Novelty(#[from] fluree_ledger_novelty::NoveltyError),

    #[error(transparent)]
    Bootstrap(#[from] fluree_ledger_schema::SchemaError),
}

impl TransactError {
    pub fn invalid_command(msg: impl Into<String>) -> Self {
        TransactError::InvalidCommand(msg.into())
    }

    /// Map onto the user-visible error surface.
    pub fn as_core(&self) -> fluree_ledger_core::Error {
        use fluree_ledger_core::Error;
        match self {
            TransactError::Core(e) => Error::unexpected(e.to_string()),
            TransactError::Validation(msg) => Error::invalid_tx(msg.clone()),
            TransactError::Overloaded => Error::invalid_tx(self.to_string()),
            TransactError::Novelty(e) => Error::unexpected(e.to_string()),
            TransactError::Bootstrap(e) => Error::unexpected(e.to_string()),
            other => Error::invalid_tx(other.to_string()),
        }
    }
}
