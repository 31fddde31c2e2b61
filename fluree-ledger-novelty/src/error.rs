//! Error types for fluree-ledger-novelty

use thiserror::Error;

pub type Result<T> = std::result::Result<T, NoveltyError>;

#[derive(Error, Debug)]
pub enum NoveltyError {
    /// Too many flakes for the arena's id space; a reindex must run.
    #[error("novelty overflow: {0}")]
    Overflow(String),

    /// Novelty has reached the hard size threshold; writes are rejected
    /// until the indexer flushes.
    #[error("novelty at maximum size ({size} bytes >= {max} bytes); reindex required")]
    AtMax { size: u64, max: u64 },
}

impl NoveltyError {
    pub fn overflow(msg: impl Into<String>) -> Self {
        NoveltyError::Overflow(msg.into())
    }
}

impl From<NoveltyError> for fluree_ledger_core::Error {
    fn from(err: NoveltyError) -> Self {
        match err {
            NoveltyError::AtMax { .. } => fluree_ledger_core::Error::invalid_tx(err.to_string()),
            NoveltyError::Overflow(_) => fluree_ledger_core::Error::unexpected(err.to_string()),
        }
    }
}
