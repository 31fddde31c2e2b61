//! Error types for fluree-ledger-schema

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SchemaError>;

#[derive(Error, Debug)]
pub enum SchemaError {
    /// The bootstrap program itself is defective (unresolved name or tag).
    /// Always fatal: this is a code bug, not a data problem.
    #[error("bootstrap error: {0}")]
    Bootstrap(String),

    /// The new-database command's signature did not yield a master
    /// authority.
    #[error("bootstrap error: missing master authority: {0}")]
    MissingMasterAuthority(String),
}

impl SchemaError {
    pub fn bootstrap(msg: impl Into<String>) -> Self {
        SchemaError::Bootstrap(msg.into())
    }
}

impl From<SchemaError> for fluree_ledger_core::Error {
    fn from(err: SchemaError) -> Self {
        fluree_ledger_core::Error::unexpected(err.to_string())
    }
}
