//! # Fluree Ledger Schema
//!
//! The self-describing schema layer:
//!
//! - [`bootstrap`]: deterministic genesis of a ledger - the fixed program
//!   of collection, predicate and tag definitions with stable numeric ids,
//!   and the construction of block 1 from a signed new-database command
//! - [`validate`]: validation of schema-mutating transactions against the
//!   type-compatibility lattice and structural rules

pub mod bootstrap;
pub mod error;
pub mod validate;

pub use bootstrap::{
    bootstrap, bootstrap_schema, collection_id, master_auth_sid, predicate_id, tag_sid,
    CollectionDef, Genesis, PredicateDef, TagDef, COLLECTIONS, PREDICATES, TAGS,
};
pub use error::{Result, SchemaError};
pub use validate::{
    allowed_type_change, validate, SchemaViolation, ValidationReport, ViolationKind,
};
