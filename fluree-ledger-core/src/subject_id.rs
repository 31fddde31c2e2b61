//! Subject identifiers - 64-bit composite ids
//!
//! A subject id packs a collection id and a within-collection id into a
//! single signed 64-bit value:
//!
//! ```text
//! | collection id (high bits) | within-collection id (low 44 bits) |
//! ```
//!
//! Predicate ids share the same shape but always live in the `_predicate`
//! collection (collection id 0), so a predicate id is just its low 44 bits.
//!
//! ## Transaction-era subjects
//!
//! Negative raw values are transaction subjects: the subject of `_tx/*` and
//! `_block/*` metadata flakes is the transaction's own `t`. They belong to
//! the `_tx` collection.
//!
//! ## Ordering
//!
//! SubjectIds use strict total ordering on the raw i64. `SubjectId::min()`
//! and `SubjectId::max()` provide bounds for wildcard range queries.

use crate::ids;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of low bits reserved for the within-collection id.
pub const SUB_ID_BITS: u32 = 44;

/// Mask selecting the within-collection id.
pub const SUB_ID_MASK: i64 = (1i64 << SUB_ID_BITS) - 1;

/// Subject ID - composite of collection id and within-collection id
///
/// Serializes as the raw i64 in JSON.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(pub i64);

impl SubjectId {
    /// Compose a subject id from a collection id and a within-collection id.
    ///
    /// `n` must fit in the low 44 bits.
    pub fn new(collection: u32, n: i64) -> Self {
        debug_assert!(n >= 0 && n <= SUB_ID_MASK, "sub-id out of range: {}", n);
        SubjectId(((collection as i64) << SUB_ID_BITS) | (n & SUB_ID_MASK))
    }

    /// Subject id for a transaction-era subject (the `t` itself, negative).
    pub fn from_t(t: i64) -> Self {
        debug_assert!(t < 0, "transaction t must be negative: {}", t);
        SubjectId(t)
    }

    /// The collection id this subject belongs to.
    ///
    /// Negative subjects are transaction subjects and belong to `_tx`.
    pub fn collection(&self) -> u32 {
        if self.0 < 0 {
            ids::collection::TX
        } else {
            (self.0 >> SUB_ID_BITS) as u32
        }
    }

    /// The within-collection id (low 44 bits). Meaningless for negative ids.
    pub fn sub_id(&self) -> i64 {
        self.0 & SUB_ID_MASK
    }

    /// Whether this is a transaction-era subject (raw value negative).
    pub fn is_tx(&self) -> bool {
        self.0 < 0
    }

    /// Minimum possible subject id (range query lower bound).
    pub fn min() -> Self {
        SubjectId(i64::MIN)
    }

    /// Maximum possible subject id (range query upper bound).
    pub fn max() -> Self {
        SubjectId(i64::MAX)
    }
}

impl From<i64> for SubjectId {
    fn from(raw: i64) -> Self {
        SubjectId(raw)
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 < 0 {
            write!(f, "{}", self.0)
        } else {
            write!(f, "{}.{}", self.collection(), self.sub_id())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_decompose() {
        let s = SubjectId::new(3, 17);
        assert_eq!(s.collection(), 3);
        assert_eq!(s.sub_id(), 17);
        assert!(!s.is_tx());
    }

    #[test]
    fn test_tx_subject() {
        let s = SubjectId::from_t(-2);
        assert!(s.is_tx());
        assert_eq!(s.collection(), ids::collection::TX);
        assert_eq!(s.0, -2);
    }

    #[test]
    fn test_ordering_within_collection() {
        let a = SubjectId::new(1, 1);
        let b = SubjectId::new(1, 2);
        let c = SubjectId::new(2, 0);
        assert!(a < b);
        assert!(b < c);
        assert!(SubjectId::min() < a);
        assert!(c < SubjectId::max());
    }

    #[test]
    fn test_serde_raw_i64() {
        let s = SubjectId::new(6, 4);
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, s.0.to_string());
        let back: SubjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}
