//! Flake - the fundamental data unit in the ledger
//!
//! A flake is one immutable fact (assertion or retraction) with 6
//! components:
//! - `s`: subject id
//! - `p`: predicate id (a subject in the `_predicate` collection)
//! - `o`: object value
//! - `t`: logical time - monotonically *decreasing*; one `t` per
//!   transaction, a smaller (more negative) `t` for the block header
//! - `op`: operation, `true` = assert, `false` = retract
//! - `m`: optional metadata blob
//!
//! ## Ordering
//!
//! Flakes don't implement `Ord` directly because ordering depends on the
//! index order. Use the comparator functions in the `comparator` module.
//! Note that `t` compares *descending* in every order: larger (less
//! negative, older-era) values sort first.
//!
//! ## Sentinels
//!
//! `Flake::first_for_*` / `Flake::last_for_*` provide bounds for wildcard
//! range queries. Because `t` is descending, a "first" bound carries
//! `t = i64::MAX` and a "last" bound `t = i64::MIN`.

use crate::subject_id::SubjectId;
use crate::value::FlakeValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single fact in the ledger
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Flake {
    /// Subject id
    pub s: SubjectId,
    /// Predicate id
    pub p: SubjectId,
    /// Object value
    pub o: FlakeValue,
    /// Logical time
    pub t: i64,
    /// Operation: true = assert, false = retract
    pub op: bool,
    /// Optional metadata
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub m: Option<String>,
}

impl Flake {
    /// Create a new flake.
    pub fn new(
        s: SubjectId,
        p: SubjectId,
        o: FlakeValue,
        t: i64,
        op: bool,
        m: Option<String>,
    ) -> Self {
        Self { s, p, o, t, op, m }
    }

    /// Create an assertion flake with no metadata.
    pub fn assert(s: SubjectId, p: SubjectId, o: FlakeValue, t: i64) -> Self {
        Self::new(s, p, o, t, true, None)
    }

    /// Create a retraction flake with no metadata.
    pub fn retract(s: SubjectId, p: SubjectId, o: FlakeValue, t: i64) -> Self {
        Self::new(s, p, o, t, false, None)
    }

    /// A retraction of this flake at a new logical time.
    pub fn retract_at(&self, t: i64) -> Self {
        Self {
            t,
            op: false,
            ..self.clone()
        }
    }

    /// Smallest flake in every order - the global range lower bound.
    pub fn first() -> Self {
        Self {
            s: SubjectId::min(),
            p: SubjectId::min(),
            o: FlakeValue::min(),
            t: i64::MAX,
            op: false,
            m: None,
        }
    }

    /// Largest flake in every order - the global range upper bound.
    pub fn last() -> Self {
        Self {
            s: SubjectId::max(),
            p: SubjectId::max(),
            o: FlakeValue::max(),
            t: i64::MIN,
            op: true,
            m: None,
        }
    }

    /// First flake with a specific subject (spot order).
    pub fn first_for_subject(s: SubjectId) -> Self {
        Self { s, ..Self::first() }
    }

    /// Last flake with a specific subject (spot order).
    pub fn last_for_subject(s: SubjectId) -> Self {
        Self { s, ..Self::last() }
    }

    /// First flake with specific subject and predicate (spot order).
    pub fn first_for_subject_predicate(s: SubjectId, p: SubjectId) -> Self {
        Self { s, p, ..Self::first() }
    }

    /// Last flake with specific subject and predicate (spot order).
    pub fn last_for_subject_predicate(s: SubjectId, p: SubjectId) -> Self {
        Self { s, p, ..Self::last() }
    }

    /// First flake with a specific predicate (psot/post order).
    pub fn first_for_predicate(p: SubjectId) -> Self {
        Self { p, ..Self::first() }
    }

    /// Last flake with a specific predicate (psot/post order).
    pub fn last_for_predicate(p: SubjectId) -> Self {
        Self { p, ..Self::last() }
    }

    /// First flake with specific predicate and object (post order).
    pub fn first_for_predicate_object(p: SubjectId, o: FlakeValue) -> Self {
        Self { p, o, ..Self::first() }
    }

    /// Last flake with specific predicate and object (post order).
    pub fn last_for_predicate_object(p: SubjectId, o: FlakeValue) -> Self {
        Self { p, o, ..Self::last() }
    }

    /// First flake at a specific logical time (tspo order).
    pub fn first_for_t(t: i64) -> Self {
        Self { t, ..Self::first() }
    }

    /// Last flake at a specific logical time (tspo order).
    pub fn last_for_t(t: i64) -> Self {
        Self { t, ..Self::last() }
    }

    /// Fast deterministic size estimate in bytes.
    ///
    /// Computed once per flake at novelty insertion and summed into the
    /// ledger stats. Speed over accuracy: this is not the storage byte
    /// size, it is a stable estimate of bytes represented by the flake.
    pub fn size_estimate_bytes(&self) -> u64 {
        // Fixed base covers s + p + t + op.
        const BASE: u64 = 38;

        let o_size: u64 = match &self.o {
            FlakeValue::Null => 0,
            FlakeValue::Boolean(_) => 1,
            FlakeValue::Long(_) | FlakeValue::Instant(_) => 8,
            FlakeValue::Double(_) => 8,
            FlakeValue::BigInt(v) => 16 + v.to_string().len() as u64,
            FlakeValue::Decimal(v) => 16 + v.to_string().len() as u64,
            FlakeValue::String(s) | FlakeValue::Json(s) | FlakeValue::Uuid(s)
            | FlakeValue::Uri(s) => s.len() as u64,
            FlakeValue::Bytes(b) => b.len() as u64,
            FlakeValue::Ref(_) => 8,
        };

        let m_size = self.m.as_ref().map_or(0, |m| 4 + m.len() as u64);

        BASE + o_size + m_size
    }

    /// Canonical tuple form `[s, p, o, t, op]` (plus `m` when present),
    /// used for block and transaction hashing.
    pub fn canonical_tuple(&self) -> serde_json::Value {
        let mut tuple = vec![
            serde_json::Value::from(self.s.0),
            serde_json::Value::from(self.p.0),
            self.o.canonical_json(),
            serde_json::Value::from(self.t),
            serde_json::Value::from(self.op),
        ];
        if let Some(m) = &self.m {
            tuple.push(serde_json::Value::from(m.clone()));
        }
        serde_json::Value::Array(tuple)
    }
}

/// Fast deterministic size estimate for a batch of flakes.
pub fn size_flakes_estimate(flakes: &[Flake]) -> u64 {
    flakes.iter().map(|f| f.size_estimate_bytes()).sum()
}

impl fmt::Display for Flake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op_str = if self.op { "+" } else { "-" };
        write!(f, "[{} {} {} t:{} {}]", self.s, self.p, self.o, self.t, op_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparator::IndexOrder;

    fn flake(s: i64, p: i64, o: i64, t: i64) -> Flake {
        Flake::assert(
            SubjectId::new(20, s),
            SubjectId::new(0, p),
            FlakeValue::Long(o),
            t,
        )
    }

    #[test]
    fn test_sentinels_bracket_data() {
        let f = flake(1, 10, 100, -5);
        let cmp = IndexOrder::Spot.comparator();
        assert_eq!(cmp(&Flake::first(), &f), std::cmp::Ordering::Less);
        assert_eq!(cmp(&f, &Flake::last()), std::cmp::Ordering::Less);

        let lo = Flake::first_for_subject(f.s);
        let hi = Flake::last_for_subject(f.s);
        assert_eq!(cmp(&lo, &f), std::cmp::Ordering::Less);
        assert_eq!(cmp(&f, &hi), std::cmp::Ordering::Less);
    }

    #[test]
    fn test_retract_at() {
        let f = flake(1, 10, 100, -5);
        let r = f.retract_at(-9);
        assert!(!r.op);
        assert_eq!(r.t, -9);
        assert_eq!(r.s, f.s);
        assert_eq!(r.o, f.o);
    }

    #[test]
    fn test_size_estimate_deterministic() {
        let f = Flake::assert(
            SubjectId::new(20, 1),
            SubjectId::new(0, 10),
            FlakeValue::String("hello".into()),
            -3,
        );
        assert_eq!(f.size_estimate_bytes(), 38 + 5);
        assert_eq!(f.size_estimate_bytes(), f.clone().size_estimate_bytes());
    }

    #[test]
    fn test_canonical_tuple_elides_meta() {
        let f = flake(1, 10, 100, -5);
        let tuple = f.canonical_tuple();
        assert_eq!(tuple.as_array().unwrap().len(), 5);

        let mut with_meta = f.clone();
        with_meta.m = Some("note".into());
        assert_eq!(with_meta.canonical_tuple().as_array().unwrap().len(), 6);
    }

    #[test]
    fn test_serde_round_trip() {
        let f = Flake::new(
            SubjectId::new(20, 1),
            SubjectId::new(0, 10),
            FlakeValue::String("v".into()),
            -4,
            true,
            Some("m".into()),
        );
        let json = serde_json::to_string(&f).unwrap();
        let back: Flake = serde_json::from_str(&json).unwrap();
        assert_eq!(back, f);
    }
}
