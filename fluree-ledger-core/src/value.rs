//! FlakeValue - polymorphic object value type
//!
//! The object position of a flake holds one of the literal kinds or a
//! reference to another subject (when the predicate's type is `ref` or
//! `tag`).
//!
//! ## Ordering
//!
//! FlakeValue implements strict total ordering with **numeric class
//! comparison**: `Long`, `Double`, `BigInt` and `Decimal` are compared
//! mathematically by value, not by type, so `Long(3) < Double(3.5) <
//! Long(4)`. All other kinds compare by class rank first, then by value
//! within the kind. `f64` comparisons use `total_cmp`, which keeps the
//! order total in the presence of NaN.
//!
//! ## Sentinels
//!
//! `FlakeValue::min()` and `FlakeValue::max()` provide bounds for wildcard
//! range queries.

use crate::subject_id::SubjectId;
use bigdecimal::{BigDecimal, FromPrimitive};
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Canonical key for numeric-class comparison and hashing.
#[derive(PartialEq, Eq, PartialOrd, Ord)]
enum NumKey {
    NegInf,
    Exact(BigDecimal),
    PosInf,
    Nan,
}

/// Polymorphic value type for flake objects
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum FlakeValue {
    /// Absent value (used as a range sentinel, never asserted)
    Null,
    /// Boolean literal
    Boolean(bool),
    /// 64-bit signed integer (`int` and `long` predicate types)
    Long(i64),
    /// Arbitrary precision integer, boxed to keep the enum small
    BigInt(Box<BigInt>),
    /// 64-bit float (`float` and `double` predicate types)
    Double(f64),
    /// Arbitrary precision decimal, boxed to keep the enum small
    Decimal(Box<BigDecimal>),
    /// Temporal instant as epoch milliseconds
    Instant(i64),
    /// String literal
    String(String),
    /// JSON document stored as its string form
    Json(String),
    /// Raw bytes
    Bytes(Vec<u8>),
    /// UUID in canonical string form
    Uuid(String),
    /// URI string
    Uri(String),
    /// Reference to another subject (`ref` and `tag` predicate types)
    Ref(SubjectId),
}

impl FlakeValue {
    /// Minimum sentinel for range bounds.
    pub fn min() -> Self {
        FlakeValue::Null
    }

    /// Maximum sentinel for range bounds.
    pub fn max() -> Self {
        FlakeValue::Ref(SubjectId::max())
    }

    /// Class rank for cross-kind ordering. All numerics share one class.
    fn class_rank(&self) -> u8 {
        match self {
            FlakeValue::Null => 0,
            FlakeValue::Boolean(_) => 1,
            FlakeValue::Long(_)
            | FlakeValue::BigInt(_)
            | FlakeValue::Double(_)
            | FlakeValue::Decimal(_) => 2,
            FlakeValue::Instant(_) => 3,
            FlakeValue::String(_) => 4,
            FlakeValue::Json(_) => 5,
            FlakeValue::Bytes(_) => 6,
            FlakeValue::Uuid(_) => 7,
            FlakeValue::Uri(_) => 8,
            FlakeValue::Ref(_) => 9,
        }
    }

    /// Whether this is any numeric kind.
    pub fn is_numeric(&self) -> bool {
        self.class_rank() == 2
    }

    /// Try to view this value as a subject reference.
    pub fn as_ref_id(&self) -> Option<SubjectId> {
        match self {
            FlakeValue::Ref(s) => Some(*s),
            _ => None,
        }
    }

    /// Try to view this value as a string slice (String/Json/Uuid/Uri).
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FlakeValue::String(s)
            | FlakeValue::Json(s)
            | FlakeValue::Uuid(s)
            | FlakeValue::Uri(s) => Some(s),
            _ => None,
        }
    }

    /// Try to view this value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FlakeValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to view this value as an i64 (Long or Instant).
    pub fn as_long(&self) -> Option<i64> {
        match self {
            FlakeValue::Long(v) | FlakeValue::Instant(v) => Some(*v),
            _ => None,
        }
    }

    /// Mathematical comparison within the numeric class.
    ///
    /// Fast paths keep same-representation comparisons allocation-free;
    /// mixed pairs compare through the exact canonical key, so the order
    /// stays total and consistent with `Eq`/`Hash` across types.
    fn cmp_numeric(&self, other: &Self) -> Ordering {
        use FlakeValue::*;
        match (self, other) {
            (Long(a), Long(b)) => a.cmp(b),
            (BigInt(a), BigInt(b)) => a.cmp(b),
            (Decimal(a), Decimal(b)) => a.cmp(b),
            // IEEE equality folds -0.0 and 0.0 together, matching the
            // exact key; total_cmp orders the rest.
            (Double(a), Double(b)) if a.is_finite() && b.is_finite() => {
                if a == b {
                    Ordering::Equal
                } else {
                    a.total_cmp(b)
                }
            }
            _ => self.num_key().cmp(&other.num_key()),
        }
    }

    /// Canonical numeric key: exact decimal value, with the non-finite
    /// doubles bracketing the number line and NaN above everything.
    fn num_key(&self) -> NumKey {
        match self {
            FlakeValue::Long(v) => NumKey::Exact(BigDecimal::from(*v)),
            FlakeValue::BigInt(v) => NumKey::Exact(BigDecimal::from((**v).clone())),
            FlakeValue::Decimal(v) => NumKey::Exact((**v).clone()),
            FlakeValue::Double(v) => match BigDecimal::from_f64(*v) {
                Some(exact) => NumKey::Exact(exact),
                None if *v == f64::NEG_INFINITY => NumKey::NegInf,
                None if *v == f64::INFINITY => NumKey::PosInf,
                None => NumKey::Nan,
            },
            _ => unreachable!("num_key called on a non-numeric value"),
        }
    }

    /// Canonical JSON form used for block/tx hashing.
    ///
    /// Arbitrary-precision and binary kinds render as strings so the output
    /// is identical across platforms; references render as the raw i64.
    pub fn canonical_json(&self) -> serde_json::Value {
        use serde_json::Value as J;
        match self {
            FlakeValue::Null => J::Null,
            FlakeValue::Boolean(b) => J::Bool(*b),
            FlakeValue::Long(v) | FlakeValue::Instant(v) => J::from(*v),
            FlakeValue::BigInt(v) => J::String(v.to_string()),
            FlakeValue::Double(v) => {
                serde_json::Number::from_f64(*v).map(J::Number).unwrap_or(J::Null)
            }
            FlakeValue::Decimal(v) => J::String(v.normalized().to_string()),
            FlakeValue::String(s) | FlakeValue::Json(s) | FlakeValue::Uuid(s)
            | FlakeValue::Uri(s) => J::String(s.clone()),
            FlakeValue::Bytes(b) => {
                let mut s = String::with_capacity(b.len() * 2);
                for byte in b {
                    use std::fmt::Write;
                    let _ = write!(s, "{:02x}", byte);
                }
                J::String(s)
            }
            FlakeValue::Ref(sid) => J::from(sid.0),
        }
    }
}

impl Ord for FlakeValue {
    fn cmp(&self, other: &Self) -> Ordering {
        use FlakeValue::*;
        let rank = self.class_rank().cmp(&other.class_rank());
        if rank != Ordering::Equal {
            return rank;
        }
        if self.is_numeric() {
            return self.cmp_numeric(other);
        }
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Boolean(a), Boolean(b)) => a.cmp(b),
            (Instant(a), Instant(b)) => a.cmp(b),
            (String(a), String(b)) => a.cmp(b),
            (Json(a), Json(b)) => a.cmp(b),
            (Bytes(a), Bytes(b)) => a.cmp(b),
            (Uuid(a), Uuid(b)) => a.cmp(b),
            (Uri(a), Uri(b)) => a.cmp(b),
            (Ref(a), Ref(b)) => a.cmp(b),
            _ => unreachable!("equal class ranks guarantee matching variants"),
        }
    }
}

impl PartialOrd for FlakeValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for FlakeValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FlakeValue {}

impl Hash for FlakeValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // The whole numeric class hashes through the canonical key so
        // that cross-representation equality (Long(7) == Decimal(7))
        // keeps the Eq/Hash contract.
        if self.is_numeric() {
            2u8.hash(state);
            match self.num_key() {
                NumKey::NegInf => 0u8.hash(state),
                NumKey::Exact(v) => {
                    1u8.hash(state);
                    v.normalized().to_string().hash(state);
                }
                NumKey::PosInf => 2u8.hash(state),
                NumKey::Nan => 3u8.hash(state),
            }
            return;
        }
        match self {
            FlakeValue::Null => 0u8.hash(state),
            FlakeValue::Boolean(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            FlakeValue::Instant(v) => {
                6u8.hash(state);
                v.hash(state);
            }
            FlakeValue::String(s) => {
                7u8.hash(state);
                s.hash(state);
            }
            FlakeValue::Json(s) => {
                8u8.hash(state);
                s.hash(state);
            }
            FlakeValue::Bytes(b) => {
                9u8.hash(state);
                b.hash(state);
            }
            FlakeValue::Uuid(s) => {
                10u8.hash(state);
                s.hash(state);
            }
            FlakeValue::Uri(s) => {
                11u8.hash(state);
                s.hash(state);
            }
            FlakeValue::Ref(sid) => {
                12u8.hash(state);
                sid.hash(state);
            }
            _ => unreachable!("numeric values hashed through the canonical key"),
        }
    }
}

impl fmt::Display for FlakeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlakeValue::Null => write!(f, "null"),
            FlakeValue::Boolean(b) => write!(f, "{}", b),
            FlakeValue::Long(v) => write!(f, "{}", v),
            FlakeValue::BigInt(v) => write!(f, "{}", v),
            FlakeValue::Double(v) => write!(f, "{}", v),
            FlakeValue::Decimal(v) => write!(f, "{}", v),
            FlakeValue::Instant(v) => write!(f, "#inst {}", v),
            FlakeValue::String(s) => write!(f, "{:?}", s),
            FlakeValue::Json(s) => write!(f, "json:{}", s),
            FlakeValue::Bytes(b) => write!(f, "bytes[{}]", b.len()),
            FlakeValue::Uuid(s) => write!(f, "uuid:{}", s),
            FlakeValue::Uri(s) => write!(f, "uri:{}", s),
            FlakeValue::Ref(sid) => write!(f, "->{}", sid),
        }
    }
}

impl From<&str> for FlakeValue {
    fn from(s: &str) -> Self {
        FlakeValue::String(s.to_string())
    }
}

impl From<i64> for FlakeValue {
    fn from(v: i64) -> Self {
        FlakeValue::Long(v)
    }
}

impl From<bool> for FlakeValue {
    fn from(v: bool) -> Self {
        FlakeValue::Boolean(v)
    }
}

impl From<SubjectId> for FlakeValue {
    fn from(sid: SubjectId) -> Self {
        FlakeValue::Ref(sid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_class_ordering() {
        assert!(FlakeValue::Long(3) < FlakeValue::Double(3.5));
        assert!(FlakeValue::Double(3.5) < FlakeValue::Long(4));
        assert!(
            FlakeValue::Long(1) < FlakeValue::BigInt(Box::new(BigInt::from(2)))
        );
        assert_eq!(
            FlakeValue::Long(7),
            FlakeValue::Decimal(Box::new(BigDecimal::from(7)))
        );
    }

    #[test]
    fn test_cross_class_ordering() {
        assert!(FlakeValue::Null < FlakeValue::Boolean(false));
        assert!(FlakeValue::Boolean(true) < FlakeValue::Long(i64::MIN));
        assert!(FlakeValue::Long(i64::MAX) < FlakeValue::Instant(0));
        assert!(FlakeValue::String("z".into()) < FlakeValue::Ref(SubjectId::min()));
        assert!(FlakeValue::min() <= FlakeValue::Null);
        assert!(FlakeValue::Ref(SubjectId::new(5, 5)) < FlakeValue::max());
    }

    #[test]
    fn test_canonical_json_stability() {
        let v = FlakeValue::Decimal(Box::new("1.500".parse::<BigDecimal>().unwrap()));
        assert_eq!(v.canonical_json(), serde_json::json!("1.5"));
        let b = FlakeValue::Bytes(vec![0xde, 0xad]);
        assert_eq!(b.canonical_json(), serde_json::json!("dead"));
        let r = FlakeValue::Ref(SubjectId::new(3, 1));
        assert_eq!(r.canonical_json(), serde_json::json!((3i64 << 44) | 1));
    }

    #[test]
    fn test_serde_round_trip() {
        let values = vec![
            FlakeValue::Long(42),
            FlakeValue::String("hello".into()),
            FlakeValue::Ref(SubjectId::new(1, 2)),
            FlakeValue::Boolean(true),
            FlakeValue::Instant(1000),
        ];
        for v in values {
            let json = serde_json::to_string(&v).unwrap();
            let back: FlakeValue = serde_json::from_str(&json).unwrap();
            assert_eq!(back, v);
        }
    }
}
