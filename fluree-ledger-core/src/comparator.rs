//! Index comparators for flakes
//!
//! Five sort orders are maintained over the same flake multiset:
//!
//! | Order | Key | Use case |
//! |-------|-----|----------|
//! | spot | s, p, o, t | primary fact lookup |
//! | psot | p, s, o, t | predicate-centric scans |
//! | post | p, o, s, t | equality/range lookup (indexed predicates) |
//! | opst | o, p, s, t | reverse-reference lookup (ref predicates) |
//! | tspo | t, s, p, o | history / log replay |
//!
//! ## t polarity
//!
//! `t` compares **descending** in every order: a larger (less negative)
//! value sorts first. Logical time decreases as the ledger advances, so
//! descending `t` puts older eras first - which is exactly replay order
//! for `tspo`.
//!
//! ## Strict total ordering
//!
//! No nil-as-wildcard; use the explicit `Flake::first_for_*` /
//! `Flake::last_for_*` bounds for wildcard queries. Ties beyond the key
//! break on `op`, then `m`.

use crate::flake::Flake;
use std::cmp::Ordering;
use std::fmt;

/// Index order enumeration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IndexOrder {
    /// Subject-Predicate-Object-Time
    Spot,
    /// Predicate-Subject-Object-Time
    Psot,
    /// Predicate-Object-Subject-Time
    Post,
    /// Object-Predicate-Subject-Time
    Opst,
    /// Time-Subject-Predicate-Object
    Tspo,
}

impl IndexOrder {
    /// All five orders.
    pub fn all() -> &'static [IndexOrder] {
        &[
            IndexOrder::Spot,
            IndexOrder::Psot,
            IndexOrder::Post,
            IndexOrder::Opst,
            IndexOrder::Tspo,
        ]
    }

    /// The comparator function for this order.
    pub fn comparator(&self) -> fn(&Flake, &Flake) -> Ordering {
        match self {
            IndexOrder::Spot => cmp_spot,
            IndexOrder::Psot => cmp_psot,
            IndexOrder::Post => cmp_post,
            IndexOrder::Opst => cmp_opst,
            IndexOrder::Tspo => cmp_tspo,
        }
    }

    /// Compare two flakes using this order.
    pub fn compare(&self, a: &Flake, b: &Flake) -> Ordering {
        self.comparator()(a, b)
    }

    /// Short name of this order.
    pub fn name(&self) -> &'static str {
        match self {
            IndexOrder::Spot => "spot",
            IndexOrder::Psot => "psot",
            IndexOrder::Post => "post",
            IndexOrder::Opst => "opst",
            IndexOrder::Tspo => "tspo",
        }
    }
}

impl fmt::Display for IndexOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for IndexOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "spot" => Ok(IndexOrder::Spot),
            "psot" => Ok(IndexOrder::Psot),
            "post" => Ok(IndexOrder::Post),
            "opst" => Ok(IndexOrder::Opst),
            "tspo" => Ok(IndexOrder::Tspo),
            _ => Err(format!("unknown index order: {}", s)),
        }
    }
}

// === Component comparators ===

/// Descending logical time: larger (less negative, older era) first.
#[inline]
fn cmp_t(f1: &Flake, f2: &Flake) -> Ordering {
    f2.t.cmp(&f1.t)
}

#[inline]
fn cmp_meta(f1: &Flake, f2: &Flake) -> Ordering {
    match (&f1.m, &f2.m) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => a.cmp(b),
    }
}

#[inline]
fn cmp_tail(f1: &Flake, f2: &Flake) -> Ordering {
    f1.op.cmp(&f2.op).then_with(|| cmp_meta(f1, f2))
}

// === Order-specific comparators ===

/// spot: subject, predicate, object, time
pub fn cmp_spot(f1: &Flake, f2: &Flake) -> Ordering {
    f1.s.cmp(&f2.s)
        .then_with(|| f1.p.cmp(&f2.p))
        .then_with(|| f1.o.cmp(&f2.o))
        .then_with(|| cmp_t(f1, f2))
        .then_with(|| cmp_tail(f1, f2))
}

/// psot: predicate, subject, object, time
pub fn cmp_psot(f1: &Flake, f2: &Flake) -> Ordering {
    f1.p.cmp(&f2.p)
        .then_with(|| f1.s.cmp(&f2.s))
        .then_with(|| f1.o.cmp(&f2.o))
        .then_with(|| cmp_t(f1, f2))
        .then_with(|| cmp_tail(f1, f2))
}

/// post: predicate, object, subject, time
pub fn cmp_post(f1: &Flake, f2: &Flake) -> Ordering {
    f1.p.cmp(&f2.p)
        .then_with(|| f1.o.cmp(&f2.o))
        .then_with(|| f1.s.cmp(&f2.s))
        .then_with(|| cmp_t(f1, f2))
        .then_with(|| cmp_tail(f1, f2))
}

/// opst: object, predicate, subject, time
pub fn cmp_opst(f1: &Flake, f2: &Flake) -> Ordering {
    f1.o.cmp(&f2.o)
        .then_with(|| f1.p.cmp(&f2.p))
        .then_with(|| f1.s.cmp(&f2.s))
        .then_with(|| cmp_t(f1, f2))
        .then_with(|| cmp_tail(f1, f2))
}

/// tspo: time, subject, predicate, object
pub fn cmp_tspo(f1: &Flake, f2: &Flake) -> Ordering {
    cmp_t(f1, f2)
        .then_with(|| f1.s.cmp(&f2.s))
        .then_with(|| f1.p.cmp(&f2.p))
        .then_with(|| f1.o.cmp(&f2.o))
        .then_with(|| cmp_tail(f1, f2))
}

/// Wrapper providing `Ord` for a specific index order.
///
/// Lets standard library sorting work with order-specific comparison.
pub struct FlakeOrd<'a> {
    pub flake: &'a Flake,
    pub order: IndexOrder,
}

impl<'a> FlakeOrd<'a> {
    pub fn new(flake: &'a Flake, order: IndexOrder) -> Self {
        Self { flake, order }
    }
}

impl PartialEq for FlakeOrd<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.order.compare(self.flake, other.flake) == Ordering::Equal
    }
}

impl Eq for FlakeOrd<'_> {}

impl PartialOrd for FlakeOrd<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FlakeOrd<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order.compare(self.flake, other.flake)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subject_id::SubjectId;
    use crate::value::FlakeValue;

    fn make_flake(s: i64, p: i64, o: i64, t: i64) -> Flake {
        Flake::assert(
            SubjectId::new(20, s),
            SubjectId::new(0, p),
            FlakeValue::Long(o),
            t,
        )
    }

    #[test]
    fn test_spot_ordering() {
        let f1 = make_flake(1, 1, 1, -1);
        let f2 = make_flake(1, 1, 2, -1);
        let f3 = make_flake(1, 2, 1, -1);
        let f4 = make_flake(2, 1, 1, -1);

        assert_eq!(cmp_spot(&f1, &f2), Ordering::Less);
        assert_eq!(cmp_spot(&f1, &f3), Ordering::Less);
        assert_eq!(cmp_spot(&f1, &f4), Ordering::Less);
    }

    #[test]
    fn test_t_descending() {
        // Older era (-1) sorts before newer era (-2) in every order.
        let older = make_flake(1, 1, 1, -1);
        let newer = make_flake(1, 1, 1, -2);
        for order in IndexOrder::all() {
            assert_eq!(
                order.compare(&older, &newer),
                Ordering::Less,
                "t not descending in {}",
                order
            );
        }
    }

    #[test]
    fn test_tspo_replay_order() {
        let a = make_flake(9, 1, 1, -1);
        let b = make_flake(1, 1, 1, -2);
        let c = make_flake(5, 1, 1, -2);
        let mut flakes = vec![c.clone(), a.clone(), b.clone()];
        flakes.sort_by(cmp_tspo);
        assert_eq!(flakes, vec![a, b, c]);
    }

    #[test]
    fn test_post_object_before_subject() {
        let f1 = make_flake(9, 1, 1, -1);
        let f2 = make_flake(1, 1, 2, -1);
        assert_eq!(cmp_post(&f1, &f2), Ordering::Less);
        // psot keys on subject before object
        assert_eq!(cmp_psot(&f1, &f2), Ordering::Greater);
    }

    #[test]
    fn test_opst_object_first() {
        let f1 = Flake::assert(
            SubjectId::new(20, 9),
            SubjectId::new(0, 5),
            FlakeValue::Ref(SubjectId::new(20, 1)),
            -1,
        );
        let f2 = Flake::assert(
            SubjectId::new(20, 1),
            SubjectId::new(0, 1),
            FlakeValue::Ref(SubjectId::new(20, 2)),
            -1,
        );
        assert_eq!(cmp_opst(&f1, &f2), Ordering::Less);
    }

    #[test]
    fn test_flake_ord_wrapper() {
        let f1 = make_flake(1, 2, 3, -1);
        let f2 = make_flake(2, 1, 3, -1);

        assert!(FlakeOrd::new(&f1, IndexOrder::Spot) < FlakeOrd::new(&f2, IndexOrder::Spot));
        assert!(FlakeOrd::new(&f2, IndexOrder::Psot) < FlakeOrd::new(&f1, IndexOrder::Psot));
    }

    #[test]
    fn test_from_str() {
        assert_eq!("tspo".parse::<IndexOrder>().unwrap(), IndexOrder::Tspo);
        assert_eq!("SPOT".parse::<IndexOrder>().unwrap(), IndexOrder::Spot);
        assert!("xyz".parse::<IndexOrder>().is_err());
    }
}
