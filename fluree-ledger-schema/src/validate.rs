//! Schema mutation validation
//!
//! When a transaction touches the `_collection` or `_predicate` meta
//! collections, every mutation is checked against the type-compatibility
//! lattice and the structural rules below. Failures are *collected* into a
//! [`ValidationReport`] and handed back to the transactor for
//! per-transaction rejection; validation never panics and never aborts
//! the block builder or the novelty layer.
//!
//! ## Type-change lattice
//!
//! A predicate's `_predicate/type` may only change in a widening
//! direction:
//!
//! | to | from |
//! |----|------|
//! | long | int, instant |
//! | bigint | int, long, instant |
//! | float | int, long |
//! | double | float, int, long |
//! | bigdec | float, double, int, long, bigint |
//! | string | json, geojson, bytes, uuid, uri |
//! | instant | int, long |

use fluree_ledger_core::ids::{collection as C, predicate as P};
use fluree_ledger_core::{
    valid_collection_name, valid_predicate_name, Flake, FlakeValue, PredicateType, Schema,
    SubjectId,
};
use std::collections::BTreeMap;

/// Whether `_predicate/type` may change `from -> to`.
///
/// Identity changes are allowed (retract-then-assert of the same type is
/// a no-op); everything not in the lattice table is rejected.
pub fn allowed_type_change(from: PredicateType, to: PredicateType) -> bool {
    use PredicateType::*;
    if from == to {
        return true;
    }
    match to {
        Long => matches!(from, Int | Instant),
        BigInt => matches!(from, Int | Long | Instant),
        Float => matches!(from, Int | Long),
        Double => matches!(from, Float | Int | Long),
        BigDec => matches!(from, Float | Double | Int | Long | BigInt),
        String => matches!(from, Json | GeoJson | Bytes | Uuid | Uri),
        Instant => matches!(from, Int | Long),
        _ => false,
    }
}

/// A single validation failure.
#[derive(Clone, Debug)]
pub struct SchemaViolation {
    /// The mutated subject (predicate or collection)
    pub subject: SubjectId,
    pub kind: ViolationKind,
    pub message: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    InvalidPredicate,
    InvalidCollection,
}

impl SchemaViolation {
    fn predicate(subject: SubjectId, message: impl Into<String>) -> Self {
        Self {
            subject,
            kind: ViolationKind::InvalidPredicate,
            message: message.into(),
        }
    }

    fn collection(subject: SubjectId, message: impl Into<String>) -> Self {
        Self {
            subject,
            kind: ViolationKind::InvalidCollection,
            message: message.into(),
        }
    }
}

/// Outcome of validating one transaction's schema mutations.
#[derive(Clone, Debug, Default)]
pub struct ValidationReport {
    pub violations: Vec<SchemaViolation>,
    /// Predicates scheduled for removal from the `post` projection
    /// because neither `index` nor `unique` holds after the transaction.
    pub remove_from_post: Vec<SubjectId>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Per-predicate flake grouping, partitioned by the mutated predicate.
#[derive(Default)]
struct PredicateGroup<'a> {
    type_flakes: Vec<&'a Flake>,
    multi: Vec<&'a Flake>,
    component: Vec<&'a Flake>,
    unique: Vec<&'a Flake>,
    index: Vec<&'a Flake>,
    name: Vec<&'a Flake>,
    #[allow(dead_code)]
    other: Vec<&'a Flake>,
}

fn asserted<'a>(flakes: &[&'a Flake]) -> Option<&'a Flake> {
    flakes.iter().find(|f| f.op).copied()
}

fn retracted<'a>(flakes: &[&'a Flake]) -> Option<&'a Flake> {
    flakes.iter().find(|f| !f.op).copied()
}

fn bool_of(flake: &Flake) -> bool {
    flake.o.as_bool().unwrap_or(false)
}

/// Resolve a `_predicate/type` object (tag ref or raw string) to a type.
fn type_of(flake: &Flake, schema: &Schema) -> Option<PredicateType> {
    match &flake.o {
        FlakeValue::Ref(sid) => type_from_tag(schema, *sid),
        other => other.as_str().and_then(PredicateType::parse),
    }
}

/// Reverse-resolve a tag subject into a predicate type by scanning the
/// known type tags in the schema's tag table.
fn type_from_tag(schema: &Schema, sid: SubjectId) -> Option<PredicateType> {
    const TYPE_NAMES: &[&str] = &[
        "string", "int", "long", "bigint", "float", "double", "bigdec", "instant",
        "boolean", "uri", "uuid", "bytes", "json", "geojson", "ref", "tag",
    ];
    TYPE_NAMES
        .iter()
        .find(|name| schema.tag_id("_predicate/type", name) == Some(sid))
        .and_then(|name| PredicateType::parse(name))
}

/// Validate one transaction's schema-mutating flakes.
///
/// `db_before` is the schema view the transaction started from;
/// `db_after` is the candidate view with the transaction's flakes applied.
/// Only flakes whose subject sits in `_predicate` or `_collection` are
/// inspected.
pub fn validate(tx_flakes: &[Flake], db_before: &Schema, db_after: &Schema) -> ValidationReport {
    let mut report = ValidationReport::default();

    // Partition predicate-subject flakes by subject, bucketed by the
    // mutated system predicate. BTreeMap keeps violation order stable.
    let mut groups: BTreeMap<SubjectId, PredicateGroup<'_>> = BTreeMap::new();

    for flake in tx_flakes {
        match flake.s.collection() {
            c if c == C::PREDICATE => {
                let group = groups.entry(flake.s).or_default();
                match flake.p.sub_id() {
                    P::PREDICATE_TYPE => group.type_flakes.push(flake),
                    P::PREDICATE_MULTI => group.multi.push(flake),
                    P::PREDICATE_COMPONENT => group.component.push(flake),
                    P::PREDICATE_UNIQUE => group.unique.push(flake),
                    P::PREDICATE_INDEX => group.index.push(flake),
                    P::PREDICATE_NAME => group.name.push(flake),
                    _ => group.other.push(flake),
                }
            }
            c if c == C::COLLECTION => {
                if flake.p.sub_id() == P::COLLECTION_NAME && flake.op {
                    if let Some(name) = flake.o.as_str() {
                        if !valid_collection_name(name) {
                            report.violations.push(SchemaViolation::collection(
                                flake.s,
                                format!("invalid collection name: {:?}", name),
                            ));
                        }
                    }
                }
            }
            _ => {}
        }
    }

    for (subject, group) in &groups {
        validate_predicate_group(*subject, group, db_before, db_after, &mut report);
    }


    // Post-index hygiene: a predicate stays in the set only if neither
    // flag holds in the db-after view.
    report
        .remove_from_post
        .retain(|sid| !db_after.is_indexed(*sid));

    report
}

fn validate_predicate_group(
    subject: SubjectId,
    group: &PredicateGroup<'_>,
    db_before: &Schema,
    db_after: &Schema,
    report: &mut ValidationReport,
) {
    let existing = db_before.predicate_by_subject(subject).cloned();
    let is_new = existing.is_none();

    // --- name ---
    if let Some(name_flake) = asserted(&group.name) {
        if let Some(name) = name_flake.o.as_str() {
            if !valid_predicate_name(name) {
                report.violations.push(SchemaViolation::predicate(
                    subject,
                    format!("invalid predicate name: {:?}", name),
                ));
            }
        }
    }

    // --- type ---
    let type_asserted = asserted(&group.type_flakes).and_then(|f| type_of(f, db_after));
    let type_retracted = retracted(&group.type_flakes).and_then(|f| type_of(f, db_before));
    let existing_type = existing.as_ref().and_then(|p| p.ptype);

    if is_new {
        if asserted(&group.type_flakes).is_none() {
            report.violations.push(SchemaViolation::predicate(
                subject,
                "a new predicate must declare a type",
            ));
        } else if type_asserted.is_none() {
            report.violations.push(SchemaViolation::predicate(
                subject,
                "unrecognized predicate type",
            ));
        }
    } else if retracted(&group.type_flakes).is_some() && asserted(&group.type_flakes).is_none() {
        report.violations.push(SchemaViolation::predicate(
            subject,
            "cannot retract a predicate type without asserting a replacement",
        ));
    } else if let Some(to) = type_asserted {
        let from = type_retracted.or(existing_type);
        if let Some(from) = from {
            if !allowed_type_change(from, to) {
                report.violations.push(SchemaViolation::predicate(
                    subject,
                    format!("predicate type cannot change from {} to {}", from, to),
                ));
            }
        }
    }

    let effective_type = type_asserted.or(existing_type);

    // --- multi ---
    let was_multi = existing.as_ref().map(|p| p.multi).unwrap_or(false);
    if let Some(multi_flake) = asserted(&group.multi) {
        if was_multi && !bool_of(multi_flake) {
            report.violations.push(SchemaViolation::predicate(
                subject,
                "a multi-cardinality predicate cannot become single-cardinality",
            ));
        }
    }

    // --- component ---
    if let Some(component_flake) = asserted(&group.component) {
        if bool_of(component_flake) {
            if !is_new {
                report.violations.push(SchemaViolation::predicate(
                    subject,
                    "component cannot be set on an existing predicate",
                ));
            } else if effective_type != Some(PredicateType::Ref) {
                report.violations.push(SchemaViolation::predicate(
                    subject,
                    "a component predicate must be of type ref",
                ));
            }
        }
    }

    // --- unique ---
    if let Some(unique_flake) = asserted(&group.unique) {
        if bool_of(unique_flake) {
            let was_unique = existing.as_ref().map(|p| p.unique).unwrap_or(false);
            if !is_new && !was_unique {
                report.violations.push(SchemaViolation::predicate(
                    subject,
                    "unique cannot be set on an existing predicate; data history cannot \
                     be proven unique - migrate values to a new unique predicate instead",
                ));
            }
            if effective_type == Some(PredicateType::Boolean) {
                report.violations.push(SchemaViolation::predicate(
                    subject,
                    "a boolean predicate can never be unique",
                ));
            }
        }
    }

    // --- post-index hygiene bookkeeping ---
    // A transition of index or unique to false makes this predicate a
    // candidate for removal from post; the db-after re-check happens in
    // `validate`.
    let index_dropped = existing.as_ref().map(|p| p.index).unwrap_or(false)
        && (asserted(&group.index).map(|f| !bool_of(f)).unwrap_or(false)
            || (retracted(&group.index).is_some() && asserted(&group.index).is_none()));
    let unique_dropped = existing.as_ref().map(|p| p.unique).unwrap_or(false)
        && (asserted(&group.unique).map(|f| !bool_of(f)).unwrap_or(false)
            || (retracted(&group.unique).is_some() && asserted(&group.unique).is_none()));

    if index_dropped || unique_dropped {
        report.remove_from_post.push(subject);
    }
}
