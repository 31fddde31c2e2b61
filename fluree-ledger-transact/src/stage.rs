//! Transaction staging
//!
//! One staged transaction runs the full pipeline: backpressure check,
//! flake materialization from the command's statement graph, schema
//! validation against the type lattice, delegated spec evaluation, and
//! `_tx` metadata emission.
//!
//! Validation failures are captured in the returned [`StagedTx`], never
//! thrown: a failed transaction carries its `_tx/error` flake and leaves
//! schema, ecount and novelty untouched, so sibling transactions in the
//! same block are unaffected. Only infrastructure problems (overload,
//! storage) surface as errors.

use crate::command::VerifiedCommand;
use crate::error::{Result, TransactError};
use crate::generate::FlakeGenerator;
use fluree_ledger_core::ids::{collection as C, predicate as P};
use fluree_ledger_core::{Flake, FlakeValue, Schema, SubjectId};
use fluree_ledger_novelty::{IndexConfig, Novelty};
use fluree_ledger_schema::{validate, ViolationKind};
use rustc_hash::FxHashMap;
use std::collections::HashMap;

/// Seam for delegated `_predicate/spec`, `_predicate/txSpec` and
/// `_collection/spec` function evaluation on the db-after view.
///
/// The evaluation engine itself is an external collaborator; the default
/// implementation accepts everything.
pub trait SpecEvaluator: Send + Sync {
    /// Return `Err(message)` to reject the transaction.
    fn evaluate(&self, db_after: &Schema, flakes: &[Flake]) -> std::result::Result<(), String>;
}

/// Accept-everything spec evaluator.
#[derive(Debug, Default)]
pub struct NoopSpecEvaluator;

impl SpecEvaluator for NoopSpecEvaluator {
    fn evaluate(&self, _db_after: &Schema, _flakes: &[Flake]) -> std::result::Result<(), String> {
        Ok(())
    }
}

/// Options for transaction staging
#[derive(Clone, Copy, Default)]
pub struct StageOptions<'a> {
    /// Backpressure thresholds; staging fails with
    /// [`TransactError::Overloaded`] when novelty is at capacity.
    pub index_config: Option<&'a IndexConfig>,

    /// Delegated spec-function evaluation on db-after.
    pub spec_evaluator: Option<&'a dyn SpecEvaluator>,
}

impl<'a> StageOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_index_config(mut self, config: &'a IndexConfig) -> Self {
        self.index_config = Some(config);
        self
    }

    pub fn with_spec_evaluator(mut self, evaluator: &'a dyn SpecEvaluator) -> Self {
        self.spec_evaluator = Some(evaluator);
        self
    }
}

/// One staged transaction - either admitted or rejected with a recorded
/// error.
#[derive(Clone, Debug)]
pub struct StagedTx {
    pub t: i64,
    pub tx_id: String,
    pub auth_id: String,
    /// Data flakes plus `_tx` metadata; for a rejected transaction, the
    /// metadata plus the `_tx/error` flake.
    pub flakes: Vec<Flake>,
    pub tempids: HashMap<String, SubjectId>,
    /// `(error-kind, message)` when the transaction was rejected
    pub error: Option<(String, String)>,
    /// Schema view with this transaction applied (unchanged on rejection)
    pub schema_after: Schema,
    /// Ecount with this transaction's mints (unchanged on rejection)
    pub ecount_after: FxHashMap<u32, i64>,
    /// Predicates to drop from the post projection at commit
    pub remove_from_post: Vec<SubjectId>,
}

impl StagedTx {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

fn tx_meta_flakes(cmd: &VerifiedCommand, t: i64) -> Vec<Flake> {
    let subject = SubjectId::from_t(t);
    let p = |pid| SubjectId::new(C::PREDICATE, pid);
    vec![
        Flake::assert(subject, p(P::TX_ID), FlakeValue::String(cmd.tx_id.clone()), t),
        Flake::assert(subject, p(P::TX_NONCE), FlakeValue::Long(cmd.nonce), t),
        Flake::assert(subject, p(P::TX_SIG), FlakeValue::String(cmd.signed.sig.clone()), t),
    ]
}

fn rejected(
    cmd: &VerifiedCommand,
    t: i64,
    schema: &Schema,
    ecount: &FxHashMap<u32, i64>,
    kind: String,
    message: String,
) -> StagedTx {
    let mut flakes = tx_meta_flakes(cmd, t);
    flakes.push(Flake::assert(
        SubjectId::from_t(t),
        SubjectId::new(C::PREDICATE, P::TX_ERROR),
        FlakeValue::String(message.clone()),
        t,
    ));
    StagedTx {
        t,
        tx_id: cmd.tx_id.clone(),
        auth_id: cmd.auth_id.clone(),
        flakes,
        tempids: HashMap::new(),
        error: Some((kind, message)),
        schema_after: schema.clone(),
        ecount_after: ecount.clone(),
        remove_from_post: Vec::new(),
    }
}

/// Liveness per value from an ordered novelty scan: within one value the
/// newest era (most negative `t`) sorts last, so the final entry wins.
fn live_values<'a>(scan: impl Iterator<Item = &'a Flake>) -> HashMap<FlakeValue, bool> {
    let mut live: HashMap<FlakeValue, bool> = HashMap::new();
    for flake in scan {
        live.insert(flake.o.clone(), flake.op);
    }
    live
}

/// Liveness per subject for one `(p, o)` pair from a post scan.
fn live_subjects<'a>(scan: impl Iterator<Item = &'a Flake>) -> HashMap<SubjectId, bool> {
    let mut live: HashMap<SubjectId, bool> = HashMap::new();
    for flake in scan {
        live.insert(flake.s, flake.op);
    }
    live
}

/// Enforce single-cardinality and uniqueness against the current view.
///
/// - For a non-multi predicate, asserting a new value auto-retracts the
///   live value (keeping assert/retract alternation per `(s, p, o)`);
///   re-asserting the live value is dropped as a no-op.
/// - For a unique predicate, an asserted value already live on another
///   subject - in novelty or earlier in this transaction - rejects the
///   transaction.
fn enforce_cardinality(
    schema: &Schema,
    novelty: &Novelty,
    flakes: &mut Vec<Flake>,
    t: i64,
) -> std::result::Result<(), String> {
    use fluree_ledger_core::IndexOrder;

    let mut retractions: Vec<Flake> = Vec::new();
    let mut drop: Vec<bool> = vec![false; flakes.len()];
    let mut asserted_unique: HashMap<(SubjectId, FlakeValue), SubjectId> = HashMap::new();

    for (i, flake) in flakes.iter().enumerate() {
        if !flake.op {
            continue;
        }
        let Some(pred) = schema.predicate_by_subject(flake.p) else {
            continue;
        };

        if !pred.multi {
            let from = Flake::first_for_subject_predicate(flake.s, flake.p);
            let to = Flake::last_for_subject_predicate(flake.s, flake.p);
            let live = live_values(novelty.range(IndexOrder::Spot, &from, &to));
            for (o, is_live) in &live {
                if !is_live || o == &flake.o {
                    continue;
                }
                let retraction = Flake::retract(flake.s, flake.p, o.clone(), t);
                let already = flakes.iter().any(|f| !f.op && f.s == retraction.s
                    && f.p == retraction.p && f.o == retraction.o)
                    || retractions.contains(&retraction);
                if !already {
                    retractions.push(retraction);
                }
            }
            if live.get(&flake.o).copied().unwrap_or(false) {
                // Re-asserting the live value is a no-op.
                drop[i] = true;
                continue;
            }
        }

        if pred.unique {
            let key = (flake.p, flake.o.clone());
            if let Some(other) = asserted_unique.get(&key) {
                if *other != flake.s {
                    return Err(format!(
                        "unique value collision on {}: value asserted for two subjects",
                        pred.name
                    ));
                }
            }
            asserted_unique.insert(key, flake.s);

            let from = Flake::first_for_predicate_object(flake.p, flake.o.clone());
            let to = Flake::last_for_predicate_object(flake.p, flake.o.clone());
            let live = live_subjects(novelty.range(IndexOrder::Post, &from, &to));
            if let Some((subject, _)) = live
                .iter()
                .find(|(subject, is_live)| **is_live && **subject != flake.s)
            {
                return Err(format!(
                    "unique value collision on {}: value already live on subject {}",
                    pred.name, subject
                ));
            }
        }
    }

    let mut keep = drop.iter().map(|d| !d);
    flakes.retain(|_| keep.next().unwrap_or(true));
    flakes.extend(retractions);
    Ok(())
}

/// Stage one verified command against the current ledger view.
///
/// `schema` and `ecount` are the views after any earlier transactions in
/// the same block. Materialization and validation failures produce a
/// rejected [`StagedTx`]; only infrastructure failures return `Err`.
pub fn stage(
    schema: &Schema,
    ecount: &FxHashMap<u32, i64>,
    novelty: &Novelty,
    cmd: &VerifiedCommand,
    t: i64,
    options: StageOptions<'_>,
) -> Result<StagedTx> {
    let span = tracing::debug_span!(
        "tx_stage",
        t,
        tx_id = %cmd.tx_id,
        statements = cmd.statements.len()
    );
    let _guard = span.enter();

    // Backpressure first: reject before doing any work.
    if let Some(config) = options.index_config {
        if novelty.at_max(config) {
            tracing::warn!("novelty at max, rejecting transaction");
            return Err(TransactError::Overloaded);
        }
    }

    // Materialize flakes from the statement graph.
    let mut generator = FlakeGenerator::new(schema, ecount.clone(), t);
    if let Err(e) = generator.generate(&cmd.statements) {
        tracing::debug!(error = %e, "flake materialization failed");
        let core = e.as_core();
        return Ok(rejected(
            cmd,
            t,
            schema,
            ecount,
            core.kind().to_string(),
            core.to_string(),
        ));
    }
    let (mut data_flakes, ecount_after, tempids) = generator.finish();

    // Single-cardinality auto-retraction and uniqueness enforcement run
    // against a preliminary db-after view (new predicates carry their
    // declared flags).
    let prelim = schema.apply(&data_flakes);
    if let Err(message) = enforce_cardinality(&prelim, novelty, &mut data_flakes, t) {
        tracing::debug!(error = %message, "cardinality enforcement rejected transaction");
        return Ok(rejected(
            cmd,
            t,
            schema,
            ecount,
            "invalid-tx".to_string(),
            message,
        ));
    }

    // Candidate db-after view, then schema validation.
    let schema_after = schema.apply(&data_flakes);
    let report = validate(&data_flakes, schema, &schema_after);
    if !report.is_ok() {
        let first = &report.violations[0];
        let kind = match first.kind {
            ViolationKind::InvalidPredicate => "invalid-predicate",
            ViolationKind::InvalidCollection => "invalid-collection",
        };
        let message = report
            .violations
            .iter()
            .map(|v| v.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        tracing::debug!(violations = report.violations.len(), "schema validation failed");
        return Ok(rejected(cmd, t, schema, ecount, kind.to_string(), message));
    }

    // Delegated spec functions run against db-after.
    if let Some(evaluator) = options.spec_evaluator {
        if let Err(message) = evaluator.evaluate(&schema_after, &data_flakes) {
            tracing::debug!(error = %message, "spec evaluation rejected transaction");
            return Ok(rejected(
                cmd,
                t,
                schema,
                ecount,
                "invalid-tx".to_string(),
                message,
            ));
        }
    }

    let mut flakes = data_flakes;
    flakes.extend(tx_meta_flakes(cmd, t));
    if !tempids.is_empty() {
        let mapping: std::collections::BTreeMap<&str, i64> = tempids
            .iter()
            .map(|(name, sid)| (name.as_str(), sid.0))
            .collect();
        flakes.push(Flake::assert(
            SubjectId::from_t(t),
            SubjectId::new(C::PREDICATE, P::TX_TEMPIDS),
            FlakeValue::String(serde_json::to_string(&mapping).unwrap_or_default()),
            t,
        ));
    }

    tracing::info!(flakes = flakes.len(), "transaction staged");

    Ok(StagedTx {
        t,
        tx_id: cmd.tx_id.clone(),
        auth_id: cmd.auth_id.clone(),
        flakes,
        tempids,
        error: None,
        schema_after,
        ecount_after,
        remove_from_post: report.remove_from_post,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{verify, SignedCommand};
    use fluree_ledger_core::{Collection, Predicate, PredicateType};
    use fluree_ledger_crypto::{sign_command, SigningKey};

    fn signed(cmd: &str) -> VerifiedCommand {
        let key = SigningKey::from_slice(&[5u8; 32]).unwrap();
        let sig = sign_command(cmd.as_bytes(), &key).unwrap();
        verify(&SignedCommand::new(cmd, sig)).unwrap()
    }

    fn test_schema() -> Schema {
        let mut schema = fluree_ledger_schema::bootstrap_schema();
        schema.put_collection(Collection {
            id: 20,
            name: "person".to_string(),
            ..Collection::default()
        });
        schema.put_predicate(Predicate::new(1000, "person/name", PredicateType::String));
        schema
    }

    fn ecount() -> FxHashMap<u32, i64> {
        let mut e = FxHashMap::default();
        e.insert(20u32, 0i64);
        e
    }

    #[test]
    fn test_stage_success() {
        let schema = test_schema();
        let cmd = signed(
            r#"{"type":"tx","db":"net/db","tx":[{"_id":"person","person/name":"alice"}]}"#,
        );
        let staged = stage(
            &schema,
            &ecount(),
            &Novelty::new(0),
            &cmd,
            -3,
            StageOptions::new(),
        )
        .unwrap();

        assert!(staged.is_ok());
        assert_eq!(staged.t, -3);
        // Data flake + _tx/id + _tx/nonce + _tx/sig + _tx/tempids
        assert_eq!(staged.flakes.len(), 5);
        assert_eq!(staged.ecount_after[&20], 1);
        assert!(staged
            .flakes
            .iter()
            .any(|f| f.p.sub_id() == P::TX_ID && f.s == SubjectId::from_t(-3)));
    }

    #[test]
    fn test_stage_unknown_predicate_rejected_with_error_flake() {
        let schema = test_schema();
        let cmd =
            signed(r#"{"type":"tx","db":"net/db","tx":[{"_id":"person","nope/nope":"x"}]}"#);
        let staged = stage(
            &schema,
            &ecount(),
            &Novelty::new(0),
            &cmd,
            -3,
            StageOptions::new(),
        )
        .unwrap();

        assert!(!staged.is_ok());
        assert!(staged
            .flakes
            .iter()
            .any(|f| f.p.sub_id() == P::TX_ERROR));
        // Rejection leaves the working views untouched.
        assert_eq!(staged.ecount_after[&20], 0);
    }

    #[test]
    fn test_stage_backpressure() {
        let schema = test_schema();
        let config = IndexConfig {
            reindex_min_bytes: 0,
            reindex_max_bytes: 0,
        };
        let cmd = signed(r#"{"type":"tx","db":"net/db","tx":[]}"#);
        let result = stage(
            &schema,
            &ecount(),
            &Novelty::new(0),
            &cmd,
            -3,
            StageOptions::new().with_index_config(&config),
        );
        assert!(matches!(result, Err(TransactError::Overloaded)));
    }

    #[test]
    fn test_stage_spec_rejection() {
        struct RejectAll;
        impl SpecEvaluator for RejectAll {
            fn evaluate(&self, _: &Schema, _: &[Flake]) -> std::result::Result<(), String> {
                Err("spec says no".to_string())
            }
        }

        let schema = test_schema();
        let cmd = signed(
            r#"{"type":"tx","db":"net/db","tx":[{"_id":"person","person/name":"a"}]}"#,
        );
        let staged = stage(
            &schema,
            &ecount(),
            &Novelty::new(0),
            &cmd,
            -3,
            StageOptions::new().with_spec_evaluator(&RejectAll),
        )
        .unwrap();

        assert!(!staged.is_ok());
        let (kind, message) = staged.error.as_ref().unwrap();
        assert_eq!(kind, "invalid-tx");
        assert_eq!(message, "spec says no");
    }
}
