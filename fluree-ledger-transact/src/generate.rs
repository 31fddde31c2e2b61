//! Flake generation - materializing a command's statement graph
//!
//! Each statement is a JSON object: `_id` names the subject (an existing
//! subject id, or a tempid `"collection"` / `"collection$name"`), an
//! optional `_action` of `"delete"` turns the statement into retractions,
//! and every other key is a predicate name whose value is coerced to the
//! predicate's declared type.
//!
//! - Named tempids (`person$alice`) are shared across the transaction;
//!   anonymous tempids (`person`) mint a fresh subject per occurrence.
//! - New subject ids are minted monotonically through the per-collection
//!   `ecount` high-water marks.
//! - Nested objects under `ref`-typed predicates are walked recursively;
//!   the nested subject becomes the reference object.
//! - `tag`-typed values resolve through the schema's tag table; unknown
//!   values mint a new `_tag` subject unless the predicate restricts tags
//!   to pre-existing ones.

use crate::error::{Result, TransactError};
use bigdecimal::BigDecimal;
use fluree_ledger_core::ids::{collection as C, predicate as P};
use fluree_ledger_core::{Flake, FlakeValue, Predicate, PredicateType, Schema, SubjectId};
use num_bigint::BigInt;
use rustc_hash::FxHashMap;
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// Coerce a JSON literal to a non-reference predicate type.
///
/// Reference and tag types are handled by the generator, which needs the
/// tempid and tag tables.
pub fn coerce_literal(value: &JsonValue, ptype: PredicateType) -> Result<FlakeValue> {
    let fail = |reason: &str| TransactError::Coercion {
        value: value.to_string(),
        ptype: ptype.as_str().to_string(),
        reason: reason.to_string(),
    };

    match ptype {
        PredicateType::String => value
            .as_str()
            .map(|s| FlakeValue::String(s.to_string()))
            .ok_or_else(|| fail("expected a string")),
        PredicateType::Int | PredicateType::Long => value
            .as_i64()
            .map(FlakeValue::Long)
            .ok_or_else(|| fail("expected an integer")),
        PredicateType::BigInt => match value {
            JsonValue::Number(n) if n.is_i64() => {
                Ok(FlakeValue::BigInt(Box::new(BigInt::from(n.as_i64().unwrap()))))
            }
            JsonValue::String(s) => s
                .parse::<BigInt>()
                .map(|v| FlakeValue::BigInt(Box::new(v)))
                .map_err(|_| fail("expected an integer or integer string")),
            _ => Err(fail("expected an integer or integer string")),
        },
        PredicateType::Float | PredicateType::Double => value
            .as_f64()
            .map(FlakeValue::Double)
            .ok_or_else(|| fail("expected a number")),
        PredicateType::BigDec => match value {
            JsonValue::Number(n) => n
                .to_string()
                .parse::<BigDecimal>()
                .map(|v| FlakeValue::Decimal(Box::new(v)))
                .map_err(|_| fail("expected a decimal")),
            JsonValue::String(s) => s
                .parse::<BigDecimal>()
                .map(|v| FlakeValue::Decimal(Box::new(v)))
                .map_err(|_| fail("expected a decimal or decimal string")),
            _ => Err(fail("expected a decimal")),
        },
        PredicateType::Instant => value
            .as_i64()
            .map(FlakeValue::Instant)
            .ok_or_else(|| fail("expected epoch milliseconds")),
        PredicateType::Boolean => value
            .as_bool()
            .map(FlakeValue::Boolean)
            .ok_or_else(|| fail("expected a boolean")),
        PredicateType::Uri => value
            .as_str()
            .map(|s| FlakeValue::Uri(s.to_string()))
            .ok_or_else(|| fail("expected a URI string")),
        PredicateType::Uuid => value
            .as_str()
            .map(|s| FlakeValue::Uuid(s.to_string()))
            .ok_or_else(|| fail("expected a UUID string")),
        PredicateType::Bytes => value
            .as_str()
            .and_then(|s| hex::decode(s).ok())
            .map(FlakeValue::Bytes)
            .ok_or_else(|| fail("expected a hex string")),
        PredicateType::Json | PredicateType::GeoJson => Ok(FlakeValue::Json(value.to_string())),
        PredicateType::Ref | PredicateType::Tag => {
            Err(fail("reference types are resolved by the generator"))
        }
    }
}

/// Statement-graph walker producing flakes for one transaction.
pub struct FlakeGenerator<'a> {
    schema: &'a Schema,
    /// Working copy of the per-collection high-water marks
    ecount: FxHashMap<u32, i64>,
    t: i64,
    /// Named tempid assignments, returned to the client
    tempids: HashMap<String, SubjectId>,
    /// Tags minted within this transaction
    minted_tags: HashMap<(String, String), SubjectId>,
    flakes: Vec<Flake>,
}

impl<'a> FlakeGenerator<'a> {
    pub fn new(schema: &'a Schema, ecount: FxHashMap<u32, i64>, t: i64) -> Self {
        Self {
            schema,
            ecount,
            t,
            tempids: HashMap::new(),
            minted_tags: HashMap::new(),
            flakes: Vec::new(),
        }
    }

    /// Walk every statement, accumulating flakes.
    pub fn generate(&mut self, statements: &[JsonValue]) -> Result<()> {
        for stmt in statements {
            self.statement(stmt)?;
        }
        Ok(())
    }

    /// Consume the generator: flakes, updated ecount, tempid mapping.
    pub fn finish(self) -> (Vec<Flake>, FxHashMap<u32, i64>, HashMap<String, SubjectId>) {
        (self.flakes, self.ecount, self.tempids)
    }

    fn mint(&mut self, collection_name: &str) -> Result<SubjectId> {
        let collection = self
            .schema
            .collection_by_name(collection_name)
            .ok_or_else(|| TransactError::UnknownCollection(collection_name.to_string()))?;
        let next = self.ecount.entry(collection.id).or_insert(0);
        *next += 1;
        Ok(SubjectId::new(collection.id, *next))
    }

    /// Resolve a statement `_id`: an existing raw subject id, a shared
    /// named tempid, or a fresh anonymous tempid.
    fn resolve_id(&mut self, id: &JsonValue) -> Result<SubjectId> {
        match id {
            JsonValue::Number(n) => n
                .as_i64()
                .map(SubjectId::from)
                .ok_or_else(|| TransactError::invalid_command("_id must be an integer or tempid")),
            JsonValue::String(tempid) => {
                if let Some(existing) = self.tempids.get(tempid) {
                    return Ok(*existing);
                }
                let collection = tempid.split('$').next().unwrap_or(tempid);
                let sid = self.mint(collection)?;
                let key = if tempid.contains('$') {
                    tempid.clone()
                } else {
                    // Anonymous tempids mint per occurrence; record them
                    // under a derived stable name.
                    format!("{}${}", collection, sid.sub_id())
                };
                self.tempids.insert(key, sid);
                Ok(sid)
            }
            _ => Err(TransactError::invalid_command(
                "_id must be an integer or tempid string",
            )),
        }
    }

    fn resolve_tag(&mut self, predicate: &Predicate, value: &str) -> Result<FlakeValue> {
        if let Some(sid) = self.schema.tag_id(&predicate.name, value) {
            return Ok(FlakeValue::Ref(sid));
        }
        let key = (predicate.name.clone(), value.to_string());
        if let Some(sid) = self.minted_tags.get(&key) {
            return Ok(FlakeValue::Ref(*sid));
        }
        if predicate.restrict_tag {
            return Err(TransactError::Coercion {
                value: value.to_string(),
                ptype: "tag".to_string(),
                reason: format!("tag {}:{} does not exist and restrictTag is set", predicate.name, value),
            });
        }
        // Mint a new tag subject alongside its identity flake.
        let sid = self.mint("_tag")?;
        self.flakes.push(Flake::assert(
            sid,
            SubjectId::new(C::PREDICATE, P::TAG_ID),
            FlakeValue::String(format!("{}:{}", predicate.name, value)),
            self.t,
        ));
        self.minted_tags.insert(key, sid);
        Ok(FlakeValue::Ref(sid))
    }

    fn resolve_object(
        &mut self,
        predicate: &Predicate,
        value: &JsonValue,
        op: bool,
    ) -> Result<FlakeValue> {
        match predicate.ptype {
            Some(PredicateType::Ref) => match value {
                JsonValue::Number(_) | JsonValue::String(_) => {
                    self.resolve_id(value).map(FlakeValue::Ref)
                }
                JsonValue::Object(_) => {
                    // Nested component statement; its subject is the ref.
                    let sid = self.statement_with_op(value, op)?;
                    Ok(FlakeValue::Ref(sid))
                }
                _ => Err(TransactError::Coercion {
                    value: value.to_string(),
                    ptype: "ref".to_string(),
                    reason: "expected a subject id, tempid or nested statement".to_string(),
                }),
            },
            Some(PredicateType::Tag) => match value {
                JsonValue::String(s) => self.resolve_tag(predicate, s),
                _ => Err(TransactError::Coercion {
                    value: value.to_string(),
                    ptype: "tag".to_string(),
                    reason: "expected a tag value string".to_string(),
                }),
            },
            Some(ptype) => coerce_literal(value, ptype),
            None => Err(TransactError::UnknownPredicate(predicate.name.clone())),
        }
    }

    fn statement(&mut self, stmt: &JsonValue) -> Result<SubjectId> {
        let op = match stmt.get("_action").and_then(JsonValue::as_str) {
            Some("delete") | Some("retract") => false,
            _ => true,
        };
        self.statement_with_op(stmt, op)
    }

    fn statement_with_op(&mut self, stmt: &JsonValue, op: bool) -> Result<SubjectId> {
        let obj = stmt
            .as_object()
            .ok_or_else(|| TransactError::invalid_command("statement must be a JSON object"))?;
        let id = obj
            .get("_id")
            .ok_or_else(|| TransactError::invalid_command("statement missing _id"))?;
        let subject = self.resolve_id(id)?;

        for (key, value) in obj {
            if key == "_id" || key == "_action" {
                continue;
            }
            let predicate = self
                .schema
                .predicate_by_name(key)
                .ok_or_else(|| TransactError::UnknownPredicate(key.clone()))?
                .clone();

            match value {
                JsonValue::Array(items) => {
                    if !predicate.multi {
                        return Err(TransactError::invalid_command(format!(
                            "predicate {} is single-cardinality but got an array",
                            key
                        )));
                    }
                    for item in items {
                        let o = self.resolve_object(&predicate, item, op)?;
                        self.flakes
                            .push(Flake::new(subject, predicate.subject_id(), o, self.t, op, None));
                    }
                }
                _ => {
                    let o = self.resolve_object(&predicate, value, op)?;
                    self.flakes
                        .push(Flake::new(subject, predicate.subject_id(), o, self.t, op, None));
                }
            }
        }

        Ok(subject)
    }
}
