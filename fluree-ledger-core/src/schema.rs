//! Schema cache - collections, predicates, tags
//!
//! An immutable, copy-on-write view of the schema graph. The transactor
//! applies schema-mutating flakes to produce a candidate view (db-after),
//! and publishes it behind an `Arc` swap only at block commit, so readers
//! always hold a consistent snapshot.
//!
//! ## Naming rules
//!
//! Collection names match `^[A-Za-z0-9_][A-Za-z0-9._-]{0,254}$`. Predicate
//! names are `ns/local` where each side matches the collection pattern and
//! the full name contains none of `__`, `/_`, `_Via_`.

use crate::flake::Flake;
use crate::ids;
use crate::subject_id::SubjectId;
use crate::value::FlakeValue;
use regex::Regex;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::sync::LazyLock;

static COLLECTION_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9._-]{0,254}$").expect("static regex"));

/// Check a collection name against the naming rule.
pub fn valid_collection_name(name: &str) -> bool {
    COLLECTION_NAME_RE.is_match(name)
}

/// Check a predicate name (`ns/local`) against the naming rules.
pub fn valid_predicate_name(name: &str) -> bool {
    if name.contains("__") || name.contains("/_") || name.contains("_Via_") {
        return false;
    }
    match name.split_once('/') {
        Some((ns, local)) => valid_collection_name(ns) && valid_collection_name(local),
        None => false,
    }
}

/// Declared value type of a predicate
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PredicateType {
    String,
    Int,
    Long,
    BigInt,
    Float,
    Double,
    BigDec,
    Instant,
    Boolean,
    Uri,
    Uuid,
    Bytes,
    Json,
    GeoJson,
    Ref,
    Tag,
}

impl PredicateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredicateType::String => "string",
            PredicateType::Int => "int",
            PredicateType::Long => "long",
            PredicateType::BigInt => "bigint",
            PredicateType::Float => "float",
            PredicateType::Double => "double",
            PredicateType::BigDec => "bigdec",
            PredicateType::Instant => "instant",
            PredicateType::Boolean => "boolean",
            PredicateType::Uri => "uri",
            PredicateType::Uuid => "uuid",
            PredicateType::Bytes => "bytes",
            PredicateType::Json => "json",
            PredicateType::GeoJson => "geojson",
            PredicateType::Ref => "ref",
            PredicateType::Tag => "tag",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "string" => PredicateType::String,
            "int" => PredicateType::Int,
            "long" => PredicateType::Long,
            "bigint" => PredicateType::BigInt,
            "float" => PredicateType::Float,
            "double" => PredicateType::Double,
            "bigdec" => PredicateType::BigDec,
            "instant" => PredicateType::Instant,
            "boolean" => PredicateType::Boolean,
            "uri" => PredicateType::Uri,
            "uuid" => PredicateType::Uuid,
            "bytes" => PredicateType::Bytes,
            "json" => PredicateType::Json,
            "geojson" => PredicateType::GeoJson,
            "ref" => PredicateType::Ref,
            "tag" => PredicateType::Tag,
            _ => return None,
        })
    }

    /// Whether objects of this type are subject references.
    pub fn is_ref(&self) -> bool {
        matches!(self, PredicateType::Ref | PredicateType::Tag)
    }
}

impl std::fmt::Display for PredicateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A collection definition
#[derive(Clone, Debug, Default)]
pub struct Collection {
    pub id: u32,
    pub name: String,
    pub doc: Option<String>,
    pub version: Option<String>,
    pub spec: Vec<SubjectId>,
    pub spec_doc: Option<String>,
    pub shard: Option<SubjectId>,
}

/// A predicate definition
#[derive(Clone, Debug)]
pub struct Predicate {
    /// Within-collection id in `_predicate`
    pub id: i64,
    pub name: String,
    pub doc: Option<String>,
    /// Declared type. `None` only transiently, for a predicate whose
    /// defining transaction has not yet passed validation.
    pub ptype: Option<PredicateType>,
    pub multi: bool,
    pub unique: bool,
    pub index: bool,
    pub upsert: bool,
    pub component: bool,
    pub no_history: bool,
    pub restrict_collection: Option<String>,
    pub restrict_tag: bool,
    pub full_text: bool,
    pub spec: Vec<SubjectId>,
    pub spec_doc: Option<String>,
    pub tx_spec: Vec<SubjectId>,
    pub tx_spec_doc: Option<String>,
    pub encrypted: bool,
    pub deprecated: bool,
}

impl Predicate {
    pub fn new(id: i64, name: impl Into<String>, ptype: PredicateType) -> Self {
        Self {
            id,
            name: name.into(),
            doc: None,
            ptype: Some(ptype),
            multi: false,
            unique: false,
            index: false,
            upsert: false,
            component: false,
            no_history: false,
            restrict_collection: None,
            restrict_tag: false,
            full_text: false,
            spec: Vec::new(),
            spec_doc: None,
            tx_spec: Vec::new(),
            tx_spec_doc: None,
            encrypted: false,
            deprecated: false,
        }
    }

    fn empty(id: i64) -> Self {
        Self {
            ptype: None,
            ..Self::new(id, "", PredicateType::String)
        }
    }

    /// Full subject id of this predicate.
    pub fn subject_id(&self) -> SubjectId {
        SubjectId::new(ids::collection::PREDICATE, self.id)
    }

    /// Whether the predicate participates in the `post` projection.
    pub fn is_indexed(&self) -> bool {
        self.index || self.unique
    }

    /// Whether objects of this predicate are subject references.
    pub fn is_ref(&self) -> bool {
        self.ptype.map(|t| t.is_ref()).unwrap_or(false)
    }
}

/// Immutable schema view
///
/// Cheap to clone (`Arc` internals); mutation goes through [`Schema::apply`]
/// which returns a new view.
#[derive(Clone, Debug, Default)]
pub struct Schema {
    collections: FxHashMap<u32, Arc<Collection>>,
    collections_by_name: FxHashMap<String, u32>,
    predicates: FxHashMap<i64, Arc<Predicate>>,
    predicates_by_name: FxHashMap<String, i64>,
    /// `(predicate-name, tag-value) -> tag subject id`
    tags: FxHashMap<(String, String), SubjectId>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collection(&self, id: u32) -> Option<&Arc<Collection>> {
        self.collections.get(&id)
    }

    pub fn collection_by_name(&self, name: &str) -> Option<&Arc<Collection>> {
        self.collections_by_name
            .get(name)
            .and_then(|id| self.collections.get(id))
    }

    pub fn predicate(&self, pid: i64) -> Option<&Arc<Predicate>> {
        self.predicates.get(&pid)
    }

    /// Look up a predicate by its full subject id.
    pub fn predicate_by_subject(&self, p: SubjectId) -> Option<&Arc<Predicate>> {
        if p.collection() != ids::collection::PREDICATE {
            return None;
        }
        self.predicates.get(&p.sub_id())
    }

    pub fn predicate_by_name(&self, name: &str) -> Option<&Arc<Predicate>> {
        self.predicates_by_name
            .get(name)
            .and_then(|pid| self.predicates.get(pid))
    }

    /// Resolve a tag value for a tag-typed predicate.
    pub fn tag_id(&self, predicate_name: &str, value: &str) -> Option<SubjectId> {
        self.tags
            .get(&(predicate_name.to_string(), value.to_string()))
            .copied()
    }

    /// Reverse-resolve a tag subject to its value for one predicate.
    pub fn tag_value(&self, predicate_name: &str, sid: SubjectId) -> Option<&str> {
        self.tags
            .iter()
            .find(|((pred, _), tag_sid)| pred == predicate_name && **tag_sid == sid)
            .map(|((_, value), _)| value.as_str())
    }

    /// Whether `p` participates in the `post` projection.
    pub fn is_indexed(&self, p: SubjectId) -> bool {
        self.predicate_by_subject(p)
            .map(|pred| pred.is_indexed())
            .unwrap_or(false)
    }

    /// Whether `p` is reference-valued (`ref` or `tag`).
    pub fn is_ref(&self, p: SubjectId) -> bool {
        self.predicate_by_subject(p)
            .map(|pred| pred.is_ref())
            .unwrap_or(false)
    }

    pub fn collections(&self) -> impl Iterator<Item = &Arc<Collection>> {
        self.collections.values()
    }

    pub fn predicates(&self) -> impl Iterator<Item = &Arc<Predicate>> {
        self.predicates.values()
    }

    /// Insert a collection definition (bootstrap and apply path).
    pub fn put_collection(&mut self, collection: Collection) {
        self.collections_by_name
            .insert(collection.name.clone(), collection.id);
        self.collections.insert(collection.id, Arc::new(collection));
    }

    /// Insert a predicate definition (bootstrap and apply path).
    pub fn put_predicate(&mut self, predicate: Predicate) {
        if !predicate.name.is_empty() {
            self.predicates_by_name
                .insert(predicate.name.clone(), predicate.id);
        }
        self.predicates.insert(predicate.id, Arc::new(predicate));
    }

    /// Register a tag subject (bootstrap and apply path).
    pub fn put_tag(&mut self, predicate_name: &str, value: &str, sid: SubjectId) {
        self.tags
            .insert((predicate_name.to_string(), value.to_string()), sid);
    }

    /// Apply schema-mutating flakes, producing a new view.
    ///
    /// Only flakes whose subject sits in `_collection` or `_predicate` are
    /// considered; everything else passes through untouched. Retractions
    /// clear the targeted field, assertions set it; within one call
    /// retractions for a subject are applied before its assertions, which
    /// matches a retract-then-assert pair sharing a single `t`.
    pub fn apply(&self, flakes: &[Flake]) -> Schema {
        let mut next = self.clone();

        let mut retracts: Vec<&Flake> = Vec::new();
        let mut asserts: Vec<&Flake> = Vec::new();
        for f in flakes {
            match f.s.collection() {
                c if c == ids::collection::PREDICATE || c == ids::collection::COLLECTION => {
                    if f.op {
                        asserts.push(f);
                    } else {
                        retracts.push(f);
                    }
                }
                _ => {}
            }
        }

        for f in retracts.into_iter().chain(asserts) {
            if f.s.collection() == ids::collection::PREDICATE {
                next.apply_predicate_flake(f);
            } else {
                next.apply_collection_flake(f);
            }
        }

        next
    }

    fn apply_predicate_flake(&mut self, f: &Flake) {
        let pid = f.s.sub_id();
        let mut pred = self
            .predicates
            .get(&pid)
            .map(|p| (**p).clone())
            .unwrap_or_else(|| Predicate::empty(pid));

        use ids::predicate as P;
        match f.p.sub_id() {
            P::PREDICATE_NAME => {
                if f.op {
                    if !pred.name.is_empty() {
                        self.predicates_by_name.remove(&pred.name);
                    }
                    pred.name = f.o.as_str().unwrap_or_default().to_string();
                } else {
                    self.predicates_by_name.remove(&pred.name);
                    pred.name.clear();
                }
            }
            P::PREDICATE_DOC => pred.doc = f.op.then(|| f.o.as_str().unwrap_or_default().to_string()),
            P::PREDICATE_TYPE => {
                pred.ptype = if f.op {
                    match &f.o {
                        FlakeValue::Ref(sid) => self
                            .tag_value("_predicate/type", *sid)
                            .and_then(PredicateType::parse),
                        other => other.as_str().and_then(PredicateType::parse),
                    }
                } else {
                    None
                };
            }
            P::PREDICATE_UNIQUE => pred.unique = f.op && f.o.as_bool().unwrap_or(false),
            P::PREDICATE_MULTI => pred.multi = f.op && f.o.as_bool().unwrap_or(false),
            P::PREDICATE_INDEX => pred.index = f.op && f.o.as_bool().unwrap_or(false),
            P::PREDICATE_UPSERT => pred.upsert = f.op && f.o.as_bool().unwrap_or(false),
            P::PREDICATE_COMPONENT => pred.component = f.op && f.o.as_bool().unwrap_or(false),
            P::PREDICATE_NO_HISTORY => pred.no_history = f.op && f.o.as_bool().unwrap_or(false),
            P::PREDICATE_RESTRICT_COLLECTION => {
                pred.restrict_collection =
                    f.op.then(|| f.o.as_str().unwrap_or_default().to_string())
            }
            P::PREDICATE_RESTRICT_TAG => pred.restrict_tag = f.op && f.o.as_bool().unwrap_or(false),
            P::PREDICATE_FULL_TEXT => pred.full_text = f.op && f.o.as_bool().unwrap_or(false),
            P::PREDICATE_SPEC => apply_ref_list(&mut pred.spec, f),
            P::PREDICATE_SPEC_DOC => {
                pred.spec_doc = f.op.then(|| f.o.as_str().unwrap_or_default().to_string())
            }
            P::PREDICATE_TX_SPEC => apply_ref_list(&mut pred.tx_spec, f),
            P::PREDICATE_TX_SPEC_DOC => {
                pred.tx_spec_doc = f.op.then(|| f.o.as_str().unwrap_or_default().to_string())
            }
            P::PREDICATE_ENCRYPTED => pred.encrypted = f.op && f.o.as_bool().unwrap_or(false),
            P::PREDICATE_DEPRECATED => pred.deprecated = f.op && f.o.as_bool().unwrap_or(false),
            _ => {}
        }

        if !pred.name.is_empty() {
            self.predicates_by_name.insert(pred.name.clone(), pid);
        }
        self.predicates.insert(pid, Arc::new(pred));
    }

    fn apply_collection_flake(&mut self, f: &Flake) {
        let cid = f.s.sub_id() as u32;
        let mut coll = self
            .collections
            .get(&cid)
            .map(|c| (**c).clone())
            .unwrap_or_else(|| Collection {
                id: cid,
                ..Collection::default()
            });

        use ids::predicate as P;
        match f.p.sub_id() {
            P::COLLECTION_NAME => {
                if f.op {
                    if !coll.name.is_empty() {
                        self.collections_by_name.remove(&coll.name);
                    }
                    coll.name = f.o.as_str().unwrap_or_default().to_string();
                } else {
                    self.collections_by_name.remove(&coll.name);
                    coll.name.clear();
                }
            }
            P::COLLECTION_DOC => {
                coll.doc = f.op.then(|| f.o.as_str().unwrap_or_default().to_string())
            }
            P::COLLECTION_VERSION => {
                coll.version = f.op.then(|| f.o.as_str().unwrap_or_default().to_string())
            }
            P::COLLECTION_SPEC => apply_ref_list(&mut coll.spec, f),
            P::COLLECTION_SPEC_DOC => {
                coll.spec_doc = f.op.then(|| f.o.as_str().unwrap_or_default().to_string())
            }
            P::COLLECTION_SHARD => coll.shard = f.op.then(|| f.o.as_ref_id()).flatten(),
            _ => {}
        }

        if !coll.name.is_empty() {
            self.collections_by_name.insert(coll.name.clone(), cid);
        }
        self.collections.insert(cid, Arc::new(coll));
    }
}

fn apply_ref_list(list: &mut Vec<SubjectId>, f: &Flake) {
    if let Some(sid) = f.o.as_ref_id() {
        if f.op {
            if !list.contains(&sid) {
                list.push(sid);
            }
        } else {
            list.retain(|s| *s != sid);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_name_rule() {
        assert!(valid_collection_name("person"));
        assert!(valid_collection_name("_predicate"));
        assert!(valid_collection_name("a.b-c_d"));
        assert!(!valid_collection_name(""));
        assert!(!valid_collection_name(".leading-dot"));
        assert!(!valid_collection_name("has space"));
        assert!(!valid_collection_name(&"x".repeat(256)));
    }

    #[test]
    fn test_predicate_name_rule() {
        assert!(valid_predicate_name("person/name"));
        assert!(valid_predicate_name("x/y"));
        assert!(!valid_predicate_name("noslash"));
        assert!(!valid_predicate_name("a__b/c"));
        assert!(!valid_predicate_name("a/_c"));
        assert!(!valid_predicate_name("a_Via_b/c"));
        assert!(!valid_predicate_name("a/b/c"));
    }

    #[test]
    fn test_apply_new_predicate() {
        let schema = Schema::new();
        let s = SubjectId::new(ids::collection::PREDICATE, 1000);
        let name_p = SubjectId::new(ids::collection::PREDICATE, ids::predicate::PREDICATE_NAME);
        let type_p = SubjectId::new(ids::collection::PREDICATE, ids::predicate::PREDICATE_TYPE);
        let flakes = vec![
            Flake::assert(s, name_p, FlakeValue::String("person/age".into()), -3),
            Flake::assert(s, type_p, FlakeValue::String("int".into()), -3),
        ];
        let next = schema.apply(&flakes);
        let pred = next.predicate_by_name("person/age").unwrap();
        assert_eq!(pred.ptype, Some(PredicateType::Int));
        assert!(!pred.multi);
        // original view untouched
        assert!(schema.predicate_by_name("person/age").is_none());
    }

    #[test]
    fn test_apply_retract_then_assert_type() {
        let mut schema = Schema::new();
        let mut p = Predicate::new(1000, "person/age", PredicateType::Int);
        p.index = true;
        schema.put_predicate(p);

        let s = SubjectId::new(ids::collection::PREDICATE, 1000);
        let type_p = SubjectId::new(ids::collection::PREDICATE, ids::predicate::PREDICATE_TYPE);
        let flakes = vec![
            Flake::assert(s, type_p, FlakeValue::String("long".into()), -4),
            Flake::retract(s, type_p, FlakeValue::String("int".into()), -4),
        ];
        let next = schema.apply(&flakes);
        assert_eq!(
            next.predicate_by_name("person/age").unwrap().ptype,
            Some(PredicateType::Long)
        );
        assert!(next.predicate_by_name("person/age").unwrap().index);
    }

    #[test]
    fn test_is_indexed_and_is_ref() {
        let mut schema = Schema::new();
        let mut p = Predicate::new(1001, "person/friend", PredicateType::Ref);
        p.unique = false;
        p.index = false;
        schema.put_predicate(p);
        let sid = SubjectId::new(ids::collection::PREDICATE, 1001);
        assert!(schema.is_ref(sid));
        assert!(!schema.is_indexed(sid));
    }
}
