//! Schema bootstrap - deterministic genesis of a ledger
//!
//! The bootstrap program is a fixed ordered list of collection, predicate
//! and tag definitions, every entry carrying an explicit stable numeric id
//! so that ids embedded in code are portable across ledger instances and
//! releases. From the program three pure lookup tables are derived:
//! collection-name to id, predicate-name to id, and
//! `(predicate-name, tag-value)` to tag subject id.
//!
//! [`bootstrap`] turns a signed new-database command and a timestamp into
//! the genesis block: the schema flakes, the master authority flakes and
//! the block header flakes, spot-ordered and hash-chained. Two bootstraps
//! with the same `(cmd, sig, timestamp)` yield byte-identical blocks.
//!
//! Any unresolved name or tag inside this module is a defect in the
//! program itself and aborts with a fatal [`SchemaError::Bootstrap`].

use crate::error::{Result, SchemaError};
use fluree_ledger_core::ids::{collection as C, predicate as P};
use fluree_ledger_core::{cmp_spot, Collection, Flake, FlakeValue, Predicate, PredicateType, Schema, SubjectId};
use fluree_ledger_crypto::{hash_flakes, recover_auth_id, tx_id};
use rustc_hash::FxHashMap;
use std::sync::LazyLock;

/// A collection definition in the bootstrap program.
pub struct CollectionDef {
    pub id: u32,
    pub name: &'static str,
    pub doc: &'static str,
}

/// A predicate definition in the bootstrap program.
pub struct PredicateDef {
    pub id: i64,
    pub name: &'static str,
    pub ptype: PredicateType,
    pub doc: &'static str,
    pub multi: bool,
    pub unique: bool,
    pub index: bool,
    pub upsert: bool,
    pub component: bool,
    pub restrict_collection: Option<&'static str>,
}

impl PredicateDef {
    fn new(
        id: i64,
        name: &'static str,
        ptype: PredicateType,
        doc: &'static str,
    ) -> Self {
        Self {
            id,
            name,
            ptype,
            doc,
            multi: false,
            unique: false,
            index: false,
            upsert: false,
            component: false,
            restrict_collection: None,
        }
    }

    fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    fn upsert(mut self) -> Self {
        self.upsert = true;
        self
    }

    fn multi(mut self) -> Self {
        self.multi = true;
        self
    }

    fn index(mut self) -> Self {
        self.index = true;
        self
    }

    fn restrict(mut self, collection: &'static str) -> Self {
        self.restrict_collection = Some(collection);
        self
    }
}

/// A tag definition: an enumerated value of a tag-typed predicate.
pub struct TagDef {
    pub predicate: &'static str,
    pub value: &'static str,
}

const fn tag(predicate: &'static str, value: &'static str) -> TagDef {
    TagDef { predicate, value }
}

/// System collections, in program order.
pub static COLLECTIONS: &[CollectionDef] = &[
    CollectionDef { id: C::PREDICATE, name: "_predicate", doc: "Schema predicate definitions" },
    CollectionDef { id: C::COLLECTION, name: "_collection", doc: "Schema collection definitions" },
    CollectionDef { id: C::SHARD, name: "_shard", doc: "Ledger shard assignments" },
    CollectionDef { id: C::TAG, name: "_tag", doc: "Enumerated tag values" },
    CollectionDef { id: C::FN, name: "_fn", doc: "Database functions" },
    CollectionDef { id: C::USER, name: "_user", doc: "Users" },
    CollectionDef { id: C::AUTH, name: "_auth", doc: "Authority records" },
    CollectionDef { id: C::ROLE, name: "_role", doc: "Roles grouping permission rules" },
    CollectionDef { id: C::RULE, name: "_rule", doc: "Permission rules" },
    CollectionDef { id: C::SETTING, name: "_setting", doc: "Ledger settings" },
    CollectionDef { id: C::TX, name: "_tx", doc: "Transaction metadata" },
    CollectionDef { id: C::BLOCK, name: "_block", doc: "Block metadata" },
];

/// System predicates, in program order.
pub static PREDICATES: LazyLock<Vec<PredicateDef>> = LazyLock::new(|| {
    use PredicateType as T;
    vec![
        // _predicate/*
        PredicateDef::new(P::PREDICATE_NAME, "_predicate/name", T::String, "Predicate name").unique().upsert(),
        PredicateDef::new(P::PREDICATE_DOC, "_predicate/doc", T::String, "Optional docstring"),
        PredicateDef::new(P::PREDICATE_TYPE, "_predicate/type", T::Tag, "Value type of this predicate"),
        PredicateDef::new(P::PREDICATE_UNIQUE, "_predicate/unique", T::Boolean, "Values are unique across subjects"),
        PredicateDef::new(P::PREDICATE_MULTI, "_predicate/multi", T::Boolean, "Multi-cardinality"),
        PredicateDef::new(P::PREDICATE_INDEX, "_predicate/index", T::Boolean, "Maintain a value index (post)"),
        PredicateDef::new(P::PREDICATE_UPSERT, "_predicate/upsert", T::Boolean, "Upsert on unique match"),
        PredicateDef::new(P::PREDICATE_COMPONENT, "_predicate/component", T::Boolean, "Referenced subjects are owned components"),
        PredicateDef::new(P::PREDICATE_NO_HISTORY, "_predicate/noHistory", T::Boolean, "Do not retain history"),
        PredicateDef::new(P::PREDICATE_RESTRICT_COLLECTION, "_predicate/restrictCollection", T::String, "Restrict references to a collection"),
        PredicateDef::new(P::PREDICATE_SPEC, "_predicate/spec", T::Ref, "Value spec functions").multi().restrict("_fn"),
        PredicateDef::new(P::PREDICATE_ENCRYPTED, "_predicate/encrypted", T::Boolean, "Values stored encrypted"),
        PredicateDef::new(P::PREDICATE_DEPRECATED, "_predicate/deprecated", T::Boolean, "Predicate is deprecated"),
        PredicateDef::new(P::PREDICATE_SPEC_DOC, "_predicate/specDoc", T::String, "Spec failure message"),
        PredicateDef::new(P::PREDICATE_TX_SPEC, "_predicate/txSpec", T::Ref, "Transaction spec functions").multi().restrict("_fn"),
        PredicateDef::new(P::PREDICATE_TX_SPEC_DOC, "_predicate/txSpecDoc", T::String, "Transaction spec failure message"),
        PredicateDef::new(P::PREDICATE_RESTRICT_TAG, "_predicate/restrictTag", T::Boolean, "Tag values must pre-exist"),
        PredicateDef::new(P::PREDICATE_FULL_TEXT, "_predicate/fullText", T::Boolean, "Include in full-text index"),
        // _collection/*
        PredicateDef::new(P::COLLECTION_NAME, "_collection/name", T::String, "Collection name").unique().upsert(),
        PredicateDef::new(P::COLLECTION_DOC, "_collection/doc", T::String, "Optional docstring"),
        PredicateDef::new(P::COLLECTION_VERSION, "_collection/version", T::String, "Schema version of this collection"),
        PredicateDef::new(P::COLLECTION_SPEC, "_collection/spec", T::Ref, "Subject spec functions").multi().restrict("_fn"),
        PredicateDef::new(P::COLLECTION_SPEC_DOC, "_collection/specDoc", T::String, "Spec failure message"),
        PredicateDef::new(P::COLLECTION_SHARD, "_collection/shard", T::Ref, "Shard this collection lives on").restrict("_shard"),
        // _tag/*
        PredicateDef::new(P::TAG_ID, "_tag/id", T::String, "Tag identity").unique().upsert(),
        PredicateDef::new(P::TAG_DOC, "_tag/doc", T::String, "Optional docstring"),
        // _fn/*
        PredicateDef::new(P::FN_NAME, "_fn/name", T::String, "Function name").unique(),
        PredicateDef::new(P::FN_PARAMS, "_fn/params", T::String, "Function parameters").multi(),
        PredicateDef::new(P::FN_CODE, "_fn/code", T::String, "Function source"),
        PredicateDef::new(P::FN_DOC, "_fn/doc", T::String, "Optional docstring"),
        PredicateDef::new(P::FN_LANGUAGE, "_fn/language", T::Tag, "Source language"),
        PredicateDef::new(P::FN_SPEC, "_fn/spec", T::Json, "Argument spec"),
        // _user/*
        PredicateDef::new(P::USER_USERNAME, "_user/username", T::String, "Unique username").unique().upsert(),
        PredicateDef::new(P::USER_AUTH, "_user/auth", T::Ref, "Authority records for this user").multi().restrict("_auth"),
        PredicateDef::new(P::USER_ROLES, "_user/roles", T::Ref, "Default roles for this user").multi().restrict("_role"),
        PredicateDef::new(P::USER_DOC, "_user/doc", T::String, "Optional docstring"),
        // _auth/*
        PredicateDef::new(P::AUTH_ID, "_auth/id", T::String, "Authority account id").unique().upsert(),
        PredicateDef::new(P::AUTH_PASSWORD, "_auth/password", T::String, "Password digest"),
        PredicateDef::new(P::AUTH_SALT, "_auth/salt", T::Bytes, "Password salt"),
        PredicateDef::new(P::AUTH_ROLES, "_auth/roles", T::Ref, "Roles granted to this authority").multi().restrict("_role"),
        PredicateDef::new(P::AUTH_DOC, "_auth/doc", T::String, "Optional docstring"),
        PredicateDef::new(P::AUTH_TYPE, "_auth/type", T::Tag, "Key type"),
        PredicateDef::new(P::AUTH_AUTHORITY, "_auth/authority", T::Ref, "Authorities allowed to act for this auth").multi().restrict("_auth"),
        PredicateDef::new(P::AUTH_FUEL, "_auth/fuel", T::Long, "Fuel balance"),
        // _role/*
        PredicateDef::new(P::ROLE_ID, "_role/id", T::String, "Role identity").unique().upsert(),
        PredicateDef::new(P::ROLE_DOC, "_role/doc", T::String, "Optional docstring"),
        PredicateDef::new(P::ROLE_RULES, "_role/rules", T::Ref, "Rules granted by this role").multi().restrict("_rule"),
        // _rule/*
        PredicateDef::new(P::RULE_ID, "_rule/id", T::String, "Rule identity").unique().upsert(),
        PredicateDef::new(P::RULE_DOC, "_rule/doc", T::String, "Optional docstring"),
        PredicateDef::new(P::RULE_COLLECTION, "_rule/collection", T::String, "Collection this rule applies to"),
        PredicateDef::new(P::RULE_PREDICATES, "_rule/predicates", T::String, "Predicates this rule applies to").multi(),
        PredicateDef::new(P::RULE_FNS, "_rule/fns", T::Ref, "Functions evaluated for this rule").multi().restrict("_fn"),
        PredicateDef::new(P::RULE_OPS, "_rule/ops", T::Tag, "Operations this rule covers").multi(),
        PredicateDef::new(P::RULE_COLLECTION_DEFAULT, "_rule/collectionDefault", T::Boolean, "Default rule for the collection"),
        PredicateDef::new(P::RULE_ERROR_MESSAGE, "_rule/errorMessage", T::String, "Message returned on rule failure"),
        // _setting/*
        PredicateDef::new(P::SETTING_ID, "_setting/id", T::String, "Setting identity").unique().upsert(),
        PredicateDef::new(P::SETTING_DOC, "_setting/doc", T::String, "Optional docstring"),
        PredicateDef::new(P::SETTING_LANGUAGE, "_setting/language", T::Tag, "Ledger language"),
        PredicateDef::new(P::SETTING_CONSENSUS, "_setting/consensus", T::Tag, "Consensus type"),
        PredicateDef::new(P::SETTING_TX_MAX, "_setting/txMax", T::Long, "Maximum transaction size"),
        PredicateDef::new(P::SETTING_ANONYMOUS, "_setting/anonymous", T::Ref, "Auth used for anonymous requests").restrict("_auth"),
        PredicateDef::new(P::SETTING_LEDGERS, "_setting/ledgers", T::Ref, "Ledger identities (auth records)").multi().restrict("_auth"),
        // _shard/*
        PredicateDef::new(P::SHARD_NAME, "_shard/name", T::String, "Shard name").unique(),
        PredicateDef::new(P::SHARD_MINERS, "_shard/miners", T::Ref, "Servers responsible for this shard").multi().restrict("_auth"),
        PredicateDef::new(P::SHARD_MUTABLE, "_shard/mutable", T::Boolean, "Shard allows mutation"),
        // _tx/*
        PredicateDef::new(P::TX_ID, "_tx/id", T::String, "Transaction id (hash of the command)").unique(),
        PredicateDef::new(P::TX_AUTH, "_tx/auth", T::Ref, "Authority that signed this transaction").restrict("_auth"),
        PredicateDef::new(P::TX_AUTHORITY, "_tx/authority", T::Ref, "Acting authority").restrict("_auth"),
        PredicateDef::new(P::TX_NONCE, "_tx/nonce", T::Long, "Command nonce"),
        PredicateDef::new(P::TX_ERROR, "_tx/error", T::String, "Rejection reason"),
        PredicateDef::new(P::TX_SIG, "_tx/sig", T::String, "Command signature"),
        PredicateDef::new(P::TX_TEMPIDS, "_tx/tempids", T::String, "Tempid mapping (JSON)"),
        // _block/*
        PredicateDef::new(P::BLOCK_NUMBER, "_block/number", T::Long, "Block number").unique(),
        PredicateDef::new(P::BLOCK_INSTANT, "_block/instant", T::Instant, "Wall-clock instant the block was sealed").index(),
        PredicateDef::new(P::BLOCK_HASH, "_block/hash", T::String, "Content hash of this block"),
        PredicateDef::new(P::BLOCK_PREV_HASH, "_block/prevHash", T::String, "Hash of the previous block"),
        PredicateDef::new(P::BLOCK_TRANSACTIONS, "_block/transactions", T::Ref, "Transactions sealed in this block").multi().restrict("_tx"),
        PredicateDef::new(P::BLOCK_LEDGERS, "_block/ledgers", T::Ref, "Ledger identities that signed this block").multi().restrict("_auth"),
        PredicateDef::new(P::BLOCK_SIGS, "_block/sigs", T::String, "Block signatures").multi(),
    ]
});

/// Tag values, in program order. Tag subject ids are minted sequentially
/// in collection `_tag` following this order.
pub static TAGS: &[TagDef] = &[
    tag("_predicate/type", "string"),
    tag("_predicate/type", "int"),
    tag("_predicate/type", "long"),
    tag("_predicate/type", "bigint"),
    tag("_predicate/type", "float"),
    tag("_predicate/type", "double"),
    tag("_predicate/type", "bigdec"),
    tag("_predicate/type", "instant"),
    tag("_predicate/type", "boolean"),
    tag("_predicate/type", "uri"),
    tag("_predicate/type", "uuid"),
    tag("_predicate/type", "bytes"),
    tag("_predicate/type", "json"),
    tag("_predicate/type", "geojson"),
    tag("_predicate/type", "ref"),
    tag("_predicate/type", "tag"),
    tag("_rule/ops", "all"),
    tag("_rule/ops", "query"),
    tag("_rule/ops", "transact"),
    tag("_rule/ops", "token"),
    tag("_rule/ops", "logs"),
    tag("_auth/type", "secp256k1"),
    tag("_auth/type", "password"),
    tag("_setting/consensus", "raft"),
    tag("_setting/consensus", "in-memory"),
];

/// Derived lookup tables - pure functions of the static program.
struct BootstrapIndex {
    collection_ids: FxHashMap<&'static str, u32>,
    predicate_ids: FxHashMap<&'static str, i64>,
    tag_sids: FxHashMap<(&'static str, &'static str), SubjectId>,
}

static INDEX: LazyLock<BootstrapIndex> = LazyLock::new(|| {
    let collection_ids = COLLECTIONS.iter().map(|c| (c.name, c.id)).collect();
    let predicate_ids = PREDICATES.iter().map(|p| (p.name, p.id)).collect();
    let tag_sids = TAGS
        .iter()
        .enumerate()
        .map(|(i, t)| {
            (
                (t.predicate, t.value),
                SubjectId::new(C::TAG, i as i64 + 1),
            )
        })
        .collect();
    BootstrapIndex {
        collection_ids,
        predicate_ids,
        tag_sids,
    }
});

/// Collection id for a system collection name.
pub fn collection_id(name: &str) -> Option<u32> {
    INDEX.collection_ids.get(name).copied()
}

/// Predicate id for a system predicate name.
pub fn predicate_id(name: &str) -> Option<i64> {
    INDEX.predicate_ids.get(name).copied()
}

/// Tag subject id for a `(predicate-name, tag-value)` pair.
pub fn tag_sid(predicate: &str, value: &str) -> Option<SubjectId> {
    INDEX.tag_sids.get(&(predicate, value)).copied()
}

/// The result of a genesis bootstrap.
#[derive(Clone, Debug)]
pub struct Genesis {
    /// Always 1
    pub block: u64,
    /// Always -2 (the block's own logical time)
    pub t: i64,
    /// Wall-clock ms supplied by the caller
    pub instant: i64,
    /// Block content hash
    pub hash: String,
    /// Master authority account id recovered from the command signature
    pub auth_id: String,
    /// All genesis flakes, spot-ordered, including the post-hash flakes
    pub flakes: Vec<Flake>,
    /// Schema cache matching the genesis flakes
    pub schema: Schema,
    /// Per-collection high-water mark of issued sub-ids
    pub ecount: FxHashMap<u32, i64>,
}

// Well-known subject ids minted by the bootstrap.
const FN_TRUE: i64 = 1;
const FN_FALSE: i64 = 2;
const ROOT_RULE: i64 = 1;
const ROOT_ROLE: i64 = 1;
const MASTER_AUTH: i64 = 1;
const ROOT_SETTING: i64 = 1;

/// Subject id of the master authority record.
pub fn master_auth_sid() -> SubjectId {
    SubjectId::new(C::AUTH, MASTER_AUTH)
}

fn p(pid: i64) -> SubjectId {
    SubjectId::new(C::PREDICATE, pid)
}

fn resolve_tag(predicate: &str, value: &str) -> Result<FlakeValue> {
    tag_sid(predicate, value)
        .map(FlakeValue::Ref)
        .ok_or_else(|| SchemaError::bootstrap(format!("unresolved tag {}:{}", predicate, value)))
}

/// Build the schema cache for the bootstrap program.
pub fn bootstrap_schema() -> Schema {
    let mut schema = Schema::new();
    for c in COLLECTIONS {
        schema.put_collection(Collection {
            id: c.id,
            name: c.name.to_string(),
            doc: Some(c.doc.to_string()),
            version: Some("1".to_string()),
            ..Collection::default()
        });
    }
    for def in PREDICATES.iter() {
        let mut pred = Predicate::new(def.id, def.name, def.ptype);
        pred.doc = Some(def.doc.to_string());
        pred.multi = def.multi;
        pred.unique = def.unique;
        pred.index = def.index;
        pred.upsert = def.upsert;
        pred.component = def.component;
        pred.restrict_collection = def.restrict_collection.map(str::to_string);
        schema.put_predicate(pred);
    }
    for (i, t) in TAGS.iter().enumerate() {
        schema.put_tag(t.predicate, t.value, SubjectId::new(C::TAG, i as i64 + 1));
    }
    schema
}

/// Genesis ecount: the largest sub-id issued per collection.
fn genesis_ecount() -> FxHashMap<u32, i64> {
    let mut ecount = FxHashMap::default();
    for c in COLLECTIONS {
        ecount.insert(c.id, 0);
    }
    let max_pid = PREDICATES.iter().map(|p| p.id).max().unwrap_or(0);
    ecount.insert(C::PREDICATE, max_pid);
    ecount.insert(C::COLLECTION, COLLECTIONS.iter().map(|c| c.id as i64).max().unwrap_or(0));
    ecount.insert(C::TAG, TAGS.len() as i64);
    ecount.insert(C::FN, FN_FALSE);
    ecount.insert(C::AUTH, MASTER_AUTH);
    ecount.insert(C::ROLE, ROOT_ROLE);
    ecount.insert(C::RULE, ROOT_RULE);
    ecount.insert(C::SETTING, ROOT_SETTING);
    ecount
}

/// Schema flakes for the static program, all at `t = -1`.
fn program_flakes(t: i64) -> Result<Vec<Flake>> {
    let mut flakes = Vec::new();

    for c in COLLECTIONS {
        let s = SubjectId::new(C::COLLECTION, c.id as i64);
        flakes.push(Flake::assert(s, p(P::COLLECTION_NAME), FlakeValue::String(c.name.into()), t));
        flakes.push(Flake::assert(s, p(P::COLLECTION_DOC), FlakeValue::String(c.doc.into()), t));
        flakes.push(Flake::assert(s, p(P::COLLECTION_VERSION), FlakeValue::String("1".into()), t));
    }

    for def in PREDICATES.iter() {
        let s = SubjectId::new(C::PREDICATE, def.id);
        flakes.push(Flake::assert(s, p(P::PREDICATE_NAME), FlakeValue::String(def.name.into()), t));
        flakes.push(Flake::assert(s, p(P::PREDICATE_DOC), FlakeValue::String(def.doc.into()), t));
        flakes.push(Flake::assert(
            s,
            p(P::PREDICATE_TYPE),
            resolve_tag("_predicate/type", def.ptype.as_str())?,
            t,
        ));
        if def.multi {
            flakes.push(Flake::assert(s, p(P::PREDICATE_MULTI), FlakeValue::Boolean(true), t));
        }
        if def.unique {
            flakes.push(Flake::assert(s, p(P::PREDICATE_UNIQUE), FlakeValue::Boolean(true), t));
        }
        if def.index {
            flakes.push(Flake::assert(s, p(P::PREDICATE_INDEX), FlakeValue::Boolean(true), t));
        }
        if def.upsert {
            flakes.push(Flake::assert(s, p(P::PREDICATE_UPSERT), FlakeValue::Boolean(true), t));
        }
        if def.component {
            flakes.push(Flake::assert(s, p(P::PREDICATE_COMPONENT), FlakeValue::Boolean(true), t));
        }
        if let Some(rc) = def.restrict_collection {
            flakes.push(Flake::assert(
                s,
                p(P::PREDICATE_RESTRICT_COLLECTION),
                FlakeValue::String(rc.into()),
                t,
            ));
        }
    }

    for (i, tag_def) in TAGS.iter().enumerate() {
        let s = SubjectId::new(C::TAG, i as i64 + 1);
        flakes.push(Flake::assert(
            s,
            p(P::TAG_ID),
            FlakeValue::String(format!("{}:{}", tag_def.predicate, tag_def.value)),
            t,
        ));
    }

    Ok(flakes)
}

/// Master authority flakes: the boolean `_fn`s, the root rule and role,
/// the `_auth` record carrying the recovered master authority, and the
/// `_setting` record tying ledger identity to that auth.
fn authority_flakes(auth_id: &str, t: i64) -> Result<Vec<Flake>> {
    let fn_true = SubjectId::new(C::FN, FN_TRUE);
    let fn_false = SubjectId::new(C::FN, FN_FALSE);
    let rule = SubjectId::new(C::RULE, ROOT_RULE);
    let role = SubjectId::new(C::ROLE, ROOT_ROLE);
    let auth = master_auth_sid();
    let setting = SubjectId::new(C::SETTING, ROOT_SETTING);

    Ok(vec![
        Flake::assert(fn_true, p(P::FN_NAME), FlakeValue::String("true".into()), t),
        Flake::assert(fn_true, p(P::FN_CODE), FlakeValue::String("true".into()), t),
        Flake::assert(fn_true, p(P::FN_DOC), FlakeValue::String("Always allow".into()), t),
        Flake::assert(fn_false, p(P::FN_NAME), FlakeValue::String("false".into()), t),
        Flake::assert(fn_false, p(P::FN_CODE), FlakeValue::String("false".into()), t),
        Flake::assert(fn_false, p(P::FN_DOC), FlakeValue::String("Always deny".into()), t),
        Flake::assert(rule, p(P::RULE_ID), FlakeValue::String("root".into()), t),
        Flake::assert(rule, p(P::RULE_DOC), FlakeValue::String("Root rule, grants full access".into()), t),
        Flake::assert(rule, p(P::RULE_COLLECTION), FlakeValue::String("*".into()), t),
        Flake::assert(rule, p(P::RULE_COLLECTION_DEFAULT), FlakeValue::Boolean(true), t),
        Flake::assert(rule, p(P::RULE_PREDICATES), FlakeValue::String("*".into()), t),
        Flake::assert(rule, p(P::RULE_FNS), FlakeValue::Ref(fn_true), t),
        Flake::assert(rule, p(P::RULE_OPS), resolve_tag("_rule/ops", "all")?, t),
        Flake::assert(role, p(P::ROLE_ID), FlakeValue::String("root".into()), t),
        Flake::assert(role, p(P::ROLE_DOC), FlakeValue::String("Root role".into()), t),
        Flake::assert(role, p(P::ROLE_RULES), FlakeValue::Ref(rule), t),
        Flake::assert(auth, p(P::AUTH_ID), FlakeValue::String(auth_id.into()), t),
        Flake::assert(auth, p(P::AUTH_DOC), FlakeValue::String("Master authority".into()), t),
        Flake::assert(auth, p(P::AUTH_ROLES), FlakeValue::Ref(role), t),
        Flake::assert(auth, p(P::AUTH_TYPE), resolve_tag("_auth/type", "secp256k1")?, t),
        Flake::assert(setting, p(P::SETTING_ID), FlakeValue::String("root".into()), t),
        Flake::assert(setting, p(P::SETTING_DOC), FlakeValue::String("Ledger settings".into()), t),
        Flake::assert(setting, p(P::SETTING_LEDGERS), FlakeValue::Ref(auth), t),
    ])
}

/// Bootstrap a new ledger from a signed new-database command.
///
/// Deterministic: the same `(cmd, sig, timestamp)` always yields a
/// byte-identical genesis block.
pub fn bootstrap(cmd: &str, sig: &str, timestamp: i64) -> Result<Genesis> {
    let auth_id = recover_auth_id(cmd.as_bytes(), sig)
        .map_err(|e| SchemaError::MissingMasterAuthority(e.to_string()))?;

    // _auth/id must exist in the program; anything else is a program defect.
    if predicate_id("_auth/id") != Some(P::AUTH_ID) {
        return Err(SchemaError::bootstrap("missing _auth/id predicate id"));
    }

    let tx_t = -1;
    let block_t = -2;

    let mut flakes = program_flakes(tx_t)?;
    flakes.extend(authority_flakes(&auth_id, tx_t)?);

    // Transaction meta at t = -1.
    let tx_subject = SubjectId::from_t(tx_t);
    flakes.push(Flake::assert(tx_subject, p(P::TX_ID), FlakeValue::String(tx_id(cmd)), tx_t));
    flakes.push(Flake::assert(tx_subject, p(P::TX_NONCE), FlakeValue::Long(timestamp), tx_t));

    // Block header at t = -2.
    let block_subject = SubjectId::from_t(block_t);
    flakes.push(Flake::assert(block_subject, p(P::BLOCK_NUMBER), FlakeValue::Long(1), block_t));
    flakes.push(Flake::assert(block_subject, p(P::BLOCK_INSTANT), FlakeValue::Instant(timestamp), block_t));
    flakes.push(Flake::assert(block_subject, p(P::BLOCK_TRANSACTIONS), FlakeValue::Ref(tx_subject), block_t));
    flakes.push(Flake::assert(block_subject, p(P::BLOCK_TRANSACTIONS), FlakeValue::Ref(block_subject), block_t));

    // Hash over the spot-ordered canonical sequence, then append the
    // hash and ledgers flakes (excluded from their own hash).
    flakes.sort_by(cmp_spot);
    let hash = hash_flakes(&flakes);

    flakes.push(Flake::assert(block_subject, p(P::BLOCK_HASH), FlakeValue::String(hash.clone()), block_t));
    flakes.push(Flake::assert(block_subject, p(P::BLOCK_LEDGERS), FlakeValue::Ref(master_auth_sid()), block_t));
    flakes.sort_by(cmp_spot);

    Ok(Genesis {
        block: 1,
        t: block_t,
        instant: timestamp,
        hash,
        auth_id,
        flakes,
        schema: bootstrap_schema(),
        ecount: genesis_ecount(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluree_ledger_core::IndexOrder;
    use fluree_ledger_crypto::{sign_command, SigningKey};

    fn signed_cmd() -> (String, String) {
        let cmd = r#"{"type":"new-db","db":"net/db","auth":"0xabc","nonce":1000,"expire":1000300000}"#;
        let key = SigningKey::from_slice(&[11u8; 32]).unwrap();
        let sig = sign_command(cmd.as_bytes(), &key).unwrap();
        (cmd.to_string(), sig)
    }

    #[test]
    fn test_bootstrap_deterministic() {
        let (cmd, sig) = signed_cmd();
        let a = bootstrap(&cmd, &sig, 1000).unwrap();
        let b = bootstrap(&cmd, &sig, 1000).unwrap();
        assert_eq!(a.hash, b.hash);
        assert_eq!(a.flakes, b.flakes);
        assert_eq!(a.block, 1);
        assert_eq!(a.t, -2);
    }

    #[test]
    fn test_bootstrap_different_timestamp_different_hash() {
        let (cmd, sig) = signed_cmd();
        let a = bootstrap(&cmd, &sig, 1000).unwrap();
        let b = bootstrap(&cmd, &sig, 2000).unwrap();
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn test_bootstrap_hash_excludes_hash_flakes() {
        let (cmd, sig) = signed_cmd();
        let genesis = bootstrap(&cmd, &sig, 1000).unwrap();

        let hashed: Vec<Flake> = genesis
            .flakes
            .iter()
            .filter(|f| {
                f.p.sub_id() != P::BLOCK_HASH && f.p.sub_id() != P::BLOCK_LEDGERS
            })
            .cloned()
            .collect();
        assert_eq!(hash_flakes(&hashed), genesis.hash);
    }

    #[test]
    fn test_bootstrap_flakes_spot_sorted() {
        let (cmd, sig) = signed_cmd();
        let genesis = bootstrap(&cmd, &sig, 1000).unwrap();
        for pair in genesis.flakes.windows(2) {
            assert_ne!(
                IndexOrder::Spot.compare(&pair[0], &pair[1]),
                std::cmp::Ordering::Greater
            );
        }
    }

    #[test]
    fn test_bootstrap_block_header() {
        let (cmd, sig) = signed_cmd();
        let genesis = bootstrap(&cmd, &sig, 1000).unwrap();

        let block_subject = SubjectId::from_t(-2);
        let number = genesis
            .flakes
            .iter()
            .find(|f| f.s == block_subject && f.p.sub_id() == P::BLOCK_NUMBER)
            .unwrap();
        assert_eq!(number.o, FlakeValue::Long(1));
        assert_eq!(number.t, -2);

        let txs: Vec<_> = genesis
            .flakes
            .iter()
            .filter(|f| f.s == block_subject && f.p.sub_id() == P::BLOCK_TRANSACTIONS)
            .collect();
        assert_eq!(txs.len(), 2);
    }

    #[test]
    fn test_bootstrap_master_auth() {
        let (cmd, sig) = signed_cmd();
        let genesis = bootstrap(&cmd, &sig, 1000).unwrap();

        let auth_flake = genesis
            .flakes
            .iter()
            .find(|f| f.s == master_auth_sid() && f.p.sub_id() == P::AUTH_ID)
            .unwrap();
        assert_eq!(
            auth_flake.o,
            FlakeValue::String(genesis.auth_id.clone())
        );
        assert!(genesis.auth_id.starts_with("0x"));
    }

    #[test]
    fn test_bootstrap_bad_signature_fails() {
        let err = bootstrap("{}", "not-hex", 1000).unwrap_err();
        assert!(matches!(err, SchemaError::MissingMasterAuthority(_)));
    }

    #[test]
    fn test_lookup_tables() {
        assert_eq!(collection_id("_predicate"), Some(C::PREDICATE));
        assert_eq!(collection_id("_auth"), Some(C::AUTH));
        assert_eq!(predicate_id("_block/hash"), Some(P::BLOCK_HASH));
        assert_eq!(predicate_id("nope/nope"), None);
        assert!(tag_sid("_predicate/type", "string").is_some());
        assert!(tag_sid("_predicate/type", "nope").is_none());

        // Tag sids are dense, sequential and in _tag.
        let first = tag_sid("_predicate/type", "string").unwrap();
        assert_eq!(first, SubjectId::new(C::TAG, 1));
    }

    #[test]
    fn test_ecount_high_water_marks() {
        let (cmd, sig) = signed_cmd();
        let genesis = bootstrap(&cmd, &sig, 1000).unwrap();
        assert_eq!(genesis.ecount[&C::TAG], TAGS.len() as i64);
        assert_eq!(genesis.ecount[&C::AUTH], 1);
        assert_eq!(genesis.ecount[&C::PREDICATE], P::BLOCK_SIGS);
        assert_eq!(genesis.ecount[&C::USER], 0);
    }

    #[test]
    fn test_schema_matches_program() {
        let schema = bootstrap_schema();
        assert!(schema.predicate_by_name("_predicate/type").unwrap().is_ref());
        assert!(schema.predicate_by_name("_block/transactions").unwrap().multi);
        assert!(schema.predicate_by_name("_auth/id").unwrap().unique);
        assert_eq!(schema.collection_by_name("_tag").unwrap().id, C::TAG);
    }
}
