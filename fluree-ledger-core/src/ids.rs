//! Stable numeric ids for the system schema
//!
//! Every system collection and predicate carries an explicit numeric id so
//! that ids embedded in code are portable across ledger instances and
//! releases. The bootstrap program is the authoritative source of the full
//! definitions; these constants let the rest of the system address system
//! subjects without a schema lookup.

/// System collection ids.
pub mod collection {
    pub const PREDICATE: u32 = 0;
    pub const COLLECTION: u32 = 1;
    pub const SHARD: u32 = 2;
    pub const TAG: u32 = 3;
    pub const FN: u32 = 4;
    pub const USER: u32 = 5;
    pub const AUTH: u32 = 6;
    pub const ROLE: u32 = 7;
    pub const RULE: u32 = 8;
    pub const SETTING: u32 = 9;
    pub const TX: u32 = 10;
    pub const BLOCK: u32 = 11;
}

/// System predicate ids (within-collection ids in collection `_predicate`).
///
/// Use [`crate::SubjectId::new`]`(collection::PREDICATE, pid)` to build the
/// full predicate subject id.
pub mod predicate {
    // _predicate/*
    pub const PREDICATE_NAME: i64 = 10;
    pub const PREDICATE_DOC: i64 = 11;
    pub const PREDICATE_TYPE: i64 = 12;
    pub const PREDICATE_UNIQUE: i64 = 13;
    pub const PREDICATE_MULTI: i64 = 14;
    pub const PREDICATE_INDEX: i64 = 15;
    pub const PREDICATE_UPSERT: i64 = 16;
    pub const PREDICATE_COMPONENT: i64 = 17;
    pub const PREDICATE_NO_HISTORY: i64 = 18;
    pub const PREDICATE_RESTRICT_COLLECTION: i64 = 19;
    pub const PREDICATE_SPEC: i64 = 20;
    pub const PREDICATE_ENCRYPTED: i64 = 21;
    pub const PREDICATE_DEPRECATED: i64 = 22;
    pub const PREDICATE_SPEC_DOC: i64 = 23;
    pub const PREDICATE_TX_SPEC: i64 = 24;
    pub const PREDICATE_TX_SPEC_DOC: i64 = 25;
    pub const PREDICATE_RESTRICT_TAG: i64 = 26;
    pub const PREDICATE_FULL_TEXT: i64 = 27;

    // _collection/*
    pub const COLLECTION_NAME: i64 = 40;
    pub const COLLECTION_DOC: i64 = 41;
    pub const COLLECTION_VERSION: i64 = 42;
    pub const COLLECTION_SPEC: i64 = 43;
    pub const COLLECTION_SPEC_DOC: i64 = 44;
    pub const COLLECTION_SHARD: i64 = 45;

    // _tag/*
    pub const TAG_ID: i64 = 50;
    pub const TAG_DOC: i64 = 51;

    // _fn/*
    pub const FN_NAME: i64 = 60;
    pub const FN_PARAMS: i64 = 61;
    pub const FN_CODE: i64 = 62;
    pub const FN_DOC: i64 = 63;
    pub const FN_LANGUAGE: i64 = 64;
    pub const FN_SPEC: i64 = 65;

    // _user/*
    pub const USER_USERNAME: i64 = 70;
    pub const USER_AUTH: i64 = 71;
    pub const USER_ROLES: i64 = 72;
    pub const USER_DOC: i64 = 73;

    // _auth/*
    pub const AUTH_ID: i64 = 80;
    pub const AUTH_PASSWORD: i64 = 81;
    pub const AUTH_SALT: i64 = 82;
    pub const AUTH_ROLES: i64 = 83;
    pub const AUTH_DOC: i64 = 84;
    pub const AUTH_TYPE: i64 = 85;
    pub const AUTH_AUTHORITY: i64 = 86;
    pub const AUTH_FUEL: i64 = 87;

    // _role/*
    pub const ROLE_ID: i64 = 90;
    pub const ROLE_DOC: i64 = 91;
    pub const ROLE_RULES: i64 = 92;

    // _rule/*
    pub const RULE_ID: i64 = 100;
    pub const RULE_DOC: i64 = 101;
    pub const RULE_COLLECTION: i64 = 102;
    pub const RULE_PREDICATES: i64 = 103;
    pub const RULE_FNS: i64 = 104;
    pub const RULE_OPS: i64 = 105;
    pub const RULE_COLLECTION_DEFAULT: i64 = 106;
    pub const RULE_ERROR_MESSAGE: i64 = 107;

    // _setting/*
    pub const SETTING_ID: i64 = 110;
    pub const SETTING_DOC: i64 = 111;
    pub const SETTING_LANGUAGE: i64 = 112;
    pub const SETTING_CONSENSUS: i64 = 113;
    pub const SETTING_TX_MAX: i64 = 114;
    pub const SETTING_ANONYMOUS: i64 = 115;
    pub const SETTING_LEDGERS: i64 = 116;

    // _shard/*
    pub const SHARD_NAME: i64 = 120;
    pub const SHARD_MINERS: i64 = 121;
    pub const SHARD_MUTABLE: i64 = 122;

    // _tx/*
    pub const TX_ID: i64 = 130;
    pub const TX_AUTH: i64 = 131;
    pub const TX_AUTHORITY: i64 = 132;
    pub const TX_NONCE: i64 = 133;
    pub const TX_ERROR: i64 = 134;
    pub const TX_SIG: i64 = 135;
    pub const TX_TEMPIDS: i64 = 136;

    // _block/*
    pub const BLOCK_NUMBER: i64 = 140;
    pub const BLOCK_INSTANT: i64 = 141;
    pub const BLOCK_HASH: i64 = 142;
    pub const BLOCK_PREV_HASH: i64 = 143;
    pub const BLOCK_TRANSACTIONS: i64 = 144;
    pub const BLOCK_LEDGERS: i64 = 145;
    pub const BLOCK_SIGS: i64 = 146;
}
