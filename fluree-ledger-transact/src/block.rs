//! Block sealing
//!
//! A block is a hash-chained batch of admitted transactions. The block's
//! own logical time sits one era below the newest transaction; its header
//! flakes live on the block subject (the block `t` itself). The content
//! hash is SHA3-256 over the canonical JSON of the spot-ordered flake set
//! *excluding* the `_block/hash` and `_block/ledgers` flakes, which are
//! appended after hashing.

use crate::stage::StagedTx;
use fluree_ledger_core::ids::{collection as C, predicate as P};
use fluree_ledger_core::{cmp_spot, Flake, FlakeValue, SubjectId};
use fluree_ledger_crypto::hash_flakes;
use serde::{Deserialize, Serialize};

/// A sealed block, ready for persistence and replication.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Block {
    pub number: u64,
    /// The block's own logical time
    pub t: i64,
    /// Wall-clock ms when the block was sealed
    pub instant: i64,
    pub hash: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub prev_hash: Option<String>,
    /// All flakes in the block, spot-ordered, including the post-hash
    /// `_block/hash` and `_block/ledgers` flakes
    pub flakes: Vec<Flake>,
    /// Transaction ids sealed in this block, newest-era last
    pub tx_ids: Vec<String>,
}

/// Seal admitted transactions into a block.
///
/// `prev` is `(block-number, hash)` of the chain head; the new block is
/// `prev.0 + 1` and carries a `_block/prevHash` flake for every block
/// after the genesis block.
pub fn seal_block(
    prev: (u64, Option<&str>),
    staged: &[StagedTx],
    instant: i64,
    ledger_auth: SubjectId,
) -> Block {
    let number = prev.0 + 1;
    // Transactions carry strictly decreasing t; the block header sits one
    // era below the newest of them.
    let block_t = staged.iter().map(|s| s.t).min().expect("seal_block needs transactions") - 1;
    let block_subject = SubjectId::from_t(block_t);
    let p = |pid| SubjectId::new(C::PREDICATE, pid);

    let span = tracing::debug_span!("seal_block", number, block_t, txs = staged.len());
    let _guard = span.enter();

    let mut flakes: Vec<Flake> = staged.iter().flat_map(|s| s.flakes.clone()).collect();

    flakes.push(Flake::assert(block_subject, p(P::BLOCK_NUMBER), FlakeValue::Long(number as i64), block_t));
    flakes.push(Flake::assert(block_subject, p(P::BLOCK_INSTANT), FlakeValue::Instant(instant), block_t));
    if let Some(prev_hash) = prev.1 {
        flakes.push(Flake::assert(
            block_subject,
            p(P::BLOCK_PREV_HASH),
            FlakeValue::String(prev_hash.to_string()),
            block_t,
        ));
    }
    for tx in staged {
        flakes.push(Flake::assert(
            block_subject,
            p(P::BLOCK_TRANSACTIONS),
            FlakeValue::Ref(SubjectId::from_t(tx.t)),
            block_t,
        ));
    }
    flakes.push(Flake::assert(
        block_subject,
        p(P::BLOCK_TRANSACTIONS),
        FlakeValue::Ref(block_subject),
        block_t,
    ));

    flakes.sort_by(cmp_spot);
    let hash = hash_flakes(&flakes);

    flakes.push(Flake::assert(block_subject, p(P::BLOCK_HASH), FlakeValue::String(hash.clone()), block_t));
    flakes.push(Flake::assert(block_subject, p(P::BLOCK_LEDGERS), FlakeValue::Ref(ledger_auth), block_t));
    flakes.sort_by(cmp_spot);

    tracing::info!(number, hash = %hash, flakes = flakes.len(), "block sealed");

    Block {
        number,
        t: block_t,
        instant,
        hash,
        prev_hash: prev.1.map(str::to_string),
        flakes,
        tx_ids: staged.iter().map(|s| s.tx_id.clone()).collect(),
    }
}

impl Block {
    /// Recompute the content hash from the block's flakes.
    ///
    /// The `_block/hash` and `_block/ledgers` flakes are excluded from
    /// their own hash.
    pub fn computed_hash(&self) -> String {
        let hashed: Vec<Flake> = self
            .flakes
            .iter()
            .filter(|f| {
                !(f.p.collection() == C::PREDICATE
                    && matches!(f.p.sub_id(), P::BLOCK_HASH | P::BLOCK_LEDGERS))
            })
            .cloned()
            .collect();
        hash_flakes(&hashed)
    }

    /// Verify the hash chain link against the previous block.
    pub fn verify_chain(&self, prev: &Block) -> bool {
        self.prev_hash.as_deref() == Some(prev.hash.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluree_ledger_core::Schema;
    use rustc_hash::FxHashMap;
    use std::collections::HashMap;

    fn staged_tx(t: i64, flakes: Vec<Flake>) -> StagedTx {
        StagedTx {
            t,
            tx_id: format!("tx-{}", -t),
            auth_id: "0xabc".to_string(),
            flakes,
            tempids: HashMap::new(),
            error: None,
            schema_after: Schema::new(),
            ecount_after: FxHashMap::default(),
            remove_from_post: Vec::new(),
        }
    }

    fn data_flake(s: i64, t: i64) -> Flake {
        Flake::assert(
            SubjectId::new(20, s),
            SubjectId::new(0, 1000),
            FlakeValue::Long(s),
            t,
        )
    }

    #[test]
    fn test_seal_block_header() {
        let staged = vec![staged_tx(-3, vec![data_flake(1, -3)])];
        let block = seal_block((1, Some("prev")), &staged, 5000, SubjectId::new(6, 1));

        assert_eq!(block.number, 2);
        assert_eq!(block.t, -4);
        assert_eq!(block.prev_hash.as_deref(), Some("prev"));
        assert_eq!(block.tx_ids, vec!["tx-3"]);

        let block_subject = SubjectId::from_t(-4);
        let txs: Vec<_> = block
            .flakes
            .iter()
            .filter(|f| f.s == block_subject && f.p.sub_id() == P::BLOCK_TRANSACTIONS)
            .collect();
        // One per tx plus the block's own t.
        assert_eq!(txs.len(), 2);
    }

    #[test]
    fn test_hash_excludes_hash_flakes() {
        let staged = vec![staged_tx(-3, vec![data_flake(1, -3)])];
        let block = seal_block((1, Some("prev")), &staged, 5000, SubjectId::new(6, 1));
        assert_eq!(block.computed_hash(), block.hash);
    }

    #[test]
    fn test_chain_verification() {
        let staged_a = vec![staged_tx(-3, vec![data_flake(1, -3)])];
        let a = seal_block((1, None), &staged_a, 5000, SubjectId::new(6, 1));

        let staged_b = vec![staged_tx(-5, vec![data_flake(2, -5)])];
        let b = seal_block((a.number, Some(&a.hash)), &staged_b, 6000, SubjectId::new(6, 1));

        assert!(b.verify_chain(&a));
        assert_eq!(b.number, a.number + 1);

        let unrelated = seal_block((9, Some("zzz")), &staged_b, 6000, SubjectId::new(6, 1));
        assert!(!unrelated.verify_chain(&a));
    }

    #[test]
    fn test_multiple_txs_decreasing_t() {
        let staged = vec![
            staged_tx(-3, vec![data_flake(1, -3)]),
            staged_tx(-4, vec![data_flake(2, -4)]),
        ];
        let block = seal_block((1, Some("prev")), &staged, 5000, SubjectId::new(6, 1));
        assert_eq!(block.t, -5);
        assert_eq!(block.tx_ids.len(), 2);
    }

    #[test]
    fn test_serde_round_trip() {
        let staged = vec![staged_tx(-3, vec![data_flake(1, -3)])];
        let block = seal_block((1, Some("prev")), &staged, 5000, SubjectId::new(6, 1));
        let bytes = serde_json::to_vec(&block).unwrap();
        let back: Block = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back.hash, block.hash);
        assert_eq!(back.flakes, block.flakes);
    }
}
