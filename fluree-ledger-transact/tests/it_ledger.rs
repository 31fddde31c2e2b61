//! End-to-end ledger scenarios: genesis, schema mutations, block chaining.

use fluree_ledger_core::ids::predicate as P;
use fluree_ledger_core::{IndexOrder, MemoryStorage, SubjectId};
use fluree_ledger_crypto::{sign_command, SigningKey};
use fluree_ledger_transact::{
    read_block, LedgerState, SignedCommand, StageOptions,
};

fn sign(cmd: &str) -> SignedCommand {
    let key = SigningKey::from_slice(&[42u8; 32]).unwrap();
    SignedCommand::new(cmd, sign_command(cmd.as_bytes(), &key).unwrap())
}

fn new_db_cmd() -> SignedCommand {
    sign(r#"{"type":"new-db","db":"net/db","auth":"0xabc","nonce":1000,"expire":1000300000}"#)
}

async fn fresh_ledger() -> (LedgerState, MemoryStorage) {
    let storage = MemoryStorage::new();
    let (ledger, _block) = LedgerState::genesis(&storage, &new_db_cmd(), 1000)
        .await
        .unwrap();
    (ledger, storage)
}

fn tx(statements: &str) -> SignedCommand {
    sign(&format!(
        r#"{{"type":"tx","db":"net/db","tx":{}}}"#,
        statements
    ))
}

/// Create a predicate, returning its subject id from the tempid mapping.
async fn create_predicate(
    ledger: &mut LedgerState,
    storage: &MemoryStorage,
    statement: &str,
) -> SubjectId {
    let (receipts, block) = ledger
        .transact(storage, &[tx(statement)], 2000, StageOptions::new())
        .await
        .unwrap();
    assert!(block.is_some(), "predicate creation failed: {:?}", receipts);
    assert_eq!(receipts[0].status, 200);
    *receipts[0].tempids.values().next().unwrap()
}

#[tokio::test]
async fn test_genesis_block_one_and_deterministic() {
    let storage_a = MemoryStorage::new();
    let (ledger_a, block_a) = LedgerState::genesis(&storage_a, &new_db_cmd(), 1000)
        .await
        .unwrap();

    let storage_b = MemoryStorage::new();
    let (_ledger_b, block_b) = LedgerState::genesis(&storage_b, &new_db_cmd(), 1000)
        .await
        .unwrap();

    assert_eq!(ledger_a.block, 1);
    assert_eq!(ledger_a.t, -2);
    // Hash stable across runs with identical (cmd, sig, timestamp).
    assert_eq!(block_a.hash, block_b.hash);
    assert_eq!(block_a.flakes, block_b.flakes);

    // Novelty contains exactly the bootstrap flakes.
    assert_eq!(
        ledger_a.novelty.len(),
        block_a.flakes.len()
    );

    // The persisted block round-trips and carries a verifiable hash.
    let persisted = read_block(&storage_a, "net", "db", 1).await.unwrap();
    assert_eq!(persisted.hash, block_a.hash);
    assert_eq!(persisted.computed_hash(), persisted.hash);
}

#[tokio::test]
async fn test_legal_type_change_int_to_long() {
    let (mut ledger, storage) = fresh_ledger().await;
    let pred = create_predicate(
        &mut ledger,
        &storage,
        r#"[{"_id":"_predicate","_predicate/name":"x/y","_predicate/type":"int"}]"#,
    )
    .await;

    let novelty_before = ledger.novelty.len();
    let change = tx(&format!(
        r#"[{{"_id":{id},"_action":"delete","_predicate/type":"int"}},{{"_id":{id},"_predicate/type":"long"}}]"#,
        id = pred.0
    ));
    let (receipts, block) = ledger
        .transact(&storage, &[change], 3000, StageOptions::new())
        .await
        .unwrap();

    assert_eq!(receipts[0].status, 200, "{:?}", receipts);
    assert!(block.is_some());
    // Both the retraction and the assertion entered novelty.
    assert!(ledger.novelty.len() > novelty_before + 1);
    let type_flakes: Vec<_> = ledger
        .novelty
        .iter_order(IndexOrder::Spot)
        .filter(|f| f.s == pred && f.p.sub_id() == P::PREDICATE_TYPE)
        .collect();
    assert!(type_flakes.iter().any(|f| !f.op));
    assert!(type_flakes.iter().filter(|f| f.op).count() >= 2);
    // Queries at the new t see the new type.
    assert_eq!(
        ledger.schema.predicate_by_subject(pred).unwrap().ptype,
        Some(fluree_ledger_core::PredicateType::Long)
    );
}

#[tokio::test]
async fn test_illegal_type_change_rejected() {
    let (mut ledger, storage) = fresh_ledger().await;
    let pred = create_predicate(
        &mut ledger,
        &storage,
        r#"[{"_id":"_predicate","_predicate/name":"x/y","_predicate/type":"int"}]"#,
    )
    .await;

    let novelty_before = ledger.novelty.len();
    let block_before = ledger.block;
    let change = tx(&format!(
        r#"[{{"_id":{id},"_action":"delete","_predicate/type":"int"}},{{"_id":{id},"_predicate/type":"boolean"}}]"#,
        id = pred.0
    ));
    let (receipts, block) = ledger
        .transact(&storage, &[change], 3000, StageOptions::new())
        .await
        .unwrap();

    assert_eq!(receipts[0].status, 400);
    assert_eq!(receipts[0].error.as_deref(), Some("invalid-predicate"));
    // The rejected transaction carries its _tx/error flake in the receipt.
    let error_flakes = receipts[0].flakes.as_ref().unwrap();
    assert!(error_flakes.iter().any(|f| f.p.sub_id() == P::TX_ERROR));
    // Novelty unchanged; block not advanced by this tx alone.
    assert!(block.is_none());
    assert_eq!(ledger.novelty.len(), novelty_before);
    assert_eq!(ledger.block, block_before);
}

#[tokio::test]
async fn test_unique_on_existing_rejected_with_migration_hint() {
    let (mut ledger, storage) = fresh_ledger().await;
    let pred = create_predicate(
        &mut ledger,
        &storage,
        r#"[{"_id":"_predicate","_predicate/name":"a/b","_predicate/type":"string"}]"#,
    )
    .await;

    let change = tx(&format!(
        r#"[{{"_id":{},"_predicate/unique":true}}]"#,
        pred.0
    ));
    let (receipts, _) = ledger
        .transact(&storage, &[change], 3000, StageOptions::new())
        .await
        .unwrap();

    assert_eq!(receipts[0].status, 400);
    assert!(receipts[0]
        .message
        .as_ref()
        .unwrap()
        .contains("new unique predicate"));
}

#[tokio::test]
async fn test_component_requires_ref_type() {
    let (mut ledger, storage) = fresh_ledger().await;

    // New ref predicate with component=true succeeds.
    let ok = tx(
        r#"[{"_id":"_predicate","_predicate/name":"c/owns","_predicate/type":"ref","_predicate/component":true}]"#,
    );
    let (receipts, _) = ledger
        .transact(&storage, &[ok], 2000, StageOptions::new())
        .await
        .unwrap();
    assert_eq!(receipts[0].status, 200, "{:?}", receipts);

    // Same shape with type string is rejected.
    let bad = tx(
        r#"[{"_id":"_predicate","_predicate/name":"c/tag","_predicate/type":"string","_predicate/component":true}]"#,
    );
    let (receipts, _) = ledger
        .transact(&storage, &[bad], 3000, StageOptions::new())
        .await
        .unwrap();
    assert_eq!(receipts[0].status, 400);
    assert_eq!(receipts[0].error.as_deref(), Some("invalid-predicate"));
}

#[tokio::test]
async fn test_post_removal_empty_when_still_indexed() {
    let (mut ledger, storage) = fresh_ledger().await;
    let pred = create_predicate(
        &mut ledger,
        &storage,
        r#"[{"_id":"_predicate","_predicate/name":"d/e","_predicate/type":"string","_predicate/index":true,"_predicate/unique":true}]"#,
    )
    .await;

    let post_before = ledger.novelty.iter_order(IndexOrder::Post).count();
    assert!(post_before > 0, "indexed predicate flakes must be in post");

    // Retract unique; index=true still holds, so nothing is removed from
    // the post projection.
    let change = tx(&format!(
        r#"[{{"_id":{},"_action":"delete","_predicate/unique":true}}]"#,
        pred.0
    ));
    let (receipts, block) = ledger
        .transact(&storage, &[change], 3000, StageOptions::new())
        .await
        .unwrap();

    assert_eq!(receipts[0].status, 200, "{:?}", receipts);
    assert!(block.is_some());
    assert!(
        ledger.novelty.iter_order(IndexOrder::Post).count() >= post_before,
        "post projection must keep the still-indexed predicate"
    );
}

#[tokio::test]
async fn test_hash_chain_across_blocks() {
    let (mut ledger, storage) = fresh_ledger().await;

    create_predicate(
        &mut ledger,
        &storage,
        r#"[{"_id":"_predicate","_predicate/name":"p/one","_predicate/type":"string"}]"#,
    )
    .await;
    create_predicate(
        &mut ledger,
        &storage,
        r#"[{"_id":"_predicate","_predicate/name":"p/two","_predicate/type":"string"}]"#,
    )
    .await;

    // Blocks 1..3 persisted; every block n > 1 links to block n-1.
    let b1 = read_block(&storage, "net", "db", 1).await.unwrap();
    let b2 = read_block(&storage, "net", "db", 2).await.unwrap();
    let b3 = read_block(&storage, "net", "db", 3).await.unwrap();

    assert!(b1.prev_hash.is_none());
    assert!(b2.verify_chain(&b1));
    assert!(b3.verify_chain(&b2));
    for block in [&b1, &b2, &b3] {
        assert_eq!(block.computed_hash(), block.hash);
    }
    assert_eq!(ledger.block, 3);
    assert_eq!(ledger.block_hash.as_deref(), Some(b3.hash.as_str()));
}

#[tokio::test]
async fn test_expired_command_rejected() {
    let (mut ledger, storage) = fresh_ledger().await;
    let cmd = sign(r#"{"type":"tx","db":"net/db","tx":[],"expire":1500}"#);
    let (receipts, block) = ledger
        .transact(&storage, &[cmd], 2000, StageOptions::new())
        .await
        .unwrap();
    assert_eq!(receipts[0].status, 400);
    assert_eq!(receipts[0].message.as_deref(), Some("command expired"));
    assert!(block.is_none());
}

#[tokio::test]
async fn test_mixed_batch_rejection_spares_siblings() {
    let (mut ledger, storage) = fresh_ledger().await;

    let good = tx(r#"[{"_id":"_predicate","_predicate/name":"m/ok","_predicate/type":"string"}]"#);
    let bad = tx(r#"[{"_id":"_predicate","_predicate/name":"m/bad"}]"#); // no type
    let (receipts, block) = ledger
        .transact(&storage, &[good, bad], 2000, StageOptions::new())
        .await
        .unwrap();

    assert_eq!(receipts.len(), 2);
    assert_eq!(receipts[0].status, 200);
    assert_eq!(receipts[1].status, 400);
    // The block seals with the admitted transaction only.
    let block = block.unwrap();
    assert_eq!(block.tx_ids.len(), 1);
    assert!(ledger.schema.predicate_by_name("m/ok").is_some());
    assert!(ledger.schema.predicate_by_name("m/bad").is_none());
}
