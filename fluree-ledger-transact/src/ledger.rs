//! Ledger state
//!
//! One owned structure per ledger: `(network, dbid, ecount, stats,
//! schema, novelty, t, block)`. Readers take cheap snapshots (`Arc`
//! clones of the novelty and schema views); the transactor is the single
//! writer and publishes new views atomically at block commit.
//!
//! A transaction batch is staged against working copies; the block is
//! fully persisted through the storage facade before any of it becomes
//! visible, so a failure (or cancellation) anywhere before commit leaves
//! no observable effect.

use crate::block::{seal_block, Block};
use crate::command::{verify, CommandType, SignedCommand};
use crate::error::{Result, TransactError};
use crate::stage::{stage, StageOptions, StagedTx};
use fluree_ledger_core::{block_key, Flake, Schema, Storage, SubjectId};
use fluree_ledger_novelty::{IndexConfig, Novelty};
use fluree_ledger_schema::{bootstrap, master_auth_sid};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Running ledger statistics.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct LedgerStats {
    /// Total flakes ever absorbed
    pub flakes: u64,
    /// Novelty size estimate in bytes
    pub size: u64,
}

/// The user-visible result of one transaction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TxReceipt {
    pub status: u16,
    pub tx_id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub block: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub hash: Option<String>,
    #[serde(skip_serializing_if = "HashMap::is_empty", default)]
    pub tempids: HashMap<String, SubjectId>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub flakes: Option<Vec<Flake>>,
}

/// A consistent read snapshot: `(block, t, novelty, schema)`.
///
/// A reader holding a snapshot sees exactly the novelty entries visible
/// at capture time and no more.
#[derive(Clone, Debug)]
pub struct LedgerSnapshot {
    pub block: u64,
    pub t: i64,
    pub novelty: Arc<Novelty>,
    pub schema: Arc<Schema>,
}

/// Per-ledger state
#[derive(Clone, Debug)]
pub struct LedgerState {
    pub network: String,
    pub dbid: String,
    /// Newest logical time (the chain head block's t)
    pub t: i64,
    /// Chain head block number
    pub block: u64,
    /// Chain head block hash
    pub block_hash: Option<String>,
    /// Per-collection high-water mark of issued sub-ids
    pub ecount: FxHashMap<u32, i64>,
    pub stats: LedgerStats,
    /// Immutable schema view, swapped at block commit
    pub schema: Arc<Schema>,
    /// Unflushed flakes in all five orders, swapped at block commit
    pub novelty: Arc<Novelty>,
    /// Auth subject signing this ledger's blocks
    pub ledger_auth: SubjectId,
}

impl LedgerState {
    /// Create a ledger by genesis bootstrap and persist block 1.
    pub async fn genesis<S: Storage>(
        storage: &S,
        signed: &SignedCommand,
        timestamp: i64,
    ) -> Result<(Self, Block)> {
        let cmd = verify(signed)?;
        if cmd.cmd_type != CommandType::NewDb {
            return Err(TransactError::invalid_command(
                "genesis requires a new-db command",
            ));
        }
        let (network, dbid) = cmd.network_dbid();

        let genesis = bootstrap(&signed.cmd, &signed.sig, timestamp)?;

        let mut novelty = Novelty::new(0);
        novelty.absorb(genesis.flakes.clone(), genesis.t, &genesis.schema)?;

        let block = Block {
            number: genesis.block,
            t: genesis.t,
            instant: genesis.instant,
            hash: genesis.hash.clone(),
            prev_hash: None,
            flakes: genesis.flakes.clone(),
            tx_ids: vec![cmd.tx_id.clone()],
        };

        let key = block_key(network, dbid, block.number);
        storage
            .write(&key, &serde_json::to_vec(&block).map_err(fluree_ledger_core::Error::from)?)
            .await?;

        let stats = LedgerStats {
            flakes: novelty.len() as u64,
            size: novelty.size,
        };

        tracing::info!(network, dbid, hash = %genesis.hash, "ledger created");

        Ok((
            Self {
                network: network.to_string(),
                dbid: dbid.to_string(),
                t: genesis.t,
                block: genesis.block,
                block_hash: Some(genesis.hash),
                ecount: genesis.ecount,
                stats,
                schema: Arc::new(genesis.schema),
                novelty: Arc::new(novelty),
                ledger_auth: master_auth_sid(),
            },
            block,
        ))
    }

    /// Capture a consistent read snapshot.
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            block: self.block,
            t: self.t,
            novelty: Arc::clone(&self.novelty),
            schema: Arc::clone(&self.schema),
        }
    }

    /// Whether the indexer should run.
    pub fn should_reindex(&self, config: &IndexConfig) -> bool {
        self.novelty.should_reindex(config)
    }

    /// Execute a command batch: stage each transaction, seal the block,
    /// persist it, then commit the new views atomically.
    ///
    /// Rejected transactions receive a 400 receipt carrying their
    /// `_tx/error` flakes and do not enter the block; a block is sealed
    /// only when at least one transaction is admitted. The consensus
    /// leader serializes calls, so transactions within the block carry
    /// strictly decreasing `t`.
    pub async fn transact<S: Storage>(
        &mut self,
        storage: &S,
        commands: &[SignedCommand],
        instant: i64,
        options: StageOptions<'_>,
    ) -> Result<(Vec<TxReceipt>, Option<Block>)> {
        tracing::debug!(
            network = %self.network,
            dbid = %self.dbid,
            commands = commands.len(),
            "transact batch"
        );

        let mut receipts: Vec<Option<TxReceipt>> = vec![None; commands.len()];
        let mut staged_ok: Vec<StagedTx> = Vec::new();

        // Working views advance across transactions within the block.
        let mut working_schema = (*self.schema).clone();
        let mut working_ecount = self.ecount.clone();
        let mut next_t = self.t - 1;

        for (i, signed) in commands.iter().enumerate() {
            let cmd = match verify(signed) {
                Ok(cmd) => cmd,
                Err(e) => {
                    let core = e.as_core();
                    receipts[i] = Some(TxReceipt {
                        status: core.status(),
                        tx_id: fluree_ledger_crypto::tx_id(&signed.cmd),
                        block: None,
                        hash: None,
                        tempids: HashMap::new(),
                        error: Some(core.kind().to_string()),
                        message: Some(core.to_string()),
                        flakes: None,
                    });
                    continue;
                }
            };

            if cmd.expired(instant) {
                receipts[i] = Some(TxReceipt {
                    status: 400,
                    tx_id: cmd.tx_id.clone(),
                    block: None,
                    hash: None,
                    tempids: HashMap::new(),
                    error: Some("invalid-tx".to_string()),
                    message: Some("command expired".to_string()),
                    flakes: None,
                });
                continue;
            }

            let staged = stage(
                &working_schema,
                &working_ecount,
                &self.novelty,
                &cmd,
                next_t,
                options,
            )?;

            if staged.is_ok() {
                working_schema = staged.schema_after.clone();
                // Tags minted by this transaction resolve for later
                // transactions in the batch and for future blocks.
                for flake in &staged.flakes {
                    if flake.op && flake.p.sub_id() == fluree_ledger_core::ids::predicate::TAG_ID {
                        if let Some((pred, value)) =
                            flake.o.as_str().and_then(|id| id.split_once(':'))
                        {
                            working_schema.put_tag(pred, value, flake.s);
                        }
                    }
                }
                working_ecount = staged.ecount_after.clone();
                next_t -= 1;
                staged_ok.push(staged);
                // Receipt completed after the block seals.
            } else {
                let (kind, message) = staged.error.clone().expect("rejected tx has error");
                receipts[i] = Some(TxReceipt {
                    status: 400,
                    tx_id: staged.tx_id.clone(),
                    block: None,
                    hash: None,
                    tempids: HashMap::new(),
                    error: Some(kind),
                    message: Some(message),
                    flakes: Some(staged.flakes),
                });
            }
        }

        if staged_ok.is_empty() {
            return Ok((receipts.into_iter().flatten().collect(), None));
        }

        // Seal and persist before anything becomes visible.
        let block = seal_block(
            (self.block, self.block_hash.as_deref()),
            &staged_ok,
            instant,
            self.ledger_auth,
        );
        let key = block_key(&self.network, &self.dbid, block.number);
        storage
            .write(&key, &serde_json::to_vec(&block).map_err(fluree_ledger_core::Error::from)?)
            .await?;

        // Commit: absorb per transaction (each with its own db-after
        // view), then the block header flakes, then post hygiene; finally
        // publish the new immutable views.
        let mut novelty = (*self.novelty).clone();
        let mut remove_from_post: Vec<SubjectId> = Vec::new();
        for tx in &staged_ok {
            novelty.absorb(tx.flakes.clone(), tx.t, &tx.schema_after)?;
            remove_from_post.extend(tx.remove_from_post.iter().copied());
        }
        let header_flakes: Vec<Flake> = block
            .flakes
            .iter()
            .filter(|f| f.t == block.t)
            .cloned()
            .collect();
        novelty.absorb(header_flakes, block.t, &working_schema)?;
        novelty.remove_from_post(&remove_from_post);

        self.stats = LedgerStats {
            flakes: self.stats.flakes + block.flakes.len() as u64,
            size: novelty.size,
        };
        self.novelty = Arc::new(novelty);
        self.schema = Arc::new(working_schema);
        self.ecount = working_ecount;
        self.t = block.t;
        self.block = block.number;
        self.block_hash = Some(block.hash.clone());

        for tx in &staged_ok {
            let i = receipts.iter().position(Option::is_none).expect("receipt slot");
            receipts[i] = Some(TxReceipt {
                status: 200,
                tx_id: tx.tx_id.clone(),
                block: Some(block.number),
                hash: Some(block.hash.clone()),
                tempids: tx.tempids.clone(),
                error: None,
                message: None,
                flakes: None,
            });
        }

        Ok((receipts.into_iter().flatten().collect(), Some(block)))
    }
}

/// Read a persisted block back from storage.
pub async fn read_block<S: Storage>(
    storage: &S,
    network: &str,
    dbid: &str,
    number: u64,
) -> Result<Block> {
    let bytes = storage.read(&block_key(network, dbid, number)).await?;
    serde_json::from_slice(&bytes)
        .map_err(|e| TransactError::Core(fluree_ledger_core::Error::from(e)))
}
