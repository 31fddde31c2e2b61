//! Novelty overlay for the Fluree ledger
//!
//! In-memory storage for every flake not yet persisted into a materialized
//! index segment, maintained in all five sort orders with running size and
//! count statistics.
//!
//! # Design
//!
//! - **Arena storage**: flakes are stored once in a central arena and
//!   referenced by `FlakeId` from the per-order vectors
//! - **Per-order sorted vectors**: `spot`, `psot` and `tspo` hold every
//!   flake; `post` only flakes of indexed predicates; `opst` only flakes
//!   of reference predicates
//! - **Batch absorb**: one epoch bump per transaction batch, not per flake
//! - **LSM-style merge**: sort the batch by each order's comparator, then
//!   linear-merge with the existing vector
//!
//! Retraction flakes are *added*, never used to delete: read paths
//! interpret assert/retract by the highest `t <= query-t`.
//!
//! # Example
//!
//! ```ignore
//! use fluree_ledger_novelty::Novelty;
//!
//! let mut novelty = Novelty::new(0);
//! novelty.absorb(flakes, t, &schema)?;
//! let hits: Vec<_> = novelty.range(IndexOrder::Spot, &from, &to).collect();
//! ```

mod error;

pub use error::{NoveltyError, Result};

use fluree_ledger_core::{Flake, IndexOrder, Schema, SubjectId};
use std::cmp::Ordering;

/// Index into the flake arena - u32 limits novelty to ~4B flakes.
pub type FlakeId = u32;

/// Maximum FlakeId before overflow.
pub const MAX_FLAKE_ID: u32 = u32::MAX - 1;

/// Reindex thresholds in bytes
///
/// At `reindex_min_bytes` the indexer is eligible to run; at
/// `reindex_max_bytes` the transactor applies backpressure and rejects new
/// writes until the flush completes.
#[derive(Clone, Debug)]
pub struct IndexConfig {
    /// Soft threshold - the indexer may run (`fdb-memory-reindex`)
    pub reindex_min_bytes: u64,
    /// Hard threshold - block new transactions (`fdb-memory-reindex-max`)
    pub reindex_max_bytes: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            reindex_min_bytes: 100_000,
            reindex_max_bytes: 1_000_000,
        }
    }
}

/// Arena-style storage for flakes
#[derive(Clone, Debug, Default)]
struct FlakeStore {
    flakes: Vec<Flake>,
    /// Per-flake size estimate, computed once on insertion
    sizes: Vec<u64>,
}

impl FlakeStore {
    fn get(&self, id: FlakeId) -> &Flake {
        &self.flakes[id as usize]
    }

    fn len(&self) -> usize {
        self.flakes.len()
    }

    fn push(&mut self, flake: Flake) -> (FlakeId, u64) {
        let size = flake.size_estimate_bytes();
        let id = self.flakes.len() as FlakeId;
        self.sizes.push(size);
        self.flakes.push(flake);
        (id, size)
    }
}

/// Novelty overlay - all five sorted projections over the unflushed flakes
#[derive(Clone, Debug, Default)]
pub struct Novelty {
    store: FlakeStore,

    spot: Vec<FlakeId>,
    psot: Vec<FlakeId>,
    post: Vec<FlakeId>,
    opst: Vec<FlakeId>,
    tspo: Vec<FlakeId>,

    /// Total size estimate in bytes (backpressure input)
    pub size: u64,

    /// Newest (most negative) logical time absorbed; 0 when empty
    pub t: i64,

    /// Bumped once per absorbed batch, for cache invalidation
    pub epoch: u64,
}

impl Novelty {
    /// Create an empty overlay anchored at logical time `t`.
    pub fn new(t: i64) -> Self {
        Self {
            t,
            ..Self::default()
        }
    }

    /// Number of flakes held.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.len() == 0
    }

    /// Flake reference by arena id.
    pub fn get_flake(&self, id: FlakeId) -> &Flake {
        self.store.get(id)
    }

    /// Whether the indexer is eligible to run.
    pub fn should_reindex(&self, config: &IndexConfig) -> bool {
        self.size >= config.reindex_min_bytes
    }

    /// Whether the hard threshold is reached (reject new writes).
    pub fn at_max(&self, config: &IndexConfig) -> bool {
        self.size >= config.reindex_max_bytes
    }

    /// Absorb a transaction batch.
    ///
    /// Every flake enters `spot`, `psot` and `tspo`; `post` only when its
    /// predicate is indexed or unique; `opst` only when its predicate is
    /// reference- or tag-valued. Retractions are additions like any other
    /// flake. The epoch bumps once per call.
    pub fn absorb(&mut self, flakes: Vec<Flake>, t: i64, schema: &Schema) -> Result<()> {
        if flakes.is_empty() {
            return Ok(());
        }

        let span = tracing::debug_span!("novelty_absorb", t, flake_count = flakes.len());
        let _guard = span.enter();

        if self.store.len() + flakes.len() > MAX_FLAKE_ID as usize {
            return Err(NoveltyError::overflow(
                "too many flakes in novelty, reindex required",
            ));
        }

        // t decreases as the ledger advances; keep the most negative.
        self.t = self.t.min(t);
        self.epoch += 1;

        let mut batch_all = Vec::with_capacity(flakes.len());
        let mut batch_post = Vec::new();
        let mut batch_opst = Vec::new();

        for flake in flakes {
            let post = schema.is_indexed(flake.p);
            let opst = schema.is_ref(flake.p);
            let (id, size) = self.store.push(flake);
            self.size += size;
            batch_all.push(id);
            if post {
                batch_post.push(id);
            }
            if opst {
                batch_opst.push(id);
            }
        }

        let store = &self.store;
        merge_batch_into_index(store, &mut self.spot, &batch_all, IndexOrder::Spot);
        merge_batch_into_index(store, &mut self.psot, &batch_all, IndexOrder::Psot);
        merge_batch_into_index(store, &mut self.tspo, &batch_all, IndexOrder::Tspo);
        merge_batch_into_index(store, &mut self.post, &batch_post, IndexOrder::Post);
        merge_batch_into_index(store, &mut self.opst, &batch_opst, IndexOrder::Opst);

        Ok(())
    }

    /// Drop every flake of the given predicates from the `post` projection.
    ///
    /// Used when a predicate's `index`/`unique` flags both transition to
    /// false: the facts stay in the other projections, they just stop
    /// being value-addressable.
    pub fn remove_from_post(&mut self, predicates: &[SubjectId]) {
        if predicates.is_empty() {
            return;
        }
        let store = &self.store;
        self.post
            .retain(|&id| !predicates.contains(&store.get(id).p));
        self.epoch += 1;
    }

    /// Sorted ids for one order.
    fn order_ids(&self, order: IndexOrder) -> &[FlakeId] {
        match order {
            IndexOrder::Spot => &self.spot,
            IndexOrder::Psot => &self.psot,
            IndexOrder::Post => &self.post,
            IndexOrder::Opst => &self.opst,
            IndexOrder::Tspo => &self.tspo,
        }
    }

    /// Lazy range scan over one order.
    ///
    /// Bounds are inclusive-exclusive: every flake `f` with
    /// `from <= f < to` under the order's comparator, in order. Bound
    /// location is O(log n); iteration is O(k). The returned iterator is
    /// `Clone`, so a scan can be restarted from the same bounds.
    pub fn range<'a>(
        &'a self,
        order: IndexOrder,
        from: &Flake,
        to: &Flake,
    ) -> impl Iterator<Item = &'a Flake> + Clone {
        let ids = self.order_ids(order);
        let cmp = order.comparator();

        let start = ids.partition_point(|&id| cmp(self.store.get(id), from) == Ordering::Less);
        let end = ids.partition_point(|&id| cmp(self.store.get(id), to) == Ordering::Less);
        let slice = if start >= end { &[][..] } else { &ids[start..end] };

        slice.iter().map(move |&id| self.store.get(id))
    }

    /// Iterate one full order.
    pub fn iter_order(&self, order: IndexOrder) -> impl Iterator<Item = &Flake> + Clone {
        self.order_ids(order).iter().map(move |&id| self.store.get(id))
    }
}

/// LSM-style merge: sort the batch by the order's comparator, then linear
/// two-way merge with the existing sorted vector.
fn merge_batch_into_index(
    store: &FlakeStore,
    target: &mut Vec<FlakeId>,
    batch: &[FlakeId],
    order: IndexOrder,
) {
    if batch.is_empty() {
        return;
    }

    let mut sorted_batch = batch.to_vec();
    sorted_batch.sort_unstable_by(|&a, &b| order.compare(store.get(a), store.get(b)));

    if target.is_empty() {
        *target = sorted_batch;
        return;
    }

    let mut merged = Vec::with_capacity(target.len() + sorted_batch.len());
    let mut i = 0;
    let mut j = 0;

    while i < target.len() && j < sorted_batch.len() {
        let cmp = order.compare(store.get(target[i]), store.get(sorted_batch[j]));
        if cmp != Ordering::Greater {
            merged.push(target[i]);
            i += 1;
        } else {
            merged.push(sorted_batch[j]);
            j += 1;
        }
    }
    merged.extend_from_slice(&target[i..]);
    merged.extend_from_slice(&sorted_batch[j..]);

    *target = merged;
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluree_ledger_core::{ids, FlakeValue, Predicate, PredicateType};

    /// Schema with one plain, one indexed and one ref predicate.
    fn test_schema() -> Schema {
        let mut schema = Schema::new();
        schema.put_predicate(Predicate::new(1000, "person/name", PredicateType::String));
        let mut age = Predicate::new(1001, "person/age", PredicateType::Int);
        age.index = true;
        schema.put_predicate(age);
        schema.put_predicate(Predicate::new(1002, "person/friend", PredicateType::Ref));
        schema
    }

    fn pred(pid: i64) -> SubjectId {
        SubjectId::new(ids::collection::PREDICATE, pid)
    }

    fn flake(s: i64, pid: i64, o: i64, t: i64) -> Flake {
        Flake::assert(SubjectId::new(20, s), pred(pid), FlakeValue::Long(o), t)
    }

    #[test]
    fn test_absorb_counts_and_stats() {
        let schema = test_schema();
        let mut novelty = Novelty::new(0);

        novelty
            .absorb(
                vec![flake(1, 1000, 10, -3), flake(2, 1000, 20, -3)],
                -3,
                &schema,
            )
            .unwrap();

        assert_eq!(novelty.len(), 2);
        assert_eq!(novelty.t, -3);
        assert_eq!(novelty.epoch, 1);
        assert!(novelty.size > 0);
        // spot/psot/tspo hold everything, post/opst nothing (plain string predicate)
        assert_eq!(novelty.iter_order(IndexOrder::Spot).count(), 2);
        assert_eq!(novelty.iter_order(IndexOrder::Tspo).count(), 2);
        assert_eq!(novelty.iter_order(IndexOrder::Post).count(), 0);
        assert_eq!(novelty.iter_order(IndexOrder::Opst).count(), 0);
    }

    #[test]
    fn test_post_only_indexed_opst_only_refs() {
        let schema = test_schema();
        let mut novelty = Novelty::new(0);

        let friend = Flake::assert(
            SubjectId::new(20, 1),
            pred(1002),
            FlakeValue::Ref(SubjectId::new(20, 2)),
            -3,
        );
        novelty
            .absorb(
                vec![flake(1, 1000, 10, -3), flake(1, 1001, 42, -3), friend],
                -3,
                &schema,
            )
            .unwrap();

        assert_eq!(novelty.iter_order(IndexOrder::Spot).count(), 3);
        // post: only the indexed person/age flake
        let post: Vec<_> = novelty.iter_order(IndexOrder::Post).collect();
        assert_eq!(post.len(), 1);
        assert_eq!(post[0].p, pred(1001));
        // opst: only the person/friend ref flake
        let opst: Vec<_> = novelty.iter_order(IndexOrder::Opst).collect();
        assert_eq!(opst.len(), 1);
        assert_eq!(opst[0].p, pred(1002));
    }

    #[test]
    fn test_retraction_is_added_not_deleted() {
        let schema = test_schema();
        let mut novelty = Novelty::new(0);

        let f = flake(1, 1000, 10, -3);
        novelty.absorb(vec![f.clone()], -3, &schema).unwrap();
        novelty.absorb(vec![f.retract_at(-4)], -4, &schema).unwrap();

        assert_eq!(novelty.len(), 2);
        assert_eq!(novelty.t, -4);
        let ops: Vec<bool> = novelty.iter_order(IndexOrder::Spot).map(|f| f.op).collect();
        assert!(ops.contains(&true) && ops.contains(&false));
    }

    #[test]
    fn test_merge_preserves_order_across_batches() {
        let schema = test_schema();
        let mut novelty = Novelty::new(0);

        novelty
            .absorb(
                vec![flake(1, 1000, 1, -3), flake(3, 1000, 1, -3), flake(5, 1000, 1, -3)],
                -3,
                &schema,
            )
            .unwrap();
        novelty
            .absorb(
                vec![flake(2, 1000, 1, -4), flake(4, 1000, 1, -4)],
                -4,
                &schema,
            )
            .unwrap();

        let flakes: Vec<_> = novelty.iter_order(IndexOrder::Spot).collect();
        assert_eq!(flakes.len(), 5);
        for pair in flakes.windows(2) {
            assert_ne!(
                IndexOrder::Spot.compare(pair[0], pair[1]),
                Ordering::Greater
            );
        }
    }

    #[test]
    fn test_range_inclusive_exclusive() {
        let schema = test_schema();
        let mut novelty = Novelty::new(0);

        novelty
            .absorb(
                (1..=5).map(|s| flake(s, 1000, 1, -3)).collect(),
                -3,
                &schema,
            )
            .unwrap();

        // [subject 2, subject 4): expect subjects 2 and 3
        let from = Flake::first_for_subject(SubjectId::new(20, 2));
        let to = Flake::first_for_subject(SubjectId::new(20, 4));
        let hits: Vec<i64> = novelty
            .range(IndexOrder::Spot, &from, &to)
            .map(|f| f.s.sub_id())
            .collect();
        assert_eq!(hits, vec![2, 3]);

        // Restartable: the same iterator bounds yield the same scan.
        let again: Vec<i64> = novelty
            .range(IndexOrder::Spot, &from, &to)
            .map(|f| f.s.sub_id())
            .collect();
        assert_eq!(hits, again);
    }

    #[test]
    fn test_tspo_history_replay() {
        let schema = test_schema();
        let mut novelty = Novelty::new(0);

        novelty.absorb(vec![flake(2, 1000, 1, -3)], -3, &schema).unwrap();
        novelty.absorb(vec![flake(1, 1000, 1, -4)], -4, &schema).unwrap();

        // Replay order: older era (larger t) first.
        let ts: Vec<i64> = novelty.iter_order(IndexOrder::Tspo).map(|f| f.t).collect();
        assert_eq!(ts, vec![-3, -4]);
    }

    #[test]
    fn test_remove_from_post() {
        let schema = test_schema();
        let mut novelty = Novelty::new(0);
        novelty
            .absorb(vec![flake(1, 1001, 42, -3), flake(2, 1001, 43, -3)], -3, &schema)
            .unwrap();
        assert_eq!(novelty.iter_order(IndexOrder::Post).count(), 2);

        novelty.remove_from_post(&[pred(1001)]);
        assert_eq!(novelty.iter_order(IndexOrder::Post).count(), 0);
        // untouched elsewhere
        assert_eq!(novelty.iter_order(IndexOrder::Spot).count(), 2);
    }

    #[test]
    fn test_thresholds() {
        let schema = test_schema();
        let mut novelty = Novelty::new(0);
        let config = IndexConfig {
            reindex_min_bytes: 40,
            reindex_max_bytes: 100,
        };

        assert!(!novelty.should_reindex(&config));
        novelty.absorb(vec![flake(1, 1000, 1, -3)], -3, &schema).unwrap();
        assert!(novelty.should_reindex(&config));
        assert!(!novelty.at_max(&config));

        novelty
            .absorb(vec![flake(2, 1000, 1, -4), flake(3, 1000, 1, -4)], -4, &schema)
            .unwrap();
        assert!(novelty.at_max(&config));
    }

    #[test]
    fn test_empty_absorb_no_epoch_bump() {
        let schema = test_schema();
        let mut novelty = Novelty::new(0);
        novelty.absorb(vec![], -3, &schema).unwrap();
        assert_eq!(novelty.epoch, 0);
    }
}
