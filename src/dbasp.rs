//! DBASP (C7): UCP-partitioned LLC eviction. Victims are chosen per-owner by
//! plain recency (no SRRIP aging), and which owner's candidate is actually
//! evicted is driven by a periodically recomputed way quota.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::SrripConfig;
use crate::error::Result;
use crate::owner::Owner;
use crate::rrpv::RrpvState;
use crate::saturating::saturating_incr;
use crate::stats::StatsSink;
use crate::ucp;

const ACCESS_MAX: u8 = 1;
const UCP_PERIOD_CYCLES: u64 = 1_000_000;
const GROUP: &str = "interval_timer";

/// Shared UCP bookkeeping for one DBASP policy instance: cumulative
/// per-owner access/recency histograms and the way quota they produce.
pub struct DbaspContext {
    associativity: usize,
    total_access: [u64; 2],
    recency_counter: [Vec<u64>; 2],
    ways_quota: (usize, usize),
    last_call_million: u64,
    stats: Arc<dyn StatsSink>,
}

impl DbaspContext {
    /// Builds a context with the quota split evenly, and registers every
    /// DBASP statistic up front.
    pub fn new(associativity: usize, stats: Arc<dyn StatsSink>) -> Self {
        for owner in [0u8, 1u8] {
            stats.register(GROUP, owner, "totalBlocksDeadC");
            stats.register(GROUP, owner, "totalBlocksInsC");
            stats.register(GROUP, owner, "totalBlocksHitC");
        }
        stats.register(GROUP, 0, "InvalidBlocks");
        for i in 0..associativity {
            stats.register(GROUP, 0, &format!("recencyCounterC0-{i}"));
            stats.register(GROUP, 0, &format!("recencyCounterC1-{i}"));
        }
        Self {
            associativity,
            total_access: [0, 0],
            recency_counter: [vec![0; associativity], vec![0; associativity]],
            ways_quota: (associativity / 2, associativity - associativity / 2),
            last_call_million: 0,
            stats,
        }
    }

    /// The current `(ways_quota[Core0], ways_quota[Core1])` split.
    pub fn ways_quota(&self) -> (usize, usize) {
        self.ways_quota
    }

    fn maybe_run_ucp(&mut self, cycle_count: u64) {
        let current_million = cycle_count / UCP_PERIOD_CYCLES;
        if current_million > self.last_call_million {
            self.ways_quota =
                ucp::compute_ways_quota(&self.recency_counter, self.total_access, self.associativity);
            self.last_call_million = current_million;
            tracing::debug!(
                cycle_count,
                ways_c0 = self.ways_quota.0,
                ways_c1 = self.ways_quota.1,
                "UCP repartitioned LLC ways"
            );
        }
    }

    fn record_install(&mut self, owner: Owner) {
        self.total_access[owner.index()] += 1;
        self.stats
            .increment(GROUP, owner.into(), "totalBlocksInsC", 1);
    }

    fn record_hit(&mut self, owner: Owner, recency_position: u8) {
        self.total_access[owner.index()] += 1;
        let pos = (recency_position as usize).min(self.associativity - 1);
        self.recency_counter[owner.index()][pos] += 1;
        self.stats.set(
            GROUP,
            0,
            &format!("recencyCounterC{}-{pos}", owner.index()),
            self.recency_counter[owner.index()][pos],
        );
        self.stats
            .increment(GROUP, owner.into(), "totalBlocksHitC", 1);
    }
}

fn lru_candidate(ways: &[(usize, u8)]) -> Option<usize> {
    ways.iter()
        .enumerate()
        .max_by(|(ia, (_, ra)), (ib, (_, rb))| ra.cmp(rb).then(ib.cmp(ia)))
        .map(|(_, (way, _))| *way)
}

/// A single DBASP-policy cache set.
pub struct DbaspSet {
    set_id: u64,
    rrpv: RrpvState,
    access: Vec<u8>,
    owner: Vec<Owner>,
    stats: Arc<dyn StatsSink>,
    context: Arc<Mutex<DbaspContext>>,
}

impl DbaspSet {
    /// Builds a new set bound to a shared `context`.
    pub fn new(
        config: SrripConfig,
        set_id: u64,
        associativity: usize,
        stats: Arc<dyn StatsSink>,
        context: Arc<Mutex<DbaspContext>>,
    ) -> Self {
        tracing::info!(set_id, associativity, bits = config.bits, "constructed DBASP set");
        Self {
            set_id,
            rrpv: RrpvState::new(associativity, config.bits),
            access: vec![0; associativity],
            owner: vec![Owner::Core0; associativity],
            stats,
            context,
        }
    }

    fn owned_ways(&self, owner: Owner) -> Vec<(usize, u8)> {
        (0..self.rrpv.associativity())
            .filter(|&i| self.owner[i] == owner)
            .map(|i| (i, self.rrpv.get(i)))
            .collect()
    }

    fn classify_and_evict(&mut self, victim: usize, owner: Owner) {
        let victim_owner = self.owner[victim];
        if self.access[victim] == 0 {
            self.stats
                .increment(GROUP, victim_owner.into(), "totalBlocksDeadC", 1);
        }
        let origin = self.rrpv.get(victim);
        self.rrpv.insert_near_lru(victim, origin);
        self.access[victim] = 0;
        self.owner[victim] = owner;
        self.context.lock().record_install(owner);
        self.stats
            .increment(GROUP, owner.into(), "totalBlocksInsC", 1);
    }

    /// Chooses a victim way on a miss, installs `owner`'s new block there,
    /// and returns the way. `cycle_count` drives the periodic UCP
    /// repartition check, run once at the start of every call before the
    /// invalid-slot scan.
    ///
    /// # Errors
    /// Returns [`crate::error::ReplacementError::InvariantViolation`] if both
    /// owners' candidate pools are empty with no invalid way present — an
    /// unreachable state for any set with at least two ways.
    pub fn get_replacement_index(
        &mut self,
        valid: &[bool],
        owner: Owner,
        cycle_count: u64,
    ) -> Result<usize> {
        self.context.lock().maybe_run_ucp(cycle_count);

        if let Some(way) = valid.iter().position(|&v| !v) {
            let rrpv_max = self.rrpv.rrpv_max();
            self.rrpv.insert_near_lru(way, rrpv_max);
            self.access[way] = 0;
            self.owner[way] = owner;
            self.context.lock().record_install(owner);
            self.stats
                .increment(GROUP, owner.into(), "totalBlocksInsC", 1);
            self.stats.increment(GROUP, 0, "InvalidBlocks", 1);
            return Ok(way);
        }

        let c0 = self.owned_ways(Owner::Core0);
        let c1 = self.owned_ways(Owner::Core1);
        let candidate_c0 = lru_candidate(&c0);
        let candidate_c1 = lru_candidate(&c1);

        let (ways_c0, _) = self.context.lock().ways_quota;
        let victim = if ways_c0 > c0.len() {
            candidate_c1.or(candidate_c0)
        } else if ways_c0 < c0.len() {
            candidate_c0.or(candidate_c1)
        } else if owner == Owner::Core0 {
            candidate_c0.or(candidate_c1)
        } else {
            candidate_c1.or(candidate_c0)
        };

        let victim = victim.ok_or_else(|| {
            crate::error::fatal(crate::error::ReplacementError::InvariantViolation {
                set_id: self.set_id,
                detail: "no eviction candidate found in either owner pool".into(),
            })
        })?;

        self.classify_and_evict(victim, owner);
        Ok(victim)
    }

    /// Records a hit at `way`: saturates the 1-bit reuse counter, folds the
    /// pre-promotion RRPV into the owner's recency histogram, then promotes
    /// to MRU.
    ///
    /// # Errors
    /// Returns [`crate::error::ReplacementError::InvariantViolation`] if
    /// `way` is out of range.
    pub fn update_on_hit(&mut self, way: usize) -> Result<()> {
        if way >= self.access.len() {
            return Err(crate::error::fatal(
                crate::error::ReplacementError::InvariantViolation {
                    set_id: self.set_id,
                    detail: format!("way {way} out of range"),
                },
            ));
        }
        self.access[way] = saturating_incr(self.access[way], ACCESS_MAX);
        let owner = self.owner[way];
        let recency_position = self.rrpv.get(way);
        self.context.lock().record_hit(owner, recency_position);
        self.rrpv.insert_at_mru(way);
        Ok(())
    }

    /// Current RRPV of `way`, for tests and diagnostics.
    pub fn rrpv(&self, way: usize) -> u8 {
        self.rrpv.get(way)
    }

    /// Owner stamped on `way`, for tests and diagnostics.
    pub fn owner(&self, way: usize) -> Owner {
        self.owner[way]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::AtomicStatsSink;

    fn fresh(associativity: usize) -> (DbaspSet, Arc<Mutex<DbaspContext>>, Arc<AtomicStatsSink>) {
        let stats = Arc::new(AtomicStatsSink::new());
        let context = Arc::new(Mutex::new(DbaspContext::new(associativity, stats.clone())));
        let set = DbaspSet::new(
            SrripConfig::dbasp_default(),
            0,
            associativity,
            stats.clone(),
            context.clone(),
        );
        (set, context, stats)
    }

    #[test]
    fn invalid_slots_fill_before_quota_logic_runs() {
        let (mut set, _ctx, stats) = fresh(4);
        let mut valid = vec![false; 4];
        for i in 0..4 {
            let way = set
                .get_replacement_index(&valid, Owner::Core0, 0)
                .unwrap();
            assert_eq!(way, i);
            valid[i] = true;
        }
        assert_eq!(stats.get(GROUP, 0, "InvalidBlocks"), 4);
    }

    #[test]
    fn quota_decides_which_owner_is_evicted() {
        let (mut set, ctx, _stats) = fresh(4);
        let valid = vec![true; 4];
        set.owner = vec![Owner::Core0, Owner::Core0, Owner::Core0, Owner::Core1];
        set.access = vec![0, 0, 0, 0];
        ctx.lock().ways_quota = (1, 3);
        // Core0 holds 3 ways but is quota-capped at 1: it is over quota, so
        // its own LRU candidate is evicted even though Core1 requested.
        let victim = set.get_replacement_index(&valid, Owner::Core1, 0).unwrap();
        assert_eq!(set.owner(victim), Owner::Core1, "victim way now belongs to the requester");
        assert!(victim < 3, "the evicted slot was one of Core0's three ways");
    }

    #[test]
    fn hit_promotes_to_mru_and_records_recency_position() {
        let (mut set, ctx, _stats) = fresh(4);
        let valid = vec![true; 4];
        set.owner = vec![Owner::Core0; 4];
        for way in 0..4 {
            set.rrpv.set(way, 2);
        }
        set.update_on_hit(1).unwrap();
        assert_eq!(set.rrpv(1), 0);
        assert_eq!(set.rrpv(0), 3);
        assert_eq!(ctx.lock().recency_counter[0][2], 1);
        let _ = valid;
    }

    #[test]
    fn ucp_runs_once_per_elapsed_million_cycles() {
        let (mut set, ctx, _stats) = fresh(4);
        let valid = vec![true; 4];
        set.owner = vec![Owner::Core0, Owner::Core0, Owner::Core1, Owner::Core1];
        set.get_replacement_index(&valid, Owner::Core0, 500_000).unwrap();
        assert_eq!(ctx.lock().last_call_million, 0);
        set.get_replacement_index(&valid, Owner::Core0, 1_000_001).unwrap();
        assert_eq!(ctx.lock().last_call_million, 1);
        set.get_replacement_index(&valid, Owner::Core0, 1_200_000).unwrap();
        assert_eq!(ctx.lock().last_call_million, 1, "same million, no re-trigger");
    }
}
