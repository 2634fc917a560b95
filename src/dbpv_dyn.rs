//! DBPV_DYN (C6): like [`crate::dbpv`], but the insertion RRPV for each owner
//! is retargeted every `max_value` insertions based on that owner's
//! dead-block percentage over the phase just completed.
//!
//! The original tracked phase state in a handful of process-wide `static`
//! globals shared by every set and core. [`DbpvDynContext`] is the owned,
//! `Arc`-shared stand-in: one context per simulated policy instance, held by
//! every [`DbpvDynSet`] that belongs to it.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::SrripConfig;
use crate::error::Result;
use crate::owner::Owner;
use crate::rrpv::RrpvState;
use crate::saturating::saturating_incr;
use crate::stats::StatsSink;

const ACCESS_MAX: u8 = 1;
const NUM_PHASES: usize = 100;
const NUM_BUCKETS: usize = 5;
const GROUP: &str = "interval_timer";

/// Shared phase-tracking state for one DBPV_DYN policy instance.
pub struct DbpvDynContext {
    insert_rrpv: [u8; 2],
    valid_inserted: [u32; 2],
    valid_dead: [u32; 2],
    phase_id: u32,
    block_access_count: Vec<[u64; NUM_BUCKETS]>,
    stats: Arc<dyn StatsSink>,
}

impl DbpvDynContext {
    /// Builds a fresh context whose insertion point starts at
    /// `config.rrpv_insert()` for both owners, and registers every
    /// phase-keyed statistic up front (mirroring the original's eager
    /// registration of all `NUM_PHASES` slots regardless of whether they are
    /// ever reached).
    pub fn new(config: &SrripConfig, stats: Arc<dyn StatsSink>) -> Self {
        let insert = config.rrpv_insert();
        for owner in [0u8, 1u8] {
            stats.register(GROUP, owner, "totalBlocksDeadC");
            stats.register(GROUP, owner, "totalBlocksInsC");
        }
        stats.register(GROUP, 0, "InvalidBlocks");
        stats.register(GROUP, 0, "NumTieAtEvict");
        stats.register(GROUP, 0, "numPhases");
        for phase in 0..NUM_PHASES {
            for bucket in 0..NUM_BUCKETS {
                stats.register(GROUP, 0, &format!("dbpv_block-access-count-{phase}-{bucket}"));
            }
        }
        Self {
            insert_rrpv: [insert, insert],
            valid_inserted: [0, 0],
            valid_dead: [0, 0],
            phase_id: 0,
            block_access_count: vec![[0; NUM_BUCKETS]; NUM_PHASES],
            stats,
        }
    }

    fn insert_rrpv_for(&self, owner: Owner) -> u8 {
        self.insert_rrpv[owner.index()]
    }

    fn record_retiring_block(&mut self, owner: Owner, reuse_count: u8) {
        let bucket = (reuse_count as usize).min(NUM_BUCKETS - 1);
        let phase = (self.phase_id as usize).min(NUM_PHASES - 1);
        self.block_access_count[phase][bucket] += 1;
        self.stats.set(
            GROUP,
            0,
            &format!("dbpv_block-access-count-{phase}-{bucket}"),
            self.block_access_count[phase][bucket],
        );
        if reuse_count == 0 {
            self.stats
                .increment(GROUP, owner.into(), "totalBlocksDeadC", 1);
            self.valid_dead[owner.index()] += 1;
        }
    }

    fn note_tie(&mut self) {
        self.stats.increment(GROUP, 0, "NumTieAtEvict", 1);
    }

    fn note_install(&mut self, owner: Owner, rrpv_insert: u8, rrpv_max: u8, db_threshold: u32, max_value: u32) {
        self.stats
            .increment(GROUP, owner.into(), "totalBlocksInsC", 1);
        self.valid_inserted[owner.index()] += 1;

        if self.valid_inserted[owner.index()] == max_value {
            self.retarget_insertion_point(owner, rrpv_insert, rrpv_max, db_threshold);
            self.valid_inserted[owner.index()] = 0;
            self.valid_dead[owner.index()] = 0;
            self.phase_id = (self.phase_id + 1).min(NUM_PHASES as u32 - 1);
            self.stats.set(GROUP, 0, "numPhases", self.phase_id as u64);
        }
    }

    /// Recomputes `owner`'s insertion RRPV from the dead-block percentage of
    /// the phase it just completed. If the resulting insertion point would
    /// tie the other owner's at `rrpv_max`, the owner whose phase boundary
    /// triggered this call backs off to `rrpv_insert` instead — the other
    /// owner, already streaming, keeps the LRU slot.
    fn retarget_insertion_point(&mut self, owner: Owner, rrpv_insert: u8, rrpv_max: u8, db_threshold: u32) {
        let idx = owner.index();
        let db_percent = if self.valid_inserted[idx] == 0 {
            0
        } else {
            10_000 * self.valid_dead[idx] as u64 / self.valid_inserted[idx] as u64
        };

        if db_percent as u32 >= db_threshold {
            let other = self.insert_rrpv[owner.other().index()];
            if other == rrpv_max {
                tracing::warn!(
                    ?owner,
                    "both owners would insert at rrpv_max; backing off to rrpv_insert"
                );
                self.insert_rrpv[idx] = rrpv_insert;
            } else {
                self.insert_rrpv[idx] = rrpv_max;
            }
        } else {
            self.insert_rrpv[idx] = rrpv_insert;
        }
    }
}

/// A single DBPV_DYN-policy cache set.
pub struct DbpvDynSet {
    set_id: u64,
    rrpv: RrpvState,
    access: Vec<u8>,
    owner: Vec<Owner>,
    rrpv_max: u8,
    rrpv_insert: u8,
    db_threshold: u32,
    max_value: u32,
    stats: Arc<dyn StatsSink>,
    context: Arc<Mutex<DbpvDynContext>>,
}

impl DbpvDynSet {
    /// Builds a new set bound to a shared `context`.
    pub fn new(
        config: SrripConfig,
        set_id: u64,
        associativity: usize,
        stats: Arc<dyn StatsSink>,
        context: Arc<Mutex<DbpvDynContext>>,
    ) -> Self {
        let rrpv = RrpvState::new(associativity, config.bits);
        tracing::info!(
            set_id,
            associativity,
            max_value = config.max_value,
            db_threshold = config.db_threshold,
            "constructed DBPV_DYN set"
        );
        Self {
            set_id,
            rrpv_max: rrpv.rrpv_max(),
            rrpv_insert: rrpv.rrpv_insert(),
            rrpv,
            access: vec![0; associativity],
            owner: vec![Owner::Core0; associativity],
            db_threshold: config.db_threshold,
            max_value: config.max_value,
            stats,
            context,
        }
    }

    fn install(&mut self, way: usize, owner: Owner) {
        let mut context = self.context.lock();
        let insert_rrpv = context.insert_rrpv_for(owner);
        self.rrpv.set(way, insert_rrpv);
        self.access[way] = 0;
        self.owner[way] = owner;
        context.note_install(owner, self.rrpv_insert, self.rrpv_max, self.db_threshold, self.max_value);
    }

    /// Chooses a victim way on a miss, installs `owner`'s new block there,
    /// and returns the way. Invalid-slot fills do not count toward an
    /// owner's phase progress, matching the original: a cache that has not
    /// finished warming up should not trigger a dead-block retarget.
    ///
    /// # Errors
    /// Propagates [`crate::error::ReplacementError::InvariantViolation`] if
    /// the victim search exhausts its bounded aging sweeps.
    pub fn get_replacement_index(&mut self, valid: &[bool], owner: Owner) -> Result<usize> {
        if let Some(way) = valid.iter().position(|&v| !v) {
            let insert_rrpv = self.context.lock().insert_rrpv_for(owner);
            self.rrpv.set(way, insert_rrpv);
            self.access[way] = 0;
            self.owner[way] = owner;
            self.stats
                .increment(GROUP, owner.into(), "totalBlocksInsC", 1);
            self.stats.increment(GROUP, 0, "InvalidBlocks", 1);
            return Ok(way);
        }

        let victim = self.rrpv.find_srrip_victim(self.set_id)?;
        if victim.tied {
            self.context.lock().note_tie();
        }
        let victim_owner = self.owner[victim.way];
        let reuse_count = self.access[victim.way];
        self.context.lock().record_retiring_block(victim_owner, reuse_count);
        self.install(victim.way, owner);
        Ok(victim.way)
    }

    /// Records a hit at `way`: saturates the 1-bit reuse counter and sets
    /// `rrpv` directly to 0.
    ///
    /// # Errors
    /// Propagates [`crate::error::ReplacementError::InvariantViolation`] if
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
        if self.rrpv.get(way) > 0 {
            self.rrpv.set(way, 0);
        }
        Ok(())
    }

    /// Current RRPV of `way`, for tests and diagnostics.
    pub fn rrpv(&self, way: usize) -> u8 {
        self.rrpv.get(way)
    }
}
