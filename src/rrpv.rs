//! Per-block re-reference prediction value (RRPV) state, shared by all three
//! replacement policies through [`RrpvState`] instead of being reimplemented
//! per policy the way the original's three translation units each carried
//! their own copy of the aging/victim-search loop.

use crate::error::{fatal, ReplacementError, Result};

/// Per-set RRPV array plus the rotating pointer used to break ties and force
/// progress during aging sweeps.
#[derive(Debug, Clone)]
pub struct RrpvState {
    rrpv: Vec<u8>,
    rrpv_max: u8,
    rrpv_insert: u8,
    replacement_pointer: usize,
}

/// The outcome of a bounded victim search, including whether more than one
/// way was tied at `rrpv_max` when the victim was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VictimSearchResult {
    /// The chosen way.
    pub way: usize,
    /// Whether more than one way already had `rrpv == rrpv_max` at selection.
    pub tied: bool,
}

impl RrpvState {
    /// Builds an `N`-way RRPV array. Every way starts at the invalid-initial
    /// sentinel `rrpv_insert + 5` until it first carries a real block, per
    /// the data model's construction rule.
    pub fn new(associativity: usize, rrpv_bits: u8) -> Self {
        let rrpv_max = (1u16 << rrpv_bits) as u8 - 1;
        let rrpv_insert = rrpv_max - 1;
        Self {
            rrpv: vec![rrpv_insert + 5; associativity],
            rrpv_max,
            rrpv_insert,
            replacement_pointer: 0,
        }
    }

    /// `rrpv_max = (1 << rrpv_bits) - 1`.
    pub fn rrpv_max(&self) -> u8 {
        self.rrpv_max
    }

    /// `rrpv_insert = rrpv_max - 1`, the static SRRIP insertion position.
    pub fn rrpv_insert(&self) -> u8 {
        self.rrpv_insert
    }

    /// Number of ways tracked.
    pub fn associativity(&self) -> usize {
        self.rrpv.len()
    }

    /// Current RRPV of `way`.
    pub fn get(&self, way: usize) -> u8 {
        self.rrpv[way]
    }

    /// Overwrites the RRPV of `way`, clamped to `rrpv_max`.
    pub fn set(&mut self, way: usize, value: u8) {
        self.rrpv[way] = value.min(self.rrpv_max);
    }

    /// Insert-at-MRU: every other way with a strictly lower RRPV than `way`
    /// is incremented, then `way` is set to 0.
    pub fn insert_at_mru(&mut self, way: usize) {
        let current = self.rrpv[way];
        for j in 0..self.rrpv.len() {
            if j != way && self.rrpv[j] < current {
                self.rrpv[j] = (self.rrpv[j] + 1).min(self.rrpv_max);
            }
        }
        self.rrpv[way] = 0;
    }

    /// Insert-near-LRU: demotes at most one way at `origin_rrpv - 1` up to
    /// `origin_rrpv`, then places `way` at `origin_rrpv - 1`. A no-op
    /// demotion if no way sits at `origin_rrpv - 1`.
    pub fn insert_near_lru(&mut self, way: usize, origin_rrpv: u8) {
        if origin_rrpv > 0 {
            if let Some(j) = (0..self.rrpv.len())
                .find(|&j| j != way && self.rrpv[j] == origin_rrpv - 1)
            {
                self.rrpv[j] = origin_rrpv;
            }
        }
        self.rrpv[way] = origin_rrpv.saturating_sub(1);
    }

    /// Increments every way below `rrpv_max` by one.
    fn aging_sweep(&mut self) {
        for v in &mut self.rrpv {
            if *v < self.rrpv_max {
                *v += 1;
            }
        }
    }

    /// SRRIP victim search: rotates through all ways from
    /// `replacement_pointer`, returning the first way at `rrpv_max`. Falls
    /// back to a bounded number of aging sweeps (at most `rrpv_max + 1`) if
    /// no way currently qualifies.
    ///
    /// # Errors
    /// Returns [`ReplacementError::InvariantViolation`] if no victim is found
    /// after exhausting every aging sweep — a fatal invariant violation.
    pub fn find_srrip_victim(&mut self, set_id: u64) -> Result<VictimSearchResult> {
        let n = self.rrpv.len();
        for _sweep in 0..=self.rrpv_max as usize {
            for _ in 0..n {
                let idx = self.replacement_pointer;
                self.replacement_pointer = (self.replacement_pointer + 1) % n;
                if self.rrpv[idx] >= self.rrpv_max {
                    let tied = self.rrpv.iter().filter(|&&v| v == self.rrpv_max).count() > 1;
                    return Ok(VictimSearchResult { way: idx, tied });
                }
            }
            self.aging_sweep();
        }
        Err(fatal(ReplacementError::InvariantViolation {
            set_id,
            detail: "victim search exhausted all aging sweeps".into(),
        }))
    }
}
