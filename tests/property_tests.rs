use std::sync::Arc;

use parking_lot::Mutex;
use proptest::prelude::*;

use llc_partition::config::SrripConfig;
use llc_partition::dbasp::{DbaspContext, DbaspSet};
use llc_partition::dbpv::DbpvSet;
use llc_partition::dbpv_dyn::{DbpvDynContext, DbpvDynSet};
use llc_partition::owner::Owner;
use llc_partition::stats::AtomicStatsSink;

const ASSOCIATIVITY: usize = 8;

#[derive(Debug, Clone)]
enum Operation {
    Access { core0: bool },
    Hit { way: usize },
}

fn arb_operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        any::<bool>().prop_map(|core0| Operation::Access { core0 }),
        (0usize..ASSOCIATIVITY).prop_map(|way| Operation::Hit { way }),
    ]
}

fn arb_ops() -> impl Strategy<Value = Vec<Operation>> {
    prop::collection::vec(arb_operation(), 1..200)
}

proptest! {
    // Property 1 (RRPV bounds) + property 5 (invalid-slot priority), DBPV.
    #[test]
    fn dbpv_invariants_hold_over_any_operation_sequence(ops in arb_ops()) {
        let stats = Arc::new(AtomicStatsSink::new());
        let mut set = DbpvSet::new(SrripConfig::dbpv_default(), 0, ASSOCIATIVITY, stats);
        let mut valid = vec![false; ASSOCIATIVITY];
        let rrpv_max = SrripConfig::dbpv_default().rrpv_max();

        for op in ops {
            match op {
                Operation::Access { core0 } => {
                    let had_invalid = valid.iter().any(|&v| !v);
                    let owner = if core0 { Owner::Core0 } else { Owner::Core1 };
                    let way = set.get_replacement_index(&valid, owner).unwrap();
                    if had_invalid {
                        prop_assert!(!valid[way], "an invalid way must be chosen while any remain");
                    }
                    valid[way] = true;
                    prop_assert!(set.rrpv(way) <= rrpv_max);
                }
                Operation::Hit { way } => {
                    if valid[way] {
                        set.update_on_hit(way).unwrap();
                        prop_assert_eq!(set.rrpv(way), 0);
                        prop_assert!(set.access(way) <= 3);
                    }
                }
            }
        }

        for way in 0..ASSOCIATIVITY {
            prop_assert!(set.rrpv(way) <= rrpv_max);
        }
    }

    // Property 1 + property 2 (saturation at MAX_BLOCK_COUNT=1), DBPV_DYN.
    #[test]
    fn dbpv_dyn_invariants_hold_over_any_operation_sequence(ops in arb_ops()) {
        let config = SrripConfig::dbpv_dyn_default();
        let stats = Arc::new(AtomicStatsSink::new());
        let context = Arc::new(Mutex::new(DbpvDynContext::new(&config, stats.clone())));
        let mut set = DbpvDynSet::new(config, 0, ASSOCIATIVITY, stats, context);
        let mut valid = vec![false; ASSOCIATIVITY];
        let rrpv_max = config.rrpv_max();

        for op in ops {
            match op {
                Operation::Access { core0 } => {
                    let owner = if core0 { Owner::Core0 } else { Owner::Core1 };
                    let way = set.get_replacement_index(&valid, owner).unwrap();
                    valid[way] = true;
                    prop_assert!(set.rrpv(way) <= rrpv_max);
                }
                Operation::Hit { way } => {
                    if valid[way] {
                        set.update_on_hit(way).unwrap();
                        prop_assert_eq!(set.rrpv(way), 0);
                    }
                }
            }
        }
    }

    // Property 3 (UCP quota always partitions all ways) + property 1, DBASP.
    #[test]
    fn dbasp_quota_and_rrpv_invariants_hold(ops in arb_ops()) {
        let stats = Arc::new(AtomicStatsSink::new());
        let context = Arc::new(Mutex::new(DbaspContext::new(ASSOCIATIVITY, stats.clone())));
        let mut set = DbaspSet::new(
            SrripConfig::dbasp_default(),
            0,
            ASSOCIATIVITY,
            stats,
            context.clone(),
        );
        let mut valid = vec![false; ASSOCIATIVITY];
        let rrpv_max = SrripConfig::dbasp_default().rrpv_max();
        let mut cycle = 0u64;

        for op in ops {
            cycle += 37;
            match op {
                Operation::Access { core0 } => {
                    let owner = if core0 { Owner::Core0 } else { Owner::Core1 };
                    let way = set.get_replacement_index(&valid, owner, cycle).unwrap();
                    valid[way] = true;
                    prop_assert!(set.rrpv(way) <= rrpv_max);
                }
                Operation::Hit { way } => {
                    if valid[way] {
                        set.update_on_hit(way).unwrap();
                        prop_assert_eq!(set.rrpv(way), 0);
                    }
                }
            }

            let (q0, q1) = context.lock().ways_quota();
            prop_assert_eq!(q0 + q1, ASSOCIATIVITY);
            prop_assert!(q0 >= 1 && q1 >= 1);
        }
    }
}

#[test]
fn dbpv_fills_every_invalid_way_before_any_eviction() {
    let stats = Arc::new(AtomicStatsSink::new());
    let mut set = DbpvSet::new(SrripConfig::dbpv_default(), 0, ASSOCIATIVITY, stats);
    let mut valid = vec![false; ASSOCIATIVITY];
    let mut seen = std::collections::HashSet::new();

    for _ in 0..ASSOCIATIVITY {
        let way = set.get_replacement_index(&valid, Owner::Core0).unwrap();
        assert!(seen.insert(way), "every invalid way is used exactly once before any repeats");
        valid[way] = true;
    }
}
