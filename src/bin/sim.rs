//! Binary entry point for the `sim` replacement-policy harness.
//!
//! Drives a synthetic, seeded two-application trace through one of the three
//! replacement policies and reports hit rate plus the policy's own
//! registered counters.

use std::collections::BTreeMap;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use llc_partition::config::SrripConfig;
use llc_partition::dbasp::{DbaspContext, DbaspSet};
use llc_partition::dbpv::DbpvSet;
use llc_partition::dbpv_dyn::{DbpvDynContext, DbpvDynSet};
use llc_partition::error::Result;
use llc_partition::logging;
use llc_partition::owner::Owner;
use llc_partition::stats::AtomicStatsSink;

#[derive(Parser, Debug)]
#[command(
    name = "sim",
    version,
    about = "Two-application LLC replacement-policy simulator"
)]
struct Cli {
    /// Which replacement policy to drive.
    #[arg(long, value_enum, default_value_t = Policy::Dbasp)]
    policy: Policy,

    /// Ways per set.
    #[arg(long, default_value_t = 16)]
    associativity: usize,

    /// Number of independent sets in the synthetic LLC.
    #[arg(long, default_value_t = 64)]
    sets: usize,

    /// Total memory accesses to generate across both owners.
    #[arg(long, default_value_t = 200_000)]
    accesses: u64,

    /// Simulated cycles elapsed per access, used only by DBASP's UCP timer.
    #[arg(long, default_value_t = 3)]
    cycles_per_access: u64,

    /// RNG seed, for a reproducible trace.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Print the report as JSON instead of a text table.
    #[arg(long)]
    json: bool,

    /// `tracing` env-filter level.
    #[arg(long, env = "LLC_LOG", default_value = "info")]
    log_level: String,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Policy {
    Dbpv,
    DbpvDyn,
    Dbasp,
}

/// A synthetic two-application access: `owner` repeatedly touches a working
/// set of `working_set_blocks` distinct block addresses, skewed so owner 1
/// streams through a much larger footprint than owner 0 reuses.
struct Trace {
    rng: ChaCha8Rng,
    working_set_blocks: [u64; 2],
}

impl Trace {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            working_set_blocks: [256, 1 << 20],
        }
    }

    fn next_access(&mut self) -> (Owner, u64) {
        let owner = if self.rng.gen_bool(0.5) {
            Owner::Core0
        } else {
            Owner::Core1
        };
        let block = self.rng.gen_range(0..self.working_set_blocks[owner.index()]);
        (owner, block)
    }
}

/// Per-way tag tracked outside the policy core, mimicking the address match
/// a real cache controller performs before asking for a replacement index.
#[derive(Clone, Copy, Default)]
struct WayTag {
    valid: bool,
    tag: u64,
}

#[derive(Serialize)]
struct Report {
    policy: String,
    sets: usize,
    associativity: usize,
    accesses: u64,
    hits: u64,
    misses: u64,
    hit_rate: f64,
    counters: BTreeMap<String, u64>,
}

fn find_hit(ways: &[WayTag], tag: u64) -> Option<usize> {
    ways.iter().position(|w| w.valid && w.tag == tag)
}

fn run_dbpv(cli: &Cli, stats: Arc<AtomicStatsSink>) -> Result<(u64, u64)> {
    let config = SrripConfig::dbpv_default();
    let mut sets: Vec<DbpvSet> = (0..cli.sets)
        .map(|id| DbpvSet::new(config, id as u64, cli.associativity, stats.clone()))
        .collect();
    let mut tags = vec![vec![WayTag::default(); cli.associativity]; cli.sets];
    let mut trace = Trace::new(cli.seed);
    let (mut hits, mut misses) = (0u64, 0u64);

    for _ in 0..cli.accesses {
        let (owner, block) = trace.next_access();
        let set_idx = (block as usize) % cli.sets;
        let ways = &mut tags[set_idx];
        if let Some(way) = find_hit(ways, block) {
            sets[set_idx].update_on_hit(way)?;
            hits += 1;
        } else {
            let valid: Vec<bool> = ways.iter().map(|w| w.valid).collect();
            let way = sets[set_idx].get_replacement_index(&valid, owner)?;
            ways[way] = WayTag { valid: true, tag: block };
            misses += 1;
        }
    }
    Ok((hits, misses))
}

fn run_dbpv_dyn(cli: &Cli, stats: Arc<AtomicStatsSink>) -> Result<(u64, u64)> {
    let config = SrripConfig::dbpv_dyn_default();
    let context = Arc::new(Mutex::new(DbpvDynContext::new(&config, stats.clone())));
    let mut sets: Vec<DbpvDynSet> = (0..cli.sets)
        .map(|id| {
            DbpvDynSet::new(
                config,
                id as u64,
                cli.associativity,
                stats.clone(),
                context.clone(),
            )
        })
        .collect();
    let mut tags = vec![vec![WayTag::default(); cli.associativity]; cli.sets];
    let mut trace = Trace::new(cli.seed);
    let (mut hits, mut misses) = (0u64, 0u64);

    for _ in 0..cli.accesses {
        let (owner, block) = trace.next_access();
        let set_idx = (block as usize) % cli.sets;
        let ways = &mut tags[set_idx];
        if let Some(way) = find_hit(ways, block) {
            sets[set_idx].update_on_hit(way)?;
            hits += 1;
        } else {
            let valid: Vec<bool> = ways.iter().map(|w| w.valid).collect();
            let way = sets[set_idx].get_replacement_index(&valid, owner)?;
            ways[way] = WayTag { valid: true, tag: block };
            misses += 1;
        }
    }
    Ok((hits, misses))
}

fn run_dbasp(cli: &Cli, stats: Arc<AtomicStatsSink>) -> Result<(u64, u64)> {
    let config = SrripConfig::dbasp_default();
    let context = Arc::new(Mutex::new(DbaspContext::new(cli.associativity, stats.clone())));
    let mut sets: Vec<DbaspSet> = (0..cli.sets)
        .map(|id| {
            DbaspSet::new(
                config,
                id as u64,
                cli.associativity,
                stats.clone(),
                context.clone(),
            )
        })
        .collect();
    let mut tags = vec![vec![WayTag::default(); cli.associativity]; cli.sets];
    let mut trace = Trace::new(cli.seed);
    let (mut hits, mut misses) = (0u64, 0u64);

    for i in 0..cli.accesses {
        let cycle_count = i * cli.cycles_per_access;
        let (owner, block) = trace.next_access();
        let set_idx = (block as usize) % cli.sets;
        let ways = &mut tags[set_idx];
        if let Some(way) = find_hit(ways, block) {
            sets[set_idx].update_on_hit(way)?;
            hits += 1;
        } else {
            let valid: Vec<bool> = ways.iter().map(|w| w.valid).collect();
            let way = sets[set_idx].get_replacement_index(&valid, owner, cycle_count)?;
            ways[way] = WayTag { valid: true, tag: block };
            misses += 1;
        }
    }
    Ok((hits, misses))
}

fn gather_counters(policy: Policy, stats: &AtomicStatsSink) -> BTreeMap<String, u64> {
    const GROUP: &str = "interval_timer";
    let mut counters = BTreeMap::new();
    let mut add = |name: &str| {
        for owner in [0u8, 1u8] {
            counters.insert(format!("{name}C{owner}"), stats.get(GROUP, owner, name));
        }
    };

    add("totalBlocksDeadC");
    add("totalBlocksInsC");
    counters.insert("InvalidBlocks".into(), stats.get(GROUP, 0, "InvalidBlocks"));

    match policy {
        Policy::Dbpv => {
            add("totalBlocksReusedOnceC");
            add("totalBlocksReusedTwiceC");
            add("totalBlocksReusedThriceOrMoreC");
        }
        Policy::DbpvDyn => {
            counters.insert("NumTieAtEvict".into(), stats.get(GROUP, 0, "NumTieAtEvict"));
            counters.insert("numPhases".into(), stats.get(GROUP, 0, "numPhases"));
        }
        Policy::Dbasp => {
            add("totalBlocksHitC");
        }
    }
    counters
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level)?;

    tracing::info!(policy = ?cli.policy, sets = cli.sets, associativity = cli.associativity, "starting simulation");

    let stats = Arc::new(AtomicStatsSink::new());
    let (hits, misses) = match cli.policy {
        Policy::Dbpv => run_dbpv(&cli, stats.clone()),
        Policy::DbpvDyn => run_dbpv_dyn(&cli, stats.clone()),
        Policy::Dbasp => run_dbasp(&cli, stats.clone()),
    }?;

    let total = hits + misses;
    let report = Report {
        policy: format!("{:?}", cli.policy),
        sets: cli.sets,
        associativity: cli.associativity,
        accesses: total,
        hits,
        misses,
        hit_rate: if total == 0 { 0.0 } else { hits as f64 / total as f64 },
        counters: gather_counters(cli.policy, &stats),
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report).map_err(|e| {
            llc_partition::error::ReplacementError::Other(format!("failed to serialize report: {e}"))
        })?);
    } else {
        println!(
            "policy={} sets={} associativity={} accesses={} hits={} misses={} hit_rate={:.4}",
            report.policy,
            report.sets,
            report.associativity,
            report.accesses,
            report.hits,
            report.misses,
            report.hit_rate
        );
        for (name, value) in &report.counters {
            println!("  {name} = {value}");
        }
    }

    Ok(())
}
