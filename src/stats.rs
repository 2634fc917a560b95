//! Registration and mutation of named counters exposed to the surrounding
//! simulator's statistics service.
//!
//! The original policy implementations call `registerStatsMetric("interval_timer",
//! core_id, name, &counter)` once per process and then mutate the counter
//! directly through its address. A `StatsSink` plays the same role without the
//! raw pointer: callers register a counter once (idempotent) and thereafter
//! read or mutate it through the sink.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

/// A sink that named counters are registered against and mutated through.
///
/// Implementors must make `register` idempotent: registering the same
/// `(group, owner, name)` triple more than once must not reset its value.
pub trait StatsSink: Send + Sync {
    /// Registers a counter, creating it at zero if it does not already exist.
    fn register(&self, group: &str, owner: u8, name: &str);

    /// Adds `by` to the named counter, registering it first if necessary.
    fn increment(&self, group: &str, owner: u8, name: &str, by: u64);

    /// Overwrites the named counter, registering it first if necessary.
    fn set(&self, group: &str, owner: u8, name: &str, value: u64);

    /// Reads the current value of the named counter, or 0 if never registered.
    fn get(&self, group: &str, owner: u8, name: &str) -> u64;
}

fn key(group: &str, owner: u8, name: &str) -> String {
    format!("{group}/{owner}/{name}")
}

/// Default in-process [`StatsSink`], backed by a concurrent map so sets
/// sharing one policy context never need a mutex on the hit/miss path.
#[derive(Debug, Default)]
pub struct AtomicStatsSink {
    counters: DashMap<String, AtomicU64>,
}

impl AtomicStatsSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self {
            counters: DashMap::new(),
        }
    }
}

impl StatsSink for AtomicStatsSink {
    fn register(&self, group: &str, owner: u8, name: &str) {
        self.counters
            .entry(key(group, owner, name))
            .or_insert_with(|| AtomicU64::new(0));
    }

    fn increment(&self, group: &str, owner: u8, name: &str, by: u64) {
        self.counters
            .entry(key(group, owner, name))
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(by, Ordering::Relaxed);
    }

    fn set(&self, group: &str, owner: u8, name: &str, value: u64) {
        self.counters
            .entry(key(group, owner, name))
            .or_insert_with(|| AtomicU64::new(0))
            .store(value, Ordering::Relaxed);
    }

    fn get(&self, group: &str, owner: u8, name: &str) -> u64 {
        self.counters
            .get(&key(group, owner, name))
            .map(|v| v.load(Ordering::Relaxed))
            .unwrap_or(0)
    }
}

/// A sink that discards everything. Useful for unit tests that don't care
/// about stats registration order or values.
#[derive(Debug, Default)]
pub struct NullStatsSink;

impl StatsSink for NullStatsSink {
    fn register(&self, _group: &str, _owner: u8, _name: &str) {}
    fn increment(&self, _group: &str, _owner: u8, _name: &str, _by: u64) {}
    fn set(&self, _group: &str, _owner: u8, _name: &str, _value: u64) {}
    fn get(&self, _group: &str, _owner: u8, _name: &str) -> u64 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_increment_is_idempotent_on_registration() {
        let sink = AtomicStatsSink::new();
        sink.register("interval_timer", 0, "totalBlocksDeadC0");
        sink.increment("interval_timer", 0, "totalBlocksDeadC0", 3);
        sink.register("interval_timer", 0, "totalBlocksDeadC0");
        assert_eq!(sink.get("interval_timer", 0, "totalBlocksDeadC0"), 3);
    }

    #[test]
    fn owners_and_groups_are_independent() {
        let sink = AtomicStatsSink::new();
        sink.increment("interval_timer", 0, "totalBlocksInsC0", 5);
        sink.increment("interval_timer", 1, "totalBlocksInsC0", 7);
        assert_eq!(sink.get("interval_timer", 0, "totalBlocksInsC0"), 5);
        assert_eq!(sink.get("interval_timer", 1, "totalBlocksInsC0"), 7);
    }

    #[test]
    fn null_sink_always_reads_zero() {
        let sink = NullStatsSink;
        sink.increment("interval_timer", 0, "InvalidBlocks", 100);
        assert_eq!(sink.get("interval_timer", 0, "InvalidBlocks"), 0);
    }
}
