//! Utility-based Cache Partitioning (C8): the global, time-triggered solver
//! that converts per-owner recency histograms into a per-owner way quota.

/// Computes the new `(ways_quota[0], ways_quota[1])` pair from the recency
/// histograms and per-owner total access counts.
///
/// `recency_counter[k]` must have at least `associativity` entries; entries
/// beyond `associativity` are ignored. Neither endpoint `0` nor
/// `associativity` is ever returned — both owners always retain at least one
/// way.
///
/// # Panics
/// Panics if `associativity < 2`, since no single-way split exists.
pub fn compute_ways_quota(
    recency_counter: &[Vec<u64>; 2],
    total_access: [u64; 2],
    associativity: usize,
) -> (usize, usize) {
    assert!(associativity >= 2, "associativity must allow a 2-owner split");

    let hit = |owner: usize, ways: usize| -> u64 {
        recency_counter[owner][..ways.min(recency_counter[owner].len())]
            .iter()
            .sum()
    };
    let miss = |owner: usize, ways: usize| -> i64 {
        total_access[owner] as i64 - hit(owner, ways) as i64
    };

    let mut best_j = 1usize;
    let mut best_utility = i64::MIN;
    for j in 1..associativity {
        let utility =
            (miss(0, 0) - miss(0, j)) + (miss(1, 0) - miss(1, associativity - j));
        if utility > best_utility {
            best_utility = utility;
            best_j = j;
        }
    }

    (best_j, associativity - best_j)
}

#[cfg(test)]
mod tests {
    use super::*;

    // S4 — UCP partition.
    #[test]
    fn scenario_s4_picks_j_star_three_of_four() {
        let recency_counter = [vec![800, 100, 50, 50], vec![100, 100, 100, 700]];
        let total_access = [1000, 1000];
        let (q0, q1) = compute_ways_quota(&recency_counter, total_access, 4);
        assert_eq!((q0, q1), (3, 1));
    }

    #[test]
    fn quota_always_sums_to_associativity() {
        let recency_counter = [vec![10, 20, 30, 40, 50, 60], vec![60, 50, 40, 30, 20, 10]];
        let total_access = [210, 210];
        let (q0, q1) = compute_ways_quota(&recency_counter, total_access, 6);
        assert_eq!(q0 + q1, 6);
        assert!(q0 >= 1 && q0 <= 5);
    }

    #[test]
    fn equal_histograms_favor_smaller_j_on_tie() {
        let recency_counter = [vec![0, 0, 0, 0], vec![0, 0, 0, 0]];
        let total_access = [0, 0];
        let (q0, q1) = compute_ways_quota(&recency_counter, total_access, 4);
        assert_eq!((q0, q1), (1, 3));
    }
}
