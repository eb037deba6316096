//! Snapshot retention policy
//!
//! The baseline snapshot (id 0) occupies one retention slot when present and
//! is never selected for deletion.

use std::collections::BTreeSet;

/// Identifier of the protected baseline snapshot
pub const BASELINE_ID: u64 = 0;

/// Select the snapshots to delete so that at most `max_count` remain
///
/// Keeps the `max_count - B` newest non-baseline ids, where `B` is 1 when
/// the baseline exists. When `max_count <= B` only the baseline survives.
pub fn ids_to_delete(ids: &BTreeSet<u64>, max_count: usize) -> Vec<u64> {
    let baseline_slots = usize::from(ids.contains(&BASELINE_ID));
    let keep = max_count.saturating_sub(baseline_slots);

    ids.iter()
        .rev()
        .filter(|id| **id != BASELINE_ID)
        .skip(keep)
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[u64]) -> BTreeSet<u64> {
        values.iter().copied().collect()
    }

    #[test]
    fn test_baseline_and_newest_survive() {
        let doomed = ids_to_delete(&ids(&[0, 10, 20, 30, 40]), 2);
        assert_eq!(doomed, vec![30, 20, 10]);
    }

    #[test]
    fn test_without_baseline_keeps_newest() {
        let doomed = ids_to_delete(&ids(&[10, 20, 30]), 1);
        assert_eq!(doomed, vec![20, 10]);
    }

    #[test]
    fn test_zero_count_keeps_only_baseline() {
        let doomed = ids_to_delete(&ids(&[0, 10, 20]), 0);
        assert_eq!(doomed, vec![20, 10]);

        let doomed = ids_to_delete(&ids(&[0, 10, 20]), 1);
        assert_eq!(doomed, vec![20, 10]);
    }

    #[test]
    fn test_under_limit_deletes_nothing() {
        assert!(ids_to_delete(&ids(&[0, 10]), 10).is_empty());
        assert!(ids_to_delete(&ids(&[]), 0).is_empty());
    }

    #[test]
    fn test_baseline_alone_is_kept() {
        assert!(ids_to_delete(&ids(&[0]), 0).is_empty());
    }
}
