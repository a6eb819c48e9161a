use testnet_core::{BalanceSnapshot, Pool};
use tracing::debug;

use crate::ports::{shuffle, RandomSource};

/// Preferred lower bound on how many pools a cycle touches.
pub const MIN_POOLS_PER_CYCLE: usize = 3;

/// Pools whose base requirement is covered by the snapshot on both sides.
pub fn affordable_pools(pools: &[Pool], snapshot: &BalanceSnapshot) -> Vec<Pool> {
    pools
        .iter()
        .filter(|p| {
            p.base_amount0 <= snapshot.raw(&p.token0) && p.base_amount1 <= snapshot.raw(&p.token1)
        })
        .cloned()
        .collect()
}

/// Bounds for the random selection size: `[min(3, upper), upper]` with
/// `upper = min(cap, n)`. The cap wins when it is below 3.
pub fn selection_bounds(affordable: usize, cap: usize) -> (usize, usize) {
    let upper = cap.min(affordable);
    let lower = MIN_POOLS_PER_CYCLE.min(upper);
    (lower, upper)
}

/// Shuffles the affordable pools and keeps a random number of them.
pub fn select_pools(
    pools: &[Pool],
    snapshot: &BalanceSnapshot,
    cap: usize,
    rng: &mut dyn RandomSource,
) -> Vec<Pool> {
    let mut affordable = affordable_pools(pools, snapshot);
    let (lower, upper) = selection_bounds(affordable.len(), cap);
    if upper == 0 {
        return Vec::new();
    }

    shuffle(&mut affordable, rng);
    let count = rng.range_inclusive(lower as u64, upper as u64) as usize;
    affordable.truncate(count.clamp(lower, upper));

    debug!(
        "🎯 Selected {} pool(s): {}",
        affordable.len(),
        affordable.iter().map(Pool::label).collect::<Vec<_>>().join(", ")
    );
    affordable
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{ScriptedRandom, ThreadRngSource};
    use crate::testing::snapshot_of;
    use testnet_core::catalog::Catalog;

    #[test]
    fn test_nothing_affordable_on_empty_wallet() {
        let catalog = Catalog::pharos_testnet();
        let snapshot = snapshot_of(&[]);
        let mut rng = ScriptedRandom::new();
        assert!(select_pools(catalog.pools(), &snapshot, 5, &mut rng).is_empty());
    }

    #[test]
    fn test_two_affordable_returns_both() {
        let catalog = Catalog::pharos_testnet();
        // Enough stables for the two cheaper USDC/USDT pools only.
        let snapshot = snapshot_of(&[("USDC", "4.5"), ("USDT", "4.5")]);
        let affordable = affordable_pools(catalog.pools(), &snapshot);
        assert_eq!(affordable.len(), 2);

        let mut rng = ThreadRngSource::seeded(9);
        let selected = select_pools(catalog.pools(), &snapshot, 5, &mut rng);
        assert_eq!(selected.len(), 2);
        for pool in &selected {
            assert_eq!(pool.pair(), "USDC/USDT");
        }
    }

    #[test]
    fn test_selection_size_bounds_hold_for_random_draws() {
        let catalog = Catalog::pharos_testnet();
        let snapshot = snapshot_of(&[("USDC", "100"), ("USDT", "100"), ("WPHRS", "1")]);
        let mut rng = ThreadRngSource::seeded(2024);

        for cap in 1..=9usize {
            for _ in 0..50 {
                let selected = select_pools(catalog.pools(), &snapshot, cap, &mut rng);
                let (lower, upper) = selection_bounds(9, cap);
                assert!(selected.len() >= lower && selected.len() <= upper, "cap {} got {}", cap, selected.len());
                let mut ids: Vec<_> = selected.iter().map(|p| p.id).collect();
                ids.sort();
                ids.dedup();
                assert_eq!(ids.len(), selected.len());
            }
        }
    }

    #[test]
    fn test_selection_bounds_cap_below_minimum() {
        assert_eq!(selection_bounds(9, 2), (2, 2));
        assert_eq!(selection_bounds(9, 5), (3, 5));
        assert_eq!(selection_bounds(1, 5), (1, 1));
        assert_eq!(selection_bounds(0, 5), (0, 0));
    }
}
