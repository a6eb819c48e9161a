use std::collections::BTreeMap;

use alloy_primitives::U256;
use testnet_core::math::percent_of;
use testnet_core::{Allocation, BalanceSnapshot, Pool};
use tracing::debug;

/// Share of the remaining balance a pool may take, in percent.
///
/// The last pool gets 80%, the final three get `40 + 20 / remaining`
/// (50% with two left, 46% with three), earlier ones 30%.
pub fn allocation_ratio_pct(remaining_pools: usize) -> u64 {
    match remaining_pools {
        0 | 1 => 80,
        2 | 3 => 40 + 20 / remaining_pools as u64,
        _ => 30,
    }
}

/// Base amount multiplier by pool weight, in percent.
pub fn weight_multiplier_pct(weight: u8) -> u64 {
    if weight >= 3 {
        130
    } else if weight >= 2 {
        110
    } else {
        100
    }
}

/// Splits the snapshot across `pools` without committing more of any token
/// than the snapshot holds. Pools are visited by weight (highest first, ties
/// in catalog order). A pool whose clamped amount is zero on either side is
/// skipped and consumes nothing.
pub fn plan_allocations(pools: &[Pool], snapshot: &BalanceSnapshot) -> Vec<Allocation> {
    let mut ordered: Vec<&Pool> = pools.iter().collect();
    ordered.sort_by(|a, b| b.weight.cmp(&a.weight).then(a.id.cmp(&b.id)));

    let mut used: BTreeMap<&str, U256> = BTreeMap::new();
    let mut allocations = Vec::with_capacity(ordered.len());
    let total = ordered.len();

    for (idx, pool) in ordered.into_iter().enumerate() {
        let remaining_pools = total - idx;
        let ratio_pct = allocation_ratio_pct(remaining_pools);
        let multiplier = weight_multiplier_pct(pool.weight);

        let remaining0 = snapshot
            .raw(&pool.token0)
            .saturating_sub(used.get(pool.token0.as_str()).copied().unwrap_or_default());
        let remaining1 = snapshot
            .raw(&pool.token1)
            .saturating_sub(used.get(pool.token1.as_str()).copied().unwrap_or_default());

        let amount0 = percent_of(pool.base_amount0, multiplier).min(percent_of(remaining0, ratio_pct));
        let amount1 = percent_of(pool.base_amount1, multiplier).min(percent_of(remaining1, ratio_pct));

        if amount0.is_zero() || amount1.is_zero() {
            debug!("⏭️ Skipping {}: nothing left to commit", pool.label());
            continue;
        }

        *used.entry(pool.token0.as_str()).or_default() += amount0;
        *used.entry(pool.token1.as_str()).or_default() += amount1;

        allocations.push(Allocation { pool: pool.clone(), amount0, amount1, ratio_pct });
    }

    allocations
}
