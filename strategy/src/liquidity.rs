use std::time::Duration;

use testnet_core::catalog::Catalog;
use testnet_core::telemetry::REMEDIATION_EXHAUSTED;
use testnet_core::{BalanceSnapshot, LiquidityReport, Pool};
use tracing::{info, warn};

use crate::error::LiquidityError;
use crate::executor::{ExecutionSettings, PoolActionExecutor};
use crate::planner::plan_allocations;
use crate::ports::{random_delay, LiquidityChain, PriceSource, RandomSource};
use crate::resolver::{DeficitResolver, RemediationSettings};
use crate::retry::RetryPolicy;
use crate::selection::select_pools;
use crate::snapshot::take_snapshot;

/// Immutable knobs for one liquidity pass. Built once from the bot config.
#[derive(Debug, Clone)]
pub struct LiquiditySettings {
    pub max_pools_per_cycle: usize,
    pub pool_delay_min: Duration,
    pub pool_delay_max: Duration,
    /// Pause between remediation and the fresh snapshot.
    pub settle_delay: Duration,
    pub balance_retry: RetryPolicy,
    pub remediation: RemediationSettings,
    pub execution: ExecutionSettings,
}

impl Default for LiquiditySettings {
    fn default() -> Self {
        Self {
            max_pools_per_cycle: 5,
            pool_delay_min: Duration::from_secs(3),
            pool_delay_max: Duration::from_secs(5),
            settle_delay: Duration::from_secs(3),
            balance_retry: RetryPolicy::exponential(3, Duration::from_millis(500), 2),
            remediation: RemediationSettings::pharos_defaults(),
            execution: ExecutionSettings::default(),
        }
    }
}

/// Snapshot, select, remediate if needed, plan and mint for one wallet.
pub struct LiquidityFlow<'a, C: ?Sized> {
    chain: &'a C,
    catalog: &'a Catalog,
    prices: &'a dyn PriceSource,
    settings: &'a LiquiditySettings,
}

impl<'a, C: LiquidityChain + ?Sized> LiquidityFlow<'a, C> {
    pub fn new(
        chain: &'a C,
        catalog: &'a Catalog,
        prices: &'a dyn PriceSource,
        settings: &'a LiquiditySettings,
    ) -> Self {
        Self { chain, catalog, prices, settings }
    }

    fn executor(&self) -> PoolActionExecutor<'a, C> {
        PoolActionExecutor::new(self.chain, self.catalog, &self.settings.execution)
    }

    async fn snapshot(&self) -> BalanceSnapshot {
        let snapshot = take_snapshot(self.chain, self.catalog, &self.settings.balance_retry).await;
        let unknown = snapshot.unknown_tokens();
        if !unknown.is_empty() {
            warn!("⚠️ Balances unknown for {}; treated as zero", unknown.join(", "));
        }
        snapshot
    }

    /// Always returns a report; a failed pass carries `error`.
    pub async fn run(&self, rng: &mut dyn RandomSource) -> LiquidityReport {
        let owner = self.chain.owner();
        info!("💧 Liquidity pass for {}", owner);

        let (snapshot, selected) = match self.select_or_remediate(rng).await {
            Ok(v) => v,
            Err(e) => {
                warn!("🚫 {}: {}", owner, e);
                return LiquidityReport::failed(owner, e.to_string());
            }
        };

        let allocations = plan_allocations(&selected, &snapshot);
        if allocations.is_empty() {
            warn!("🚫 {}: {}", owner, LiquidityError::NoAllocations);
            return LiquidityReport::failed(owner, LiquidityError::NoAllocations.to_string());
        }

        let executor = self.executor();
        let mut results = Vec::with_capacity(allocations.len());
        for (idx, allocation) in allocations.iter().enumerate() {
            if idx > 0 {
                let delay = random_delay(rng, self.settings.pool_delay_min, self.settings.pool_delay_max);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
            info!("🏊 [{}/{}] {} ({}% of remaining)", idx + 1, allocations.len(), allocation.pool.label(), allocation.ratio_pct);
            results.push(executor.execute_pool(allocation).await);
        }

        let report = LiquidityReport::from_outcomes(owner, results);
        info!("📊 {}: {}/{} pools succeeded", owner, report.successful_pools, report.total_pools);
        report
    }

    async fn select_or_remediate(
        &self,
        rng: &mut dyn RandomSource,
    ) -> Result<(BalanceSnapshot, Vec<Pool>), LiquidityError> {
        let cap = self.settings.max_pools_per_cycle;
        let snapshot = self.snapshot().await;
        let selected = select_pools(self.catalog.pools(), &snapshot, cap, rng);
        if !selected.is_empty() {
            return Ok((snapshot, selected));
        }

        info!("🩹 No affordable pools, attempting remediation");
        let resolver = DeficitResolver::new(
            self.chain,
            self.catalog,
            self.prices,
            &self.settings.remediation,
            self.executor(),
        );
        let outcome = resolver.resolve(&snapshot).await;
        if !outcome.any_resolved() {
            REMEDIATION_EXHAUSTED.inc();
            return Err(LiquidityError::RemediationExhausted);
        }

        if !self.settings.settle_delay.is_zero() {
            tokio::time::sleep(self.settings.settle_delay).await;
        }
        let refreshed = self.snapshot().await;
        let selected = select_pools(self.catalog.pools(), &refreshed, cap, rng);
        if selected.is_empty() {
            return Err(LiquidityError::NoPoolsAfterRemediation);
        }
        Ok((refreshed, selected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::Backoff;

    #[test]
    fn test_balance_reads_back_off_exponentially() {
        let settings = LiquiditySettings::default();
        assert_eq!(settings.balance_retry.max_attempts, 3);
        assert_eq!(
            settings.balance_retry.backoff,
            Backoff::Exponential { initial: Duration::from_millis(500), factor: 2 }
        );
        assert_eq!(settings.balance_retry.backoff.delay_for(1), Duration::from_secs(1));
    }
}
