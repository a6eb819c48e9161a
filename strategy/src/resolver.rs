use std::collections::BTreeMap;
use std::time::Duration;

use alloy_primitives::U256;
use testnet_core::catalog::Catalog;
use testnet_core::math::{format_amount, from_float_units, from_micro_units, one_unit, percent_of, to_float_units};
use testnet_core::telemetry::{outcome_label, SWAPS_TOTAL, WRAPS_TOTAL};
use testnet_core::{BalanceSnapshot, SwapPlan, TxHash};
use tracing::{debug, info, warn};

use crate::error::LiquidityError;
use crate::executor::PoolActionExecutor;
use crate::ports::{LiquidityChain, PriceSource};

/// Minimum balance a token must hold before a cycle will use it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub symbol: String,
    pub amount: U256,
}

#[derive(Debug, Clone)]
pub struct RemediationSettings {
    /// Checked in order; earlier tokens get first pick of swap sources.
    pub requirements: Vec<Requirement>,
    /// Wrap this share of the requirement, in percent.
    pub wrap_multiplier_pct: u64,
    /// Native balance kept back for gas when wrapping.
    pub gas_reserve: U256,
    /// Source tokens per short token, most preferred first.
    pub swap_sources: BTreeMap<String, Vec<String>>,
    pub swap_multiplier: f64,
    pub max_swap_pct: u64,
    pub fallback_swap_pct: u64,
    /// Pause before re-reading the wrapped balance.
    pub wrap_settle: Duration,
    /// Pause after each swap.
    pub swap_pause: Duration,
}

impl RemediationSettings {
    /// WPHRS 0.02, USDC 15, USDT 15 with the testnet swap routes.
    pub fn pharos_defaults() -> Self {
        let requirements = vec![
            Requirement { symbol: "WPHRS".into(), amount: from_micro_units(20_000, 18) },
            Requirement { symbol: "USDC".into(), amount: from_micro_units(15_000_000, 6) },
            Requirement { symbol: "USDT".into(), amount: from_micro_units(15_000_000, 6) },
        ];
        let swap_sources = BTreeMap::from([
            ("WPHRS".to_string(), vec!["USDC".to_string(), "USDT".to_string()]),
            ("USDC".to_string(), vec!["USDT".to_string(), "WPHRS".to_string()]),
            ("USDT".to_string(), vec!["USDC".to_string(), "WPHRS".to_string()]),
        ]);
        Self {
            requirements,
            wrap_multiplier_pct: 120,
            gas_reserve: from_micro_units(10_000, 18),
            swap_sources,
            swap_multiplier: 1.5,
            max_swap_pct: 50,
            fallback_swap_pct: 90,
            wrap_settle: Duration::from_secs(2),
            swap_pause: Duration::from_secs(2),
        }
    }

    pub fn requirement_for(&self, symbol: &str) -> Option<U256> {
        self.requirements.iter().find(|r| r.symbol == symbol).map(|r| r.amount)
    }
}

/// Swap size for covering `deficit` from a source holding `source_balance`.
///
/// `None` when the source holds no more than one whole unit. Otherwise the
/// estimate is clamped to `[1 unit, max_swap_pct of balance]`, falling back to
/// `fallback_swap_pct` of the balance if that still exceeds it.
pub fn size_swap(
    deficit: U256,
    target_decimals: u8,
    source_balance: U256,
    source_decimals: u8,
    source_per_target: f64,
    settings: &RemediationSettings,
) -> Option<U256> {
    let min_swap = one_unit(source_decimals);
    if source_balance <= min_swap {
        return None;
    }

    let estimate = to_float_units(deficit, target_decimals) * source_per_target * settings.swap_multiplier;
    let raw = from_float_units(estimate, source_decimals);
    let mut amount = raw.min(percent_of(source_balance, settings.max_swap_pct)).max(min_swap);
    if amount > source_balance {
        amount = percent_of(source_balance, settings.fallback_swap_pct);
    }
    Some(amount)
}

/// Picks the first usable source for `target` and sizes the swap. `available`
/// holds what each token can still spend.
pub fn plan_swap(
    target: &str,
    deficit: U256,
    available: &BTreeMap<String, U256>,
    catalog: &Catalog,
    prices: &dyn PriceSource,
    settings: &RemediationSettings,
) -> Option<SwapPlan> {
    let target_token = catalog.token(target).ok()?;
    let sources = settings.swap_sources.get(target)?;

    for source in sources {
        let Ok(source_token) = catalog.token(source) else {
            warn!("⚠️ Swap source {} is not in the catalog", source);
            continue;
        };
        let balance = available.get(source).copied().unwrap_or_default();
        let rate = prices.source_per_target(source, target).unwrap_or_else(|| {
            warn!("⚠️ No rate for {} -> {}, assuming 1:1", source, target);
            1.0
        });
        if let Some(amount) = size_swap(deficit, target_token.decimals, balance, source_token.decimals, rate, settings) {
            if !prices.is_live() {
                debug!("📐 {} -> {} sized from static rate {}", source, target, rate);
            }
            return Some(SwapPlan {
                from: source.clone(),
                to: target.to_string(),
                amount,
                target_deficit: deficit,
            });
        }
    }
    None
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRecord {
    pub plan: SwapPlan,
    pub tx_hash: Option<TxHash>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemediationOutcome {
    pub resolved: Vec<String>,
    pub unresolved: Vec<String>,
    pub wrap_txs: Vec<TxHash>,
    pub swaps: Vec<SwapRecord>,
}

impl RemediationOutcome {
    pub fn any_resolved(&self) -> bool {
        !self.resolved.is_empty()
    }
}

/// Covers token shortfalls by wrapping native currency or swapping between
/// catalog tokens. At most one wrap and one swap per short token.
pub struct DeficitResolver<'a, C: ?Sized> {
    chain: &'a C,
    catalog: &'a Catalog,
    prices: &'a dyn PriceSource,
    settings: &'a RemediationSettings,
    executor: PoolActionExecutor<'a, C>,
}

impl<'a, C: LiquidityChain + ?Sized> DeficitResolver<'a, C> {
    pub fn new(
        chain: &'a C,
        catalog: &'a Catalog,
        prices: &'a dyn PriceSource,
        settings: &'a RemediationSettings,
        executor: PoolActionExecutor<'a, C>,
    ) -> Self {
        Self { chain, catalog, prices, settings, executor }
    }

    pub async fn resolve(&self, snapshot: &BalanceSnapshot) -> RemediationOutcome {
        let mut available: BTreeMap<String, U256> =
            snapshot.balances.iter().map(|(s, b)| (s.clone(), b.raw)).collect();
        let mut outcome = RemediationOutcome::default();

        for requirement in &self.settings.requirements {
            let symbol = requirement.symbol.as_str();
            let balance = snapshot.raw(symbol);
            if balance >= requirement.amount {
                continue;
            }
            let deficit = requirement.amount - balance;
            info!("📉 {} short by {} (raw)", symbol, deficit);

            if symbol == self.catalog.wrapped_native() {
                match self.wrap_native(requirement.amount).await {
                    Ok(tx) => {
                        WRAPS_TOTAL.with_label_values(&[outcome_label(true)]).inc();
                        info!("🎁 Wrapped native to cover {}", symbol);
                        outcome.wrap_txs.push(tx);
                        outcome.resolved.push(symbol.to_string());
                        continue;
                    }
                    Err(e) => {
                        WRAPS_TOTAL.with_label_values(&[outcome_label(false)]).inc();
                        warn!("⚠️ Wrap for {} failed: {}; trying a swap", symbol, e);
                    }
                }
            }

            let Some(plan) = plan_swap(symbol, deficit, &available, self.catalog, self.prices, self.settings) else {
                warn!("🚫 {}", LiquidityError::NoSwapSource(symbol.to_string()));
                outcome.unresolved.push(symbol.to_string());
                continue;
            };

            match self.executor.execute_swap(&plan).await {
                Ok(exec) => {
                    SWAPS_TOTAL.with_label_values(&[outcome_label(true)]).inc();
                    if let Some(left) = available.get_mut(&plan.from) {
                        *left = left.saturating_sub(plan.amount);
                    }
                    outcome.resolved.push(symbol.to_string());
                    outcome.swaps.push(SwapRecord { plan, tx_hash: Some(exec.tx_hash), error: None });
                    if !self.settings.swap_pause.is_zero() {
                        tokio::time::sleep(self.settings.swap_pause).await;
                    }
                }
                Err(e) => {
                    SWAPS_TOTAL.with_label_values(&[outcome_label(false)]).inc();
                    warn!("❌ Swap {} -> {} failed: {}", plan.from, plan.to, e);
                    outcome.unresolved.push(symbol.to_string());
                    outcome.swaps.push(SwapRecord { plan, tx_hash: None, error: Some(e.to_string()) });
                }
            }
        }

        if !outcome.unresolved.is_empty() {
            warn!("🚫 Unresolved deficits: {}", outcome.unresolved.join(", "));
        }
        outcome
    }

    /// Wraps the configured share of `requirement` and checks that the
    /// wrapped balance now covers it.
    pub async fn wrap_native(&self, requirement: U256) -> Result<TxHash, LiquidityError> {
        let token = self.catalog.token(self.catalog.wrapped_native())?;
        let wrap_amount = percent_of(requirement, self.settings.wrap_multiplier_pct);
        let needed = wrap_amount + self.settings.gas_reserve;

        let native = self.chain.native_balance().await?;
        if native < needed {
            return Err(LiquidityError::InsufficientNative {
                have: format_amount(native, 18),
                need: format_amount(needed, 18),
            });
        }

        let tx = self.chain.wrap_native(wrap_amount).await?;
        let confirmed = self.executor.confirm(tx).await;
        let receipt = confirmed.result?;
        if !receipt.success {
            return Err(LiquidityError::Reverted(tx));
        }

        if !self.settings.wrap_settle.is_zero() {
            tokio::time::sleep(self.settings.wrap_settle).await;
        }
        let after = self.chain.token_balance(token.address).await?;
        if after < requirement {
            return Err(LiquidityError::WrapShortfall {
                have: format_amount(after, token.decimals),
                need: format_amount(requirement, token.decimals),
            });
        }
        Ok(tx)
    }
}
