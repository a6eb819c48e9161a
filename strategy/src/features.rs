// Auxiliary per-wallet features run alongside the liquidity pass:
// tiny native transfers, a top-up wrap and a few stable swaps.

use std::time::Duration;

use alloy_primitives::{Address, U256};
use testnet_core::catalog::Catalog;
use testnet_core::math::{format_amount, from_micro_units, parse_amount, AmountError};
use testnet_core::telemetry::{outcome_label, SWAPS_TOTAL, TRANSFERS_TOTAL, WRAPS_TOTAL};
use testnet_core::SwapPlan;
use tracing::{info, warn};

use crate::error::LiquidityError;
use crate::executor::PoolActionExecutor;
use crate::ports::{random_delay, LiquidityChain, RandomSource};

/// Native currency decimals.
const NATIVE_DECIMALS: u8 = 18;

/// Result of one feature for one wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureOutcome {
    pub feature: &'static str,
    pub success: bool,
    pub attempted: usize,
    pub succeeded: usize,
    pub detail: Option<String>,
}

impl FeatureOutcome {
    fn new(feature: &'static str) -> Self {
        Self { feature, success: false, attempted: 0, succeeded: 0, detail: None }
    }

    fn finish(mut self) -> Self {
        self.success = self.succeeded > 0 || (self.attempted == 0 && self.detail.is_none());
        self
    }
}

#[derive(Debug, Clone)]
pub struct TransferSettings {
    pub count: usize,
    pub amount: U256,
    /// Kept back so the wallet can still pay for later transactions.
    pub gas_buffer: U256,
    pub delay_min: Duration,
    pub delay_max: Duration,
}

impl TransferSettings {
    pub fn new(count: usize, amount: &str) -> Result<Self, AmountError> {
        Ok(Self {
            count,
            amount: parse_amount(amount, NATIVE_DECIMALS)?,
            gas_buffer: from_micro_units(1_000, NATIVE_DECIMALS),
            delay_min: Duration::from_secs(1),
            delay_max: Duration::from_secs(3),
        })
    }
}

#[derive(Debug, Clone)]
pub struct WrapSettings {
    pub amount: U256,
    /// Skip wrapping while the wrapped balance is at least this much.
    pub min_balance: U256,
    pub gas_reserve: U256,
}

impl WrapSettings {
    pub fn new(amount: &str, min_balance: &str) -> Result<Self, AmountError> {
        Ok(Self {
            amount: parse_amount(amount, NATIVE_DECIMALS)?,
            min_balance: parse_amount(min_balance, NATIVE_DECIMALS)?,
            gas_reserve: from_micro_units(10_000, NATIVE_DECIMALS),
        })
    }
}

#[derive(Debug, Clone)]
pub struct SwapSettings {
    pub count: usize,
    /// Human amount per swap, in whole units of the sold token.
    pub amount: String,
    /// The two tokens swapped back and forth.
    pub pair: (String, String),
    pub pause: Duration,
}

impl Default for SwapSettings {
    fn default() -> Self {
        Self {
            count: 3,
            amount: "1".to_string(),
            pair: ("USDC".to_string(), "USDT".to_string()),
            pause: Duration::from_secs(2),
        }
    }
}

fn random_address(rng: &mut dyn RandomSource) -> Address {
    let mut bytes = [0u8; 20];
    for chunk in bytes.chunks_mut(8) {
        let word = rng.range_inclusive(0, u64::MAX).to_be_bytes();
        chunk.copy_from_slice(&word[..chunk.len()]);
    }
    Address::from(bytes)
}

/// Sends `count` tiny native transfers to fresh random addresses, stopping
/// early once the balance cannot cover another transfer plus the gas buffer.
pub async fn run_transfers<C: LiquidityChain + ?Sized>(
    chain: &C,
    executor: &PoolActionExecutor<'_, C>,
    settings: &TransferSettings,
    rng: &mut dyn RandomSource,
) -> FeatureOutcome {
    let mut outcome = FeatureOutcome::new("transfer");

    for i in 0..settings.count {
        let native = match chain.native_balance().await {
            Ok(v) => v,
            Err(e) => {
                outcome.detail = Some(e.to_string());
                break;
            }
        };
        if native < settings.amount + settings.gas_buffer {
            warn!("⛽ Native balance {} too low for more transfers", format_amount(native, NATIVE_DECIMALS));
            outcome.detail = Some("insufficient native balance".to_string());
            break;
        }

        if i > 0 {
            let delay = random_delay(rng, settings.delay_min, settings.delay_max);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        let to = random_address(rng);
        outcome.attempted += 1;
        let sent = match chain.send_native(to, settings.amount).await {
            Ok(tx) => executor.confirm(tx).await.result.map(|r| r.success).map_err(LiquidityError::from),
            Err(e) => Err(e.into()),
        };
        match sent {
            Ok(true) => {
                outcome.succeeded += 1;
                TRANSFERS_TOTAL.with_label_values(&[outcome_label(true)]).inc();
                info!("📨 Transfer {}/{} -> {}", i + 1, settings.count, to);
            }
            Ok(false) => {
                TRANSFERS_TOTAL.with_label_values(&[outcome_label(false)]).inc();
                warn!("❌ Transfer {}/{} reverted", i + 1, settings.count);
            }
            Err(e) => {
                TRANSFERS_TOTAL.with_label_values(&[outcome_label(false)]).inc();
                warn!("❌ Transfer {}/{} failed: {}", i + 1, settings.count, e);
            }
        }
    }

    outcome.finish()
}

/// Tops up the wrapped-native balance when it is below the minimum.
pub async fn run_wrap<C: LiquidityChain + ?Sized>(
    chain: &C,
    executor: &PoolActionExecutor<'_, C>,
    catalog: &Catalog,
    settings: &WrapSettings,
) -> FeatureOutcome {
    let mut outcome = FeatureOutcome::new("wrap");
    match wrap_if_low(chain, executor, catalog, settings, &mut outcome).await {
        Ok(()) => {}
        Err(e) => {
            warn!("❌ Wrap feature failed: {}", e);
            outcome.detail = Some(e.to_string());
        }
    }
    outcome.finish()
}

async fn wrap_if_low<C: LiquidityChain + ?Sized>(
    chain: &C,
    executor: &PoolActionExecutor<'_, C>,
    catalog: &Catalog,
    settings: &WrapSettings,
    outcome: &mut FeatureOutcome,
) -> Result<(), LiquidityError> {
    let token = catalog.token(catalog.wrapped_native())?;
    let wrapped = chain.token_balance(token.address).await?;
    if wrapped >= settings.min_balance {
        info!("🎁 {} balance {} already above minimum", token.symbol, format_amount(wrapped, token.decimals));
        return Ok(());
    }

    let native = chain.native_balance().await?;
    let needed = settings.amount + settings.gas_reserve;
    if native < needed {
        return Err(LiquidityError::InsufficientNative {
            have: format_amount(native, NATIVE_DECIMALS),
            need: format_amount(needed, NATIVE_DECIMALS),
        });
    }

    outcome.attempted += 1;
    let tx = chain.wrap_native(settings.amount).await?;
    let receipt = executor.confirm(tx).await.result?;
    WRAPS_TOTAL.with_label_values(&[outcome_label(receipt.success)]).inc();
    if !receipt.success {
        return Err(LiquidityError::Reverted(tx));
    }
    outcome.succeeded += 1;
    info!("🎁 Wrapped {} native", format_amount(settings.amount, NATIVE_DECIMALS));
    Ok(())
}

/// Swaps a fixed amount between the configured pair, picking the direction at
/// random each time. Directions whose source balance is short are skipped.
pub async fn run_swaps<C: LiquidityChain + ?Sized>(
    chain: &C,
    executor: &PoolActionExecutor<'_, C>,
    catalog: &Catalog,
    settings: &SwapSettings,
    rng: &mut dyn RandomSource,
) -> FeatureOutcome {
    let mut outcome = FeatureOutcome::new("swap");

    for i in 0..settings.count {
        let (from, to) = if rng.next_unit() < 0.5 {
            (&settings.pair.0, &settings.pair.1)
        } else {
            (&settings.pair.1, &settings.pair.0)
        };

        let token = match catalog.token(from) {
            Ok(t) => t,
            Err(e) => {
                outcome.detail = Some(e.to_string());
                break;
            }
        };
        let amount = match parse_amount(&settings.amount, token.decimals) {
            Ok(a) => a,
            Err(e) => {
                outcome.detail = Some(e.to_string());
                break;
            }
        };
        let balance = match chain.token_balance(token.address).await {
            Ok(b) => b,
            Err(e) => {
                warn!("⚠️ Swap {}/{}: {} balance unavailable: {}", i + 1, settings.count, from, e);
                outcome.detail = Some(format!("{} balance query failed: {}", from, e));
                continue;
            }
        };
        if balance < amount {
            warn!("⏭️ Swap {}/{}: {} balance too low", i + 1, settings.count, from);
            continue;
        }

        outcome.attempted += 1;
        let plan = SwapPlan { from: from.clone(), to: to.clone(), amount, target_deficit: U256::ZERO };
        match executor.execute_swap(&plan).await {
            Ok(_) => {
                outcome.succeeded += 1;
                SWAPS_TOTAL.with_label_values(&[outcome_label(true)]).inc();
            }
            Err(e) => {
                SWAPS_TOTAL.with_label_values(&[outcome_label(false)]).inc();
                warn!("❌ Swap {}/{} {} -> {} failed: {}", i + 1, settings.count, from, to, e);
            }
        }
        if i + 1 < settings.count && !settings.pause.is_zero() {
            tokio::time::sleep(settings.pause).await;
        }
    }

    if outcome.attempted == 0 && outcome.detail.is_none() {
        outcome.detail = Some("no swap had enough balance".to_string());
    }
    outcome.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ScriptedRandom;
    use crate::executor::ExecutionSettings;
    use crate::retry::RetryPolicy;
    use crate::testing::{MockChain, TxKind};
    use testnet_core::constants::{USDC, USDT, WPHRS};

    fn fast_execution() -> ExecutionSettings {
        ExecutionSettings { confirmation: RetryPolicy::fixed(3, Duration::ZERO), ..Default::default() }
    }

    fn fast_transfers(count: usize) -> TransferSettings {
        TransferSettings { delay_min: Duration::ZERO, delay_max: Duration::ZERO, ..TransferSettings::new(count, "0.000001").unwrap() }
    }

    #[tokio::test]
    async fn test_transfers_go_to_distinct_addresses() {
        let catalog = Catalog::pharos_testnet();
        let execution = fast_execution();
        let chain = MockChain::new().with_native(parse_amount("1", 18).unwrap());
        let executor = PoolActionExecutor::new(&chain, &catalog, &execution);
        let mut rng = crate::adapters::ThreadRngSource::seeded(5);

        let outcome = run_transfers(&chain, &executor, &fast_transfers(10), &mut rng).await;

        assert!(outcome.success);
        assert_eq!(outcome.succeeded, 10);
        let transfers = chain.transfers();
        let mut targets: Vec<_> = transfers.iter().map(|(to, _)| *to).collect();
        targets.sort();
        targets.dedup();
        assert_eq!(targets.len(), 10);
        assert!(transfers.iter().all(|(_, amount)| *amount == U256::from(1_000_000_000_000u64)));
    }

    #[tokio::test]
    async fn test_transfers_stop_when_buffer_would_be_breached() {
        let catalog = Catalog::pharos_testnet();
        let execution = fast_execution();
        // Enough for exactly two transfers on top of the 0.001 buffer.
        let chain = MockChain::new().with_native(parse_amount("0.001002", 18).unwrap());
        let executor = PoolActionExecutor::new(&chain, &catalog, &execution);

        let outcome = run_transfers(&chain, &executor, &fast_transfers(10), &mut ScriptedRandom::new()).await;

        assert_eq!(outcome.succeeded, 2);
        assert_eq!(chain.submitted(TxKind::Transfer), 2);
        assert_eq!(outcome.detail.as_deref(), Some("insufficient native balance"));
    }

    #[tokio::test]
    async fn test_wrap_skips_when_balance_is_enough() {
        let catalog = Catalog::pharos_testnet();
        let execution = fast_execution();
        let chain = MockChain::new()
            .with_native(parse_amount("1", 18).unwrap())
            .with_balance(WPHRS, parse_amount("0.5", 18).unwrap());
        let executor = PoolActionExecutor::new(&chain, &catalog, &execution);
        let settings = WrapSettings::new("0.02", "0.01").unwrap();

        let outcome = run_wrap(&chain, &executor, &catalog, &settings).await;

        assert!(outcome.success);
        assert_eq!(outcome.attempted, 0);
        assert_eq!(chain.submitted(TxKind::Wrap), 0);
    }

    #[tokio::test]
    async fn test_wrap_tops_up_low_balance() {
        let catalog = Catalog::pharos_testnet();
        let execution = fast_execution();
        let chain = MockChain::new().with_native(parse_amount("1", 18).unwrap());
        let executor = PoolActionExecutor::new(&chain, &catalog, &execution);
        let settings = WrapSettings::new("0.02", "0.01").unwrap();

        let outcome = run_wrap(&chain, &executor, &catalog, &settings).await;

        assert!(outcome.success);
        assert_eq!(chain.balance_of(WPHRS), parse_amount("0.02", 18).unwrap());
    }

    #[tokio::test]
    async fn test_wrap_without_native_fails() {
        let catalog = Catalog::pharos_testnet();
        let execution = fast_execution();
        let chain = MockChain::new();
        let executor = PoolActionExecutor::new(&chain, &catalog, &execution);
        let settings = WrapSettings::new("0.02", "0.01").unwrap();

        let outcome = run_wrap(&chain, &executor, &catalog, &settings).await;

        assert!(!outcome.success);
        assert!(outcome.detail.unwrap().contains("insufficient native"));
    }

    #[tokio::test]
    async fn test_swaps_follow_random_direction() {
        let catalog = Catalog::pharos_testnet();
        let execution = fast_execution();
        let chain = MockChain::new()
            .with_balance(USDC, parse_amount("10", 6).unwrap())
            .with_balance(USDT, parse_amount("10", 6).unwrap());
        let executor = PoolActionExecutor::new(&chain, &catalog, &execution);
        let settings = SwapSettings { pause: Duration::ZERO, ..Default::default() };
        let mut rng = ScriptedRandom::new().with_units(&[0.1, 0.9, 0.2]);

        let outcome = run_swaps(&chain, &executor, &catalog, &settings, &mut rng).await;

        assert!(outcome.success);
        assert_eq!(outcome.succeeded, 3);
        let ins: Vec<_> = chain.swaps().iter().map(|s| s.token_in).collect();
        assert_eq!(ins, vec![USDC, USDT, USDC]);
    }

    #[tokio::test]
    async fn test_swaps_skip_empty_side() {
        let catalog = Catalog::pharos_testnet();
        let execution = fast_execution();
        let chain = MockChain::new();
        let executor = PoolActionExecutor::new(&chain, &catalog, &execution);
        let settings = SwapSettings { pause: Duration::ZERO, ..Default::default() };

        let outcome = run_swaps(&chain, &executor, &catalog, &settings, &mut ScriptedRandom::new()).await;

        assert!(!outcome.success);
        assert_eq!(outcome.attempted, 0);
        assert_eq!(chain.total_submissions(), 0);
    }

    #[tokio::test]
    async fn test_swap_balance_errors_are_recorded_not_hidden() {
        let catalog = Catalog::pharos_testnet();
        let execution = fast_execution();
        let chain = MockChain::new()
            .with_balance(USDC, parse_amount("10", 6).unwrap())
            .with_balance(USDT, parse_amount("10", 6).unwrap())
            .fail_balance_reads(USDC, 1);
        let executor = PoolActionExecutor::new(&chain, &catalog, &execution);
        let settings = SwapSettings { pause: Duration::ZERO, ..Default::default() };
        let mut rng = ScriptedRandom::new().with_units(&[0.1, 0.9, 0.9]);

        let outcome = run_swaps(&chain, &executor, &catalog, &settings, &mut rng).await;

        assert_eq!(outcome.attempted, 2);
        assert_eq!(outcome.succeeded, 2);
        let detail = outcome.detail.unwrap();
        assert!(detail.contains("USDC balance query failed"));
        assert!(detail.contains("connection reset"));
        assert!(!detail.contains("too low"));
        assert!(chain.swaps().iter().all(|s| s.token_in == USDT));
    }
}
