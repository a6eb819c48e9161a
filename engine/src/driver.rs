use std::collections::BTreeMap;

use alloy_primitives::Address;
use anyhow::Result;
use executor::EvmChainClient;
use strategy::adapters::{StaticRates, ThreadRngSource};
use strategy::executor::PoolActionExecutor;
use strategy::features::{run_swaps, run_transfers, run_wrap, FeatureOutcome, SwapSettings, TransferSettings, WrapSettings};
use strategy::ports::{LiquidityChain, RandomSource};
use strategy::{LiquidityFlow, LiquiditySettings};
use testnet_core::catalog::Catalog;
use testnet_core::telemetry::{CYCLES_TOTAL, WALLETS_PROCESSED};
use testnet_core::LiquidityReport;
use tracing::{error, info, warn};

use crate::config::BotConfig;
use crate::wallets::short_address;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    Transfer,
    Swap,
    Wrap,
    Liquidity,
}

impl Feature {
    pub fn name(&self) -> &'static str {
        match self {
            Feature::Transfer => "transfer",
            Feature::Swap => "swap",
            Feature::Wrap => "wrap",
            Feature::Liquidity => "liquidity",
        }
    }
}

/// Enabled features in execution order.
pub fn enabled_features(config: &BotConfig) -> Vec<Feature> {
    [
        (Feature::Transfer, config.feature_transfer),
        (Feature::Swap, config.feature_swap),
        (Feature::Wrap, config.feature_wrap),
        (Feature::Liquidity, config.feature_liquidity),
    ]
    .into_iter()
    .filter_map(|(f, on)| on.then_some(f))
    .collect()
}

/// Liquidity reports fold into the same shape as the other features.
pub fn liquidity_outcome(report: &LiquidityReport) -> FeatureOutcome {
    FeatureOutcome {
        feature: Feature::Liquidity.name(),
        success: report.success,
        attempted: report.total_pools,
        succeeded: report.successful_pools,
        detail: report.error.clone(),
    }
}

#[derive(Debug, Clone, Default)]
pub struct WalletSummary {
    pub address: Option<Address>,
    pub features: Vec<FeatureOutcome>,
    pub error: Option<String>,
}

impl WalletSummary {
    pub fn successful_features(&self) -> usize {
        self.features.iter().filter(|f| f.success).count()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CycleSummary {
    pub cycle: u64,
    pub wallets: Vec<WalletSummary>,
}

impl CycleSummary {
    pub fn successful_wallets(&self) -> usize {
        self.wallets.iter().filter(|w| w.successful_features() > 0).count()
    }

    pub fn total_features(&self) -> usize {
        self.wallets.iter().map(|w| w.features.len()).sum()
    }

    pub fn successful_features(&self) -> usize {
        self.wallets.iter().map(|w| w.successful_features()).sum()
    }

    /// `(succeeded, total)` per feature name.
    pub fn per_feature(&self) -> BTreeMap<&'static str, (usize, usize)> {
        let mut stats = BTreeMap::new();
        for outcome in self.wallets.iter().flat_map(|w| w.features.iter()) {
            let entry = stats.entry(outcome.feature).or_insert((0, 0));
            entry.1 += 1;
            if outcome.success {
                entry.0 += 1;
            }
        }
        stats
    }

    /// Wallets that never reached their features, with the reason.
    pub fn wallet_errors(&self) -> Vec<(usize, &str)> {
        self.wallets
            .iter()
            .enumerate()
            .filter_map(|(i, w)| w.error.as_deref().map(|e| (i + 1, e)))
            .collect()
    }

    pub fn success_rate(&self) -> f64 {
        match self.total_features() {
            0 => 0.0,
            total => self.successful_features() as f64 * 100.0 / total as f64,
        }
    }

    pub fn log(&self) {
        info!("📊 Cycle {} summary", self.cycle);
        info!("   Wallets:  {}/{} succeeded", self.successful_wallets(), self.wallets.len());
        info!(
            "   Features: {}/{} succeeded ({:.1}%)",
            self.successful_features(),
            self.total_features(),
            self.success_rate()
        );
        for (feature, (ok, total)) in self.per_feature() {
            info!("   {:<10} {}/{}", feature, ok, total);
        }
        for wallet in self.wallets.iter().filter(|w| w.successful_features() == 0) {
            if let Some(address) = &wallet.address {
                warn!("   {} had no successful feature", short_address(address));
            }
        }
        for (idx, err) in self.wallet_errors() {
            warn!("   wallet #{} skipped: {}", idx, err);
        }
    }
}

/// Whether another cycle should start after `completed` cycles.
pub fn should_continue(config: &BotConfig, completed: u64) -> bool {
    if !config.loop_enabled {
        return false;
    }
    config.max_cycles == 0 || completed < config.max_cycles
}

/// Runs every wallet through the enabled features, cycle after cycle.
pub struct CycleDriver {
    config: BotConfig,
    catalog: Catalog,
    keys: Vec<String>,
    prices: StaticRates,
    liquidity: LiquiditySettings,
    transfer: TransferSettings,
    wrap: WrapSettings,
    swap: SwapSettings,
}

impl CycleDriver {
    pub fn new(config: BotConfig, keys: Vec<String>) -> Result<Self> {
        let catalog = Catalog::pharos_testnet();
        let liquidity = config.liquidity_settings(&catalog).map_err(anyhow::Error::msg)?;
        let transfer = config.transfer_settings().map_err(anyhow::Error::msg)?;
        let wrap = config.wrap_settings().map_err(anyhow::Error::msg)?;
        let swap = config.swap_settings();
        Ok(Self {
            config,
            catalog,
            keys,
            prices: StaticRates::pharos_testnet(),
            liquidity,
            transfer,
            wrap,
            swap,
        })
    }

    pub async fn run(&self) {
        let features: Vec<&str> = enabled_features(&self.config).iter().map(Feature::name).collect();
        info!("🧭 {} wallet(s), features: {}", self.keys.len(), features.join(", "));

        let mut cycle = 0u64;
        loop {
            cycle += 1;
            info!("🔁 Starting cycle {} at {}", cycle, chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));

            let summary = self.run_cycle(cycle).await;
            summary.log();
            CYCLES_TOTAL.inc();

            if !should_continue(&self.config, cycle) {
                info!("🏁 Finished after {} cycle(s)", cycle);
                break;
            }
            info!("⏳ Next cycle in {} minute(s)", self.config.wait_minutes);
            tokio::time::sleep(self.config.wait_between_cycles()).await;
        }
    }

    pub async fn run_cycle(&self, cycle: u64) -> CycleSummary {
        let mut summary = CycleSummary { cycle, wallets: Vec::with_capacity(self.keys.len()) };

        for (i, key) in self.keys.iter().enumerate() {
            info!("👛 Wallet {}/{}", i + 1, self.keys.len());
            let wallet = self.process_wallet(key).await;
            WALLETS_PROCESSED.inc();
            summary.wallets.push(wallet);

            if i + 1 < self.keys.len() {
                tokio::time::sleep(self.config.wallet_delay()).await;
            }
        }
        summary
    }

    async fn process_wallet(&self, key: &str) -> WalletSummary {
        let chain = match EvmChainClient::connect(key, self.config.client_config()).await {
            Ok(c) => c,
            Err(e) => {
                error!("❌ Wallet connection failed: {:#}", e);
                return WalletSummary { error: Some(format!("{:#}", e)), ..Default::default() };
            }
        };
        let address = chain.owner();
        info!("🔑 Wallet {}", short_address(&address));
        match chain.native_balance().await {
            Ok(balance) => info!("💰 Native balance: {}", testnet_core::math::format_amount(balance, 18)),
            Err(e) => warn!("⚠️ Native balance unavailable: {}", e),
        }

        let mut rng = ThreadRngSource::new();
        let features = self.run_features(&chain, &mut rng).await;
        WalletSummary { address: Some(address), features, error: None }
    }

    /// Runs the enabled features against one wallet, pausing between them.
    pub async fn run_features<C: LiquidityChain + ?Sized>(
        &self,
        chain: &C,
        rng: &mut dyn RandomSource,
    ) -> Vec<FeatureOutcome> {
        let executor = PoolActionExecutor::new(chain, &self.catalog, &self.liquidity.execution);
        let features = enabled_features(&self.config);
        let mut outcomes = Vec::with_capacity(features.len());

        for (i, feature) in features.iter().enumerate() {
            info!("▶️  {}", feature.name());
            let outcome = match feature {
                Feature::Transfer => run_transfers(chain, &executor, &self.transfer, rng).await,
                Feature::Swap => run_swaps(chain, &executor, &self.catalog, &self.swap, rng).await,
                Feature::Wrap => run_wrap(chain, &executor, &self.catalog, &self.wrap).await,
                Feature::Liquidity => {
                    let flow = LiquidityFlow::new(chain, &self.catalog, &self.prices, &self.liquidity);
                    let report = flow.run(rng).await;
                    info!(
                        "🏊 Liquidity: {}/{} pools, txs {:?}",
                        report.successful_pools, report.total_pools, report.successful_txs
                    );
                    liquidity_outcome(&report)
                }
            };
            if outcome.success {
                info!("✅ {} done ({}/{})", outcome.feature, outcome.succeeded, outcome.attempted);
            } else {
                warn!("❌ {} failed: {}", outcome.feature, outcome.detail.as_deref().unwrap_or("no successful action"));
            }
            outcomes.push(outcome);

            if i + 1 < features.len() {
                tokio::time::sleep(self.config.feature_delay()).await;
            }
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(pairs: &[(&str, &str)]) -> BotConfig {
        let mut builder = ::config::Config::builder();
        for (key, value) in pairs {
            builder = builder.set_override(*key, *value).unwrap();
        }
        BotConfig::from_builder(builder).unwrap()
    }

    fn outcome(feature: &'static str, success: bool) -> FeatureOutcome {
        FeatureOutcome { feature, success, attempted: 1, succeeded: success as usize, detail: None }
    }

    #[test]
    fn test_enabled_features_keep_order() {
        let config = config_with(&[("feature_wrap", "true"), ("feature_swap", "false")]);
        assert_eq!(
            enabled_features(&config),
            vec![Feature::Transfer, Feature::Wrap, Feature::Liquidity]
        );
    }

    #[test]
    fn test_cycle_summary_counts() {
        let summary = CycleSummary {
            cycle: 4,
            wallets: vec![
                WalletSummary {
                    features: vec![outcome("transfer", true), outcome("liquidity", false)],
                    ..Default::default()
                },
                WalletSummary {
                    features: vec![outcome("transfer", false), outcome("liquidity", false)],
                    ..Default::default()
                },
                WalletSummary { error: Some("connect".into()), ..Default::default() },
            ],
        };

        assert_eq!(summary.successful_wallets(), 1);
        assert_eq!(summary.total_features(), 4);
        assert_eq!(summary.successful_features(), 1);
        assert!((summary.success_rate() - 25.0).abs() < 1e-9);
        let stats = summary.per_feature();
        assert_eq!(stats["transfer"], (1, 2));
        assert_eq!(stats["liquidity"], (0, 2));
        assert_eq!(summary.wallet_errors(), vec![(3, "connect")]);
    }

    #[test]
    fn test_empty_summary_rate_is_zero() {
        assert_eq!(CycleSummary::default().success_rate(), 0.0);
    }

    #[test]
    fn test_liquidity_outcome_mirrors_report() {
        let report = LiquidityReport::failed(Address::ZERO, "no usable pools, remediation exhausted");
        let out = liquidity_outcome(&report);

        assert!(!out.success);
        assert_eq!(out.feature, "liquidity");
        assert_eq!(out.detail.as_deref(), Some("no usable pools, remediation exhausted"));
    }

    #[test]
    fn test_should_continue() {
        let single = config_with(&[("loop_enabled", "false")]);
        assert!(!should_continue(&single, 1));

        let bounded = config_with(&[("max_cycles", "2")]);
        assert!(should_continue(&bounded, 1));
        assert!(!should_continue(&bounded, 2));

        let endless = config_with(&[]);
        assert!(should_continue(&endless, 1_000));
    }
}
