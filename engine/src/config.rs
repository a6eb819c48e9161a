use std::time::Duration;

use ::config::builder::DefaultState;
use ::config::ConfigBuilder;
use executor::EvmClientConfig;
use strategy::executor::ExecutionSettings;
use strategy::features::{SwapSettings, TransferSettings, WrapSettings};
use strategy::resolver::{RemediationSettings, Requirement};
use strategy::retry::RetryPolicy;
use strategy::LiquiditySettings;
use testnet_core::catalog::Catalog;
use testnet_core::constants::{PHAROS_CHAIN_ID, PHAROS_RPC_URL, POSITION_MANAGER, SWAP_ROUTER, WPHRS};
use testnet_core::math::parse_amount;

#[derive(Debug, serde::Deserialize, Clone)]
pub struct BotConfig {
    #[serde(alias = "RPC_URL", default = "default_rpc_url")]
    pub rpc_url: String,
    #[serde(alias = "CHAIN_ID", default = "default_chain_id")]
    pub chain_id: u64,
    #[serde(alias = "PRIVATE_KEYS_FILE", default = "default_keys_file")]
    pub private_keys_file: String,
    /// 0 processes every wallet in the file.
    #[serde(alias = "MAX_WALLETS", default)]
    pub max_wallets: usize,

    // Loop
    #[serde(alias = "LOOP_ENABLED", default = "default_true")]
    pub loop_enabled: bool,
    #[serde(alias = "WAIT_MINUTES", default = "default_wait_minutes")]
    pub wait_minutes: u64,
    /// 0 means unbounded.
    #[serde(alias = "MAX_CYCLES", default)]
    pub max_cycles: u64,
    #[serde(alias = "DELAY_BETWEEN_WALLETS_MS", default = "default_wallet_delay_ms")]
    pub delay_between_wallets_ms: u64,
    #[serde(alias = "DELAY_BETWEEN_FEATURES_MS", default = "default_feature_delay_ms")]
    pub delay_between_features_ms: u64,

    // Feature toggles
    #[serde(alias = "FEATURE_LIQUIDITY", default = "default_true")]
    pub feature_liquidity: bool,
    #[serde(alias = "FEATURE_TRANSFER", default = "default_true")]
    pub feature_transfer: bool,
    #[serde(alias = "FEATURE_WRAP", default)]
    pub feature_wrap: bool,
    #[serde(alias = "FEATURE_SWAP", default = "default_true")]
    pub feature_swap: bool,

    // Liquidity
    #[serde(alias = "MAX_POOLS_PER_CYCLE", default = "default_max_pools")]
    pub max_pools_per_cycle: usize,
    /// `SYM:amount` pairs, comma separated, in priority order.
    #[serde(alias = "MIN_REQUIRED_BALANCES", default = "default_min_required")]
    pub min_required_balances: String,
    #[serde(alias = "POOL_DELAY_MIN_MS", default = "default_pool_delay_min_ms")]
    pub pool_delay_min_ms: u64,
    #[serde(alias = "POOL_DELAY_MAX_MS", default = "default_pool_delay_max_ms")]
    pub pool_delay_max_ms: u64,
    #[serde(alias = "CONFIRMATION_TIMEOUT_SECS", default = "default_confirmation_timeout")]
    pub confirmation_timeout_secs: u64,
    #[serde(alias = "CONFIRMATION_RETRY_BACKOFF_SECS", default = "default_confirmation_backoff")]
    pub confirmation_retry_backoff_secs: u64,
    /// Fixed legacy gas price. Unset lets the node price transactions.
    #[serde(alias = "GAS_PRICE_WEI", default)]
    pub gas_price_wei: Option<u64>,

    // Auxiliary features
    #[serde(alias = "TRANSFER_COUNT", default = "default_transfer_count")]
    pub transfer_count: usize,
    #[serde(alias = "TRANSFER_AMOUNT", default = "default_transfer_amount")]
    pub transfer_amount: String,
    #[serde(alias = "WRAP_AMOUNT", default = "default_wrap_amount")]
    pub wrap_amount: String,
    #[serde(alias = "WRAP_MIN_BALANCE", default = "default_wrap_min_balance")]
    pub wrap_min_balance: String,
    #[serde(alias = "SWAP_COUNT", default = "default_swap_count")]
    pub swap_count: usize,
    #[serde(alias = "SWAP_AMOUNT", default = "default_swap_amount")]
    pub swap_amount: String,

    // Observability
    #[serde(alias = "METRICS_PORT", default)]
    pub metrics_port: Option<u16>,
    #[serde(alias = "LOG_DIR", default)]
    pub log_dir: Option<String>,
}

fn default_rpc_url() -> String { PHAROS_RPC_URL.to_string() }
fn default_chain_id() -> u64 { PHAROS_CHAIN_ID }
fn default_keys_file() -> String { "wallets.txt".to_string() }
fn default_true() -> bool { true }
fn default_wait_minutes() -> u64 { 15 }
fn default_wallet_delay_ms() -> u64 { 2_000 }
fn default_feature_delay_ms() -> u64 { 1_000 }
fn default_max_pools() -> usize { 5 }
fn default_min_required() -> String { "WPHRS:0.02,USDC:15,USDT:15".to_string() }
fn default_pool_delay_min_ms() -> u64 { 3_000 }
fn default_pool_delay_max_ms() -> u64 { 5_000 }
fn default_confirmation_timeout() -> u64 { 60 }
fn default_confirmation_backoff() -> u64 { 10 }
fn default_transfer_count() -> usize { 10 }
fn default_transfer_amount() -> String { "0.000001".to_string() }
fn default_wrap_amount() -> String { "0.02".to_string() }
fn default_wrap_min_balance() -> String { "0.01".to_string() }
fn default_swap_count() -> usize { 10 }
fn default_swap_amount() -> String { "1".to_string() }

impl BotConfig {
    /// Loads from the process environment (after `.env`) and validates.
    pub fn new() -> Result<Self, String> {
        Self::from_builder(::config::Config::builder().add_source(::config::Environment::default()))
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, String> {
        let s = builder
            .build()
            .map_err(|e| format!("Config Build Error: {}", e))?;

        let config: BotConfig = s.try_deserialize()
            .map_err(|e| format!("Config Deserialize Error: {}", e))?;

        config.validate()?;
        Ok(config)
    }

    /// Validates configuration values at startup (Fail Fast)
    pub fn validate(&self) -> Result<(), String> {
        if !self.rpc_url.starts_with("http") {
            return Err(format!("Invalid RPC_URL: must start with http/https. Got: {}", self.rpc_url));
        }
        if self.chain_id != PHAROS_CHAIN_ID {
            tracing::warn!("⚠️  CHAIN_ID {} differs from Pharos testnet ({}). Contract addresses may not exist.", self.chain_id, PHAROS_CHAIN_ID);
        }
        if self.private_keys_file.trim().is_empty() {
            return Err("PRIVATE_KEYS_FILE cannot be empty".into());
        }

        if self.max_pools_per_cycle == 0 {
            return Err("MAX_POOLS_PER_CYCLE cannot be 0".into());
        }
        if self.pool_delay_min_ms > self.pool_delay_max_ms {
            return Err(format!(
                "POOL_DELAY_MIN_MS ({}) must not exceed POOL_DELAY_MAX_MS ({})",
                self.pool_delay_min_ms, self.pool_delay_max_ms
            ));
        }
        if self.confirmation_timeout_secs == 0 {
            return Err("CONFIRMATION_TIMEOUT_SECS cannot be 0".into());
        }

        if !(self.feature_liquidity || self.feature_transfer || self.feature_wrap || self.feature_swap) {
            return Err("All features are disabled. Enable at least one FEATURE_* flag".into());
        }

        // Amounts must parse against the decimals they are used with.
        parse_requirement_list(&self.min_required_balances, &Catalog::pharos_testnet())?;
        for (key, value) in [
            ("TRANSFER_AMOUNT", &self.transfer_amount),
            ("WRAP_AMOUNT", &self.wrap_amount),
            ("WRAP_MIN_BALANCE", &self.wrap_min_balance),
        ] {
            parse_amount(value, 18).map_err(|e| format!("Invalid {}: {}", key, e))?;
        }
        parse_amount(&self.swap_amount, 6).map_err(|e| format!("Invalid SWAP_AMOUNT: {}", e))?;

        if self.loop_enabled && self.wait_minutes == 0 {
            tracing::warn!("⚠️  WAIT_MINUTES is 0. Cycles will run back to back.");
        }

        Ok(())
    }

    pub fn requirements(&self, catalog: &Catalog) -> Result<Vec<Requirement>, String> {
        parse_requirement_list(&self.min_required_balances, catalog)
    }

    pub fn wallet_delay(&self) -> Duration {
        Duration::from_millis(self.delay_between_wallets_ms)
    }

    pub fn feature_delay(&self) -> Duration {
        Duration::from_millis(self.delay_between_features_ms)
    }

    pub fn wait_between_cycles(&self) -> Duration {
        Duration::from_secs(self.wait_minutes * 60)
    }

    pub fn execution_settings(&self) -> ExecutionSettings {
        ExecutionSettings {
            confirmation_timeout: Duration::from_secs(self.confirmation_timeout_secs),
            confirmation: RetryPolicy::fixed(3, Duration::from_secs(self.confirmation_retry_backoff_secs)),
            ..Default::default()
        }
    }

    pub fn liquidity_settings(&self, catalog: &Catalog) -> Result<LiquiditySettings, String> {
        let remediation = RemediationSettings {
            requirements: self.requirements(catalog)?,
            ..RemediationSettings::pharos_defaults()
        };
        Ok(LiquiditySettings {
            max_pools_per_cycle: self.max_pools_per_cycle,
            pool_delay_min: Duration::from_millis(self.pool_delay_min_ms),
            pool_delay_max: Duration::from_millis(self.pool_delay_max_ms),
            remediation,
            execution: self.execution_settings(),
            ..Default::default()
        })
    }

    pub fn transfer_settings(&self) -> Result<TransferSettings, String> {
        TransferSettings::new(self.transfer_count, &self.transfer_amount)
            .map_err(|e| format!("Invalid TRANSFER_AMOUNT: {}", e))
    }

    pub fn wrap_settings(&self) -> Result<WrapSettings, String> {
        WrapSettings::new(&self.wrap_amount, &self.wrap_min_balance)
            .map_err(|e| format!("Invalid WRAP settings: {}", e))
    }

    pub fn swap_settings(&self) -> SwapSettings {
        SwapSettings {
            count: self.swap_count,
            amount: self.swap_amount.clone(),
            ..Default::default()
        }
    }

    pub fn client_config(&self) -> EvmClientConfig {
        EvmClientConfig {
            rpc_url: self.rpc_url.clone(),
            chain_id: self.chain_id,
            gas_price_wei: self.gas_price_wei.map(u128::from),
            wrapped_native: WPHRS,
            position_manager: POSITION_MANAGER,
            swap_router: SWAP_ROUTER,
            receipt_poll_interval: Duration::from_secs(2),
        }
    }
}

/// Parses `WPHRS:0.02,USDC:15` into requirements, keeping the listed order.
pub fn parse_requirement_list(raw: &str, catalog: &Catalog) -> Result<Vec<Requirement>, String> {
    let mut out: Vec<Requirement> = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (symbol, amount) = entry
            .split_once(':')
            .ok_or_else(|| format!("MIN_REQUIRED_BALANCES entry '{}' must look like SYM:amount", entry))?;
        let symbol = symbol.trim();
        let token = catalog
            .token(symbol)
            .map_err(|e| format!("MIN_REQUIRED_BALANCES: {}", e))?;
        let amount = parse_amount(amount.trim(), token.decimals)
            .map_err(|e| format!("MIN_REQUIRED_BALANCES {}: {}", symbol, e))?;
        if out.iter().any(|r| r.symbol == symbol) {
            return Err(format!("MIN_REQUIRED_BALANCES lists {} twice", symbol));
        }
        out.push(Requirement { symbol: symbol.to_string(), amount });
    }
    Ok(out)
}


#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
