// Port definitions for the liquidity flows.
// The chain, randomness and pricing seams are traits so the flows can run
// against an alloy client in production and scripted doubles in tests.

use std::time::Duration;

use alloy_primitives::{Address, U256};
use testnet_core::TxHash;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error("rpc error: {0}")]
    Rpc(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("transaction {0} reverted")]
    Reverted(TxHash),
    #[error("contract call failed: {0}")]
    Contract(String),
}

impl ChainError {
    /// Confirmation waits are only retried on this.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ChainError::Timeout(_))
    }

    /// Balance reads retry on transport-level failures.
    pub fn is_transient(&self) -> bool {
        matches!(self, ChainError::Rpc(_) | ChainError::Timeout(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub success: bool,
    pub gas_used: u64,
}

/// Arguments for `NonfungiblePositionManager.mint`. Tokens must already be in
/// canonical (ascending address) order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintRequest {
    pub token0: Address,
    pub token1: Address,
    pub fee: u32,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub amount0_desired: U256,
    pub amount1_desired: U256,
    pub amount0_min: U256,
    pub amount1_min: U256,
    pub recipient: Address,
    pub deadline: u64,
}

/// A single-hop exact-input swap routed through the router's multicall.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRequest {
    pub token_in: Address,
    pub token_out: Address,
    pub fee: u32,
    pub amount_in: U256,
    pub recipient: Address,
    pub deadline: u64,
}

/// Port for everything the flows need from the network, bound to one wallet.
#[async_trait::async_trait]
pub trait LiquidityChain: Send + Sync {
    /// Address of the signing wallet.
    fn owner(&self) -> Address;

    async fn token_balance(&self, token: Address) -> Result<U256, ChainError>;

    async fn native_balance(&self) -> Result<U256, ChainError>;

    async fn allowance(&self, token: Address, spender: Address) -> Result<U256, ChainError>;

    async fn approve(&self, token: Address, spender: Address, amount: U256) -> Result<TxHash, ChainError>;

    /// Deposits native currency into the wrapped-native contract.
    async fn wrap_native(&self, amount: U256) -> Result<TxHash, ChainError>;

    async fn swap_exact_input(&self, request: SwapRequest) -> Result<TxHash, ChainError>;

    async fn mint_position(&self, request: MintRequest) -> Result<TxHash, ChainError>;

    async fn send_native(&self, to: Address, amount: U256) -> Result<TxHash, ChainError>;

    /// Waits at most `timeout` for the receipt; `ChainError::Timeout` when it
    /// does not arrive in time.
    async fn wait_for_receipt(&self, tx_hash: TxHash, timeout: Duration) -> Result<Receipt, ChainError>;
}

/// All randomness in the flows goes through here.
pub trait RandomSource: Send {
    /// Uniform in `[0, 1)`.
    fn next_unit(&mut self) -> f64;

    /// Uniform in `[low, high]`. Returns `low` when `high <= low`.
    fn range_inclusive(&mut self, low: u64, high: u64) -> u64;
}

/// Fisher-Yates over any `RandomSource`.
pub fn shuffle<T>(items: &mut [T], rng: &mut dyn RandomSource) {
    for i in (1..items.len()).rev() {
        let j = rng.range_inclusive(0, i as u64) as usize;
        items.swap(i, j.min(i));
    }
}

/// Random duration in `[min, max]` at millisecond resolution.
pub fn random_delay(rng: &mut dyn RandomSource, min: Duration, max: Duration) -> Duration {
    let ms = rng.range_inclusive(min.as_millis() as u64, max.as_millis() as u64);
    Duration::from_millis(ms)
}

/// Exchange-rate lookup used to size remediation swaps.
pub trait PriceSource: Send + Sync {
    /// Whole units of `source` needed to buy one whole unit of `target`.
    fn source_per_target(&self, source: &str, target: &str) -> Option<f64>;

    /// False for hard-coded tables; sizing from these is an estimate only.
    fn is_live(&self) -> bool {
        false
    }
}
