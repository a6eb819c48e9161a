pub mod catalog;
pub mod math;
pub mod telemetry;

use std::collections::BTreeMap;

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

/// Transaction identifier as returned by the chain.
pub type TxHash = B256;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Token {
    pub symbol: String,
    pub address: Address,
    pub decimals: u8,
}

/// Position of a pool inside its catalog. Used as the tie-break when two
/// pools carry the same weight.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolId(pub usize);

/// A candidate liquidity pool. Base amounts are raw integers in each token's
/// own precision.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Pool {
    pub id: PoolId,
    pub token0: String,
    pub token1: String,
    pub fee: u32,
    pub base_amount0: U256,
    pub base_amount1: U256,
    pub tick_spacing: i32,
    pub weight: u8,
}

impl Pool {
    pub fn pair(&self) -> String {
        format!("{}/{}", self.token0, self.token1)
    }

    /// Human label, e.g. `USDC/WPHRS (0.05%)`.
    pub fn label(&self) -> String {
        format!("{} ({})", self.pair(), fee_tier_label(self.fee))
    }
}

/// Fee tier in hundredths of a bip rendered as a percentage (500 -> "0.05%").
pub fn fee_tier_label(fee: u32) -> String {
    let whole = fee / 10_000;
    let frac = fee % 10_000;
    if frac == 0 {
        format!("{}%", whole)
    } else {
        let digits = format!("{:04}", frac);
        format!("{}.{}%", whole, digits.trim_end_matches('0'))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum BalanceStatus {
    Confirmed,
    /// Every read attempt failed; the raw balance is reported as zero.
    Unknown,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TokenBalance {
    pub raw: U256,
    pub formatted: String,
    pub sufficient: bool,
    pub status: BalanceStatus,
}

/// Holdings of the catalog's token set for one wallet at one point in time.
/// Never mutated; a fresh snapshot replaces it after any remediation.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct BalanceSnapshot {
    pub owner: Address,
    pub balances: BTreeMap<String, TokenBalance>,
}

impl BalanceSnapshot {
    pub fn new(owner: Address, balances: BTreeMap<String, TokenBalance>) -> Self {
        Self { owner, balances }
    }

    pub fn get(&self, symbol: &str) -> Option<&TokenBalance> {
        self.balances.get(symbol)
    }

    /// Raw balance for `symbol`, zero when the token is absent or unknown.
    pub fn raw(&self, symbol: &str) -> U256 {
        self.balances.get(symbol).map(|b| b.raw).unwrap_or(U256::ZERO)
    }

    pub fn unknown_tokens(&self) -> Vec<&str> {
        self.balances
            .iter()
            .filter(|(_, b)| b.status == BalanceStatus::Unknown)
            .map(|(s, _)| s.as_str())
            .collect()
    }
}

/// A single remediation swap: sell `amount` of `from` to cover a `to` deficit.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SwapPlan {
    pub from: String,
    pub to: String,
    pub amount: U256,
    pub target_deficit: U256,
}

/// Amounts committed to one pool in one planning pass.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub pool: Pool,
    pub amount0: U256,
    pub amount1: U256,
    /// Share of the remaining balance this pool was allowed to take, in percent.
    pub ratio_pct: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct PoolOutcome {
    pub pool: String,
    pub fee: u32,
    pub success: bool,
    pub tx_hash: Option<TxHash>,
    pub error: Option<String>,
    pub amount0: String,
    pub amount1: String,
    pub approvals: Vec<TxHash>,
    pub gas_used: Option<u64>,
    pub confirmation_retries: u32,
}

/// Per-wallet result of one liquidity pass.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LiquidityReport {
    pub owner: Address,
    pub success: bool,
    pub error: Option<String>,
    pub total_pools: usize,
    pub successful_pools: usize,
    pub successful_txs: Vec<TxHash>,
    pub results: Vec<PoolOutcome>,
}

impl LiquidityReport {
    pub fn from_outcomes(owner: Address, results: Vec<PoolOutcome>) -> Self {
        let successful_txs: Vec<TxHash> = results
            .iter()
            .filter(|r| r.success)
            .filter_map(|r| r.tx_hash)
            .collect();
        let successful_pools = results.iter().filter(|r| r.success).count();
        Self {
            owner,
            success: successful_pools > 0,
            error: None,
            total_pools: results.len(),
            successful_pools,
            successful_txs,
            results,
        }
    }

    pub fn failed(owner: Address, error: impl Into<String>) -> Self {
        Self {
            owner,
            success: false,
            error: Some(error.into()),
            total_pools: 0,
            successful_pools: 0,
            successful_txs: Vec::new(),
            results: Vec::new(),
        }
    }
}

pub mod constants {
    use alloy_primitives::{address, Address};

    pub const PHAROS_CHAIN_ID: u64 = 688688;
    pub const PHAROS_RPC_URL: &str = "https://testnet.dplabs-internal.com";
    pub const NATIVE_SYMBOL: &str = "PHRS";

    pub const USDC: Address = address!("72df0bcd7276f2dfbac900d1ce63c272c4bccced");
    pub const USDT: Address = address!("d4071393f8716661958f766df660033b3d35fd29");
    pub const WPHRS: Address = address!("76aaada469d23216be5f7c596fa25f282ff9b364");

    /// Uniswap-V3 style NonfungiblePositionManager.
    pub const POSITION_MANAGER: Address = address!("f8a1d4ff0f9b9af7ce58e1fc1833688f3bfd6115");
    /// Multicall swap router (fixed 0.05% fee tier).
    pub const SWAP_ROUTER: Address = address!("3541423f25a1ca5c98fdbcf478405d3f0aad1164");
    pub const SWAP_FEE_TIER: u32 = 500;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fee_tier_labels() {
        assert_eq!(fee_tier_label(500), "0.05%");
        assert_eq!(fee_tier_label(3000), "0.3%");
        assert_eq!(fee_tier_label(10000), "1%");
        assert_eq!(fee_tier_label(100), "0.01%");
    }

    #[test]
    fn test_report_from_outcomes_counts_successes() {
        let ok = PoolOutcome {
            pool: "USDC/USDT (0.05%)".into(),
            success: true,
            tx_hash: Some(TxHash::repeat_byte(0xab)),
            ..Default::default()
        };
        let failed = PoolOutcome {
            pool: "USDC/WPHRS (0.3%)".into(),
            success: false,
            error: Some("execution reverted".into()),
            ..Default::default()
        };

        let report = LiquidityReport::from_outcomes(Address::ZERO, vec![ok, failed]);
        assert!(report.success);
        assert_eq!(report.total_pools, 2);
        assert_eq!(report.successful_pools, 1);
        assert_eq!(report.successful_txs, vec![TxHash::repeat_byte(0xab)]);
    }

    #[test]
    fn test_snapshot_raw_defaults_to_zero() {
        let snapshot = BalanceSnapshot::new(Address::ZERO, BTreeMap::new());
        assert_eq!(snapshot.raw("USDC"), U256::ZERO);
        assert!(snapshot.unknown_tokens().is_empty());
    }
}
