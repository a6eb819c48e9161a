use std::collections::BTreeMap;

use alloy_primitives::Address;

use crate::constants::{USDC, USDT, WPHRS};
use crate::math::from_micro_units;
use crate::{Pool, PoolId, Token};

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("unknown token symbol: {0}")]
    UnknownToken(String),
}

/// Static token table and candidate pools for one network.
#[derive(Debug, Clone)]
pub struct Catalog {
    tokens: BTreeMap<String, Token>,
    pools: Vec<Pool>,
    wrapped_native: String,
}

/// Pool entry before base amounts are scaled to token precision.
/// Base amounts are in millionths of a whole token.
struct PoolSpec {
    token0: &'static str,
    token1: &'static str,
    fee: u32,
    base0_micros: u64,
    base1_micros: u64,
    tick_spacing: i32,
    weight: u8,
}

const PHAROS_POOLS: &[PoolSpec] = &[
    PoolSpec { token0: "USDC", token1: "WPHRS", fee: 500, base0_micros: 8_000_000, base1_micros: 5_000, tick_spacing: 10, weight: 3 },
    PoolSpec { token0: "USDC", token1: "WPHRS", fee: 3000, base0_micros: 6_000_000, base1_micros: 4_000, tick_spacing: 60, weight: 2 },
    PoolSpec { token0: "USDC", token1: "WPHRS", fee: 10000, base0_micros: 4_000_000, base1_micros: 3_000, tick_spacing: 200, weight: 1 },
    PoolSpec { token0: "USDT", token1: "WPHRS", fee: 500, base0_micros: 8_000_000, base1_micros: 5_000, tick_spacing: 10, weight: 3 },
    PoolSpec { token0: "USDT", token1: "WPHRS", fee: 3000, base0_micros: 6_000_000, base1_micros: 4_000, tick_spacing: 60, weight: 2 },
    PoolSpec { token0: "USDT", token1: "WPHRS", fee: 10000, base0_micros: 4_000_000, base1_micros: 3_000, tick_spacing: 200, weight: 1 },
    PoolSpec { token0: "USDC", token1: "USDT", fee: 500, base0_micros: 5_000_000, base1_micros: 5_000_000, tick_spacing: 10, weight: 2 },
    PoolSpec { token0: "USDC", token1: "USDT", fee: 3000, base0_micros: 4_000_000, base1_micros: 4_000_000, tick_spacing: 60, weight: 1 },
    PoolSpec { token0: "USDC", token1: "USDT", fee: 10000, base0_micros: 3_000_000, base1_micros: 3_000_000, tick_spacing: 200, weight: 1 },
];

impl Catalog {
    /// Builds a catalog from explicit tokens and pools. Pools naming a symbol
    /// missing from `tokens` are rejected.
    pub fn new(tokens: Vec<Token>, pools: Vec<Pool>, wrapped_native: &str) -> Result<Self, CatalogError> {
        let tokens: BTreeMap<String, Token> = tokens.into_iter().map(|t| (t.symbol.clone(), t)).collect();
        if !tokens.contains_key(wrapped_native) {
            return Err(CatalogError::UnknownToken(wrapped_native.to_string()));
        }
        for pool in &pools {
            for symbol in [&pool.token0, &pool.token1] {
                if !tokens.contains_key(symbol.as_str()) {
                    return Err(CatalogError::UnknownToken(symbol.clone()));
                }
            }
        }
        Ok(Self { tokens, pools, wrapped_native: wrapped_native.to_string() })
    }

    /// The Pharos testnet reference catalog: USDC, USDT, WPHRS and nine pools.
    pub fn pharos_testnet() -> Self {
        let tokens = vec![
            Token { symbol: "USDC".into(), address: USDC, decimals: 6 },
            Token { symbol: "USDT".into(), address: USDT, decimals: 6 },
            Token { symbol: "WPHRS".into(), address: WPHRS, decimals: 18 },
        ];
        let decimals: BTreeMap<&str, u8> = tokens.iter().map(|t| (t.symbol.as_str(), t.decimals)).collect();

        let pools = PHAROS_POOLS
            .iter()
            .enumerate()
            .map(|(idx, spec)| Pool {
                id: PoolId(idx),
                token0: spec.token0.to_string(),
                token1: spec.token1.to_string(),
                fee: spec.fee,
                base_amount0: from_micro_units(spec.base0_micros, decimals[spec.token0]),
                base_amount1: from_micro_units(spec.base1_micros, decimals[spec.token1]),
                tick_spacing: spec.tick_spacing,
                weight: spec.weight,
            })
            .collect();

        let wrapped_native = "WPHRS".to_string();
        let tokens = tokens.into_iter().map(|t| (t.symbol.clone(), t)).collect();
        Self { tokens, pools, wrapped_native }
    }

    pub fn token(&self, symbol: &str) -> Result<&Token, CatalogError> {
        self.tokens
            .get(symbol)
            .ok_or_else(|| CatalogError::UnknownToken(symbol.to_string()))
    }

    pub fn token_by_address(&self, address: Address) -> Option<&Token> {
        self.tokens.values().find(|t| t.address == address)
    }

    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.tokens.values()
    }

    pub fn pools(&self) -> &[Pool] {
        &self.pools
    }

    pub fn wrapped_native(&self) -> &str {
        &self.wrapped_native
    }

    /// Replaces the pool list without validating symbols; flows skip pools
    /// whose tokens cannot be resolved.
    pub fn with_pools(mut self, pools: Vec<Pool>) -> Self {
        self.pools = pools;
        self
    }
}
