use std::collections::BTreeMap;

use alloy_primitives::U256;
use testnet_core::catalog::Catalog;
use testnet_core::math::{format_amount, from_micro_units};
use testnet_core::telemetry::BALANCE_QUERY_ERRORS;
use testnet_core::{BalanceSnapshot, BalanceStatus, TokenBalance};
use tracing::{debug, warn};

use crate::ports::{ChainError, LiquidityChain};
use crate::retry::{retry_with_backoff, RetryPolicy};

/// Balances at or below 0.001 of a whole token count as dust.
pub const DUST_THRESHOLD_MICROS: u64 = 1_000;

/// Reads every catalog token for the chain's wallet. Each token is queried on
/// its own; a token whose reads keep failing is reported as zero with
/// `BalanceStatus::Unknown` while the others are still read.
pub async fn take_snapshot<C: LiquidityChain + ?Sized>(
    chain: &C,
    catalog: &Catalog,
    policy: &RetryPolicy,
) -> BalanceSnapshot {
    let mut balances = BTreeMap::new();

    for token in catalog.tokens() {
        let read = retry_with_backoff(policy, ChainError::is_transient, || {
            chain.token_balance(token.address)
        })
        .await;

        let dust = from_micro_units(DUST_THRESHOLD_MICROS, token.decimals);
        let entry = match read.result {
            Ok(raw) => TokenBalance {
                raw,
                formatted: format_amount(raw, token.decimals),
                sufficient: raw > dust,
                status: BalanceStatus::Confirmed,
            },
            Err(e) => {
                warn!("⚠️ Balance read for {} failed after {} retries: {}", token.symbol, read.retries, e);
                BALANCE_QUERY_ERRORS.with_label_values(&[&token.symbol]).inc();
                TokenBalance {
                    raw: U256::ZERO,
                    formatted: format_amount(U256::ZERO, token.decimals),
                    sufficient: false,
                    status: BalanceStatus::Unknown,
                }
            }
        };
        debug!("💰 {}: {}", token.symbol, entry.formatted);
        balances.insert(token.symbol.clone(), entry);
    }

    BalanceSnapshot::new(chain.owner(), balances)
}
