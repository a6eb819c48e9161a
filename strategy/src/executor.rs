use std::time::Duration;

use alloy_primitives::{Address, U256};
use testnet_core::catalog::Catalog;
use testnet_core::constants::{POSITION_MANAGER, SWAP_FEE_TIER, SWAP_ROUTER};
use testnet_core::math::{canonical_pair, format_amount, full_range_ticks};
use testnet_core::telemetry::{CONFIRMATION_RETRIES, POOLS_ATTEMPTED, POOLS_FAILED, POOLS_SUCCEEDED};
use testnet_core::{Allocation, PoolOutcome, SwapPlan, TxHash};
use tracing::{debug, info, warn};

use crate::error::LiquidityError;
use crate::ports::{ChainError, LiquidityChain, MintRequest, Receipt, SwapRequest};
use crate::retry::{retry_with_backoff, Retried, RetryPolicy};

/// Contract addresses and confirmation behaviour for on-chain actions.
#[derive(Debug, Clone)]
pub struct ExecutionSettings {
    pub position_manager: Address,
    pub swap_router: Address,
    pub swap_fee: u32,
    /// Per-wait receipt timeout.
    pub confirmation_timeout: Duration,
    /// Re-waits happen on timeout only.
    pub confirmation: RetryPolicy,
    /// Added to the current time for mint and swap deadlines.
    pub deadline: Duration,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            position_manager: POSITION_MANAGER,
            swap_router: SWAP_ROUTER,
            swap_fee: SWAP_FEE_TIER,
            confirmation_timeout: Duration::from_secs(60),
            confirmation: RetryPolicy::fixed(3, Duration::from_secs(10)),
            deadline: Duration::from_secs(600),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapExecution {
    pub tx_hash: TxHash,
    pub approval: Option<TxHash>,
    pub confirmation_retries: u32,
}

/// Runs approvals, mints and swaps for one wallet.
pub struct PoolActionExecutor<'a, C: ?Sized> {
    chain: &'a C,
    catalog: &'a Catalog,
    settings: &'a ExecutionSettings,
}

impl<'a, C: LiquidityChain + ?Sized> PoolActionExecutor<'a, C> {
    pub fn new(chain: &'a C, catalog: &'a Catalog, settings: &'a ExecutionSettings) -> Self {
        Self { chain, catalog, settings }
    }

    fn deadline(&self) -> u64 {
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        now + self.settings.deadline.as_secs()
    }

    /// Waits for a receipt, re-waiting on timeouts up to the policy ceiling.
    pub async fn confirm(&self, tx_hash: TxHash) -> Retried<Receipt, ChainError> {
        let timeout = self.settings.confirmation_timeout;
        let out = retry_with_backoff(&self.settings.confirmation, ChainError::is_timeout, || {
            self.chain.wait_for_receipt(tx_hash, timeout)
        })
        .await;
        if out.retries > 0 {
            CONFIRMATION_RETRIES.inc_by(out.retries as u64);
        }
        out
    }

    async fn confirm_success(&self, tx_hash: TxHash) -> Result<(Receipt, u32), LiquidityError> {
        let confirmed = self.confirm(tx_hash).await;
        let receipt = confirmed.result?;
        if !receipt.success {
            return Err(LiquidityError::Reverted(tx_hash));
        }
        Ok((receipt, confirmed.retries))
    }

    /// Approves `spender` for an unlimited amount when the current allowance
    /// is below `amount`. Returns the approval tx when one was sent.
    pub async fn ensure_allowance(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<Option<TxHash>, LiquidityError> {
        let current = self.chain.allowance(token, spender).await?;
        if current >= amount {
            return Ok(None);
        }
        debug!("🔓 Approving {} for {}", token, spender);
        let tx = self.chain.approve(token, spender, U256::MAX).await?;
        self.confirm_success(tx).await?;
        Ok(Some(tx))
    }

    /// Mints a full-range position for one allocation. Never returns an error;
    /// failures are recorded on the outcome.
    pub async fn execute_pool(&self, allocation: &Allocation) -> PoolOutcome {
        let pool = &allocation.pool;
        let mut outcome = PoolOutcome { pool: pool.label(), fee: pool.fee, ..Default::default() };
        POOLS_ATTEMPTED.inc();

        match self.mint_allocation(allocation, &mut outcome).await {
            Ok(()) => {
                POOLS_SUCCEEDED.inc();
                outcome.success = true;
                info!("✅ {} minted: {:?}", outcome.pool, outcome.tx_hash);
            }
            Err(e) => {
                POOLS_FAILED.inc();
                outcome.success = false;
                outcome.error = Some(e.to_string());
                warn!("❌ {} failed: {}", outcome.pool, e);
            }
        }
        outcome
    }

    async fn mint_allocation(&self, allocation: &Allocation, outcome: &mut PoolOutcome) -> Result<(), LiquidityError> {
        let pool = &allocation.pool;
        let token0 = self.catalog.token(&pool.token0)?;
        let token1 = self.catalog.token(&pool.token1)?;
        outcome.amount0 = format_amount(allocation.amount0, token0.decimals);
        outcome.amount1 = format_amount(allocation.amount1, token1.decimals);

        let (tick_lower, tick_upper) = full_range_ticks(pool.fee, pool.tick_spacing);
        let pair = canonical_pair(
            (token0.address, allocation.amount0),
            (token1.address, allocation.amount1),
        );
        if pair.flipped {
            debug!("🔀 {} reordered to canonical token order", pool.pair());
        }

        for (token, amount) in [(pair.token0, pair.amount0), (pair.token1, pair.amount1)] {
            if let Some(tx) = self.ensure_allowance(token, self.settings.position_manager, amount).await? {
                outcome.approvals.push(tx);
            }
        }

        let request = MintRequest {
            token0: pair.token0,
            token1: pair.token1,
            fee: pool.fee,
            tick_lower,
            tick_upper,
            amount0_desired: pair.amount0,
            amount1_desired: pair.amount1,
            amount0_min: U256::ZERO,
            amount1_min: U256::ZERO,
            recipient: self.chain.owner(),
            deadline: self.deadline(),
        };
        info!("🏊 Minting {} with {} {} + {} {}", outcome.pool, outcome.amount0, pool.token0, outcome.amount1, pool.token1);
        let tx = self.chain.mint_position(request).await?;
        outcome.tx_hash = Some(tx);

        let confirmed = self.confirm(tx).await;
        outcome.confirmation_retries = confirmed.retries;
        let receipt = confirmed.result?;
        outcome.gas_used = Some(receipt.gas_used);
        if !receipt.success {
            return Err(LiquidityError::Reverted(tx));
        }
        Ok(())
    }

    /// Sells `plan.amount` of `plan.from` for `plan.to` through the router.
    pub async fn execute_swap(&self, plan: &SwapPlan) -> Result<SwapExecution, LiquidityError> {
        let from = self.catalog.token(&plan.from)?;
        let to = self.catalog.token(&plan.to)?;

        let approval = self.ensure_allowance(from.address, self.settings.swap_router, plan.amount).await?;
        let request = SwapRequest {
            token_in: from.address,
            token_out: to.address,
            fee: self.settings.swap_fee,
            amount_in: plan.amount,
            recipient: self.chain.owner(),
            deadline: self.deadline(),
        };
        info!("🔄 Swapping {} {} -> {}", format_amount(plan.amount, from.decimals), plan.from, plan.to);
        let tx = self.chain.swap_exact_input(request).await?;
        let (_, retries) = self.confirm_success(tx).await?;

        Ok(SwapExecution { tx_hash: tx, approval, confirmation_retries: retries })
    }
}
