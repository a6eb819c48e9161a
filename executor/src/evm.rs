//! Alloy-backed EVM chain client
//!
//! Implements the strategy's `LiquidityChain` port for a single signing wallet
//! against one HTTP RPC endpoint. Transactions are submitted with explicit gas
//! limits (and an optional fixed gas price, zero on Pharos testnet); receipts
//! are polled separately so the flows control their own confirmation retries.

use std::time::Duration;

use alloy::network::{EthereumWallet, ReceiptResponse, TransactionBuilder};
use alloy::primitives::aliases::{I24, U160, U24};
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::SolCall;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use strategy::ports::{ChainError, LiquidityChain, MintRequest, Receipt, SwapRequest};
use testnet_core::TxHash;
use tracing::{debug, info, warn};

use crate::bindings::{IWrappedNative, INonfungiblePositionManager, ISwapRouter, IERC20};

pub const MINT_GAS_LIMIT: u64 = 800_000;
pub const SWAP_GAS_LIMIT: u64 = 500_000;
pub const WRAP_GAS_LIMIT: u64 = 100_000;
pub const APPROVE_GAS_LIMIT: u64 = 100_000;
pub const TRANSFER_GAS_LIMIT: u64 = 21_000;

/// Connection settings for one wallet.
#[derive(Debug, Clone)]
pub struct EvmClientConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    /// Fixed legacy gas price; `None` lets the provider estimate fees.
    pub gas_price_wei: Option<u128>,
    pub wrapped_native: Address,
    pub position_manager: Address,
    pub swap_router: Address,
    pub receipt_poll_interval: Duration,
}

pub struct EvmChainClient {
    provider: DynProvider,
    owner: Address,
    config: EvmClientConfig,
}

fn rpc_err(e: impl std::fmt::Display) -> ChainError {
    ChainError::Rpc(e.to_string())
}

fn contract_err(e: impl std::fmt::Display) -> ChainError {
    ChainError::Contract(e.to_string())
}

/// ABI-encodes the `exactInputSingle` leg carried inside the router multicall.
pub fn encode_exact_input_single(request: &SwapRequest) -> Result<Bytes, ChainError> {
    let fee = U24::try_from(request.fee).map_err(contract_err)?;
    let call = ISwapRouter::exactInputSingleCall {
        params: ISwapRouter::ExactInputSingleParams {
            tokenIn: request.token_in,
            tokenOut: request.token_out,
            fee,
            recipient: request.recipient,
            amountIn: request.amount_in,
            amountOutMinimum: U256::ZERO,
            sqrtPriceLimitX96: U160::ZERO,
        },
    };
    Ok(Bytes::from(call.abi_encode()))
}

/// Converts a mint request into the position manager's parameter struct.
pub fn mint_params(request: &MintRequest) -> Result<INonfungiblePositionManager::MintParams, ChainError> {
    Ok(INonfungiblePositionManager::MintParams {
        token0: request.token0,
        token1: request.token1,
        fee: U24::try_from(request.fee).map_err(contract_err)?,
        tickLower: I24::try_from(request.tick_lower).map_err(contract_err)?,
        tickUpper: I24::try_from(request.tick_upper).map_err(contract_err)?,
        amount0Desired: request.amount0_desired,
        amount1Desired: request.amount1_desired,
        amount0Min: request.amount0_min,
        amount1Min: request.amount1_min,
        recipient: request.recipient,
        deadline: U256::from(request.deadline),
    })
}

/// Polls `fetch` every `interval` until it yields a receipt or `timeout`
/// passes. RPC errors while polling are logged and polled through; the
/// transaction may still be mined.
pub async fn poll_receipt<F, Fut>(mut fetch: F, interval: Duration, timeout: Duration) -> Result<Receipt, ChainError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<Option<Receipt>, ChainError>>,
{
    let poll = async {
        loop {
            match fetch().await {
                Ok(Some(receipt)) => return receipt,
                Ok(None) => {}
                Err(e) => warn!("⚠️ Receipt poll failed, retrying: {}", e),
            }
            tokio::time::sleep(interval).await;
        }
    };
    tokio::time::timeout(timeout, poll).await.map_err(|_| ChainError::Timeout(timeout))
}

impl EvmChainClient {
    /// Connect a signing wallet to the configured RPC endpoint
    ///
    /// # Errors
    /// Returns error if:
    /// - The private key does not parse
    /// - The RPC URL is invalid or unreachable
    /// - The endpoint reports a different chain id
    pub async fn connect(private_key: &str, config: EvmClientConfig) -> Result<Self> {
        let signer: PrivateKeySigner = private_key
            .trim()
            .parse()
            .context("Invalid private key")?;
        let owner = signer.address();
        let wallet = EthereumWallet::from(signer);

        let rpc_url = config.rpc_url.parse().context("Invalid RPC URL")?;
        let provider = ProviderBuilder::new().wallet(wallet).connect_http(rpc_url).erased();

        let chain_id = provider.get_chain_id().await.context("Failed to query chain id")?;
        if chain_id != config.chain_id {
            bail!("RPC reports chain id {} but {} is configured", chain_id, config.chain_id);
        }
        debug!("🔌 Connected {} to chain {}", owner, chain_id);

        Ok(Self { provider, owner, config })
    }

    async fn submit(&self, tx: TransactionRequest, gas_limit: u64) -> Result<TxHash, ChainError> {
        let mut tx = tx.with_from(self.owner).with_gas_limit(gas_limit);
        if let Some(gas_price) = self.config.gas_price_wei {
            tx = tx.with_gas_price(gas_price);
        }
        let pending = self.provider.send_transaction(tx).await.map_err(rpc_err)?;
        let hash = *pending.tx_hash();
        debug!("📤 Submitted {}", hash);
        Ok(hash)
    }
}

#[async_trait]
impl LiquidityChain for EvmChainClient {
    fn owner(&self) -> Address {
        self.owner
    }

    async fn token_balance(&self, token: Address) -> Result<U256, ChainError> {
        IERC20::new(token, self.provider.clone())
            .balanceOf(self.owner)
            .call()
            .await
            .map_err(rpc_err)
    }

    async fn native_balance(&self) -> Result<U256, ChainError> {
        self.provider.get_balance(self.owner).await.map_err(rpc_err)
    }

    async fn allowance(&self, token: Address, spender: Address) -> Result<U256, ChainError> {
        IERC20::new(token, self.provider.clone())
            .allowance(self.owner, spender)
            .call()
            .await
            .map_err(rpc_err)
    }

    async fn approve(&self, token: Address, spender: Address, amount: U256) -> Result<TxHash, ChainError> {
        let tx = IERC20::new(token, self.provider.clone())
            .approve(spender, amount)
            .into_transaction_request();
        self.submit(tx, APPROVE_GAS_LIMIT).await
    }

    async fn wrap_native(&self, amount: U256) -> Result<TxHash, ChainError> {
        let tx = IWrappedNative::new(self.config.wrapped_native, self.provider.clone())
            .deposit()
            .value(amount)
            .into_transaction_request();
        self.submit(tx, WRAP_GAS_LIMIT).await
    }

    async fn swap_exact_input(&self, request: SwapRequest) -> Result<TxHash, ChainError> {
        let leg = encode_exact_input_single(&request)?;
        let tx = ISwapRouter::new(self.config.swap_router, self.provider.clone())
            .multicall(U256::from(request.deadline), vec![leg])
            .into_transaction_request();
        self.submit(tx, SWAP_GAS_LIMIT).await
    }

    async fn mint_position(&self, request: MintRequest) -> Result<TxHash, ChainError> {
        let params = mint_params(&request)?;
        let tx = INonfungiblePositionManager::new(self.config.position_manager, self.provider.clone())
            .mint(params)
            .into_transaction_request();
        self.submit(tx, MINT_GAS_LIMIT).await
    }

    async fn send_native(&self, to: Address, amount: U256) -> Result<TxHash, ChainError> {
        let tx = TransactionRequest::default().with_to(to).with_value(amount);
        self.submit(tx, TRANSFER_GAS_LIMIT).await
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash, timeout: Duration) -> Result<Receipt, ChainError> {
        let result = poll_receipt(
            || async {
                let receipt = self.provider.get_transaction_receipt(tx_hash).await.map_err(rpc_err)?;
                Ok::<_, ChainError>(receipt.map(|r| Receipt { tx_hash, success: r.status(), gas_used: r.gas_used() }))
            },
            self.config.receipt_poll_interval,
            timeout,
        )
        .await;
        if let Ok(receipt) = &result {
            info!("🧾 {} {} (gas {})", tx_hash, if receipt.success { "confirmed" } else { "reverted" }, receipt.gas_used);
        }
        result
    }
}
