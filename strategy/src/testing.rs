// In-memory chain double for flow tests.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use alloy_primitives::{Address, U256};
use testnet_core::catalog::Catalog;
use testnet_core::constants::WPHRS;
use testnet_core::math::{format_amount, parse_amount};
use testnet_core::{BalanceSnapshot, BalanceStatus, TokenBalance, TxHash};

use crate::ports::{ChainError, LiquidityChain, MintRequest, Receipt, SwapRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxKind {
    Approve,
    Wrap,
    Swap,
    Mint,
    Transfer,
}

#[derive(Default)]
struct State {
    balances: HashMap<Address, U256>,
    native: U256,
    allowances: HashMap<(Address, Address), U256>,
    balance_failures: HashMap<Address, u32>,
    receipts: HashMap<TxKind, VecDeque<Result<bool, ChainError>>>,
    submit_errors: HashMap<TxKind, ChainError>,
    swap_credit: HashMap<Address, U256>,
    wrap_credits_nothing: bool,
    tx_kinds: HashMap<TxHash, TxKind>,
    submitted: Vec<TxKind>,
    mints: Vec<MintRequest>,
    swaps: Vec<SwapRequest>,
    transfers: Vec<(Address, U256)>,
    nonce: u64,
}

pub struct MockChain {
    owner: Address,
    state: Mutex<State>,
}

impl MockChain {
    pub fn new() -> Self {
        Self { owner: Address::repeat_byte(0x11), state: Mutex::new(State::default()) }
    }

    pub fn with_balance(self, token: Address, amount: U256) -> Self {
        self.state.lock().unwrap().balances.insert(token, amount);
        self
    }

    pub fn with_native(self, amount: U256) -> Self {
        self.state.lock().unwrap().native = amount;
        self
    }

    pub fn with_allowance(self, token: Address, spender: Address, amount: U256) -> Self {
        self.state.lock().unwrap().allowances.insert((token, spender), amount);
        self
    }

    /// The next `times` balance reads for `token` fail with an RPC error.
    pub fn fail_balance_reads(self, token: Address, times: u32) -> Self {
        self.state.lock().unwrap().balance_failures.insert(token, times);
        self
    }

    /// Receipt results for transactions of `kind`, in order. `Ok(success)`
    /// yields a receipt; once exhausted every wait succeeds.
    pub fn script_receipts(self, kind: TxKind, steps: Vec<Result<bool, ChainError>>) -> Self {
        self.state.lock().unwrap().receipts.insert(kind, steps.into());
        self
    }

    pub fn fail_submission(self, kind: TxKind, error: ChainError) -> Self {
        self.state.lock().unwrap().submit_errors.insert(kind, error);
        self
    }

    /// Amount of `token` credited per swap into it.
    pub fn with_swap_credit(self, token: Address, amount: U256) -> Self {
        self.state.lock().unwrap().swap_credit.insert(token, amount);
        self
    }

    pub fn wrap_credits_nothing(self) -> Self {
        self.state.lock().unwrap().wrap_credits_nothing = true;
        self
    }

    pub fn submitted(&self, kind: TxKind) -> usize {
        self.state.lock().unwrap().submitted.iter().filter(|k| **k == kind).count()
    }

    pub fn total_submissions(&self) -> usize {
        self.state.lock().unwrap().submitted.len()
    }

    pub fn mints(&self) -> Vec<MintRequest> {
        self.state.lock().unwrap().mints.clone()
    }

    pub fn swaps(&self) -> Vec<SwapRequest> {
        self.state.lock().unwrap().swaps.clone()
    }

    pub fn transfers(&self) -> Vec<(Address, U256)> {
        self.state.lock().unwrap().transfers.clone()
    }

    pub fn balance_of(&self, token: Address) -> U256 {
        self.state.lock().unwrap().balances.get(&token).copied().unwrap_or_default()
    }

    pub fn allowance_of(&self, token: Address, spender: Address) -> U256 {
        self.state.lock().unwrap().allowances.get(&(token, spender)).copied().unwrap_or_default()
    }

    fn submit(&self, state: &mut State, kind: TxKind) -> Result<TxHash, ChainError> {
        if let Some(err) = state.submit_errors.get(&kind) {
            return Err(err.clone());
        }
        state.nonce += 1;
        let hash = TxHash::left_padding_from(&state.nonce.to_be_bytes());
        state.tx_kinds.insert(hash, kind);
        state.submitted.push(kind);
        Ok(hash)
    }
}

fn debit(balances: &mut HashMap<Address, U256>, token: Address, amount: U256) {
    let entry = balances.entry(token).or_default();
    *entry = entry.saturating_sub(amount);
}

#[async_trait::async_trait]
impl LiquidityChain for MockChain {
    fn owner(&self) -> Address {
        self.owner
    }

    async fn token_balance(&self, token: Address) -> Result<U256, ChainError> {
        let mut state = self.state.lock().unwrap();
        if let Some(left) = state.balance_failures.get_mut(&token) {
            if *left > 0 {
                *left -= 1;
                return Err(ChainError::Rpc("balanceOf: connection reset".into()));
            }
        }
        Ok(state.balances.get(&token).copied().unwrap_or_default())
    }

    async fn native_balance(&self) -> Result<U256, ChainError> {
        Ok(self.state.lock().unwrap().native)
    }

    async fn allowance(&self, token: Address, spender: Address) -> Result<U256, ChainError> {
        Ok(self.allowance_of(token, spender))
    }

    async fn approve(&self, token: Address, spender: Address, amount: U256) -> Result<TxHash, ChainError> {
        let mut state = self.state.lock().unwrap();
        let hash = self.submit(&mut state, TxKind::Approve)?;
        state.allowances.insert((token, spender), amount);
        Ok(hash)
    }

    async fn wrap_native(&self, amount: U256) -> Result<TxHash, ChainError> {
        let mut state = self.state.lock().unwrap();
        let hash = self.submit(&mut state, TxKind::Wrap)?;
        state.native = state.native.saturating_sub(amount);
        if !state.wrap_credits_nothing {
            *state.balances.entry(WPHRS).or_default() += amount;
        }
        Ok(hash)
    }

    async fn swap_exact_input(&self, request: SwapRequest) -> Result<TxHash, ChainError> {
        let mut state = self.state.lock().unwrap();
        let hash = self.submit(&mut state, TxKind::Swap)?;
        debit(&mut state.balances, request.token_in, request.amount_in);
        let credit = state.swap_credit.get(&request.token_out).copied().unwrap_or_default();
        *state.balances.entry(request.token_out).or_default() += credit;
        state.swaps.push(request);
        Ok(hash)
    }

    async fn mint_position(&self, request: MintRequest) -> Result<TxHash, ChainError> {
        let mut state = self.state.lock().unwrap();
        let hash = self.submit(&mut state, TxKind::Mint)?;
        debit(&mut state.balances, request.token0, request.amount0_desired);
        debit(&mut state.balances, request.token1, request.amount1_desired);
        state.mints.push(request);
        Ok(hash)
    }

    async fn send_native(&self, to: Address, amount: U256) -> Result<TxHash, ChainError> {
        let mut state = self.state.lock().unwrap();
        let hash = self.submit(&mut state, TxKind::Transfer)?;
        state.native = state.native.saturating_sub(amount);
        state.transfers.push((to, amount));
        Ok(hash)
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash, _timeout: Duration) -> Result<Receipt, ChainError> {
        let mut state = self.state.lock().unwrap();
        let kind = state
            .tx_kinds
            .get(&tx_hash)
            .copied()
            .ok_or_else(|| ChainError::Rpc(format!("unknown tx {}", tx_hash)))?;
        let step = state.receipts.get_mut(&kind).and_then(|q| q.pop_front()).unwrap_or(Ok(true));
        step.map(|success| Receipt { tx_hash, success, gas_used: 150_000 })
    }
}

/// Snapshot over the testnet catalog from human amounts; missing tokens are zero.
pub fn snapshot_of(entries: &[(&str, &str)]) -> BalanceSnapshot {
    let catalog = Catalog::pharos_testnet();
    let raw: Vec<(&str, U256)> = entries
        .iter()
        .map(|(symbol, value)| {
            let decimals = catalog.token(symbol).unwrap().decimals;
            (*symbol, parse_amount(value, decimals).unwrap())
        })
        .collect();
    raw_snapshot(&raw)
}

pub fn raw_snapshot(entries: &[(&str, U256)]) -> BalanceSnapshot {
    let catalog = Catalog::pharos_testnet();
    let mut balances = BTreeMap::new();
    for token in catalog.tokens() {
        let raw = entries
            .iter()
            .find(|(s, _)| *s == token.symbol)
            .map(|(_, v)| *v)
            .unwrap_or_default();
        balances.insert(
            token.symbol.clone(),
            TokenBalance {
                raw,
                formatted: format_amount(raw, token.decimals),
                sufficient: !raw.is_zero(),
                status: BalanceStatus::Confirmed,
            },
        );
    }
    BalanceSnapshot::new(Address::repeat_byte(0x11), balances)
}
