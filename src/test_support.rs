// In-memory chain and price feed used by unit tests across modules

use crate::chain::{ChainReader, TxGateway};
use crate::config::{ExchangeConfig, PollPolicy, TradeConfig};
use crate::error::{Result, SniperError};
use crate::pricing::PriceOracle;
use alloy::primitives::{keccak256, Address, B256, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub(crate) fn exchange() -> ExchangeConfig {
    ExchangeConfig::default()
}

pub(crate) fn trade_config() -> TradeConfig {
    TradeConfig {
        buy_amount: dec!(25),
        gas_price_gwei: dec!(5),
        gas_multiplier: dec!(1.5),
        min_amount_out: U256::ZERO,
    }
}

pub(crate) fn fast_poll() -> PollPolicy {
    PollPolicy {
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(4),
        max_elapsed: Some(Duration::from_secs(5)),
        max_attempts: None,
    }
}

pub(crate) fn signer() -> PrivateKeySigner {
    PrivateKeySigner::from_bytes(&B256::repeat_byte(0x42)).unwrap()
}

pub(crate) fn ether(units: u64) -> U256 {
    U256::from(units) * U256::from(10u64).pow(U256::from(18u64))
}

/// Scripted chain: pools, balances, gas and nonce are set up front; every
/// call is counted and every submission captured.
pub(crate) struct MockChain {
    pairs: Mutex<HashMap<(Address, Address), Address>>,
    balances: Mutex<HashMap<(Address, Address), U256>>,
    allowances: Mutex<HashMap<(Address, Address, Address), U256>>,
    /// Pools stay invisible until this many getPair calls have been served
    hidden_for_calls: AtomicU32,
    /// Number of upcoming getPair calls that fail with a network error
    failing_get_pair: AtomicU32,
    pub get_pair_calls: AtomicU32,
    pub balance_calls: AtomicU32,
    pub chain_id: u64,
    pub gas_estimate: u64,
    pub nonce: u64,
    pub reject_send: bool,
    pub estimate_requests: Mutex<Vec<TransactionRequest>>,
    pub sent: Mutex<Vec<Vec<u8>>>,
}

impl MockChain {
    pub fn new() -> Self {
        Self {
            pairs: Mutex::new(HashMap::new()),
            balances: Mutex::new(HashMap::new()),
            allowances: Mutex::new(HashMap::new()),
            hidden_for_calls: AtomicU32::new(0),
            failing_get_pair: AtomicU32::new(0),
            get_pair_calls: AtomicU32::new(0),
            balance_calls: AtomicU32::new(0),
            chain_id: 56,
            gas_estimate: 200_000,
            nonce: 7,
            reject_send: false,
            estimate_requests: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Register a pool for (token, quote) holding `reserve` of the quote asset.
    pub fn with_pool(self, token: Address, quote: Address, pair: Address, reserve: U256) -> Self {
        self.pairs.lock().unwrap().insert((token, quote), pair);
        self.balances.lock().unwrap().insert((quote, pair), reserve);
        self
    }

    pub fn with_balance(self, token: Address, holder: Address, amount: U256) -> Self {
        self.balances.lock().unwrap().insert((token, holder), amount);
        self
    }

    pub fn with_allowance(self, token: Address, owner: Address, spender: Address, amount: U256) -> Self {
        self.allowances
            .lock()
            .unwrap()
            .insert((token, owner, spender), amount);
        self
    }

    /// Each liquidity poll issues two getPair calls
    pub fn pools_hidden_for_polls(self, polls: u32) -> Self {
        self.hidden_for_calls.store(polls * 2, Ordering::SeqCst);
        self
    }

    pub fn failing_get_pair(self, calls: u32) -> Self {
        self.failing_get_pair.store(calls, Ordering::SeqCst);
        self
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl ChainReader for MockChain {
    async fn get_pair(&self, _factory: Address, token_a: Address, token_b: Address) -> Result<Address> {
        let served = self.get_pair_calls.fetch_add(1, Ordering::SeqCst);

        let failing = self.failing_get_pair.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_get_pair.store(failing - 1, Ordering::SeqCst);
            return Err(SniperError::network("getPair", "connection reset by peer"));
        }

        if served < self.hidden_for_calls.load(Ordering::SeqCst) {
            return Ok(Address::ZERO);
        }

        let pairs = self.pairs.lock().unwrap();
        Ok(pairs
            .get(&(token_a, token_b))
            .or_else(|| pairs.get(&(token_b, token_a)))
            .copied()
            .unwrap_or(Address::ZERO))
    }

    async fn balance_of(&self, token: Address, holder: Address) -> Result<U256> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(&(token, holder))
            .copied()
            .unwrap_or(U256::ZERO))
    }

    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256> {
        Ok(self
            .allowances
            .lock()
            .unwrap()
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or(U256::ZERO))
    }
}

#[async_trait]
impl TxGateway for MockChain {
    async fn chain_id(&self) -> Result<u64> {
        Ok(self.chain_id)
    }

    async fn estimate_gas(&self, request: TransactionRequest) -> Result<u64> {
        self.estimate_requests.lock().unwrap().push(request);
        Ok(self.gas_estimate)
    }

    async fn transaction_count(&self, _account: Address) -> Result<u64> {
        Ok(self.nonce)
    }

    async fn send_raw(&self, raw: Vec<u8>) -> Result<B256> {
        if self.reject_send {
            return Err(SniperError::Transaction(
                "send_raw_transaction: insufficient funds for gas".into(),
            ));
        }
        let hash = keccak256(&raw);
        self.sent.lock().unwrap().push(raw);
        Ok(hash)
    }
}

pub(crate) struct MockOracle {
    price: Option<Decimal>,
    pub calls: AtomicU32,
}

impl MockOracle {
    pub fn fixed(price: Decimal) -> Self {
        Self {
            price: Some(price),
            calls: AtomicU32::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            price: None,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl PriceOracle for MockOracle {
    async fn native_price(&self) -> Result<Decimal> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.price
            .ok_or_else(|| SniperError::PriceFeed("HTTP 503 Service Unavailable".into()))
    }
}
