//! Chain Access
//!
//! The monitor and executor never touch a provider directly. They go through
//! two narrow traits:
//! - `ChainReader`: factory and token reads (getPair, balanceOf, allowance)
//! - `TxGateway`: gas estimation, nonce lookup, raw submission
//!
//! `RpcChain<P>` implements both over any alloy Provider and wraps every call
//! in a timeout, so a hung node surfaces as `SniperError::Timeout`.

use crate::contracts::{IERC20, IPancakeFactory};
use crate::error::{Result, SniperError};
use alloy::primitives::{Address, B256, U256};
use alloy::providers::Provider;
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Pair address for (token_a, token_b); the zero address when no pool exists
    async fn get_pair(&self, factory: Address, token_a: Address, token_b: Address) -> Result<Address>;

    async fn balance_of(&self, token: Address, holder: Address) -> Result<U256>;

    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256>;
}

#[async_trait]
pub trait TxGateway: Send + Sync {
    async fn chain_id(&self) -> Result<u64>;

    async fn estimate_gas(&self, request: TransactionRequest) -> Result<u64>;

    /// Current transaction count of `account`, used directly as the nonce
    async fn transaction_count(&self, account: Address) -> Result<u64>;

    /// Broadcast an EIP-2718 encoded signed transaction. Returns the hash
    /// without waiting for inclusion.
    async fn send_raw(&self, raw: Vec<u8>) -> Result<B256>;
}

/// Provider-backed implementation of both traits
pub struct RpcChain<P> {
    provider: Arc<P>,
    call_timeout: Duration,
}

impl<P: Provider + 'static> RpcChain<P> {
    pub fn new(provider: Arc<P>, call_timeout: Duration) -> Self {
        Self {
            provider,
            call_timeout,
        }
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    async fn timed<T, E, F>(&self, operation: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, E>>,
        E: std::fmt::Display,
    {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(SniperError::network(operation, e)),
            Err(_) => Err(SniperError::Timeout {
                operation,
                after: self.call_timeout,
            }),
        }
    }
}

#[async_trait]
impl<P: Provider + 'static> ChainReader for RpcChain<P> {
    async fn get_pair(&self, factory: Address, token_a: Address, token_b: Address) -> Result<Address> {
        let factory = IPancakeFactory::new(factory, self.provider.clone());
        let call = factory.getPair(token_a, token_b);
        let pair = self.timed("getPair", call.call().into_future()).await?;
        debug!("getPair({:?}, {:?}) = {:?}", token_a, token_b, pair);
        Ok(pair)
    }

    async fn balance_of(&self, token: Address, holder: Address) -> Result<U256> {
        let contract = IERC20::new(token, self.provider.clone());
        let call = contract.balanceOf(holder);
        self.timed("balanceOf", call.call().into_future()).await
    }

    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256> {
        let contract = IERC20::new(token, self.provider.clone());
        let call = contract.allowance(owner, spender);
        self.timed("allowance", call.call().into_future()).await
    }
}

#[async_trait]
impl<P: Provider + 'static> TxGateway for RpcChain<P> {
    async fn chain_id(&self) -> Result<u64> {
        self.timed("eth_chainId", self.provider.get_chain_id()).await
    }

    async fn estimate_gas(&self, request: TransactionRequest) -> Result<u64> {
        self.timed("eth_estimateGas", self.provider.estimate_gas(request).into_future())
            .await
    }

    async fn transaction_count(&self, account: Address) -> Result<u64> {
        self.timed(
            "eth_getTransactionCount",
            self.provider.get_transaction_count(account).into_future(),
        )
        .await
    }

    async fn send_raw(&self, raw: Vec<u8>) -> Result<B256> {
        // A rejected submission is a transaction error, not a transient network blip
        let pending = match tokio::time::timeout(
            self.call_timeout,
            self.provider.send_raw_transaction(&raw),
        )
        .await
        {
            Ok(Ok(pending)) => pending,
            Ok(Err(e)) => return Err(SniperError::Transaction(format!("send_raw_transaction: {}", e))),
            Err(_) => {
                return Err(SniperError::Timeout {
                    operation: "eth_sendRawTransaction",
                    after: self.call_timeout,
                })
            }
        };
        Ok(*pending.tx_hash())
    }
}
