//! Trade Executor
//!
//! Buys a freshly-listed token through the PancakeSwap V2 router:
//!   swapExactTokensForTokensSupportingFeeOnTransferTokens(
//!       amountIn, amountOutMin, [stable, (wrapped native), token], account, now + 4h)
//!
//! Steps: build calldata → eth_estimateGas → scale by multiplier (ceil) →
//! nonce from eth_getTransactionCount → sign legacy tx locally → send raw.
//!
//! The nonce is read fresh per trade with no local tracking. That is safe
//! only because the orchestrator runs one trade at a time.

use crate::chain::TxGateway;
use crate::config::{ExchangeConfig, TradeConfig};
use crate::error::{Result, SniperError};
use crate::execution::swap::{scaled_gas_limit, swap_deadline, SwapCall};
use crate::types::{SubmittedTrade, SwapPath, TokenCandidate};
use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::network::TxSignerSync;
use alloy::primitives::{Address, Bytes, TxKind, B256, U256};
use alloy::rpc::types::{TransactionInput, TransactionRequest};
use alloy::signers::local::PrivateKeySigner;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Trade executor. Sole owner of the signing key.
pub struct TradeExecutor {
    gateway: Arc<dyn TxGateway>,
    signer: PrivateKeySigner,
    exchange: ExchangeConfig,
    trade: TradeConfig,
    /// Dry run mode - signs but never broadcasts
    dry_run: bool,
    explorer_tx_url: String,
}

impl TradeExecutor {
    pub fn new(
        gateway: Arc<dyn TxGateway>,
        signer: PrivateKeySigner,
        exchange: ExchangeConfig,
        trade: TradeConfig,
    ) -> Self {
        Self {
            gateway,
            signer,
            exchange,
            trade,
            dry_run: false,
            explorer_tx_url: crate::config::DEFAULT_EXPLORER_TX_URL.to_string(),
        }
    }

    /// Enable or disable dry run mode
    pub fn set_dry_run(&mut self, dry_run: bool) {
        self.dry_run = dry_run;
        if dry_run {
            info!("Executor in DRY RUN mode - swaps will be signed but not sent");
        } else {
            warn!("Executor in LIVE mode - swaps will be submitted!");
        }
    }

    pub fn set_explorer_tx_url(&mut self, url: impl Into<String>) {
        self.explorer_tx_url = url.into();
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Address of the signing account (safe to log)
    pub fn account(&self) -> Address {
        self.signer.address()
    }

    pub fn trade_config(&self) -> &TradeConfig {
        &self.trade
    }

    /// Submit one swap for `token`. Returns once the node accepted the raw
    /// transaction; inclusion is not awaited.
    pub async fn execute(&self, token: &TokenCandidate, is_native_pair: bool) -> Result<SubmittedTrade> {
        let account = self.account();
        let path = SwapPath::for_trade(&self.exchange, token.address(), is_native_pair);
        if is_native_pair {
            info!("Token is a native pair, routing through wrapped native");
        }

        let amount_in = self.trade.amount_in_wei()?;
        let gas_price = self.trade.gas_price_wei()?;
        if self.trade.min_amount_out.is_zero() {
            warn!(token = %token, "amountOutMin is 0 - no slippage protection on this swap");
        }

        let call = SwapCall {
            path: path.clone(),
            amount_in,
            amount_out_min: self.trade.min_amount_out,
            recipient: account,
            deadline: swap_deadline(Utc::now().timestamp().max(0) as u64),
        };
        let input = call.calldata();

        info!(
            token = %token,
            path = %path,
            amount_in = %amount_in,
            "Building swap"
        );

        let estimate = self
            .gateway
            .estimate_gas(self.estimate_request(account, gas_price, input.clone()))
            .await?;
        let gas_limit = scaled_gas_limit(estimate, self.trade.gas_multiplier)?;
        debug!(
            "Gas estimate {} × {} → limit {}",
            estimate, self.trade.gas_multiplier, gas_limit
        );

        let nonce = self.gateway.transaction_count(account).await?;

        let tx = TxLegacy {
            chain_id: Some(self.exchange.chain_id),
            nonce,
            gas_price,
            gas_limit,
            to: TxKind::Call(self.exchange.router),
            value: U256::ZERO,
            input,
        };
        let (raw, signed_hash) = self.sign(tx)?;

        let mut submitted = SubmittedTrade {
            token: *token,
            tx_hash: signed_hash,
            nonce,
            gas_limit,
            gas_price_wei: gas_price,
            amount_in,
            amount_out_min: call.amount_out_min,
            path,
            deadline: call.deadline,
            broadcast: false,
        };

        if self.dry_run {
            info!(
                "DRY RUN: signed swap {} (nonce {}, gas {}) not sent",
                signed_hash, nonce, gas_limit
            );
            return Ok(submitted);
        }

        let tx_hash = self.gateway.send_raw(raw).await?;
        if tx_hash != signed_hash {
            warn!("Node reported hash {} for locally signed {}", tx_hash, signed_hash);
        }
        submitted.tx_hash = tx_hash;
        submitted.broadcast = true;

        info!("Transaction: {}{}", self.explorer_tx_url, tx_hash);
        Ok(submitted)
    }

    fn estimate_request(&self, account: Address, gas_price: u128, input: Bytes) -> TransactionRequest {
        TransactionRequest {
            from: Some(account),
            to: Some(TxKind::Call(self.exchange.router)),
            gas_price: Some(gas_price),
            value: Some(U256::ZERO),
            input: TransactionInput::new(input),
            chain_id: Some(self.exchange.chain_id),
            ..Default::default()
        }
    }

    fn sign(&self, mut tx: TxLegacy) -> Result<(Vec<u8>, B256)> {
        let signature = self
            .signer
            .sign_transaction_sync(&mut tx)
            .map_err(|e| SniperError::Transaction(format!("signing failed: {}", e)))?;
        let signed: TxEnvelope = tx.into_signed(signature).into();
        Ok((signed.encoded_2718(), *signed.tx_hash()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::IPancakeRouter02;
    use crate::test_support::{ether, exchange, signer, trade_config, MockChain};
    use alloy::consensus::Transaction;
    use alloy::eips::eip2718::Decodable2718;
    use alloy::sol_types::SolCall;

    const TOKEN: Address = Address::repeat_byte(0xAB);

    fn executor(chain: Arc<MockChain>) -> TradeExecutor {
        TradeExecutor::new(chain, signer(), exchange(), trade_config())
    }

    fn decode_sent(chain: &MockChain) -> TxEnvelope {
        let sent = chain.sent.lock().unwrap();
        let raw = sent.last().expect("a submitted transaction");
        TxEnvelope::decode_2718(&mut raw.as_slice()).unwrap()
    }

    fn decode_swap(
        env: &TxEnvelope,
    ) -> IPancakeRouter02::swapExactTokensForTokensSupportingFeeOnTransferTokensCall {
        IPancakeRouter02::swapExactTokensForTokensSupportingFeeOnTransferTokensCall::abi_decode(env.input())
            .unwrap()
    }

    #[tokio::test]
    async fn test_stable_pair_swap_submitted() {
        let chain = Arc::new(MockChain::new());
        let exec = executor(chain.clone());
        let trade = exec.execute(&TokenCandidate::new(TOKEN), false).await.unwrap();

        assert!(trade.broadcast);
        assert_eq!(trade.path.hops(), &[exchange().stable_quote, TOKEN]);
        assert_eq!(chain.sent_count(), 1);

        let env = decode_sent(&chain);
        assert_eq!(*env.tx_hash(), trade.tx_hash);
        assert_eq!(env.to(), Some(exchange().router));
        assert_eq!(env.nonce(), 7);
        assert_eq!(env.gas_price(), Some(5_000_000_000u128));
        assert_eq!(env.chain_id(), Some(56));

        let swap = decode_swap(&env);
        assert_eq!(swap.amountIn, ether(25));
        assert_eq!(swap.amountOutMin, U256::ZERO);
        assert_eq!(swap.path, vec![exchange().stable_quote, TOKEN]);
        assert_eq!(swap.to, exec.account());
    }

    #[tokio::test]
    async fn test_native_pair_routes_through_wrapped_native() {
        let chain = Arc::new(MockChain::new());
        let trade = executor(chain.clone())
            .execute(&TokenCandidate::new(TOKEN), true)
            .await
            .unwrap();

        let ex = exchange();
        assert_eq!(trade.path.hops(), &[ex.stable_quote, ex.wrapped_native, TOKEN]);
        assert_eq!(
            decode_swap(&decode_sent(&chain)).path,
            vec![ex.stable_quote, ex.wrapped_native, TOKEN]
        );
    }

    #[tokio::test]
    async fn test_gas_limit_is_scaled_estimate() {
        let mut mock = MockChain::new();
        mock.gas_estimate = 123_457;
        let chain = Arc::new(mock);
        let trade = executor(chain.clone())
            .execute(&TokenCandidate::new(TOKEN), false)
            .await
            .unwrap();

        // 123_457 × 1.5 = 185_185.5 → 185_186
        assert_eq!(trade.gas_limit, 185_186);
        assert_eq!(decode_sent(&chain).gas_limit(), 185_186);

        let requests = chain.estimate_requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].from, Some(signer().address()));
        assert_eq!(requests[0].to, Some(TxKind::Call(exchange().router)));
    }

    #[tokio::test]
    async fn test_deadline_four_hours_ahead() {
        let chain = Arc::new(MockChain::new());
        let before = Utc::now().timestamp() as u64;
        let trade = executor(chain.clone())
            .execute(&TokenCandidate::new(TOKEN), false)
            .await
            .unwrap();
        let after = Utc::now().timestamp() as u64;

        assert!(trade.deadline >= before + 14_400 && trade.deadline <= after + 14_400);
        assert_eq!(
            decode_swap(&decode_sent(&chain)).deadline,
            U256::from(trade.deadline)
        );
    }

    #[tokio::test]
    async fn test_configured_min_amount_out_is_used() {
        let chain = Arc::new(MockChain::new());
        let mut config = trade_config();
        config.min_amount_out = U256::from(1_000_000u64);
        let exec = TradeExecutor::new(chain.clone(), signer(), exchange(), config);
        exec.execute(&TokenCandidate::new(TOKEN), false).await.unwrap();

        assert_eq!(
            decode_swap(&decode_sent(&chain)).amountOutMin,
            U256::from(1_000_000u64)
        );
    }

    #[tokio::test]
    async fn test_dry_run_signs_without_sending() {
        let chain = Arc::new(MockChain::new());
        let mut exec = executor(chain.clone());
        exec.set_dry_run(true);
        let trade = exec.execute(&TokenCandidate::new(TOKEN), false).await.unwrap();

        assert!(!trade.broadcast);
        assert_ne!(trade.tx_hash, B256::ZERO);
        assert_eq!(chain.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_rejected_submission_is_transaction_error() {
        let mut mock = MockChain::new();
        mock.reject_send = true;
        let err = executor(Arc::new(mock))
            .execute(&TokenCandidate::new(TOKEN), false)
            .await
            .unwrap_err();
        assert!(matches!(err, SniperError::Transaction(_)));
        assert!(!err.is_transient());
    }
}
