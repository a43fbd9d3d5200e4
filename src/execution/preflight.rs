// Startup checks: read-only, runs once before the first message is consumed

use crate::chain::{ChainReader, TxGateway};
use crate::config::{ExchangeConfig, TradeConfig};
use crate::error::{Result, SniperError};
use alloy::primitives::{Address, U256};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreflightReport {
    pub account: Address,
    pub chain_id: u64,
    pub stable_balance: U256,
    pub allowance: U256,
    pub amount_in: U256,
}

impl PreflightReport {
    pub fn balance_sufficient(&self) -> bool {
        self.stable_balance >= self.amount_in
    }

    pub fn allowance_sufficient(&self) -> bool {
        self.allowance >= self.amount_in
    }
}

/// Verify the node serves the configured chain and report whether the account
/// can cover one buy. A wrong chain is fatal. A short balance or allowance
/// only warns: funds may arrive before the first announcement does.
pub async fn run_preflight(
    reader: &dyn ChainReader,
    gateway: &dyn TxGateway,
    exchange: &ExchangeConfig,
    trade: &TradeConfig,
    account: Address,
) -> Result<PreflightReport> {
    let chain_id = gateway.chain_id().await?;
    if chain_id != exchange.chain_id {
        return Err(SniperError::Configuration(format!(
            "RPC reports chain id {}, expected {}",
            chain_id, exchange.chain_id
        )));
    }

    let amount_in = trade.amount_in_wei()?;
    let stable_balance = reader.balance_of(exchange.stable_quote, account).await?;
    let allowance = reader
        .allowance(exchange.stable_quote, account, exchange.router)
        .await?;

    let report = PreflightReport {
        account,
        chain_id,
        stable_balance,
        allowance,
        amount_in,
    };

    info!(
        "Preflight: account {:?} on chain {} | stable balance {} | router allowance {}",
        account, chain_id, stable_balance, allowance
    );
    if !report.balance_sufficient() {
        warn!(
            "Stable balance {} is below buy amount {} - swaps will revert",
            stable_balance, amount_in
        );
    }
    if !report.allowance_sufficient() {
        warn!(
            "Router allowance {} is below buy amount {} - approve the router before trading",
            allowance, amount_in
        );
    }

    Ok(report)
}
