//! Liquidity Monitor
//!
//! For each quote asset (wrapped native, stable quote):
//!   factory.getPair(token, quote) → zero address means no pool, reserve 0
//!   quote.balanceOf(pair)         → reserve
//! The native reserve is valued in stable units through the price oracle,
//! which is only consulted when that reserve is nonzero.
//!
//! No retries here; the poller owns retry policy.

use crate::chain::ChainReader;
use crate::config::{ExchangeConfig, PricePrecision};
use crate::error::Result;
use crate::pricing::{native_reserve_value, wei_to_units, PriceOracle};
use crate::types::{LiquidityReport, PoolReserve, QuoteAsset, TokenCandidate};
use alloy::primitives::Address;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};

pub struct LiquidityMonitor {
    chain: Arc<dyn ChainReader>,
    oracle: Arc<dyn PriceOracle>,
    exchange: ExchangeConfig,
    precision: PricePrecision,
}

impl LiquidityMonitor {
    pub fn new(
        chain: Arc<dyn ChainReader>,
        oracle: Arc<dyn PriceOracle>,
        exchange: ExchangeConfig,
        precision: PricePrecision,
    ) -> Self {
        Self {
            chain,
            oracle,
            exchange,
            precision,
        }
    }

    /// One liquidity check. Fresh reads every call.
    pub async fn check(&self, token: &TokenCandidate) -> Result<LiquidityReport> {
        let (native, stable) = tokio::join!(
            self.pool_reserve(token, QuoteAsset::WrappedNative),
            self.pool_reserve(token, QuoteAsset::StableQuote)
        );
        let (native, stable) = (native?, stable?);

        debug!(
            "Native pool: {:?} | Stable pool: {:?}",
            native.pair, stable.pair
        );

        let native_value = if native.reserve.is_zero() {
            Decimal::ZERO
        } else {
            let price = self.oracle.native_price().await?;
            debug!("Native price {} (precision {:?})", price, self.precision);
            native_reserve_value(native.reserve, price, self.precision)
        };
        let stable_value = wei_to_units(stable.reserve);

        let report = LiquidityReport {
            token: *token,
            native,
            stable,
            native_value,
            stable_value,
        };

        if report.has_liquidity() {
            info!(
                token = %token,
                native_value = %report.native_value.round_dp(2),
                stable_value = %report.stable_value.round_dp(2),
                native_pair = report.is_native_pair(),
                "Liquidity found"
            );
        } else {
            debug!(token = %token, "No liquidity yet");
        }

        Ok(report)
    }

    async fn pool_reserve(&self, token: &TokenCandidate, quote: QuoteAsset) -> Result<PoolReserve> {
        let quote_address = quote.address(&self.exchange);
        let pair = self
            .chain
            .get_pair(self.exchange.factory, token.address(), quote_address)
            .await?;

        if pair == Address::ZERO {
            return Ok(PoolReserve::missing(quote));
        }

        let reserve = self.chain.balance_of(quote_address, pair).await?;
        Ok(PoolReserve {
            quote,
            pair: Some(pair),
            reserve,
        })
    }
}
