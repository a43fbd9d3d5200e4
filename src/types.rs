// Core data structures shared by the extractor, monitor and executor

use alloy::primitives::{Address, B256, U256};
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

use crate::config::ExchangeConfig;
use crate::error::SniperError;

/// Token address pulled out of an announcement. Lives only for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenCandidate {
    address: Address,
}

impl TokenCandidate {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// EIP-55 mixed-case form, used in every log line.
    pub fn checksummed(&self) -> String {
        self.address.to_checksum(None)
    }
}

impl fmt::Display for TokenCandidate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.checksummed())
    }
}

impl FromStr for TokenCandidate {
    type Err = SniperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let address = Address::from_str(s.trim())
            .map_err(|e| SniperError::Configuration(format!("invalid token address '{}': {}", s, e)))?;
        Ok(Self::new(address))
    }
}

/// The two quote assets a target token can be paired against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuoteAsset {
    WrappedNative,
    StableQuote,
}

impl QuoteAsset {
    pub fn address(&self, exchange: &ExchangeConfig) -> Address {
        match self {
            QuoteAsset::WrappedNative => exchange.wrapped_native,
            QuoteAsset::StableQuote => exchange.stable_quote,
        }
    }
}

impl fmt::Display for QuoteAsset {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            QuoteAsset::WrappedNative => write!(f, "WrappedNative"),
            QuoteAsset::StableQuote => write!(f, "StableQuote"),
        }
    }
}

/// One side of the liquidity picture: the pair for (token, quote) and the
/// quote-asset balance it holds. `pair` is None when the factory returned
/// the zero address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolReserve {
    pub quote: QuoteAsset,
    pub pair: Option<Address>,
    /// Raw balance in the quote asset's smallest unit (18 decimals)
    pub reserve: U256,
}

impl PoolReserve {
    pub fn missing(quote: QuoteAsset) -> Self {
        Self {
            quote,
            pair: None,
            reserve: U256::ZERO,
        }
    }

    pub fn exists(&self) -> bool {
        self.pair.is_some()
    }
}

/// Result of one liquidity poll. Recomputed every poll, never cached.
#[derive(Debug, Clone, PartialEq)]
pub struct LiquidityReport {
    pub token: TokenCandidate,
    pub native: PoolReserve,
    pub stable: PoolReserve,
    /// Native reserve expressed in stable-quote units
    pub native_value: Decimal,
    /// Stable reserve in stable-quote units
    pub stable_value: Decimal,
}

impl LiquidityReport {
    pub fn has_liquidity(&self) -> bool {
        self.native_value > Decimal::ZERO || self.stable_value > Decimal::ZERO
    }

    /// Strictly greater: ties and stable-only liquidity route through the stable pair.
    pub fn is_native_pair(&self) -> bool {
        self.native_value > self.stable_value
    }

    /// (hasLiquidity, isNativePair)
    pub fn decision(&self) -> (bool, bool) {
        (self.has_liquidity(), self.is_native_pair())
    }
}

/// Ordered router hops: stable quote first, optional wrapped native, target last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapPath(Vec<Address>);

impl SwapPath {
    pub fn for_trade(exchange: &ExchangeConfig, token: Address, is_native_pair: bool) -> Self {
        let mut hops = vec![exchange.stable_quote];
        if is_native_pair {
            hops.push(exchange.wrapped_native);
        }
        hops.push(token);
        Self(hops)
    }

    pub fn hops(&self) -> &[Address] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<Address> {
        self.0
    }
}

impl fmt::Display for SwapPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let hops: Vec<String> = self.0.iter().map(|a| a.to_checksum(None)).collect();
        write!(f, "{}", hops.join(" -> "))
    }
}

/// What the executor hands back once a swap has been signed (and usually sent).
#[derive(Debug, Clone)]
pub struct SubmittedTrade {
    pub token: TokenCandidate,
    pub tx_hash: B256,
    pub nonce: u64,
    pub gas_limit: u64,
    pub gas_price_wei: u128,
    pub amount_in: U256,
    pub amount_out_min: U256,
    pub path: SwapPath,
    pub deadline: u64,
    /// false in dry-run mode: signed but never sent to the node
    pub broadcast: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;
    use rust_decimal_macros::dec;

    fn exchange() -> ExchangeConfig {
        ExchangeConfig {
            chain_id: 56,
            router: address!("10ED43C718714eb63d5aA57B78B54704E256024E"),
            factory: address!("cA143Ce32Fe78f1f7019d7d551a6402fC5350c73"),
            wrapped_native: address!("bb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c"),
            stable_quote: address!("e9e7CEA3DedcA5984780Bafc599bD69ADd087D56"),
        }
    }

    fn report(native_value: Decimal, stable_value: Decimal) -> LiquidityReport {
        LiquidityReport {
            token: TokenCandidate::new(Address::repeat_byte(0x11)),
            native: PoolReserve::missing(QuoteAsset::WrappedNative),
            stable: PoolReserve::missing(QuoteAsset::StableQuote),
            native_value,
            stable_value,
        }
    }

    #[test]
    fn test_swap_path_stable_only() {
        let ex = exchange();
        let token = Address::repeat_byte(0xAB);
        let path = SwapPath::for_trade(&ex, token, false);
        assert_eq!(path.hops(), &[ex.stable_quote, token]);
    }

    #[test]
    fn test_swap_path_through_wrapped_native() {
        let ex = exchange();
        let token = Address::repeat_byte(0xAB);
        let path = SwapPath::for_trade(&ex, token, true);
        assert_eq!(path.hops(), &[ex.stable_quote, ex.wrapped_native, token]);
        assert_eq!(path.len(), 3);
    }

    #[test]
    fn test_decision_equal_values_prefer_stable() {
        assert_eq!(report(dec!(100), dec!(100)).decision(), (true, false));
        assert_eq!(report(dec!(100.01), dec!(100)).decision(), (true, true));
        assert_eq!(report(dec!(0), dec!(0)).decision(), (false, false));
        assert_eq!(report(dec!(0), dec!(5000)).decision(), (true, false));
    }

    #[test]
    fn test_candidate_display_is_checksummed() {
        let candidate: TokenCandidate = "0xe9e7cea3dedca5984780bafc599bd69add087d56".parse().unwrap();
        assert_eq!(
            candidate.to_string(),
            "0xe9e7CEA3DedcA5984780Bafc599bD69ADd087D56"
        );
    }

    #[test]
    fn test_candidate_rejects_garbage() {
        assert!("0x1234".parse::<TokenCandidate>().is_err());
    }
}
