//! Price Oracle
//!
//! One HTTP request per call, no cache, no retry. The liquidity poller owns
//! retries. Any failure, including a zero or negative price, surfaces as
//! `SniperError::PriceFeed` rather than a zero valuation.

use crate::error::{Result, SniperError};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Current spot price of the native coin in stable-quote units
    async fn native_price(&self) -> Result<Decimal>;
}

/// Ticker endpoint returning `{"symbol": "BNBUSDT", "price": "612.34000000"}`
pub struct HttpPriceOracle {
    client: Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct TickerResponse {
    price: Value,
}

impl HttpPriceOracle {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SniperError::Configuration(format!("price feed client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl PriceOracle for HttpPriceOracle {
    async fn native_price(&self) -> Result<Decimal> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| SniperError::PriceFeed(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SniperError::PriceFeed(format!("HTTP {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SniperError::PriceFeed(format!("failed to read body: {}", e)))?;
        let price = parse_ticker_price(&body)?;
        debug!("Native price {} (stable quote)", price);
        Ok(price)
    }
}

/// Pull the numeric `price` field out of a ticker body. Accepts the price as
/// a JSON string (Binance) or a JSON number.
pub fn parse_ticker_price(body: &str) -> Result<Decimal> {
    let ticker: TickerResponse = serde_json::from_str(body)
        .map_err(|e| SniperError::PriceFeed(format!("invalid ticker JSON: {}", e)))?;

    let raw = match &ticker.price {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => {
            return Err(SniperError::PriceFeed(format!(
                "price field is not numeric: {}",
                other
            )))
        }
    };

    let price = Decimal::from_str(raw.trim())
        .or_else(|_| Decimal::from_scientific(raw.trim()))
        .map_err(|e| SniperError::PriceFeed(format!("unparsable price '{}': {}", raw, e)))?;

    if price <= Decimal::ZERO {
        return Err(SniperError::PriceFeed(format!("non-positive price {}", price)));
    }
    Ok(price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_binance_ticker() {
        let body = r#"{"symbol":"BNBUSDT","price":"612.34000000"}"#;
        assert_eq!(parse_ticker_price(body).unwrap(), dec!(612.34));
    }

    #[test]
    fn test_parse_numeric_price() {
        assert_eq!(parse_ticker_price(r#"{"price": 301.5}"#).unwrap(), dec!(301.5));
    }

    #[test]
    fn test_missing_price_is_error_not_zero() {
        let err = parse_ticker_price(r#"{"symbol":"BNBUSDT"}"#).unwrap_err();
        assert!(matches!(err, SniperError::PriceFeed(_)));
    }

    #[test]
    fn test_zero_price_rejected() {
        let err = parse_ticker_price(r#"{"price":"0.00000000"}"#).unwrap_err();
        assert!(matches!(err, SniperError::PriceFeed(_)));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(parse_ticker_price("<html>rate limited</html>").is_err());
        assert!(parse_ticker_price(r#"{"price":"abc"}"#).is_err());
        assert!(parse_ticker_price(r#"{"price":null}"#).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_feed_is_price_feed_error() {
        let oracle =
            HttpPriceOracle::new("http://127.0.0.1:9/ticker", Duration::from_millis(500)).unwrap();
        let err = oracle.native_price().await.unwrap_err();
        assert!(matches!(err, SniperError::PriceFeed(_)));
        assert!(err.is_transient());
    }
}
