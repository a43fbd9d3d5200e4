//! Configuration management
//! Load settings from .env file and the process environment, once, at startup.
//!
//! Parsing goes through `SniperConfig::from_lookup` so tests can feed a map
//! instead of mutating the process environment.

use crate::error::{Result, SniperError};
use alloy::primitives::utils::parse_units;
use alloy::primitives::{address, Address, U256};
use rust_decimal::Decimal;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// PancakeSwap V2 router (BSC mainnet)
pub const DEFAULT_ROUTER: Address = address!("10ED43C718714eb63d5aA57B78B54704E256024E");
/// PancakeSwap V2 factory (BSC mainnet)
pub const DEFAULT_FACTORY: Address = address!("cA143Ce32Fe78f1f7019d7d551a6402fC5350c73");
/// WBNB
pub const DEFAULT_WRAPPED_NATIVE: Address = address!("bb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c");
/// BUSD
pub const DEFAULT_STABLE_QUOTE: Address = address!("e9e7CEA3DedcA5984780Bafc599bD69ADd087D56");

pub const DEFAULT_CHAIN_ID: u64 = 56;
pub const DEFAULT_PRICE_FEED_URL: &str = "https://api.binance.com/api/v3/ticker/price?symbol=BNBUSDT";
pub const DEFAULT_EXPLORER_TX_URL: &str = "https://bscscan.com/tx/";

/// Swap deadline window: four hours past submission
pub const SWAP_DEADLINE_SECS: u64 = 4 * 60 * 60;

/// All exchange tokens are assumed to carry 18 decimals
pub const TOKEN_DECIMALS: u8 = 18;

/// Characters of the RPC URL shown in logs
const RPC_URL_LOG_CHARS: usize = 40;

/// Private key material. Debug/Display never print the key.
#[derive(Clone)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: String) -> Self {
        Self(value)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SecretString(***)")
    }
}

/// Router/factory pair and the two quote assets. Immutable after startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeConfig {
    pub chain_id: u64,
    pub router: Address,
    pub factory: Address,
    pub wrapped_native: Address,
    pub stable_quote: Address,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID,
            router: DEFAULT_ROUTER,
            factory: DEFAULT_FACTORY,
            wrapped_native: DEFAULT_WRAPPED_NATIVE,
            stable_quote: DEFAULT_STABLE_QUOTE,
        }
    }
}

/// Per-trade parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeConfig {
    /// Whole units of the stable quote to spend
    pub buy_amount: Decimal,
    pub gas_price_gwei: Decimal,
    /// Applied to the gas estimate, result rounded up
    pub gas_multiplier: Decimal,
    /// Floor on the swap output, smallest units of the target token.
    /// Zero means no slippage protection at all.
    pub min_amount_out: U256,
}

impl TradeConfig {
    /// Buy amount scaled to 18-decimal base units
    pub fn amount_in_wei(&self) -> Result<U256> {
        let parsed = parse_units(&self.buy_amount.normalize().to_string(), TOKEN_DECIMALS)
            .map_err(|e| SniperError::Configuration(format!("BUY_AMOUNT out of range: {}", e)))?;
        Ok(parsed.into())
    }

    pub fn gas_price_wei(&self) -> Result<u128> {
        let parsed = parse_units(&self.gas_price_gwei.normalize().to_string(), "gwei")
            .map_err(|e| SniperError::Configuration(format!("GAS_PRICE out of range: {}", e)))?;
        let wei: U256 = parsed.into();
        u128::try_from(wei)
            .map_err(|_| SniperError::Configuration("GAS_PRICE does not fit in u128 wei".into()))
    }
}

/// How the native price is carried into the reserve valuation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PricePrecision {
    /// Keep every decimal of the feed price
    FixedPoint,
    /// Truncate the price to an integer before multiplying
    Integer,
}

impl FromStr for PricePrecision {
    type Err = SniperError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "fixed" | "fixed-point" | "decimal" => Ok(PricePrecision::FixedPoint),
            "integer" | "int" | "truncate" => Ok(PricePrecision::Integer),
            other => Err(SniperError::Configuration(format!(
                "PRICE_PRECISION must be 'fixed' or 'integer', got '{}'",
                other
            ))),
        }
    }
}

/// What to do with a candidate that arrives while a trade is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusyPolicy {
    /// Wait for the slot, FIFO, up to `capacity` waiting candidates
    Queue { capacity: usize },
    /// Discard the candidate with a log line
    Drop,
}

/// Liquidity poll backoff: exponential from `initial_delay`, capped at
/// `max_delay`, giving up after `max_elapsed` or `max_attempts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub max_elapsed: Option<Duration>,
    pub max_attempts: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_millis(5_000),
            max_elapsed: Some(Duration::from_secs(3_600)),
            max_attempts: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Bot configuration
#[derive(Debug, Clone)]
pub struct SniperConfig {
    // Network
    pub rpc_url: String,
    pub call_timeout: Duration,

    // Wallet
    pub private_key: SecretString,

    // Message source
    pub channels: Vec<String>,

    // Exchange + trading parameters
    pub exchange: ExchangeConfig,
    pub trade: TradeConfig,

    // Price feed
    pub price_feed_url: String,
    pub price_precision: PricePrecision,

    // Pipeline
    pub poll: PollPolicy,
    pub busy_policy: BusyPolicy,
    pub dry_run: bool,

    // Output
    pub explorer_tx_url: String,
    pub log_format: LogFormat,
    pub log_file: Option<PathBuf>,
}

impl SniperConfig {
    /// Build the config from any key lookup (process env, map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| -> Option<String> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &str| -> Result<String> {
            get(key).ok_or_else(|| SniperError::Configuration(format!("{} not set", key)))
        };

        let rpc_url = get("RPC_URL")
            .or_else(|| get("BSC_URL"))
            .ok_or_else(|| SniperError::Configuration("RPC_URL (or BSC_URL) not set".into()))?;
        let private_key = SecretString::new(required("PRIVATE_KEY")?);

        let channels: Vec<String> = required("CHANNELS")?
            .split(',')
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        if channels.is_empty() {
            return Err(SniperError::Configuration("CHANNELS is empty".into()));
        }

        let buy_amount: Decimal = parse_value("BUY_AMOUNT", &required("BUY_AMOUNT")?)?;
        if buy_amount <= Decimal::ZERO {
            return Err(SniperError::Configuration("BUY_AMOUNT must be positive".into()));
        }
        let gas_price_gwei: Decimal = parse_value("GAS_PRICE", &required("GAS_PRICE")?)?;
        if gas_price_gwei <= Decimal::ZERO {
            return Err(SniperError::Configuration("GAS_PRICE must be positive".into()));
        }
        let gas_multiplier: Decimal = parse_value("GAS_MULTIPLIER", &required("GAS_MULTIPLIER")?)?;
        if gas_multiplier < Decimal::ONE {
            return Err(SniperError::Configuration(format!(
                "GAS_MULTIPLIER must be at least 1, got {}",
                gas_multiplier
            )));
        }
        let min_amount_out = match get("MIN_AMOUNT_OUT") {
            Some(v) => parse_value::<U256>("MIN_AMOUNT_OUT", &v)?,
            None => U256::ZERO,
        };
        let trade = TradeConfig {
            buy_amount,
            gas_price_gwei,
            gas_multiplier,
            min_amount_out,
        };
        // Sub-unit inputs truncate to zero base units
        if trade.amount_in_wei()?.is_zero() {
            return Err(SniperError::Configuration(format!(
                "BUY_AMOUNT {} is below one base unit",
                buy_amount
            )));
        }
        if trade.gas_price_wei()? == 0 {
            return Err(SniperError::Configuration(format!(
                "GAS_PRICE {} gwei is below 1 wei",
                gas_price_gwei
            )));
        }

        let exchange = ExchangeConfig {
            chain_id: optional("CHAIN_ID", get("CHAIN_ID"), DEFAULT_CHAIN_ID)?,
            router: optional("ROUTER_ADDRESS", get("ROUTER_ADDRESS"), DEFAULT_ROUTER)?,
            factory: optional("FACTORY_ADDRESS", get("FACTORY_ADDRESS"), DEFAULT_FACTORY)?,
            wrapped_native: optional(
                "WRAPPED_NATIVE_ADDRESS",
                get("WRAPPED_NATIVE_ADDRESS"),
                DEFAULT_WRAPPED_NATIVE,
            )?,
            stable_quote: optional(
                "STABLE_QUOTE_ADDRESS",
                get("STABLE_QUOTE_ADDRESS"),
                DEFAULT_STABLE_QUOTE,
            )?,
        };
        if exchange.wrapped_native == exchange.stable_quote {
            return Err(SniperError::Configuration(
                "WRAPPED_NATIVE_ADDRESS and STABLE_QUOTE_ADDRESS must differ".into(),
            ));
        }

        let poll = PollPolicy {
            initial_delay: Duration::from_millis(optional(
                "POLL_INITIAL_DELAY_MS",
                get("POLL_INITIAL_DELAY_MS"),
                200u64,
            )?),
            max_delay: Duration::from_millis(optional(
                "POLL_MAX_DELAY_MS",
                get("POLL_MAX_DELAY_MS"),
                5_000u64,
            )?),
            // 0 disables the elapsed-time cap
            max_elapsed: match optional("POLL_MAX_ELAPSED_SECS", get("POLL_MAX_ELAPSED_SECS"), 3_600u64)? {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            max_attempts: match get("POLL_MAX_ATTEMPTS") {
                Some(v) => Some(parse_value::<u32>("POLL_MAX_ATTEMPTS", &v)?),
                None => None,
            },
        };
        if poll.initial_delay.is_zero() {
            return Err(SniperError::Configuration(
                "POLL_INITIAL_DELAY_MS must be positive".into(),
            ));
        }
        if poll.initial_delay > poll.max_delay {
            return Err(SniperError::Configuration(
                "POLL_INITIAL_DELAY_MS must not exceed POLL_MAX_DELAY_MS".into(),
            ));
        }

        let busy_policy = match get("BUSY_POLICY").as_deref().map(str::to_lowercase).as_deref() {
            None | Some("queue") => BusyPolicy::Queue {
                capacity: optional("QUEUE_CAPACITY", get("QUEUE_CAPACITY"), 8usize)?,
            },
            Some("drop") => BusyPolicy::Drop,
            Some(other) => {
                return Err(SniperError::Configuration(format!(
                    "BUSY_POLICY must be 'queue' or 'drop', got '{}'",
                    other
                )))
            }
        };

        let log_format = match get("LOG_FORMAT").as_deref().map(str::to_lowercase).as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(SniperError::Configuration(format!(
                    "LOG_FORMAT must be 'text' or 'json', got '{}'",
                    other
                )))
            }
        };

        Ok(SniperConfig {
            rpc_url,
            call_timeout: Duration::from_millis(optional(
                "CALL_TIMEOUT_MS",
                get("CALL_TIMEOUT_MS"),
                10_000u64,
            )?),
            private_key,
            channels,
            exchange,
            trade,
            price_feed_url: get("PRICE_FEED_URL").unwrap_or_else(|| DEFAULT_PRICE_FEED_URL.to_string()),
            price_precision: match get("PRICE_PRECISION") {
                Some(v) => v.parse()?,
                None => PricePrecision::FixedPoint,
            },
            poll,
            busy_policy,
            dry_run: optional("DRY_RUN", get("DRY_RUN"), false)?,
            explorer_tx_url: get("EXPLORER_TX_URL").unwrap_or_else(|| DEFAULT_EXPLORER_TX_URL.to_string()),
            log_format,
            log_file: get("LOG_FILE").map(PathBuf::from),
        })
    }

    /// RPC URL trimmed for logging (API keys usually sit in the tail)
    pub fn rpc_url_for_log(&self) -> &str {
        let end = self
            .rpc_url
            .char_indices()
            .nth(RPC_URL_LOG_CHARS)
            .map_or(self.rpc_url.len(), |(i, _)| i);
        &self.rpc_url[..end]
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| SniperError::Configuration(format!("invalid {} '{}': {}", key, raw, e)))
}

fn optional<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match raw {
        Some(v) => parse_value(key, &v),
        None => Ok(default),
    }
}

/// Load from `.env` in the working directory plus the process environment.
pub fn load_config() -> Result<SniperConfig> {
    dotenv::dotenv().ok();
    SniperConfig::from_lookup(|key| std::env::var(key).ok())
}

/// Load from a specific env file. A missing file is not an error: the
/// process environment may carry everything.
pub fn load_config_from_file(path: &Path) -> Result<SniperConfig> {
    if path.exists() {
        dotenv::from_path(path).map_err(|e| {
            SniperError::Configuration(format!("failed to read {}: {}", path.display(), e))
        })?;
    }
    SniperConfig::from_lookup(|key| std::env::var(key).ok())
}
