//! Error kinds for the sniper pipeline
//!
//! Library code returns `Result<T, SniperError>`. Binaries wrap these in
//! `anyhow` with context. The liquidity poller uses `is_transient()` to
//! decide which failures are retried with backoff.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SniperError {
    /// Required setting absent or malformed at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A configured channel handle cannot be resolved.
    #[error("channel cannot be resolved: {0}")]
    ChannelResolution(String),

    /// An RPC call against the node failed.
    #[error("network error during {operation}: {message}")]
    Network {
        operation: &'static str,
        message: String,
    },

    /// The native-coin price feed failed or returned an unusable price.
    #[error("price feed error: {0}")]
    PriceFeed(String),

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// Signing or submission failed (e.g. the node rejected the transaction).
    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("liquidity polling gave up after {attempts} attempts ({elapsed:?})")]
    PollExhausted { attempts: u32, elapsed: Duration },

    #[error("pipeline cancelled by shutdown")]
    Cancelled,
}

impl SniperError {
    pub fn network(operation: &'static str, err: impl std::fmt::Display) -> Self {
        SniperError::Network {
            operation,
            message: err.to_string(),
        }
    }

    /// Failures worth another liquidity poll: node, price feed and timeouts.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SniperError::Network { .. } | SniperError::PriceFeed(_) | SniperError::Timeout { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SniperError>;
