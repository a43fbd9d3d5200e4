//! Announcement Sniper Library
//!
//! Watches channel announcements for a freshly launched token, waits for
//! its PancakeSwap pool to receive liquidity, then buys it with a locally
//! signed swap.

pub mod chain;
pub mod config;
pub mod contracts;
pub mod error;
pub mod execution;
pub mod extractor;
pub mod liquidity;
pub mod logging;
pub mod pipeline;
pub mod pricing;
pub mod shutdown;
pub mod source;
pub mod types;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::{load_config, load_config_from_file, SniperConfig};
pub use error::{Result, SniperError};
pub use extractor::AddressExtractor;
pub use pipeline::{Orchestrator, PipelineOutcome};
pub use types::{LiquidityReport, SubmittedTrade, SwapPath, TokenCandidate};
