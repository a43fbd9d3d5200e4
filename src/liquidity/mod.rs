//! Liquidity Detection
//!
//! `LiquidityMonitor` answers one question per call: does a pool for the
//! token exist yet, and which quote asset holds more value. `LiquidityPoller`
//! repeats that question with exponential backoff until the answer is yes,
//! the budget runs out, or shutdown fires.

pub mod monitor;
pub mod poller;

pub use monitor::LiquidityMonitor;
pub use poller::{next_delay, LiquidityPoller};
