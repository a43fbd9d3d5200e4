//! Trade Execution
//!
//! Builds the router call, sizes gas, signs locally and submits raw.
//! Submission is fire-and-forget: no receipt wait, no retry.

pub mod executor;
pub mod preflight;
pub mod swap;

pub use executor::TradeExecutor;
pub use preflight::{run_preflight, PreflightReport};
pub use swap::{scaled_gas_limit, swap_deadline, SwapCall};
