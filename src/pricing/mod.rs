//! Native Coin Pricing
//!
//! Spot price of the native coin in stable-quote units, plus the fixed-point
//! conversions the liquidity monitor uses to compare reserves.

pub mod oracle;
pub mod valuation;

pub use oracle::{HttpPriceOracle, PriceOracle};
pub use valuation::{native_reserve_value, wei_to_units};
