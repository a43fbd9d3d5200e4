// Router call construction and gas sizing

use crate::config::SWAP_DEADLINE_SECS;
use crate::contracts::IPancakeRouter02;
use crate::error::{Result, SniperError};
use crate::types::SwapPath;
use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Arguments of `swapExactTokensForTokensSupportingFeeOnTransferTokens`
#[derive(Debug, Clone)]
pub struct SwapCall {
    pub path: SwapPath,
    pub amount_in: U256,
    pub amount_out_min: U256,
    pub recipient: Address,
    pub deadline: u64,
}

impl SwapCall {
    pub fn calldata(&self) -> Bytes {
        IPancakeRouter02::swapExactTokensForTokensSupportingFeeOnTransferTokensCall {
            amountIn: self.amount_in,
            amountOutMin: self.amount_out_min,
            path: self.path.hops().to_vec(),
            to: self.recipient,
            deadline: U256::from(self.deadline),
        }
        .abi_encode()
        .into()
    }
}

/// Unix deadline for a swap submitted at `now_secs`
pub fn swap_deadline(now_secs: u64) -> u64 {
    now_secs + SWAP_DEADLINE_SECS
}

/// Gas limit = ceil(estimate × multiplier)
pub fn scaled_gas_limit(estimate: u64, multiplier: Decimal) -> Result<u64> {
    Decimal::from(estimate)
        .checked_mul(multiplier)
        .map(|scaled| scaled.ceil())
        .and_then(|scaled| scaled.to_u64())
        .ok_or_else(|| {
            SniperError::Transaction(format!(
                "gas limit overflow: {} × {}",
                estimate, multiplier
            ))
        })
}
