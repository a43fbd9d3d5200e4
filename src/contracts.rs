//! Contract Definitions
//!
//! Solidity interfaces the sniper talks to, defined using alloy's `sol!` macro.
//! Each interface is annotated with `#[sol(rpc)]` to generate contract
//! instance types that can make RPC calls via any alloy Provider.

use alloy::sol;

// ── BEP20 / ERC20 ─────────────────────────────────────────────────────

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function allowance(address owner, address spender) external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
    }
}

// ── PancakeSwap V2 ────────────────────────────────────────────────────

sol! {
    #[sol(rpc)]
    interface IPancakeFactory {
        function getPair(address tokenA, address tokenB) external view returns (address pair);
    }
}

sol! {
    #[sol(rpc)]
    interface IPancakeRouter02 {
        function swapExactTokensForTokensSupportingFeeOnTransferTokens(uint256 amountIn, uint256 amountOutMin, address[] calldata path, address to, uint256 deadline) external;
    }
}
