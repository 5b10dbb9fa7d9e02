//! Solidity interface for the refund transfer.

use alloy_sol_types::sol;

sol! {
    /// The ERC-20 subset needed to pay a refund.
    #[allow(missing_docs)]
    #[derive(Debug)]
    #[sol(rpc)]
    interface IERC20 {
        function transfer(address to, uint256 amount) external returns (bool);
    }
}
