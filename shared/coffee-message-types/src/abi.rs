//! Solidity ABI surface of the `MessageStore` ledger contract.
//!
//! Only the four operations the client consumes are declared. Argument order is fixed by the
//! deployed contract.

use alloy_sol_types::sol;

sol! {
    /// Message record as returned by `getMyMessages`.
    #[derive(Debug, PartialEq, Eq)]
    struct Message {
        address sender;
        string message;
        uint256 amount;
    }

    #[derive(Debug, PartialEq, Eq)]
    interface IMessageStore {
        function sendMessageWithCoffee(address recipient, string message) external payable;
        function withdrawCoffee() external;
        function getMyMessages() external view returns (Message[] memory);
        function getPendingWithdrawal(address user) external view returns (uint256);
    }
}
