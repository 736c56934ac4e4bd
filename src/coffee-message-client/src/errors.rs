use coffee_message_types::{AddressError, AmountError};
use thiserror::Error;

/// Every failure the agent gateway, ledger client or session can surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// No signing agent reachable in this environment.
    #[error("signing agent unavailable: {0}")]
    AgentUnavailable(String),
    #[error("account access denied by the user")]
    AccessDenied,
    #[error("invalid amount {input:?}: {reason:?}")]
    InvalidAmount { input: String, reason: AmountError },
    #[error("invalid recipient address {input:?}: {reason:?}")]
    InvalidRecipient { input: String, reason: AddressError },
    #[error("message text is empty")]
    EmptyMessage,
    /// The user declined to sign.
    #[error("transaction rejected by the signer: {0}")]
    TransactionRejected(String),
    /// The ledger (or the node on its behalf) refused the transaction.
    #[error("transaction reverted: {0}")]
    TransactionReverted(String),
    #[error("network error: {0}")]
    NetworkError(String),
    #[error("contract call failed: {0}")]
    ContractCallError(String),
    #[error("session is not connected")]
    NotConnected,
    #[error("invalid configuration: {0}")]
    Config(String),
}
