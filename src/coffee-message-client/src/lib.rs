//! Client for the coffee message ledger.
//!
//! A [`SessionController`] acquires access from a [`SigningAgent`], binds a [`LedgerClient`] to
//! the granted identity and keeps a [`ViewState`] in sync with the ledger. All balances and
//! messages are owned by the ledger contract; the client only projects what it reads back.

pub mod agent;
pub mod config;
pub mod errors;
pub mod ledger;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod session;
pub mod view;

#[cfg(test)]
mod tests;

pub use agent::{
    rpc::{ConfiguredAgent, LocalKeyAgent, WalletRpcAgent},
    Identity, LedgerSigner, SigningAgent, TxReceipt,
};
pub use config::{AgentConfig, LedgerConfig, DEFAULT_CONTRACT_ADDRESS};
pub use errors::ClientError;
pub use ledger::LedgerClient;
pub use session::{MutationOutcome, SessionController, SessionState};
pub use view::{DraftSendRequest, LedgerSnapshot, ReceivedMessage, SendRequest, ViewState};

pub use coffee_message_types::{from_base_unit, to_base_unit, Address, U256};
