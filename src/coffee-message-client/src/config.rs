//! Injected configuration: which ledger contract to talk to and how to reach the signing agent.

use std::fmt;

use alloy_primitives::{address, Address};
use serde::Deserialize;

/// `MessageStore` deployment the client binds to unless configured otherwise.
pub const DEFAULT_CONTRACT_ADDRESS: Address = address!("238F0095AE9b8F53BE79Ace20b4BdD3e5793bBA7");

/// Blocks to wait for after inclusion before a transaction counts as confirmed.
pub const DEFAULT_CONFIRMATIONS: usize = 1;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LedgerConfig {
    pub contract_address: Address,
    pub confirmations: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            contract_address: DEFAULT_CONTRACT_ADDRESS,
            confirmations: DEFAULT_CONFIRMATIONS,
        }
    }
}

/// How to reach the signing agent.
///
/// With `private_key` unset the agent is a wallet behind `rpc_url` that signs on its own.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    pub rpc_url: String,
    #[serde(default)]
    pub private_key: Option<String>,
}

impl fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentConfig")
            .field("rpc_url", &self.rpc_url)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
