//! Signing agent gateway.
//!
//! The agent is the only component that holds keys. The client asks it for access, learns the
//! active identity from it, and receives a [`LedgerSigner`] capability bound to that identity.

pub mod rpc;

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use coffee_message_types::{checksummed, Address, B256, U256};

use crate::errors::ClientError;

/// Active account address. Rendered EIP-55 checksummed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Identity(Address);

impl Identity {
    pub fn new(address: Address) -> Self {
        Self(address)
    }

    pub fn address(&self) -> Address {
        self.0
    }
}

impl From<Address> for Identity {
    fn from(address: Address) -> Self {
        Self(address)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&checksummed(&self.0))
    }
}

/// Confirmed transaction summary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
}

/// Capability to read from and transact against the ledger as one identity.
#[async_trait]
pub trait LedgerSigner: Send + Sync {
    fn identity(&self) -> Identity;

    /// Read-only call with `from` set to [`Self::identity`].
    async fn call(&self, to: Address, calldata: Vec<u8>) -> Result<Vec<u8>, ClientError>;

    /// Sign, submit and wait for confirmation.
    async fn send_transaction(
        &self,
        to: Address,
        calldata: Vec<u8>,
        value: U256,
    ) -> Result<TxReceipt, ClientError>;
}

/// User-controlled key custodian.
#[async_trait]
pub trait SigningAgent: Send + Sync {
    /// Ask the user to expose an account to this client. May prompt.
    async fn request_access(&self) -> Result<(), ClientError>;

    /// Currently authorised identity. Requires a successful [`Self::request_access`].
    async fn active_identity(&self) -> Result<Identity, ClientError>;

    /// Transaction capability bound to the active identity.
    async fn signer(&self) -> Result<Arc<dyn LedgerSigner>, ClientError>;
}
