//! Typed handle on the `MessageStore` ledger contract.
//!
//! Each operation maps 1:1 onto a contract function. No ledger rule is checked here beyond what
//! the types already guarantee; the contract decides.

use std::{fmt, sync::Arc};

use alloy_sol_types::SolCall;
use coffee_message_types::{Address, IMessageStore, U256};
use tracing::{debug, info};

use crate::{
    agent::{Identity, LedgerSigner, TxReceipt},
    errors::ClientError,
    view::ReceivedMessage,
};

/// Immutable binding of contract address, operation schema and signer.
#[derive(Clone)]
pub struct LedgerClient {
    contract: Address,
    signer: Arc<dyn LedgerSigner>,
}

impl fmt::Debug for LedgerClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerClient")
            .field("contract", &self.contract)
            .field("signer", &self.signer.identity())
            .finish()
    }
}

impl LedgerClient {
    pub fn new(contract: Address, signer: Arc<dyn LedgerSigner>) -> Self {
        Self { contract, signer }
    }

    pub fn contract_address(&self) -> Address {
        self.contract
    }

    pub fn identity(&self) -> Identity {
        self.signer.identity()
    }

    /// `sendMessageWithCoffee(recipient, text)` with `amount` wei attached.
    ///
    /// Returns once the transaction is confirmed.
    pub async fn send_message_with_payment(
        &self,
        recipient: Address,
        text: &str,
        amount: U256,
    ) -> Result<TxReceipt, ClientError> {
        if text.is_empty() {
            return Err(ClientError::EmptyMessage);
        }
        let calldata = IMessageStore::sendMessageWithCoffeeCall {
            recipient,
            message: text.to_string(),
        }
        .abi_encode();

        debug!(%recipient, %amount, "submitting sendMessageWithCoffee");
        let receipt = self
            .signer
            .send_transaction(self.contract, calldata, amount)
            .await?;
        info!(tx_hash = %receipt.tx_hash, %recipient, "message sent with coffee");
        Ok(receipt)
    }

    /// `withdrawCoffee()`. A zero balance is not checked here; the ledger decides.
    pub async fn withdraw(&self) -> Result<TxReceipt, ClientError> {
        let calldata = IMessageStore::withdrawCoffeeCall {}.abi_encode();

        debug!("submitting withdrawCoffee");
        let receipt = self
            .signer
            .send_transaction(self.contract, calldata, U256::ZERO)
            .await?;
        info!(tx_hash = %receipt.tx_hash, "coffee withdrawn");
        Ok(receipt)
    }

    /// Messages addressed to the signer's identity, in ledger order.
    pub async fn get_my_messages(&self) -> Result<Vec<ReceivedMessage>, ClientError> {
        let out = self
            .signer
            .call(self.contract, IMessageStore::getMyMessagesCall {}.abi_encode())
            .await?;
        let decoded = IMessageStore::getMyMessagesCall::abi_decode_returns(&out, true)
            .map_err(|e| ClientError::ContractCallError(format!("getMyMessages: {e}")))?;
        Ok(decoded._0.into_iter().map(ReceivedMessage::from).collect())
    }

    /// Pending withdrawal for `identity`, in wei.
    pub async fn get_pending_withdrawal(&self, identity: &Identity) -> Result<U256, ClientError> {
        let calldata = IMessageStore::getPendingWithdrawalCall {
            user: identity.address(),
        }
        .abi_encode();
        let out = self.signer.call(self.contract, calldata).await?;
        let decoded = IMessageStore::getPendingWithdrawalCall::abi_decode_returns(&out, true)
            .map_err(|e| ClientError::ContractCallError(format!("getPendingWithdrawal: {e}")))?;
        Ok(decoded._0)
    }
}
