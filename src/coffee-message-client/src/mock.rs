//! In-memory ledger and agent doubles.
//!
//! [`InMemoryLedger`] answers the `MessageStore` ABI from process memory so sessions can be driven
//! end to end without a node. [`MockAgent`] plays the signing agent with a scripted answer to the
//! access request.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use alloy_sol_types::{sol_data, SolInterface, SolType};
use async_trait::async_trait;
use coffee_message_types::{Address, IMessageStore, Message, B256, U256};

use crate::{
    agent::{Identity, LedgerSigner, SigningAgent, TxReceipt},
    config::DEFAULT_CONTRACT_ADDRESS,
    errors::ClientError,
};

/// Revert reason for a withdrawal with nothing pending, when that policy is enabled.
pub const NOTHING_TO_WITHDRAW: &str = "No coffee to withdraw";

#[derive(Default)]
struct LedgerBook {
    inboxes: HashMap<Address, Vec<Message>>,
    pending: HashMap<Address, U256>,
    block: u64,
    calls: usize,
    revert_empty_withdrawals: bool,
    fail_message_reads: bool,
    fail_pending_reads: bool,
    reject_transactions: bool,
}

/// Shared in-memory `MessageStore`. Clones see the same state.
#[derive(Clone)]
pub struct InMemoryLedger {
    address: Address,
    book: Arc<Mutex<LedgerBook>>,
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new(DEFAULT_CONTRACT_ADDRESS)
    }
}

impl InMemoryLedger {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            book: Arc::new(Mutex::new(LedgerBook::default())),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    fn book(&self) -> MutexGuard<'_, LedgerBook> {
        // A panicking test thread must not hide the book from the rest of the test.
        self.book.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Calls and transactions that reached the ledger.
    pub fn call_count(&self) -> usize {
        self.book().calls
    }

    pub fn pending_of(&self, account: Address) -> U256 {
        self.book().pending.get(&account).copied().unwrap_or_default()
    }

    pub fn inbox_of(&self, account: Address) -> Vec<Message> {
        self.book().inboxes.get(&account).cloned().unwrap_or_default()
    }

    /// Revert `withdrawCoffee` when nothing is pending instead of succeeding as a no-op.
    pub fn set_revert_empty_withdrawals(&self, enabled: bool) {
        self.book().revert_empty_withdrawals = enabled;
    }

    pub fn set_fail_message_reads(&self, enabled: bool) {
        self.book().fail_message_reads = enabled;
    }

    pub fn set_fail_pending_reads(&self, enabled: bool) {
        self.book().fail_pending_reads = enabled;
    }

    /// Simulate the user declining every signature request.
    pub fn set_reject_transactions(&self, enabled: bool) {
        self.book().reject_transactions = enabled;
    }

    fn decode(calldata: &[u8]) -> Result<IMessageStore::IMessageStoreCalls, String> {
        IMessageStore::IMessageStoreCalls::abi_decode(calldata, true)
            .map_err(|e| format!("unknown call: {e}"))
    }

    fn handle_call(&self, from: Address, to: Address, calldata: &[u8]) -> Result<Vec<u8>, ClientError> {
        let mut book = self.book();
        book.calls += 1;
        if to != self.address {
            return Err(ClientError::ContractCallError(format!("no contract at {to}")));
        }

        match Self::decode(calldata).map_err(ClientError::ContractCallError)? {
            IMessageStore::IMessageStoreCalls::getMyMessages(_) => {
                if book.fail_message_reads {
                    return Err(ClientError::ContractCallError("getMyMessages failed".to_string()));
                }
                let inbox = book.inboxes.get(&from).cloned().unwrap_or_default();
                Ok(<sol_data::Array<Message> as SolType>::abi_encode(&inbox))
            }
            IMessageStore::IMessageStoreCalls::getPendingWithdrawal(call) => {
                if book.fail_pending_reads {
                    return Err(ClientError::NetworkError("getPendingWithdrawal timed out".to_string()));
                }
                let pending = book.pending.get(&call.user).copied().unwrap_or_default();
                Ok(<sol_data::Uint<256> as SolType>::abi_encode(&pending))
            }
            _ => Err(ClientError::ContractCallError(
                "state-changing function called read-only".to_string(),
            )),
        }
    }

    fn handle_transaction(
        &self,
        from: Address,
        to: Address,
        calldata: &[u8],
        value: U256,
    ) -> Result<TxReceipt, ClientError> {
        let mut book = self.book();
        book.calls += 1;
        if book.reject_transactions {
            return Err(ClientError::TransactionRejected(
                "User denied transaction signature.".to_string(),
            ));
        }
        if to != self.address {
            return Err(ClientError::TransactionReverted(format!("no contract at {to}")));
        }

        match Self::decode(calldata).map_err(ClientError::TransactionReverted)? {
            IMessageStore::IMessageStoreCalls::sendMessageWithCoffee(call) => {
                book.inboxes.entry(call.recipient).or_default().push(Message {
                    sender: from,
                    message: call.message,
                    amount: value,
                });
                let pending = book.pending.entry(call.recipient).or_default();
                *pending = pending.saturating_add(value);
            }
            IMessageStore::IMessageStoreCalls::withdrawCoffee(_) => {
                let pending = book.pending.remove(&from).unwrap_or_default();
                if pending.is_zero() && book.revert_empty_withdrawals {
                    return Err(ClientError::TransactionReverted(NOTHING_TO_WITHDRAW.to_string()));
                }
            }
            _ => {
                return Err(ClientError::TransactionReverted(
                    "view function called as transaction".to_string(),
                ))
            }
        }

        book.block += 1;
        Ok(TxReceipt {
            tx_hash: B256::left_padding_from(&book.block.to_be_bytes()),
            block_number: Some(book.block),
        })
    }
}

/// [`LedgerSigner`] acting as one identity against an [`InMemoryLedger`].
#[derive(Clone)]
pub struct MockSigner {
    ledger: InMemoryLedger,
    identity: Identity,
}

impl MockSigner {
    pub fn new(ledger: InMemoryLedger, identity: Identity) -> Self {
        Self { ledger, identity }
    }
}

#[async_trait]
impl LedgerSigner for MockSigner {
    fn identity(&self) -> Identity {
        self.identity
    }

    async fn call(&self, to: Address, calldata: Vec<u8>) -> Result<Vec<u8>, ClientError> {
        self.ledger.handle_call(self.identity.address(), to, &calldata)
    }

    async fn send_transaction(
        &self,
        to: Address,
        calldata: Vec<u8>,
        value: U256,
    ) -> Result<TxReceipt, ClientError> {
        self.ledger
            .handle_transaction(self.identity.address(), to, &calldata, value)
    }
}

/// How the [`MockAgent`] answers an access request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessResponse {
    Grant,
    Deny,
    /// No agent installed.
    Unavailable,
}

pub struct MockAgent {
    ledger: InMemoryLedger,
    identity: Mutex<Identity>,
    response: Mutex<AccessResponse>,
    granted: Mutex<bool>,
    switch_on_signer: Mutex<Option<Identity>>,
}

impl MockAgent {
    pub fn new(ledger: InMemoryLedger, identity: Identity, response: AccessResponse) -> Self {
        Self {
            ledger,
            identity: Mutex::new(identity),
            response: Mutex::new(response),
            granted: Mutex::new(false),
            switch_on_signer: Mutex::new(None),
        }
    }

    /// Change the answer for the next access request (e.g. the user approves on retry).
    pub fn respond_with(&self, response: AccessResponse) {
        *self.response.lock().unwrap_or_else(|p| p.into_inner()) = response;
    }

    /// Have the user switch to `identity` right before the next signer is handed out.
    pub fn switch_account_on_signer(&self, identity: Identity) {
        *self.switch_on_signer.lock().unwrap_or_else(|p| p.into_inner()) = Some(identity);
    }

    fn is_granted(&self) -> bool {
        *self.granted.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[async_trait]
impl SigningAgent for MockAgent {
    async fn request_access(&self) -> Result<(), ClientError> {
        let response = *self.response.lock().unwrap_or_else(|p| p.into_inner());
        match response {
            AccessResponse::Grant => {
                *self.granted.lock().unwrap_or_else(|p| p.into_inner()) = true;
                Ok(())
            }
            AccessResponse::Deny => Err(ClientError::AccessDenied),
            AccessResponse::Unavailable => Err(ClientError::AgentUnavailable(
                "no signing agent installed".to_string(),
            )),
        }
    }

    async fn active_identity(&self) -> Result<Identity, ClientError> {
        if !self.is_granted() {
            return Err(ClientError::AccessDenied);
        }
        Ok(*self.identity.lock().unwrap_or_else(|p| p.into_inner()))
    }

    async fn signer(&self) -> Result<Arc<dyn LedgerSigner>, ClientError> {
        let switched = self
            .switch_on_signer
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take();
        if let Some(identity) = switched {
            *self.identity.lock().unwrap_or_else(|p| p.into_inner()) = identity;
        }
        let identity = self.active_identity().await?;
        Ok(Arc::new(MockSigner::new(self.ledger.clone(), identity)))
    }
}
