//! Observable view state: identity, form inputs and the last ledger snapshot.

use std::fmt;

use coffee_message_types::{from_base_unit, parse_address, to_base_unit, Address, Message, U256};

use crate::{agent::Identity, errors::ClientError, ledger::LedgerClient};

/// Amount pre-filled in the send form.
pub const DEFAULT_COFFEE_AMOUNT: &str = "0.0005";

/// A message addressed to the connected identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub sender: Identity,
    pub message: String,
    /// Wei.
    pub amount: U256,
}

impl ReceivedMessage {
    pub fn amount_display(&self) -> String {
        from_base_unit(self.amount)
    }
}

impl From<Message> for ReceivedMessage {
    fn from(message: Message) -> Self {
        Self {
            sender: Identity::new(message.sender),
            message: message.message,
            amount: message.amount,
        }
    }
}

impl fmt::Display for ReceivedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "From: {}, Message: {}, Amount: {} ETH",
            self.sender,
            self.message,
            self.amount_display()
        )
    }
}

/// Both ledger reads, taken together.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub messages: Vec<ReceivedMessage>,
    pub pending_withdrawal: U256,
}

/// Raw send-form inputs, unvalidated until submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DraftSendRequest {
    pub recipient: String,
    pub message: String,
    pub amount: String,
}

impl Default for DraftSendRequest {
    fn default() -> Self {
        Self {
            recipient: String::new(),
            message: String::new(),
            amount: DEFAULT_COFFEE_AMOUNT.to_string(),
        }
    }
}

/// A draft that passed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendRequest {
    pub recipient: Address,
    pub message: String,
    pub amount: U256,
}

impl DraftSendRequest {
    pub fn parse(&self) -> Result<SendRequest, ClientError> {
        let recipient =
            parse_address(&self.recipient).map_err(|reason| ClientError::InvalidRecipient {
                input: self.recipient.clone(),
                reason,
            })?;
        if self.message.is_empty() {
            return Err(ClientError::EmptyMessage);
        }
        let amount = to_base_unit(&self.amount).map_err(|reason| ClientError::InvalidAmount {
            input: self.amount.clone(),
            reason,
        })?;
        Ok(SendRequest {
            recipient,
            message: self.message.clone(),
            amount,
        })
    }

    /// Recipient and message are cleared after a send; the amount is kept for the next coffee.
    pub(crate) fn clear_after_send(&mut self) {
        self.recipient.clear();
        self.message.clear();
    }
}

#[derive(Clone, Debug, Default)]
pub struct ViewState {
    identity: Option<Identity>,
    draft: DraftSendRequest,
    snapshot: LedgerSnapshot,
}

impl ViewState {
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn draft(&self) -> &DraftSendRequest {
        &self.draft
    }

    pub fn snapshot(&self) -> &LedgerSnapshot {
        &self.snapshot
    }

    pub fn messages(&self) -> &[ReceivedMessage] {
        &self.snapshot.messages
    }

    pub fn pending_withdrawal(&self) -> U256 {
        self.snapshot.pending_withdrawal
    }

    pub fn pending_withdrawal_display(&self) -> String {
        from_base_unit(self.snapshot.pending_withdrawal)
    }

    /// Gate for the withdraw action.
    pub fn can_withdraw(&self) -> bool {
        self.snapshot.pending_withdrawal > U256::ZERO
    }

    pub(crate) fn set_identity(&mut self, identity: Identity) {
        self.identity = Some(identity);
    }

    pub(crate) fn draft_mut(&mut self) -> &mut DraftSendRequest {
        &mut self.draft
    }

    /// Read messages and pending withdrawal concurrently and swap both in together.
    ///
    /// If either read fails the previous snapshot stays in place.
    pub async fn refresh(
        &mut self,
        ledger: &LedgerClient,
        identity: &Identity,
    ) -> Result<(), ClientError> {
        let (messages, pending_withdrawal) = tokio::try_join!(
            ledger.get_my_messages(),
            ledger.get_pending_withdrawal(identity)
        )?;
        self.snapshot = LedgerSnapshot {
            messages,
            pending_withdrawal,
        };
        Ok(())
    }
}
