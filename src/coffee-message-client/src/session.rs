//! Session lifecycle: agent access → identity → ledger client → view refresh.
//!
//! The controller owns the identity, the ledger client and the view. Nothing reaches the ledger
//! unless the session is [`SessionState::Connected`].

use tracing::{info, warn};

use crate::{
    agent::{Identity, SigningAgent, TxReceipt},
    config::LedgerConfig,
    errors::ClientError,
    ledger::LedgerClient,
    view::{DraftSendRequest, ViewState},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    /// The last connect attempt failed. `connect` may be called again.
    Error(ClientError),
}

/// Result of a confirmed mutation.
///
/// The transaction itself succeeded; `refresh` reports whether the follow-up ledger read did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationOutcome {
    pub receipt: TxReceipt,
    pub refresh: Result<(), ClientError>,
}

pub struct SessionController<A> {
    agent: A,
    config: LedgerConfig,
    state: SessionState,
    ledger: Option<LedgerClient>,
    view: ViewState,
}

impl<A: SigningAgent> SessionController<A> {
    pub fn new(agent: A, config: LedgerConfig) -> Self {
        Self {
            agent,
            config,
            state: SessionState::Disconnected,
            ledger: None,
            view: ViewState::default(),
        }
    }

    pub fn agent(&self) -> &A {
        &self.agent
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.view.identity()
    }

    pub fn ledger(&self) -> Option<&LedgerClient> {
        self.ledger.as_ref()
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    /// Send-form inputs. The snapshot itself is only ever replaced by a refresh.
    pub fn draft_mut(&mut self) -> &mut DraftSendRequest {
        self.view.draft_mut()
    }

    /// Establish the session and load the initial view.
    ///
    /// A failed initial load is returned, but the session stays connected with an empty
    /// snapshot; call [`Self::refresh`] to retry. No-op when already connected.
    pub async fn connect(&mut self) -> Result<(), ClientError> {
        if self.is_connected() {
            return Ok(());
        }

        self.state = SessionState::Connecting;
        info!("requesting signing agent access");

        let (identity, ledger) = match self.establish().await {
            Ok(bound) => bound,
            Err(e) => {
                warn!(error = %e, "failed to connect to signing agent");
                self.state = SessionState::Error(e.clone());
                return Err(e);
            }
        };

        info!(%identity, contract = %ledger.contract_address(), "session connected");
        self.view.set_identity(identity);
        self.ledger = Some(ledger);
        self.state = SessionState::Connected;

        self.refresh().await
    }

    async fn establish(&self) -> Result<(Identity, LedgerClient), ClientError> {
        self.agent.request_access().await?;
        let identity = self.agent.active_identity().await?;
        let signer = self.agent.signer().await?;
        // Reads and writes must run as the identity the view is keyed on.
        if signer.identity() != identity {
            return Err(ClientError::AgentUnavailable(format!(
                "active account changed from {identity} to {} while connecting",
                signer.identity()
            )));
        }
        Ok((identity, LedgerClient::new(self.config.contract_address, signer)))
    }

    fn bound(&self) -> Result<(&LedgerClient, Identity), ClientError> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }
        match (self.ledger.as_ref(), self.view.identity()) {
            (Some(ledger), Some(identity)) => Ok((ledger, *identity)),
            _ => Err(ClientError::NotConnected),
        }
    }

    /// Reload messages and pending withdrawal; the previous snapshot survives a failed read.
    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }
        let (Some(ledger), Some(identity)) = (self.ledger.as_ref(), self.view.identity().copied())
        else {
            return Err(ClientError::NotConnected);
        };

        if let Err(e) = self.view.refresh(ledger, &identity).await {
            warn!(error = %e, %identity, "failed to load ledger state");
            return Err(e);
        }
        Ok(())
    }

    /// Submit the current draft.
    ///
    /// On success the draft's recipient and message are cleared and the view is refreshed. On
    /// failure the draft and the snapshot are left as they were.
    pub async fn send_draft(&mut self) -> Result<MutationOutcome, ClientError> {
        let (ledger, _) = self.bound()?;
        let request = self.view.draft().parse()?;

        let receipt = ledger
            .send_message_with_payment(request.recipient, &request.message, request.amount)
            .await
            .map_err(|e| {
                warn!(error = %e, recipient = %request.recipient, "failed to send message with coffee");
                e
            })?;

        self.view.draft_mut().clear_after_send();
        let refresh = self.refresh().await;
        Ok(MutationOutcome { receipt, refresh })
    }

    /// Withdraw whatever the ledger holds for this identity. Not gated on the pending amount.
    pub async fn withdraw(&mut self) -> Result<MutationOutcome, ClientError> {
        let (ledger, identity) = self.bound()?;

        let receipt = ledger.withdraw().await.map_err(|e| {
            warn!(error = %e, %identity, "failed to withdraw coffee");
            e
        })?;

        let refresh = self.refresh().await;
        Ok(MutationOutcome { receipt, refresh })
    }
}
