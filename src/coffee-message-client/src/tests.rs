use coffee_message_types::{Address, U256};

use crate::{
    agent::Identity,
    config::LedgerConfig,
    errors::ClientError,
    mock::{AccessResponse, InMemoryLedger, MockAgent, NOTHING_TO_WITHDRAW},
    session::{SessionController, SessionState},
    view::{LedgerSnapshot, ReceivedMessage},
};

const HALF_MILLI_ETHER: u64 = 500_000_000_000_000;

fn alice() -> Identity {
    Identity::new(Address::repeat_byte(0xaa))
}

fn bob() -> Identity {
    Identity::new(Address::repeat_byte(0xbb))
}

fn session(
    ledger: &InMemoryLedger,
    identity: Identity,
    response: AccessResponse,
) -> SessionController<MockAgent> {
    SessionController::new(
        MockAgent::new(ledger.clone(), identity, response),
        LedgerConfig {
            contract_address: ledger.address(),
            ..LedgerConfig::default()
        },
    )
}

async fn connected(ledger: &InMemoryLedger, identity: Identity) -> SessionController<MockAgent> {
    let mut s = session(ledger, identity, AccessResponse::Grant);
    s.connect().await.unwrap();
    s
}

fn fill_draft(s: &mut SessionController<MockAgent>, to: Identity, text: &str, amount: &str) {
    let draft = s.draft_mut();
    draft.recipient = to.address().to_string();
    draft.message = text.to_string();
    draft.amount = amount.to_string();
}

#[tokio::test]
async fn test_coffee_message_reaches_recipient() {
    let ledger = InMemoryLedger::default();
    let mut sender = connected(&ledger, alice()).await;

    fill_draft(&mut sender, bob(), "hi", "0.0005");
    let outcome = sender.send_draft().await.unwrap();
    assert_eq!(outcome.refresh, Ok(()));
    assert_eq!(outcome.receipt.block_number, Some(1));

    // Recipient and message cleared, amount kept.
    assert!(sender.view().draft().recipient.is_empty());
    assert!(sender.view().draft().message.is_empty());
    assert_eq!(sender.view().draft().amount, "0.0005");

    let recipient = connected(&ledger, bob()).await;
    assert_eq!(
        recipient.view().messages(),
        &[ReceivedMessage {
            sender: alice(),
            message: "hi".to_string(),
            amount: U256::from(HALF_MILLI_ETHER),
        }]
    );
    assert!(recipient.view().pending_withdrawal() >= U256::from(HALF_MILLI_ETHER));
    assert!(recipient.view().can_withdraw());
    assert_eq!(recipient.view().pending_withdrawal_display(), "0.0005");

    // The sender's own inbox is untouched.
    assert!(sender.view().messages().is_empty());
}

#[tokio::test]
async fn test_messages_keep_ledger_order() {
    let ledger = InMemoryLedger::default();
    let mut sender = connected(&ledger, alice()).await;
    for (text, amount) in [("first", "0.001"), ("second", "0"), ("third", "2.5")] {
        fill_draft(&mut sender, bob(), text, amount);
        sender.send_draft().await.unwrap();
    }

    let recipient = connected(&ledger, bob()).await;
    let texts: Vec<&str> = recipient
        .view()
        .messages()
        .iter()
        .map(|m| m.message.as_str())
        .collect();
    assert_eq!(texts, ["first", "second", "third"]);
    assert_eq!(recipient.view().pending_withdrawal_display(), "2.501");
}

#[tokio::test]
async fn test_withdraw_refreshes_pending_amount() {
    let ledger = InMemoryLedger::default();
    let mut sender = connected(&ledger, alice()).await;
    fill_draft(&mut sender, bob(), "hi", "0.0005");
    sender.send_draft().await.unwrap();

    let mut recipient = connected(&ledger, bob()).await;
    assert!(recipient.view().can_withdraw());

    let outcome = recipient.withdraw().await.unwrap();
    assert_eq!(outcome.refresh, Ok(()));
    assert_eq!(recipient.view().pending_withdrawal(), U256::ZERO);
    assert!(!recipient.view().can_withdraw());
    // Messages stay; only the balance moved.
    assert_eq!(recipient.view().messages().len(), 1);
}

#[tokio::test]
async fn test_zero_withdraw_is_passed_to_the_ledger() {
    let ledger = InMemoryLedger::default();
    let mut s = connected(&ledger, bob()).await;
    assert!(!s.view().can_withdraw());

    // Ledger accepts as a no-op.
    let before = ledger.call_count();
    assert!(s.withdraw().await.is_ok());
    assert!(ledger.call_count() > before);

    // Ledger reverts; the revert comes back unchanged.
    ledger.set_revert_empty_withdrawals(true);
    assert_eq!(
        s.withdraw().await.unwrap_err(),
        ClientError::TransactionReverted(NOTHING_TO_WITHDRAW.to_string())
    );
}

#[tokio::test]
async fn test_failed_read_keeps_previous_snapshot() {
    let ledger = InMemoryLedger::default();
    let mut sender = connected(&ledger, alice()).await;
    fill_draft(&mut sender, bob(), "hi", "0.0005");
    sender.send_draft().await.unwrap();

    let mut recipient = connected(&ledger, bob()).await;
    let before: LedgerSnapshot = recipient.view().snapshot().clone();

    // New ledger state the failed refresh must not leak in.
    fill_draft(&mut sender, bob(), "again", "1");
    sender.send_draft().await.unwrap();

    ledger.set_fail_pending_reads(true);
    assert!(matches!(
        recipient.refresh().await,
        Err(ClientError::NetworkError(_))
    ));
    assert_eq!(recipient.view().snapshot(), &before);

    ledger.set_fail_pending_reads(false);
    ledger.set_fail_message_reads(true);
    assert!(matches!(
        recipient.refresh().await,
        Err(ClientError::ContractCallError(_))
    ));
    assert_eq!(recipient.view().snapshot(), &before);

    ledger.set_fail_message_reads(false);
    recipient.refresh().await.unwrap();
    assert_eq!(recipient.view().messages().len(), 2);
}

#[tokio::test]
async fn test_rejected_send_preserves_draft_and_view() {
    let ledger = InMemoryLedger::default();
    let mut s = connected(&ledger, alice()).await;
    fill_draft(&mut s, bob(), "hi", "0.0005");
    let draft = s.view().draft().clone();
    let snapshot = s.view().snapshot().clone();

    ledger.set_reject_transactions(true);
    assert!(matches!(
        s.send_draft().await,
        Err(ClientError::TransactionRejected(_))
    ));
    assert_eq!(s.view().draft(), &draft);
    assert_eq!(s.view().snapshot(), &snapshot);
    assert!(ledger.inbox_of(bob().address()).is_empty());
}

#[tokio::test]
async fn test_invalid_draft_never_reaches_ledger() {
    let ledger = InMemoryLedger::default();
    let mut s = connected(&ledger, alice()).await;
    let calls = ledger.call_count();

    fill_draft(&mut s, bob(), "hi", "-0.1");
    assert!(matches!(
        s.send_draft().await,
        Err(ClientError::InvalidAmount { .. })
    ));

    fill_draft(&mut s, bob(), "hi", "lots");
    assert!(matches!(
        s.send_draft().await,
        Err(ClientError::InvalidAmount { .. })
    ));

    s.draft_mut().recipient = "0x1234".to_string();
    s.draft_mut().amount = "1".to_string();
    assert!(matches!(
        s.send_draft().await,
        Err(ClientError::InvalidRecipient { .. })
    ));

    fill_draft(&mut s, bob(), "", "1");
    assert_eq!(s.send_draft().await.unwrap_err(), ClientError::EmptyMessage);

    assert_eq!(ledger.call_count(), calls);
    assert_eq!(s.view().draft().message, "");
    assert_eq!(s.view().draft().amount, "1");
}

#[tokio::test]
async fn test_access_denied_ends_in_error_without_ledger() {
    let ledger = InMemoryLedger::default();
    let mut s = session(&ledger, alice(), AccessResponse::Deny);

    assert_eq!(s.connect().await, Err(ClientError::AccessDenied));
    assert_eq!(s.state(), &SessionState::Error(ClientError::AccessDenied));
    assert!(s.ledger().is_none());
    assert!(s.identity().is_none());
    assert_eq!(s.view().snapshot(), &LedgerSnapshot::default());
    assert_eq!(ledger.call_count(), 0);
}

#[tokio::test]
async fn test_missing_agent_ends_in_error() {
    let ledger = InMemoryLedger::default();
    let mut s = session(&ledger, alice(), AccessResponse::Unavailable);

    assert!(matches!(
        s.connect().await,
        Err(ClientError::AgentUnavailable(_))
    ));
    assert!(matches!(
        s.state(),
        SessionState::Error(ClientError::AgentUnavailable(_))
    ));
    assert_eq!(ledger.call_count(), 0);
}

#[tokio::test]
async fn test_no_ledger_calls_before_connect() {
    let ledger = InMemoryLedger::default();
    let mut s = session(&ledger, alice(), AccessResponse::Grant);
    assert_eq!(s.state(), &SessionState::Disconnected);
    fill_draft(&mut s, bob(), "hi", "0.0005");

    assert_eq!(s.refresh().await, Err(ClientError::NotConnected));
    assert_eq!(s.send_draft().await.unwrap_err(), ClientError::NotConnected);
    assert_eq!(s.withdraw().await.unwrap_err(), ClientError::NotConnected);
    assert_eq!(ledger.call_count(), 0);

    // Same after a failed attempt.
    s.agent().respond_with(AccessResponse::Deny);
    assert!(s.connect().await.is_err());
    assert_eq!(s.refresh().await, Err(ClientError::NotConnected));
    assert_eq!(ledger.call_count(), 0);
}

#[tokio::test]
async fn test_connect_can_be_retried_after_error() {
    let ledger = InMemoryLedger::default();
    let mut s = session(&ledger, alice(), AccessResponse::Deny);
    assert!(s.connect().await.is_err());

    s.agent().respond_with(AccessResponse::Grant);
    s.connect().await.unwrap();
    assert_eq!(s.state(), &SessionState::Connected);
    assert_eq!(s.identity(), Some(&alice()));
    assert_eq!(
        s.ledger().map(|l| l.contract_address()),
        Some(ledger.address())
    );

    // Connecting again is a no-op.
    let calls = ledger.call_count();
    s.connect().await.unwrap();
    assert_eq!(ledger.call_count(), calls);
}

#[tokio::test]
async fn test_failed_initial_load_still_connects() {
    let ledger = InMemoryLedger::default();
    ledger.set_fail_message_reads(true);
    let mut s = session(&ledger, bob(), AccessResponse::Grant);

    assert!(matches!(
        s.connect().await,
        Err(ClientError::ContractCallError(_))
    ));
    assert_eq!(s.state(), &SessionState::Connected);
    assert_eq!(s.view().snapshot(), &LedgerSnapshot::default());

    ledger.set_fail_message_reads(false);
    s.refresh().await.unwrap();
}

#[tokio::test]
async fn test_wrong_contract_address_surfaces_call_error() {
    let ledger = InMemoryLedger::default();
    let mut s = SessionController::new(
        MockAgent::new(ledger.clone(), alice(), AccessResponse::Grant),
        LedgerConfig {
            contract_address: Address::with_last_byte(1),
            ..LedgerConfig::default()
        },
    );
    assert!(matches!(
        s.connect().await,
        Err(ClientError::ContractCallError(_))
    ));
}

#[tokio::test]
async fn test_account_switch_while_connecting_is_refused() {
    let ledger = InMemoryLedger::default();
    let mut s = session(&ledger, alice(), AccessResponse::Grant);
    s.agent().switch_account_on_signer(bob());

    assert!(matches!(
        s.connect().await,
        Err(ClientError::AgentUnavailable(_))
    ));
    assert!(matches!(s.state(), SessionState::Error(_)));
    assert!(s.ledger().is_none());
    assert!(s.identity().is_none());
    assert_eq!(ledger.call_count(), 0);

    // The agent now reports one account consistently.
    s.connect().await.unwrap();
    assert_eq!(s.identity(), Some(&bob()));
    assert_eq!(s.ledger().map(|l| l.identity()), Some(bob()));
}
