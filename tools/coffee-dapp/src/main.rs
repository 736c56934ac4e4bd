use anyhow::{Context, Result};
use clap::Parser;
use coffee_message_client::{
    AgentConfig, ConfiguredAgent, LedgerConfig, MutationOutcome, SessionController, SessionState,
    SigningAgent, DEFAULT_CONTRACT_ADDRESS,
};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Send messages with a coffee attached, and withdraw the coffee others sent you.
///
/// Talks to the `MessageStore` ledger through a signing agent: the wallet behind `--rpc-url`, or a
/// local key when `--private-key` / `PKEY` is set.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// JSON-RPC endpoint of the wallet (or of the node, when signing with a local key).
    #[arg(long, env = "RPC_URL", default_value = "http://127.0.0.1:8545")]
    rpc_url: String,

    /// `MessageStore` contract address.
    #[arg(long, env = "CONTRACT_ADDRESS", default_value_t = DEFAULT_CONTRACT_ADDRESS)]
    contract_address: coffee_message_client::Address,

    /// Private key (hex string, 0x...). Without it the wallet signs.
    #[arg(long, env = "PKEY", hide_env_values = true)]
    private_key: Option<String>,

    /// Confirmations to wait for before a transaction counts as done.
    #[arg(long, env = "CONFIRMATIONS", default_value_t = 1)]
    confirmations: usize,
}

type Input = Lines<BufReader<Stdin>>;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("coffee_message_client=info,coffee_dapp=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ledger_config = LedgerConfig {
        contract_address: cli.contract_address,
        confirmations: cli.confirmations,
    };
    info!(
        rpc_url = %cli.rpc_url,
        contract = %ledger_config.contract_address,
        local_key = cli.private_key.is_some(),
        "starting coffee dapp"
    );
    let agent_config = AgentConfig {
        rpc_url: cli.rpc_url,
        private_key: cli.private_key,
    };
    let agent = ConfiguredAgent::from_config(&agent_config, ledger_config.confirmations)
        .context("failed to set up signing agent")?;

    let mut session = SessionController::new(agent, ledger_config);
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    println!("Coffee Message DApp");
    if let Err(e) = session.connect().await {
        println!("! {e}");
    }

    loop {
        render(&session);
        let Some(choice) = prompt(&mut input, &menu(&session)).await? else {
            break;
        };

        let connected = session.is_connected();
        match (connected, choice.as_str()) {
            (_, "q") => break,
            (true, "s") => {
                if edit_draft(&mut session, &mut input).await? {
                    report(session.send_draft().await, "Message sent with coffee");
                }
            }
            (true, "w") if session.view().can_withdraw() => {
                report(session.withdraw().await, "Coffee withdrawn");
            }
            (true, "r") => {
                if let Err(e) = session.refresh().await {
                    println!("! {e}");
                }
            }
            (true, _) => println!("? unknown choice {choice:?}"),
            (false, "c") => {
                if let Err(e) = session.connect().await {
                    println!("! {e}");
                }
            }
            _ => println!("? unknown choice {choice:?}"),
        }
    }

    Ok(())
}

fn menu<A: SigningAgent>(session: &SessionController<A>) -> String {
    if !session.is_connected() {
        return "[c]onnect  [q]uit".to_string();
    }
    if session.view().can_withdraw() {
        "[s]end  [w]ithdraw  [r]efresh  [q]uit".to_string()
    } else {
        "[s]end  [r]efresh  [q]uit".to_string()
    }
}

fn render<A: SigningAgent>(session: &SessionController<A>) {
    println!();
    let Some(identity) = session.identity() else {
        match session.state() {
            SessionState::Error(e) => println!("Please connect your wallet ({e})"),
            _ => println!("Please connect your wallet"),
        }
        return;
    };

    let view = session.view();
    println!("Connected account: {identity}");

    println!("\nMy Received Messages");
    if view.messages().is_empty() {
        println!("  (none)");
    }
    for message in view.messages() {
        println!("  {message}");
    }

    println!("\nYour pending withdrawal: {} ETH", view.pending_withdrawal_display());
    if !view.can_withdraw() {
        println!("No funds available to withdraw.");
    }
}

/// Walk the send form. Empty input keeps the current field value. Returns `false` on EOF.
async fn edit_draft<A: SigningAgent>(
    session: &mut SessionController<A>,
    input: &mut Input,
) -> Result<bool> {
    let current = session.view().draft().clone();
    let fields = [
        ("Recipient address", current.recipient),
        ("Message", current.message),
        ("Coffee amount in ETH", current.amount),
    ];

    let mut values = Vec::with_capacity(fields.len());
    for (label, value) in fields {
        let Some(line) = prompt(input, &format!("{label} [{value}]")).await? else {
            return Ok(false);
        };
        values.push(if line.is_empty() { value } else { line });
    }

    let draft = session.draft_mut();
    draft.amount = values.pop().unwrap_or_default();
    draft.message = values.pop().unwrap_or_default();
    draft.recipient = values.pop().unwrap_or_default();
    Ok(true)
}

fn report(result: Result<MutationOutcome, coffee_message_client::ClientError>, done: &str) {
    match result {
        Ok(outcome) => {
            println!("{done} (tx {})", outcome.receipt.tx_hash);
            if let Err(e) = outcome.refresh {
                println!("! view not refreshed: {e}");
            }
        }
        Err(e) => println!("! {e}"),
    }
}

async fn prompt(input: &mut Input, label: &str) -> Result<Option<String>> {
    println!("{label} > ");
    let line = input.next_line().await.context("failed reading stdin")?;
    Ok(line.map(|l| l.trim().to_string()))
}
