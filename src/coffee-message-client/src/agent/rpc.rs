//! JSON-RPC backed signing agents.
//!
//! - [`WalletRpcAgent`]: an EIP-1193 style wallet (`eth_requestAccounts`, `eth_sendTransaction`).
//!   The wallet owns the key and may prompt the user on every request.
//! - [`LocalKeyAgent`]: a key held in-process that signs locally and broadcasts through a node.
//!
//! Both hand out an [`RpcSigner`] that maps `ethers` errors onto [`ClientError`].

use std::sync::Arc;

use alloy_primitives::hex;
use alloy_sol_types::{Revert, SolError};
use async_trait::async_trait;
use coffee_message_types::{Address, B256, U256};
use ethers::{
    middleware::SignerMiddleware,
    providers::{
        Http, JsonRpcClient, JsonRpcError, Middleware, MiddlewareError, Provider, RpcError,
    },
    signers::{LocalWallet, Signer},
    types::{
        transaction::eip2718::TypedTransaction, TransactionReceipt, TransactionRequest, H160,
        U256 as RpcU256, U64,
    },
};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::{Identity, LedgerSigner, SigningAgent, TxReceipt};
use crate::{config::AgentConfig, errors::ClientError};

/// EIP-1193 `userRejectedRequest`.
const USER_REJECTED_REQUEST: i64 = 4001;
/// Geth / EIP-1474 code for `execution reverted`.
const EXECUTION_REVERTED: i64 = 3;

/// Which boundary call failed; decides how an RPC error is reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Phase {
    Access,
    Read,
    Submit,
}

/// Map an RPC failure onto the client taxonomy.
///
/// `response` is the JSON-RPC error object when the remote side answered; `None` means the
/// request never got an answer (transport failure).
pub(crate) fn classify(
    phase: Phase,
    response: Option<&JsonRpcError>,
    detail: String,
) -> ClientError {
    let Some(response) = response else {
        return match phase {
            Phase::Access => ClientError::AgentUnavailable(detail),
            Phase::Read | Phase::Submit => ClientError::NetworkError(detail),
        };
    };

    match phase {
        Phase::Access if response.code == USER_REJECTED_REQUEST => ClientError::AccessDenied,
        Phase::Access => ClientError::AgentUnavailable(response.message.clone()),
        Phase::Submit if response.code == USER_REJECTED_REQUEST => {
            ClientError::TransactionRejected(response.message.clone())
        }
        // Reverts surface at gas estimation; any other refusal (funds, nonce) is the ledger's
        // network declining the call.
        Phase::Submit => ClientError::TransactionReverted(revert_reason(response)),
        Phase::Read if is_revert(response) => {
            ClientError::ContractCallError(revert_reason(response))
        }
        Phase::Read => ClientError::ContractCallError(response.message.clone()),
    }
}

fn is_revert(response: &JsonRpcError) -> bool {
    response.code == EXECUTION_REVERTED || response.message.to_ascii_lowercase().contains("revert")
}

/// Decoded `Error(string)` reason when the node returned revert data, the raw message otherwise.
fn revert_reason(response: &JsonRpcError) -> String {
    response
        .data
        .as_ref()
        .and_then(|data| data.as_str())
        .and_then(|raw| hex::decode(raw).ok())
        .and_then(|bytes| Revert::abi_decode(&bytes, true).ok())
        .map(|revert| revert.reason)
        .unwrap_or_else(|| response.message.clone())
}

fn to_h160(address: Address) -> H160 {
    H160::from_slice(address.as_slice())
}

fn from_h160(address: H160) -> Address {
    Address::from_slice(address.as_bytes())
}

fn to_rpc_u256(value: U256) -> RpcU256 {
    RpcU256::from_big_endian(&value.to_be_bytes::<32>())
}

/// Confirmation for `tx_hash` from the receipt the node reported, if any.
fn settle(tx_hash: B256, receipt: Option<TransactionReceipt>) -> Result<TxReceipt, ClientError> {
    let receipt = receipt.ok_or_else(|| {
        ClientError::NetworkError(format!("transaction {tx_hash} dropped before confirmation"))
    })?;
    if receipt.status == Some(U64::zero()) {
        return Err(ClientError::TransactionReverted(format!(
            "transaction {tx_hash} failed on-chain"
        )));
    }
    Ok(TxReceipt {
        tx_hash,
        block_number: receipt.block_number.map(|block| block.as_u64()),
    })
}

fn http_provider(rpc_url: &str) -> Result<Provider<Http>, ClientError> {
    Provider::<Http>::try_from(rpc_url)
        .map_err(|e| ClientError::Config(format!("invalid rpc url {rpc_url}: {e}")))
}

/// [`LedgerSigner`] over any `ethers` middleware stack.
#[derive(Debug)]
pub struct RpcSigner<M> {
    middleware: Arc<M>,
    identity: Identity,
    confirmations: usize,
}

impl<M> RpcSigner<M> {
    pub fn new(middleware: Arc<M>, identity: Identity, confirmations: usize) -> Self {
        Self {
            middleware,
            identity,
            confirmations,
        }
    }

    fn request(&self, to: Address, calldata: Vec<u8>) -> TransactionRequest {
        TransactionRequest::new()
            .from(to_h160(self.identity.address()))
            .to(to_h160(to))
            .data(calldata)
    }
}

#[async_trait]
impl<M> LedgerSigner for RpcSigner<M>
where
    M: Middleware + 'static,
{
    fn identity(&self) -> Identity {
        self.identity
    }

    async fn call(&self, to: Address, calldata: Vec<u8>) -> Result<Vec<u8>, ClientError> {
        let tx: TypedTransaction = self.request(to, calldata).into();
        let out = self.middleware.call(&tx, None).await.map_err(|e| {
            classify(
                Phase::Read,
                MiddlewareError::as_error_response(&e),
                e.to_string(),
            )
        })?;
        Ok(out.to_vec())
    }

    async fn send_transaction(
        &self,
        to: Address,
        calldata: Vec<u8>,
        value: U256,
    ) -> Result<TxReceipt, ClientError> {
        let tx = self.request(to, calldata).value(to_rpc_u256(value));
        let pending = self
            .middleware
            .send_transaction(tx, None)
            .await
            .map_err(|e| {
                classify(
                    Phase::Submit,
                    MiddlewareError::as_error_response(&e),
                    e.to_string(),
                )
            })?;

        let tx_hash = B256::from_slice(pending.tx_hash().as_bytes());
        debug!(%tx_hash, confirmations = self.confirmations, "awaiting confirmation");

        let receipt = pending
            .confirmations(self.confirmations)
            .await
            .map_err(|e| classify(Phase::Submit, RpcError::as_error_response(&e), e.to_string()))?;

        let confirmed = settle(tx_hash, receipt)?;
        info!(%tx_hash, block_number = ?confirmed.block_number, "transaction confirmed");
        Ok(confirmed)
    }
}

/// Wallet reached over JSON-RPC; signs with `eth_sendTransaction`.
#[derive(Debug)]
pub struct WalletRpcAgent<P = Http> {
    provider: Arc<Provider<P>>,
    confirmations: usize,
}

impl WalletRpcAgent<Http> {
    pub fn new(rpc_url: &str, confirmations: usize) -> Result<Self, ClientError> {
        Ok(Self::with_provider(http_provider(rpc_url)?, confirmations))
    }
}

impl<P: JsonRpcClient> WalletRpcAgent<P> {
    pub fn with_provider(provider: Provider<P>, confirmations: usize) -> Self {
        Self {
            provider: Arc::new(provider),
            confirmations,
        }
    }
}

#[async_trait]
impl<P> SigningAgent for WalletRpcAgent<P>
where
    P: JsonRpcClient + 'static,
{
    async fn request_access(&self) -> Result<(), ClientError> {
        let accounts: Vec<H160> = self
            .provider
            .request("eth_requestAccounts", ())
            .await
            .map_err(|e| classify(Phase::Access, RpcError::as_error_response(&e), e.to_string()))?;
        if accounts.is_empty() {
            return Err(ClientError::AccessDenied);
        }
        Ok(())
    }

    async fn active_identity(&self) -> Result<Identity, ClientError> {
        let accounts = self
            .provider
            .get_accounts()
            .await
            .map_err(|e| classify(Phase::Access, RpcError::as_error_response(&e), e.to_string()))?;
        accounts
            .first()
            .map(|account| Identity::new(from_h160(*account)))
            .ok_or(ClientError::AccessDenied)
    }

    async fn signer(&self) -> Result<Arc<dyn LedgerSigner>, ClientError> {
        let identity = self.active_identity().await?;
        Ok(Arc::new(RpcSigner::new(
            Arc::clone(&self.provider),
            identity,
            self.confirmations,
        )))
    }
}

/// In-process key; signs locally and broadcasts raw transactions.
pub struct LocalKeyAgent {
    provider: Provider<Http>,
    wallet: LocalWallet,
    confirmations: usize,
    chain_id: OnceCell<u64>,
}

impl LocalKeyAgent {
    pub fn new(rpc_url: &str, private_key: &str, confirmations: usize) -> Result<Self, ClientError> {
        let wallet = private_key
            .trim()
            .trim_start_matches("0x")
            .parse::<LocalWallet>()
            .map_err(|e| ClientError::Config(format!("invalid private key: {e}")))?;
        Ok(Self {
            provider: http_provider(rpc_url)?,
            wallet,
            confirmations,
            chain_id: OnceCell::new(),
        })
    }

    /// Chain id of the node; doubles as the reachability check for `request_access`.
    async fn chain_id(&self) -> Result<u64, ClientError> {
        self.chain_id
            .get_or_try_init(|| async {
                let id = self.provider.get_chainid().await.map_err(|e| {
                    ClientError::AgentUnavailable(format!("rpc node unreachable: {e}"))
                })?;
                Ok(id.as_u64())
            })
            .await
            .copied()
    }
}

#[async_trait]
impl SigningAgent for LocalKeyAgent {
    async fn request_access(&self) -> Result<(), ClientError> {
        let chain_id = self.chain_id().await?;
        debug!(chain_id, "local key agent ready");
        Ok(())
    }

    async fn active_identity(&self) -> Result<Identity, ClientError> {
        Ok(Identity::new(from_h160(self.wallet.address())))
    }

    async fn signer(&self) -> Result<Arc<dyn LedgerSigner>, ClientError> {
        let chain_id = self.chain_id().await?;
        let identity = self.active_identity().await?;
        let wallet = self.wallet.clone().with_chain_id(chain_id);
        let middleware = SignerMiddleware::new(self.provider.clone(), wallet);
        Ok(Arc::new(RpcSigner::new(
            Arc::new(middleware),
            identity,
            self.confirmations,
        )))
    }
}

/// Agent selected from [`AgentConfig`]: a local key when one is configured, the wallet otherwise.
pub enum ConfiguredAgent {
    Wallet(WalletRpcAgent),
    LocalKey(LocalKeyAgent),
}

impl ConfiguredAgent {
    pub fn from_config(config: &AgentConfig, confirmations: usize) -> Result<Self, ClientError> {
        match config.private_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(Self::LocalKey(LocalKeyAgent::new(
                &config.rpc_url,
                key,
                confirmations,
            )?)),
            _ => Ok(Self::Wallet(WalletRpcAgent::new(
                &config.rpc_url,
                confirmations,
            )?)),
        }
    }
}

#[async_trait]
impl SigningAgent for ConfiguredAgent {
    async fn request_access(&self) -> Result<(), ClientError> {
        match self {
            Self::Wallet(agent) => agent.request_access().await,
            Self::LocalKey(agent) => agent.request_access().await,
        }
    }

    async fn active_identity(&self) -> Result<Identity, ClientError> {
        match self {
            Self::Wallet(agent) => agent.active_identity().await,
            Self::LocalKey(agent) => agent.active_identity().await,
        }
    }

    async fn signer(&self) -> Result<Arc<dyn LedgerSigner>, ClientError> {
        match self {
            Self::Wallet(agent) => agent.signer().await,
            Self::LocalKey(agent) => agent.signer().await,
        }
    }
}
