//! Wallet provider over JSON-RPC/HTTP.
//!
//! Talks to a wallet (or a signing node) exposing the EIP-1193 methods on an
//! HTTP endpoint. Change notifications are derived by polling `eth_accounts`
//! and `eth_chainId`.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use haki_types::{parse_address, Address, ChainId, NetworkParams};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::rpc::{RpcClient, RpcFailure};
use crate::ports::{codes, WalletError, WalletEvent, WalletProvider};

/// Connection settings for [`JsonRpcWallet`].
#[derive(Debug, Clone)]
pub struct JsonRpcWalletConfig {
    pub url: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
}

impl Default for JsonRpcWalletConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8545".to_string(),
            poll_interval: Duration::from_secs(1),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl JsonRpcWalletConfig {
    /// `HAKI_WALLET_RPC_URL`, `HAKI_WALLET_POLL_MS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = env::var("HAKI_WALLET_RPC_URL") {
            config.url = url;
        }
        if let Some(ms) = env::var("HAKI_WALLET_POLL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
        {
            config.poll_interval = Duration::from_millis(ms);
        }
        config
    }
}

#[derive(Default)]
struct Observed {
    accounts: Option<Vec<Address>>,
    chain: Option<ChainId>,
}

/// HTTP JSON-RPC wallet.
pub struct JsonRpcWallet {
    rpc: RpcClient,
    config: JsonRpcWalletConfig,
    events: broadcast::Sender<WalletEvent>,
    observed: Mutex<Observed>,
}

impl JsonRpcWallet {
    pub fn new(config: JsonRpcWalletConfig) -> Result<Self, WalletError> {
        let rpc = RpcClient::new(config.url.clone(), config.request_timeout)
            .map_err(|e| WalletError::Unavailable(e.to_string()))?;
        let (events, _) = broadcast::channel(64);

        Ok(Self {
            rpc,
            config,
            events,
            observed: Mutex::new(Observed::default()),
        })
    }

    async fn call<R: DeserializeOwned>(&self, method: &str, params: Value) -> Result<R, WalletError> {
        self.rpc.call(method, params).await.map_err(|failure| match failure {
            RpcFailure::Transport(message) => WalletError::Unavailable(message),
            RpcFailure::Remote { code, message, .. } => WalletError::from_rpc(code, message),
            RpcFailure::Result(message) => WalletError::Rpc {
                code: -32603,
                message,
            },
        })
    }

    async fn accounts(&self, method: &str) -> Result<Vec<Address>, WalletError> {
        let raw: Vec<String> = self.call(method, json!([])).await?;
        raw.iter()
            .map(|a| {
                parse_address(a).ok_or_else(|| WalletError::Rpc {
                    code: -32603,
                    message: format!("invalid account {:?}", a),
                })
            })
            .collect()
    }

    /// Poll once and broadcast any change since the previous poll.
    pub async fn poll_changes(&self) -> Result<(), WalletError> {
        let accounts = self.accounts("eth_accounts").await?;
        let chain = self.chain_id().await?;

        let mut changes = Vec::new();
        {
            let mut observed = self.observed.lock();
            if observed.accounts.as_ref().is_some_and(|prev| *prev != accounts) {
                changes.push(WalletEvent::AccountsChanged(accounts.clone()));
            }
            if observed.chain.is_some_and(|prev| prev != chain) {
                changes.push(WalletEvent::ChainChanged(chain));
            }
            observed.accounts = Some(accounts);
            observed.chain = Some(chain);
        }

        for change in changes {
            debug!(?change, "Wallet change detected");
            let _ = self.events.send(change);
        }
        Ok(())
    }

    /// Spawn the change poller. Abort the handle to stop it.
    pub fn spawn_change_poller(self: &Arc<Self>) -> JoinHandle<()> {
        let wallet = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(wallet.config.poll_interval);
            loop {
                ticker.tick().await;
                if let Err(e) = wallet.poll_changes().await {
                    warn!(error = %e, "Wallet poll failed");
                }
            }
        })
    }
}

#[async_trait]
impl WalletProvider for JsonRpcWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        let accounts = self.accounts("eth_requestAccounts").await?;
        self.observed.lock().accounts = Some(accounts.clone());
        Ok(accounts)
    }

    async fn chain_id(&self) -> Result<ChainId, WalletError> {
        let raw: String = self.call("eth_chainId", json!([])).await?;
        raw.parse().map_err(|_| WalletError::Rpc {
            code: -32603,
            message: format!("invalid chain id {:?}", raw),
        })
    }

    async fn switch_chain(&self, chain: ChainId) -> Result<(), WalletError> {
        let result: Result<Value, _> = self
            .call(
                "wallet_switchEthereumChain",
                json!([{ "chainId": chain.to_hex() }]),
            )
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(WalletError::Rpc {
                code: codes::UNRECOGNIZED_CHAIN,
                ..
            }) => Err(WalletError::UnrecognizedChain(chain)),
            Err(e) => Err(e),
        }
    }

    async fn add_chain(&self, params: &NetworkParams) -> Result<(), WalletError> {
        let _: Value = self
            .call("wallet_addEthereumChain", json!([params]))
            .await?;
        Ok(())
    }

    fn events(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}
