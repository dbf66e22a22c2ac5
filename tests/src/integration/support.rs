//! Shared fixtures.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{extract::Path, http::StatusCode, routing::get, Json, Router};
use haki_pin_gateway::{build_router, AppState, Credentials, GatewayConfig, InMemoryPinService};
use haki_session::adapters::{InMemoryChain, InMemoryWallet};
use haki_session::{
    ContractHandles, ContractResult, ContractTopic, EventSource, Listener, ListenerId, Registry,
    SessionConfig, SessionContext, SessionManager, WalletProvider,
};
use haki_sync::PinningConfig;
use haki_types::{
    Address, Amount, Application, Bounty, BountyId, ChainId, Hash, IdentityRecord, Milestone,
    RoleId, RoleTag, TxHash,
};
use parking_lot::Mutex;
use serde_json::Value;

pub fn ngo() -> Address {
    Address::repeat_byte(0x0A)
}

pub fn donor() -> Address {
    Address::repeat_byte(0x0D)
}

pub fn lawyer() -> Address {
    Address::repeat_byte(0x1A)
}

pub fn steward() -> Address {
    Address::repeat_byte(0x5E)
}

/// Session manager over `chain` driven by `wallet`.
pub fn session_manager(chain: &InMemoryChain, wallet: InMemoryWallet) -> (Arc<InMemoryWallet>, Arc<SessionManager>) {
    let wallet = Arc::new(wallet);
    let config = SessionConfig {
        contracts: chain.addresses(),
        ..SessionConfig::default()
    };
    let manager = Arc::new(SessionManager::new(
        config,
        Some(wallet.clone() as Arc<dyn WalletProvider>),
        Arc::new(chain.clone()),
    ));
    (wallet, manager)
}

/// Grant `roles` to `account` and connect it on the target chain.
pub async fn connect_as(chain: &InMemoryChain, account: Address, roles: &[RoleTag]) -> SessionContext {
    for role in roles {
        chain.grant_role(*role, account);
    }
    let wallet = InMemoryWallet::new(ChainId::SEPOLIA).with_accounts(vec![account]);
    let (_, manager) = session_manager(chain, wallet);
    manager
        .connect()
        .await
        .unwrap_or_else(|e| panic!("connect as {:?} failed: {}", account, e))
}

/// Registry whose bounty listing is held back after it has been read, one
/// queued delay per call. Everything else passes straight through.
pub struct DelayedListing {
    inner: Arc<dyn Registry>,
    delays: Mutex<VecDeque<Duration>>,
}

impl DelayedListing {
    pub fn wrap(handles: &ContractHandles, delays: impl IntoIterator<Item = Duration>) -> ContractHandles {
        let registry = Arc::new(Self {
            inner: Arc::clone(&handles.registry),
            delays: Mutex::new(delays.into_iter().collect()),
        });
        ContractHandles {
            registry,
            ..handles.clone()
        }
    }
}

impl EventSource for DelayedListing {
    fn on(&self, topic: ContractTopic, listener: Listener) -> ListenerId {
        self.inner.on(topic, listener)
    }

    fn off(&self, topic: ContractTopic, id: ListenerId) -> bool {
        self.inner.off(topic, id)
    }

    fn listener_count(&self) -> usize {
        self.inner.listener_count()
    }
}

#[async_trait]
impl Registry for DelayedListing {
    async fn has_role(&self, role: RoleId, account: Address) -> ContractResult<bool> {
        self.inner.has_role(role, account).await
    }

    async fn get_all_bounties(&self) -> ContractResult<Vec<Bounty>> {
        let listing = self.inner.get_all_bounties().await;
        let delay = self.delays.lock().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        listing
    }

    async fn get_all_milestones(&self, bounty: BountyId) -> ContractResult<Vec<Milestone>> {
        self.inner.get_all_milestones(bounty).await
    }

    async fn get_applications(&self, bounty: BountyId) -> ContractResult<Vec<Application>> {
        self.inner.get_applications(bounty).await
    }

    async fn get_lawyer_identity(&self, account: Address) -> ContractResult<IdentityRecord> {
        self.inner.get_lawyer_identity(account).await
    }

    async fn get_ngo_identity(&self, account: Address) -> ContractResult<IdentityRecord> {
        self.inner.get_ngo_identity(account).await
    }

    async fn register_donor(&self, cid: &str, payload_hash: Hash) -> ContractResult<TxHash> {
        self.inner.register_donor(cid, payload_hash).await
    }

    async fn register_ngo(&self, cid: &str, payload_hash: Hash) -> ContractResult<TxHash> {
        self.inner.register_ngo(cid, payload_hash).await
    }

    async fn register_lawyer(&self, cid: &str, payload_hash: Hash) -> ContractResult<TxHash> {
        self.inner.register_lawyer(cid, payload_hash).await
    }

    async fn create_bounty(&self, milestone_amounts: &[Amount]) -> ContractResult<TxHash> {
        self.inner.create_bounty(milestone_amounts).await
    }

    async fn approve_milestone(&self, bounty: BountyId, index: u32) -> ContractResult<TxHash> {
        self.inner.approve_milestone(bounty, index).await
    }

    async fn apply_for_bounty(
        &self,
        bounty: BountyId,
        proposal_uri: &str,
        proposal_hash: Hash,
    ) -> ContractResult<TxHash> {
        self.inner.apply_for_bounty(bounty, proposal_uri, proposal_hash).await
    }

    async fn set_escrow(&self, escrow: Address) -> ContractResult<TxHash> {
        self.inner.set_escrow(escrow).await
    }
}

/// Pin gateway plus a read-only IPFS gateway over the same in-memory store,
/// served on an ephemeral local port.
pub struct PinStack {
    pub addr: SocketAddr,
    pub service: Arc<InMemoryPinService>,
}

impl PinStack {
    pub async fn spawn(credentials: Option<Credentials>) -> Self {
        let service = Arc::new(InMemoryPinService::new());
        let gateway = build_router(
            &GatewayConfig::default(),
            AppState {
                pinner: service.clone(),
                credentials,
            },
        );

        let store = Arc::clone(&service);
        let ipfs = Router::new().route(
            "/ipfs/:cid",
            get(move |Path(cid): Path<String>| {
                let store = Arc::clone(&store);
                async move { lookup(&store, &cid).map(Json).ok_or(StatusCode::NOT_FOUND) }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = gateway.merge(ipfs);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { addr, service }
    }

    pub fn pin_endpoint(&self) -> String {
        format!("http://{}/api/pin-lsk", self.addr)
    }

    /// Client configuration pointing at this stack.
    pub fn pinning_config(&self) -> PinningConfig {
        PinningConfig {
            pin_endpoint: self.pin_endpoint(),
            gateway_url: format!("http://{}/ipfs", self.addr),
            ..PinningConfig::default()
        }
    }
}

fn lookup(store: &InMemoryPinService, cid: &str) -> Option<Value> {
    let n: usize = cid.strip_prefix("QmMemory")?.parse().ok()?;
    store.documents().get(n.checked_sub(1)?).cloned()
}
