//! Registry, escrow and token over JSON-RPC/HTTP.
//!
//! Reads go through `eth_call`, writes through `eth_sendTransaction` from
//! the bound signer (the endpoint is expected to be the signing wallet or a
//! node holding the key), confirmation polls `eth_getTransactionReceipt`,
//! and change notifications are derived by polling `eth_getLogs` while at
//! least one listener is installed.

use std::collections::BTreeMap;
use std::env;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use haki_types::{
    Address, Amount, Application, Bounty, BountyId, ChainId, ContractError, Hash, IdentityRecord,
    Milestone, RoleId, TxHash, H256,
};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::abi::{encode_call, event_topic, AbiValue, Decoder};
use super::rpc::{RpcClient, RpcFailure};
use crate::domain::ContractAddresses;
use crate::ports::{
    codes, ContractConnector, ContractEvent, ContractHandles, ContractResult, ContractTopic,
    Escrow, EventSource, Listener, ListenerId, Registry, Token, TxConfirmer, TxReceipt,
};

/// JSON-RPC error code nodes use for reverted calls.
const EXECUTION_REVERTED: i64 = 3;

/// Connection settings for [`JsonRpcConnector`].
#[derive(Debug, Clone)]
pub struct JsonRpcContractsConfig {
    pub url: String,
    /// Interval for receipt and log polling.
    pub poll_interval: Duration,
    /// How long [`TxConfirmer::wait`] polls before giving up.
    pub receipt_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for JsonRpcContractsConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8545".to_string(),
            poll_interval: Duration::from_secs(2),
            receipt_timeout: Duration::from_secs(300),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl JsonRpcContractsConfig {
    /// `HAKI_WALLET_RPC_URL` (the signer), `HAKI_CONTRACT_POLL_MS`,
    /// `HAKI_RECEIPT_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = env::var("HAKI_WALLET_RPC_URL") {
            config.url = url;
        }
        if let Some(ms) = positive_var("HAKI_CONTRACT_POLL_MS") {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = positive_var("HAKI_RECEIPT_TIMEOUT_SECS") {
            config.receipt_timeout = Duration::from_secs(secs);
        }
        config
    }
}

fn positive_var(name: &str) -> Option<u64> {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|v| *v > 0)
}

/// Solidity event signature behind each change topic.
fn event_signature(topic: ContractTopic) -> &'static str {
    match topic {
        ContractTopic::BountyCreated => "BountyCreated(uint256,address)",
        ContractTopic::BountyUpdated => "BountyUpdated(uint256)",
        ContractTopic::MilestoneApproved => "MilestoneApproved(uint256,uint256)",
        ContractTopic::DonationReceived => "DonationReceived(uint256,address,uint256)",
    }
}

fn contract_error(failure: RpcFailure) -> ContractError {
    match failure {
        RpcFailure::Remote {
            code,
            message,
            data,
        } if code == EXECUTION_REVERTED || message.contains("revert") => match data {
            Some(serde_json::Value::String(data)) => {
                ContractError::Reverted(format!("{} ({})", message, data))
            }
            _ => ContractError::Reverted(message),
        },
        RpcFailure::Remote { code, message, .. } if code == codes::USER_REJECTED => {
            ContractError::Rpc(format!("user rejected the transaction: {}", message))
        }
        RpcFailure::Remote { code, message, .. } => {
            ContractError::Rpc(format!("RPC error {}: {}", code, message))
        }
        RpcFailure::Transport(message) => ContractError::Rpc(message),
        RpcFailure::Result(message) => ContractError::Decode(message),
    }
}

fn decode_hex(text: &str) -> ContractResult<Vec<u8>> {
    let digits = text.strip_prefix("0x").unwrap_or(text);
    hex::decode(digits).map_err(|e| ContractError::Decode(format!("invalid hex {:?}: {}", text, e)))
}

fn decode_quantity(text: &str) -> ContractResult<u64> {
    let digits = text.strip_prefix("0x").unwrap_or(text);
    u64::from_str_radix(digits, 16)
        .map_err(|e| ContractError::Decode(format!("invalid quantity {:?}: {}", text, e)))
}

fn decode_hash(text: &str) -> ContractResult<H256> {
    let bytes = decode_hex(text)?;
    if bytes.len() != 32 {
        return Err(ContractError::Decode(format!("expected 32-byte hash, got {:?}", text)));
    }
    Ok(H256::from_slice(&bytes))
}

fn decode_address(text: &str) -> ContractResult<Address> {
    let bytes = decode_hex(text)?;
    if bytes.len() != 20 {
        return Err(ContractError::Decode(format!("expected 20-byte address, got {:?}", text)));
    }
    Ok(Address::from_slice(&bytes))
}

fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

fn index_of(position: usize) -> ContractResult<u32> {
    u32::try_from(position).map_err(|_| ContractError::Decode(format!("index {} too large", position)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: String,
    block_number: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawLog {
    address: String,
    topics: Vec<String>,
    data: String,
}

/// Builds [`JsonRpcContracts`] handles on one endpoint.
pub struct JsonRpcConnector {
    rpc: Arc<RpcClient>,
    config: JsonRpcContractsConfig,
}

impl JsonRpcConnector {
    pub fn new(config: JsonRpcContractsConfig) -> ContractResult<Self> {
        let rpc = RpcClient::new(config.url.clone(), config.request_timeout)
            .map_err(|e| ContractError::Rpc(e.to_string()))?;
        Ok(Self {
            rpc: Arc::new(rpc),
            config,
        })
    }
}

#[async_trait]
impl ContractConnector for JsonRpcConnector {
    async fn connect(
        &self,
        addresses: &ContractAddresses,
        signer: Address,
        chain: ChainId,
    ) -> ContractResult<ContractHandles> {
        let raw: String = self
            .rpc
            .call("eth_chainId", json!([]))
            .await
            .map_err(contract_error)?;
        let node_chain: ChainId = raw
            .parse()
            .map_err(|_| ContractError::Decode(format!("invalid chain id {:?}", raw)))?;
        if node_chain != chain {
            return Err(ContractError::Rpc(format!(
                "endpoint {} is on chain {}, session expects {}",
                self.rpc.url(),
                node_chain,
                chain
            )));
        }

        debug!(signer = ?signer, chain = %chain, "Binding JSON-RPC contract handles");
        let contracts = Arc::new(JsonRpcContracts {
            inner: Arc::new(ContractsInner {
                rpc: Arc::clone(&self.rpc),
                config: self.config.clone(),
                addresses: *addresses,
                signer,
                listeners: Mutex::new(BTreeMap::new()),
                next_listener: AtomicU64::new(1),
                last_block: Mutex::new(None),
                poller: Mutex::new(None),
            }),
        });

        Ok(ContractHandles {
            signer,
            chain_id: chain,
            addresses: *addresses,
            registry: contracts.clone(),
            escrow: contracts.clone(),
            token: contracts.clone(),
            confirmer: contracts,
        })
    }
}

struct ContractsInner {
    rpc: Arc<RpcClient>,
    config: JsonRpcContractsConfig,
    addresses: ContractAddresses,
    signer: Address,
    listeners: Mutex<BTreeMap<ListenerId, (ContractTopic, Listener)>>,
    next_listener: AtomicU64,
    /// Last block whose logs were delivered.
    last_block: Mutex<Option<u64>>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

/// Registry, escrow, token and confirmer bound to one signer.
pub struct JsonRpcContracts {
    inner: Arc<ContractsInner>,
}

impl Drop for JsonRpcContracts {
    fn drop(&mut self) {
        if let Some(poller) = self.inner.poller.lock().take() {
            poller.abort();
        }
    }
}

impl JsonRpcContracts {
    async fn read(&self, to: Address, signature: &str, args: &[AbiValue]) -> ContractResult<Vec<u8>> {
        let call = json!({
            "from": self.inner.signer,
            "to": to,
            "data": to_hex(&encode_call(signature, args)),
        });
        let raw: String = self
            .inner
            .rpc
            .call("eth_call", json!([call, "latest"]))
            .await
            .map_err(contract_error)?;
        decode_hex(&raw)
    }

    async fn send(&self, to: Address, signature: &str, args: &[AbiValue]) -> ContractResult<TxHash> {
        let tx = json!({
            "from": self.inner.signer,
            "to": to,
            "data": to_hex(&encode_call(signature, args)),
        });
        let raw: String = self
            .inner
            .rpc
            .call("eth_sendTransaction", json!([tx]))
            .await
            .map_err(contract_error)?;
        let hash = decode_hash(&raw)?;
        debug!(method = signature, tx = ?hash, "Transaction submitted");
        Ok(hash)
    }

    async fn registry_read(&self, signature: &str, args: &[AbiValue]) -> ContractResult<Vec<u8>> {
        self.read(self.inner.addresses.registry, signature, args).await
    }

    async fn escrow_read(&self, signature: &str, args: &[AbiValue]) -> ContractResult<Vec<u8>> {
        self.read(self.inner.addresses.escrow, signature, args).await
    }

    async fn identity(&self, signature: &str, account: Address) -> ContractResult<IdentityRecord> {
        let data = self.registry_read(signature, &[AbiValue::Address(account)]).await?;
        let record = Decoder::new(&data).tail(0)?;
        Ok(IdentityRecord {
            cid: record.string(0)?,
            payload_hash: record.bytes32(1)?,
        })
    }

    async fn register(&self, signature: &str, cid: &str, payload_hash: Hash) -> ContractResult<TxHash> {
        self.send(
            self.inner.addresses.registry,
            signature,
            &[AbiValue::String(cid.to_string()), AbiValue::Bytes32(payload_hash)],
        )
        .await
    }

    /// Deliver logs mined since the previous poll to the installed
    /// listeners. The first poll only records the current block.
    pub async fn poll_logs(&self) -> ContractResult<usize> {
        poll_logs(&self.inner).await
    }

    fn ensure_poller(&self) {
        let mut poller = self.inner.poller.lock();
        if poller.is_some() {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No async runtime, contract events will not be polled");
            return;
        };
        let weak = Arc::downgrade(&self.inner);
        let interval = self.inner.config.poll_interval;
        *poller = Some(runtime.spawn(run_log_poller(weak, interval)));
    }
}

async fn run_log_poller(inner: Weak<ContractsInner>, interval: Duration) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
    loop {
        ticker.tick().await;
        let Some(inner) = inner.upgrade() else {
            break;
        };
        if let Err(e) = poll_logs(&inner).await {
            warn!(error = %e, "Contract log poll failed");
        }
    }
}

async fn poll_logs(inner: &ContractsInner) -> ContractResult<usize> {
    let raw: String = inner
        .rpc
        .call("eth_blockNumber", json!([]))
        .await
        .map_err(contract_error)?;
    let latest = decode_quantity(&raw)?;

    let from = {
        let mut last_block = inner.last_block.lock();
        let previous = *last_block;
        match previous {
            None => {
                *last_block = Some(latest);
                return Ok(0);
            }
            Some(seen) if seen >= latest => return Ok(0),
            Some(seen) => seen + 1,
        }
    };

    let topics: Vec<String> = ContractTopic::REGISTRY
        .iter()
        .chain(ContractTopic::ESCROW.iter())
        .map(|t| to_hex(event_topic(event_signature(*t)).as_bytes()))
        .collect();
    let filter = json!({
        "fromBlock": format!("0x{:x}", from),
        "toBlock": format!("0x{:x}", latest),
        "address": [inner.addresses.registry, inner.addresses.escrow],
        "topics": [topics],
    });
    let logs: Vec<RawLog> = inner
        .rpc
        .call("eth_getLogs", json!([filter]))
        .await
        .map_err(contract_error)?;
    *inner.last_block.lock() = Some(latest);

    let mut delivered = 0;
    for log in &logs {
        match decode_log(&inner.addresses, log) {
            Ok(Some(event)) => delivered += dispatch(inner, event),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Skipping undecodable contract log"),
        }
    }
    Ok(delivered)
}

fn decode_log(addresses: &ContractAddresses, log: &RawLog) -> ContractResult<Option<ContractEvent>> {
    let emitter = decode_address(&log.address)?;
    let candidates: &[ContractTopic] = if emitter == addresses.registry {
        &ContractTopic::REGISTRY
    } else if emitter == addresses.escrow {
        &ContractTopic::ESCROW
    } else {
        return Ok(None);
    };

    let Some(first) = log.topics.first() else {
        return Ok(None);
    };
    let topic0 = decode_hash(first)?;
    let Some(topic) = candidates
        .iter()
        .copied()
        .find(|t| event_topic(event_signature(*t)) == topic0)
    else {
        return Ok(None);
    };

    // Bounty id is the first indexed argument, or the first data word.
    let bounty_id = match log.topics.get(1) {
        Some(indexed) => {
            let word = decode_hex(indexed)?;
            Decoder::new(&word).u64(0)?
        }
        None => {
            let data = decode_hex(&log.data)?;
            Decoder::new(&data).u64(0)?
        }
    };

    Ok(Some(ContractEvent {
        topic,
        bounty_id: Some(BountyId(bounty_id)),
    }))
}

fn dispatch(inner: &ContractsInner, event: ContractEvent) -> usize {
    let listeners: Vec<Listener> = inner
        .listeners
        .lock()
        .values()
        .filter(|(t, _)| *t == event.topic)
        .map(|(_, l)| Arc::clone(l))
        .collect();
    debug!(
        topic = %event.topic,
        bounty = ?event.bounty_id,
        listeners = listeners.len(),
        "Contract event"
    );
    for listener in &listeners {
        listener(event.clone());
    }
    listeners.len()
}

impl EventSource for JsonRpcContracts {
    fn on(&self, topic: ContractTopic, listener: Listener) -> ListenerId {
        let id = ListenerId(self.inner.next_listener.fetch_add(1, Ordering::SeqCst));
        self.inner.listeners.lock().insert(id, (topic, listener));
        self.ensure_poller();
        id
    }

    fn off(&self, topic: ContractTopic, id: ListenerId) -> bool {
        let (removed, now_empty) = {
            let mut listeners = self.inner.listeners.lock();
            let registered = listeners.get(&id).is_some_and(|(t, _)| *t == topic);
            let removed = registered && listeners.remove(&id).is_some();
            (removed, listeners.is_empty())
        };
        if now_empty {
            if let Some(poller) = self.inner.poller.lock().take() {
                poller.abort();
            }
            *self.inner.last_block.lock() = None;
        }
        removed
    }

    fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }
}

#[async_trait]
impl Registry for JsonRpcContracts {
    async fn has_role(&self, role: RoleId, account: Address) -> ContractResult<bool> {
        let data = self
            .registry_read(
                "hasRole(bytes32,address)",
                &[AbiValue::Bytes32(role.0), AbiValue::Address(account)],
            )
            .await?;
        Decoder::new(&data).bool(0)
    }

    async fn get_all_bounties(&self) -> ContractResult<Vec<Bounty>> {
        let data = self.registry_read("getAllBounties()", &[]).await?;
        // (uint256 id, address ngo, bool active, bool lawyerSelected, address assignedLawyer)[]
        let (len, items) = Decoder::new(&data).array(0)?;
        (0..len)
            .map(|i| {
                let slot = i * 5;
                let lawyer = items.address(slot + 4)?;
                Ok(Bounty {
                    id: BountyId(items.u64(slot)?),
                    ngo: items.address(slot + 1)?,
                    active: items.bool(slot + 2)?,
                    lawyer_selected: items.bool(slot + 3)?,
                    assigned_lawyer: (!lawyer.is_zero()).then_some(lawyer),
                })
            })
            .collect()
    }

    async fn get_all_milestones(&self, bounty: BountyId) -> ContractResult<Vec<Milestone>> {
        let data = self
            .registry_read("getAllMilestones(uint256)", &[bounty.0.into()])
            .await?;
        // (uint256 amount, bool approved, bool released)[]
        let (len, items) = Decoder::new(&data).array(0)?;
        (0..len)
            .map(|i| {
                let slot = i * 3;
                Ok(Milestone {
                    bounty_id: bounty,
                    index: index_of(i)?,
                    amount: items.uint(slot)?,
                    approved: items.bool(slot + 1)?,
                    released: items.bool(slot + 2)?,
                })
            })
            .collect()
    }

    async fn get_applications(&self, bounty: BountyId) -> ContractResult<Vec<Application>> {
        let data = self
            .registry_read("getApplications(uint256)", &[bounty.0.into()])
            .await?;
        // (address lawyer, string proposalURI, bytes32 proposalHash, bool accepted)[]
        let (len, items) = Decoder::new(&data).array(0)?;
        (0..len)
            .map(|i| {
                let item = items.tail(i)?;
                Ok(Application {
                    bounty_id: bounty,
                    lawyer: item.address(0)?,
                    proposal_uri: item.string(1)?,
                    accepted: item.bool(3)?,
                })
            })
            .collect()
    }

    async fn get_lawyer_identity(&self, account: Address) -> ContractResult<IdentityRecord> {
        self.identity("getLawyerIdentity(address)", account).await
    }

    async fn get_ngo_identity(&self, account: Address) -> ContractResult<IdentityRecord> {
        self.identity("getNGOIdentity(address)", account).await
    }

    async fn register_donor(&self, cid: &str, payload_hash: Hash) -> ContractResult<TxHash> {
        self.register("registerDonor(string,bytes32)", cid, payload_hash).await
    }

    async fn register_ngo(&self, cid: &str, payload_hash: Hash) -> ContractResult<TxHash> {
        self.register("registerNGO(string,bytes32)", cid, payload_hash).await
    }

    async fn register_lawyer(&self, cid: &str, payload_hash: Hash) -> ContractResult<TxHash> {
        self.register("registerLawyer(string,bytes32)", cid, payload_hash).await
    }

    async fn create_bounty(&self, milestone_amounts: &[Amount]) -> ContractResult<TxHash> {
        self.send(
            self.inner.addresses.registry,
            "createBounty(uint256[])",
            &[AbiValue::UintArray(milestone_amounts.to_vec())],
        )
        .await
    }

    async fn approve_milestone(&self, bounty: BountyId, index: u32) -> ContractResult<TxHash> {
        self.send(
            self.inner.addresses.registry,
            "approveMilestone(uint256,uint256)",
            &[bounty.0.into(), u64::from(index).into()],
        )
        .await
    }

    async fn apply_for_bounty(
        &self,
        bounty: BountyId,
        proposal_uri: &str,
        proposal_hash: Hash,
    ) -> ContractResult<TxHash> {
        self.send(
            self.inner.addresses.registry,
            "applyForBounty(uint256,string,bytes32)",
            &[
                bounty.0.into(),
                AbiValue::String(proposal_uri.to_string()),
                AbiValue::Bytes32(proposal_hash),
            ],
        )
        .await
    }

    async fn set_escrow(&self, escrow: Address) -> ContractResult<TxHash> {
        self.send(
            self.inner.addresses.registry,
            "setEscrow(address)",
            &[AbiValue::Address(escrow)],
        )
        .await
    }
}

#[async_trait]
impl Escrow for JsonRpcContracts {
    async fn get_donors(&self, bounty: BountyId) -> ContractResult<Vec<Address>> {
        let data = self
            .escrow_read("getDonors(uint256)", &[bounty.0.into()])
            .await?;
        let (len, items) = Decoder::new(&data).array(0)?;
        (0..len).map(|i| items.address(i)).collect()
    }

    async fn get_donor_contribution(
        &self,
        bounty: BountyId,
        donor: Address,
    ) -> ContractResult<Amount> {
        let data = self
            .escrow_read(
                "getDonorContribution(uint256,address)",
                &[bounty.0.into(), AbiValue::Address(donor)],
            )
            .await?;
        Decoder::new(&data).uint(0)
    }

    async fn get_bounty_balance(&self, bounty: BountyId) -> ContractResult<Amount> {
        let data = self
            .escrow_read("getBountyBalance(uint256)", &[bounty.0.into()])
            .await?;
        Decoder::new(&data).uint(0)
    }

    async fn deposit(
        &self,
        bounty: BountyId,
        donor: Address,
        amount: Amount,
    ) -> ContractResult<TxHash> {
        self.send(
            self.inner.addresses.escrow,
            "deposit(uint256,address,uint256)",
            &[bounty.0.into(), AbiValue::Address(donor), AbiValue::Uint(amount)],
        )
        .await
    }

    async fn release(&self, bounty: BountyId, index: u32) -> ContractResult<TxHash> {
        self.send(
            self.inner.addresses.escrow,
            "release(uint256,uint256)",
            &[bounty.0.into(), u64::from(index).into()],
        )
        .await
    }
}

#[async_trait]
impl Token for JsonRpcContracts {
    async fn approve(&self, spender: Address, amount: Amount) -> ContractResult<TxHash> {
        self.send(
            self.inner.addresses.token,
            "approve(address,uint256)",
            &[AbiValue::Address(spender), AbiValue::Uint(amount)],
        )
        .await
    }

    async fn balance_of(&self, account: Address) -> ContractResult<Amount> {
        let data = self
            .read(
                self.inner.addresses.token,
                "balanceOf(address)",
                &[AbiValue::Address(account)],
            )
            .await?;
        Decoder::new(&data).uint(0)
    }
}

impl JsonRpcContracts {
    async fn poll_receipt(&self, tx: TxHash) -> ContractResult<TxReceipt> {
        let mut ticker = tokio::time::interval(self.inner.config.poll_interval);
        loop {
            ticker.tick().await;
            let receipt: Option<RawReceipt> = self
                .inner
                .rpc
                .call("eth_getTransactionReceipt", json!([tx]))
                .await
                .map_err(contract_error)?;
            let Some(receipt) = receipt else {
                continue;
            };
            // some nodes return pending receipts without a block
            let Some(block) = receipt.block_number.as_deref() else {
                continue;
            };
            let block_number = decode_quantity(block)?;
            let tx_hash = decode_hash(&receipt.transaction_hash)?;
            if receipt.status.as_deref().map(decode_quantity).transpose()? == Some(0) {
                return Err(ContractError::Reverted(format!(
                    "transaction {:?} reverted in block {}",
                    tx_hash, block_number
                )));
            }
            return Ok(TxReceipt {
                tx_hash,
                block_number,
            });
        }
    }
}

#[async_trait]
impl TxConfirmer for JsonRpcContracts {
    async fn wait(&self, tx: TxHash) -> ContractResult<TxReceipt> {
        tokio::time::timeout(self.inner.config.receipt_timeout, self.poll_receipt(tx))
            .await
            .map_err(|_| ContractError::Rpc(format!("no receipt for {:?} before timeout", tx)))?
    }
}
