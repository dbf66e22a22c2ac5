//! Contract collaborator ports.
//!
//! The registry, escrow and token contracts are external black boxes; these
//! traits list exactly the read/write surface the dashboards consume. Write
//! calls return the submitted transaction hash; confirmation is a separate
//! step through [`TxConfirmer`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use haki_types::{
    Address, Amount, Application, Bounty, BountyId, ChainId, ContractError, Hash, IdentityRecord,
    Milestone, RoleId, TxHash,
};

use crate::domain::ContractAddresses;

/// Result of a single contract call.
pub type ContractResult<T> = Result<T, ContractError>;

/// Change-notification topics emitted by the mutable contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContractTopic {
    BountyCreated,
    BountyUpdated,
    MilestoneApproved,
    DonationReceived,
}

impl ContractTopic {
    /// Topics emitted by the registry.
    pub const REGISTRY: [ContractTopic; 3] = [
        ContractTopic::BountyCreated,
        ContractTopic::BountyUpdated,
        ContractTopic::MilestoneApproved,
    ];

    /// Topics emitted by the escrow.
    pub const ESCROW: [ContractTopic; 1] = [ContractTopic::DonationReceived];

    /// Solidity event name.
    pub fn name(self) -> &'static str {
        match self {
            Self::BountyCreated => "BountyCreated",
            Self::BountyUpdated => "BountyUpdated",
            Self::MilestoneApproved => "MilestoneApproved",
            Self::DonationReceived => "DonationReceived",
        }
    }
}

impl fmt::Display for ContractTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractEvent {
    pub topic: ContractTopic,
    pub bounty_id: Option<BountyId>,
}

/// Callback installed on an [`EventSource`].
pub type Listener = Arc<dyn Fn(ContractEvent) + Send + Sync>;

/// Handle returned by [`EventSource::on`], needed to remove the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

/// A contract that emits change notifications.
pub trait EventSource: Send + Sync {
    /// Install `listener` for `topic`.
    fn on(&self, topic: ContractTopic, listener: Listener) -> ListenerId;

    /// Remove one listener. Returns `false` if it was not installed.
    fn off(&self, topic: ContractTopic, id: ListenerId) -> bool;

    /// Number of listeners currently installed across all topics.
    fn listener_count(&self) -> usize;
}

/// Identity, role, bounty and application registry.
#[async_trait]
pub trait Registry: EventSource {
    async fn has_role(&self, role: RoleId, account: Address) -> ContractResult<bool>;

    async fn get_all_bounties(&self) -> ContractResult<Vec<Bounty>>;

    async fn get_all_milestones(&self, bounty: BountyId) -> ContractResult<Vec<Milestone>>;

    async fn get_applications(&self, bounty: BountyId) -> ContractResult<Vec<Application>>;

    async fn get_lawyer_identity(&self, account: Address) -> ContractResult<IdentityRecord>;

    async fn get_ngo_identity(&self, account: Address) -> ContractResult<IdentityRecord>;

    async fn register_donor(&self, cid: &str, payload_hash: Hash) -> ContractResult<TxHash>;

    async fn register_ngo(&self, cid: &str, payload_hash: Hash) -> ContractResult<TxHash>;

    async fn register_lawyer(&self, cid: &str, payload_hash: Hash) -> ContractResult<TxHash>;

    /// Create a bounty with one milestone per amount.
    async fn create_bounty(&self, milestone_amounts: &[Amount]) -> ContractResult<TxHash>;

    async fn approve_milestone(&self, bounty: BountyId, index: u32) -> ContractResult<TxHash>;

    async fn apply_for_bounty(
        &self,
        bounty: BountyId,
        proposal_uri: &str,
        proposal_hash: Hash,
    ) -> ContractResult<TxHash>;

    async fn set_escrow(&self, escrow: Address) -> ContractResult<TxHash>;
}

/// Per-bounty fund custody.
#[async_trait]
pub trait Escrow: EventSource {
    async fn get_donors(&self, bounty: BountyId) -> ContractResult<Vec<Address>>;

    async fn get_donor_contribution(&self, bounty: BountyId, donor: Address)
        -> ContractResult<Amount>;

    async fn get_bounty_balance(&self, bounty: BountyId) -> ContractResult<Amount>;

    async fn deposit(&self, bounty: BountyId, donor: Address, amount: Amount)
        -> ContractResult<TxHash>;

    async fn release(&self, bounty: BountyId, index: u32) -> ContractResult<TxHash>;
}

/// ERC-20 token used for funding.
#[async_trait]
pub trait Token: Send + Sync {
    async fn approve(&self, spender: Address, amount: Amount) -> ContractResult<TxHash>;

    async fn balance_of(&self, account: Address) -> ContractResult<Amount>;
}

/// Receipt of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
}

/// Waits for a submitted transaction to be mined.
#[async_trait]
pub trait TxConfirmer: Send + Sync {
    /// Resolve once `tx` is mined. A reverted transaction is an error.
    async fn wait(&self, tx: TxHash) -> ContractResult<TxReceipt>;
}

/// Builds contract handles bound to one signing account.
#[async_trait]
pub trait ContractConnector: Send + Sync {
    async fn connect(
        &self,
        addresses: &ContractAddresses,
        signer: Address,
        chain: ChainId,
    ) -> ContractResult<ContractHandles>;
}

/// Registry, escrow and token handles bound to the same signer and network.
#[derive(Clone)]
pub struct ContractHandles {
    pub signer: Address,
    pub chain_id: ChainId,
    pub addresses: ContractAddresses,
    pub registry: Arc<dyn Registry>,
    pub escrow: Arc<dyn Escrow>,
    pub token: Arc<dyn Token>,
    pub confirmer: Arc<dyn TxConfirmer>,
}

impl fmt::Debug for ContractHandles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractHandles")
            .field("signer", &self.signer)
            .field("chain_id", &self.chain_id)
            .field("addresses", &self.addresses)
            .finish_non_exhaustive()
    }
}
