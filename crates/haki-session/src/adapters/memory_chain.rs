//! In-memory contract collaborators.
//!
//! One shared ledger backs the registry, escrow and token; [`ChainView`]
//! binds it to a signing account the same way a connected contract
//! instance would. Writes apply immediately, return a transaction hash that
//! [`TxConfirmer::wait`] resolves, and fire change notifications to the
//! installed listeners.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use haki_types::{
    keccak256, Address, Amount, Application, Bounty, BountyId, ChainId, ContractError, Hash,
    IdentityRecord, Milestone, RoleId, RoleTag, TxHash,
};
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::domain::ContractAddresses;
use crate::ports::{
    ContractConnector, ContractEvent, ContractHandles, ContractResult, ContractTopic, Escrow,
    EventSource, Listener, ListenerId, Registry, Token, TxConfirmer, TxReceipt,
};

/// A read that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadFault {
    Bounties,
    Milestones(BountyId),
    Applications(BountyId),
    Donors(BountyId),
    Contributions(BountyId),
    Balance(BountyId),
}

#[derive(Debug, Clone)]
struct BountyRecord {
    bounty: Bounty,
    milestones: Vec<Milestone>,
    applications: Vec<Application>,
}

#[derive(Default)]
struct Ledger {
    roles: HashSet<(RoleId, Address)>,
    bounties: BTreeMap<BountyId, BountyRecord>,
    next_bounty: u64,
    donors: HashMap<BountyId, Vec<Address>>,
    contributions: HashMap<(BountyId, Address), Amount>,
    escrow_balances: HashMap<BountyId, Amount>,
    token_balances: HashMap<Address, Amount>,
    allowances: HashMap<(Address, Address), Amount>,
    ngo_identities: HashMap<Address, IdentityRecord>,
    lawyer_identities: HashMap<Address, IdentityRecord>,
    donor_identities: HashMap<Address, IdentityRecord>,
    registry_escrow: Address,
    mined: HashMap<TxHash, u64>,
    block: u64,
    faults: HashSet<ReadFault>,
    role_check_failure: Option<String>,
}

type ListenerTable = Mutex<BTreeMap<ListenerId, (ContractTopic, Listener)>>;

struct ChainInner {
    addresses: ContractAddresses,
    ledger: RwLock<Ledger>,
    registry_listeners: ListenerTable,
    escrow_listeners: ListenerTable,
    next_listener: AtomicU64,
    role_checks: AtomicUsize,
}

/// Shared in-memory ledger for registry, escrow and token.
#[derive(Clone)]
pub struct InMemoryChain {
    inner: Arc<ChainInner>,
}

impl Default for InMemoryChain {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryChain {
    pub fn new() -> Self {
        let addresses = ContractAddresses {
            registry: Address::repeat_byte(0xC1),
            escrow: Address::repeat_byte(0xC2),
            token: Address::repeat_byte(0xC3),
        };
        let ledger = Ledger {
            next_bounty: 1,
            registry_escrow: addresses.escrow,
            ..Ledger::default()
        };
        Self {
            inner: Arc::new(ChainInner {
                addresses,
                ledger: RwLock::new(ledger),
                registry_listeners: Mutex::new(BTreeMap::new()),
                escrow_listeners: Mutex::new(BTreeMap::new()),
                next_listener: AtomicU64::new(1),
                role_checks: AtomicUsize::new(0),
            }),
        }
    }

    /// Where the three contracts live.
    pub fn addresses(&self) -> ContractAddresses {
        self.inner.addresses
    }

    /// Contract instances bound to `signer`.
    pub fn view(&self, signer: Address) -> ChainView {
        ChainView {
            chain: self.clone(),
            signer,
        }
    }

    pub fn grant_role(&self, role: RoleTag, account: Address) {
        self.inner.ledger.write().roles.insert((role.role_id(), account));
    }

    pub fn revoke_role(&self, role: RoleTag, account: Address) {
        self.inner.ledger.write().roles.remove(&(role.role_id(), account));
    }

    /// Credit `amount` tokens to `account`.
    pub fn mint(&self, account: Address, amount: Amount) {
        let mut ledger = self.inner.ledger.write();
        let balance = ledger.token_balances.entry(account).or_default();
        *balance = balance.saturating_add(amount);
    }

    /// Mark `lawyer` as the assigned lawyer of `bounty`.
    pub fn assign_lawyer(&self, bounty: BountyId, lawyer: Address) -> ContractResult<()> {
        {
            let mut ledger = self.inner.ledger.write();
            let record = ledger
                .bounties
                .get_mut(&bounty)
                .ok_or_else(|| unknown_bounty(bounty))?;
            record.bounty.lawyer_selected = true;
            record.bounty.assigned_lawyer = Some(lawyer);
            for app in record.applications.iter_mut() {
                app.accepted = app.lawyer == lawyer;
            }
        }
        self.emit(ContractTopic::BountyUpdated, Some(bounty));
        Ok(())
    }

    /// Escrow address currently recorded by the registry.
    pub fn registry_escrow(&self) -> Address {
        self.inner.ledger.read().registry_escrow
    }

    pub fn token_balance(&self, account: Address) -> Amount {
        self.inner
            .ledger
            .read()
            .token_balances
            .get(&account)
            .copied()
            .unwrap_or_default()
    }

    /// Make one read fail with an RPC error until [`Self::heal`].
    pub fn fail_read(&self, fault: ReadFault) {
        self.inner.ledger.write().faults.insert(fault);
    }

    /// Make every `hasRole` check fail.
    pub fn fail_role_checks(&self, message: &str) {
        self.inner.ledger.write().role_check_failure = Some(message.to_string());
    }

    /// Clear every injected failure.
    pub fn heal(&self) {
        let mut ledger = self.inner.ledger.write();
        ledger.faults.clear();
        ledger.role_check_failure = None;
    }

    /// `hasRole` calls served so far.
    pub fn role_check_count(&self) -> usize {
        self.inner.role_checks.load(Ordering::SeqCst)
    }

    /// Listeners installed on the registry and escrow together.
    pub fn listener_count(&self) -> usize {
        self.inner.registry_listeners.lock().len() + self.inner.escrow_listeners.lock().len()
    }

    /// Fire `topic` as if the contract emitted it.
    pub fn emit(&self, topic: ContractTopic, bounty_id: Option<BountyId>) {
        let table = if ContractTopic::ESCROW.contains(&topic) {
            &self.inner.escrow_listeners
        } else {
            &self.inner.registry_listeners
        };
        let listeners: Vec<Listener> = table
            .lock()
            .values()
            .filter(|(t, _)| *t == topic)
            .map(|(_, l)| Arc::clone(l))
            .collect();

        debug!(topic = %topic, listeners = listeners.len(), "Emitting contract event");
        let event = ContractEvent { topic, bounty_id };
        for listener in listeners {
            listener(event.clone());
        }
    }

    fn check(&self, fault: ReadFault) -> ContractResult<()> {
        if self.inner.ledger.read().faults.contains(&fault) {
            return Err(ContractError::Rpc(format!("{:?} unavailable", fault)));
        }
        Ok(())
    }

    fn mine(ledger: &mut Ledger) -> TxHash {
        ledger.block += 1;
        let tx = keccak256(&ledger.block.to_be_bytes());
        ledger.mined.insert(tx, ledger.block);
        tx
    }

    fn install(&self, table: &ListenerTable, topic: ContractTopic, listener: Listener) -> ListenerId {
        let id = ListenerId(self.inner.next_listener.fetch_add(1, Ordering::SeqCst));
        table.lock().insert(id, (topic, listener));
        id
    }

    fn remove(table: &ListenerTable, topic: ContractTopic, id: ListenerId) -> bool {
        let mut table = table.lock();
        match table.get(&id) {
            Some((t, _)) if *t == topic => table.remove(&id).is_some(),
            _ => false,
        }
    }
}

fn unknown_bounty(bounty: BountyId) -> ContractError {
    ContractError::Reverted(format!("bounty {} does not exist", bounty))
}

/// The shared ledger seen through one signer.
#[derive(Clone)]
pub struct ChainView {
    chain: InMemoryChain,
    signer: Address,
}

impl ChainView {
    pub fn signer(&self) -> Address {
        self.signer
    }

    fn register_identity(
        &self,
        kind: RoleTag,
        cid: &str,
        payload_hash: Hash,
    ) -> ContractResult<TxHash> {
        if cid.is_empty() || payload_hash.is_zero() {
            return Err(ContractError::Reverted("empty identity payload".into()));
        }
        let record = IdentityRecord {
            cid: cid.to_string(),
            payload_hash,
        };
        let mut ledger = self.chain.inner.ledger.write();
        let identities = match kind {
            RoleTag::Ngo => &mut ledger.ngo_identities,
            RoleTag::Lawyer => &mut ledger.lawyer_identities,
            _ => &mut ledger.donor_identities,
        };
        identities.insert(self.signer, record);
        Ok(InMemoryChain::mine(&mut ledger))
    }
}

impl EventSource for ChainView {
    fn on(&self, topic: ContractTopic, listener: Listener) -> ListenerId {
        let table = if ContractTopic::ESCROW.contains(&topic) {
            &self.chain.inner.escrow_listeners
        } else {
            &self.chain.inner.registry_listeners
        };
        self.chain.install(table, topic, listener)
    }

    fn off(&self, topic: ContractTopic, id: ListenerId) -> bool {
        let table = if ContractTopic::ESCROW.contains(&topic) {
            &self.chain.inner.escrow_listeners
        } else {
            &self.chain.inner.registry_listeners
        };
        InMemoryChain::remove(table, topic, id)
    }

    fn listener_count(&self) -> usize {
        self.chain.listener_count()
    }
}

#[async_trait]
impl Registry for ChainView {
    async fn has_role(&self, role: RoleId, account: Address) -> ContractResult<bool> {
        self.chain.inner.role_checks.fetch_add(1, Ordering::SeqCst);
        let ledger = self.chain.inner.ledger.read();
        if let Some(message) = &ledger.role_check_failure {
            return Err(ContractError::Rpc(message.clone()));
        }
        Ok(ledger.roles.contains(&(role, account)))
    }

    async fn get_all_bounties(&self) -> ContractResult<Vec<Bounty>> {
        self.chain.check(ReadFault::Bounties)?;
        let ledger = self.chain.inner.ledger.read();
        Ok(ledger.bounties.values().map(|r| r.bounty.clone()).collect())
    }

    async fn get_all_milestones(&self, bounty: BountyId) -> ContractResult<Vec<Milestone>> {
        self.chain.check(ReadFault::Milestones(bounty))?;
        let ledger = self.chain.inner.ledger.read();
        let record = ledger.bounties.get(&bounty).ok_or_else(|| unknown_bounty(bounty))?;
        Ok(record.milestones.clone())
    }

    async fn get_applications(&self, bounty: BountyId) -> ContractResult<Vec<Application>> {
        self.chain.check(ReadFault::Applications(bounty))?;
        let ledger = self.chain.inner.ledger.read();
        let record = ledger.bounties.get(&bounty).ok_or_else(|| unknown_bounty(bounty))?;
        Ok(record.applications.clone())
    }

    async fn get_lawyer_identity(&self, account: Address) -> ContractResult<IdentityRecord> {
        let ledger = self.chain.inner.ledger.read();
        Ok(ledger.lawyer_identities.get(&account).cloned().unwrap_or_default())
    }

    async fn get_ngo_identity(&self, account: Address) -> ContractResult<IdentityRecord> {
        let ledger = self.chain.inner.ledger.read();
        Ok(ledger.ngo_identities.get(&account).cloned().unwrap_or_default())
    }

    async fn register_donor(&self, cid: &str, payload_hash: Hash) -> ContractResult<TxHash> {
        self.register_identity(RoleTag::Donor, cid, payload_hash)
    }

    async fn register_ngo(&self, cid: &str, payload_hash: Hash) -> ContractResult<TxHash> {
        self.register_identity(RoleTag::Ngo, cid, payload_hash)
    }

    async fn register_lawyer(&self, cid: &str, payload_hash: Hash) -> ContractResult<TxHash> {
        self.register_identity(RoleTag::Lawyer, cid, payload_hash)
    }

    async fn create_bounty(&self, milestone_amounts: &[Amount]) -> ContractResult<TxHash> {
        if milestone_amounts.is_empty() {
            return Err(ContractError::Reverted("at least one milestone required".into()));
        }
        let (tx, id) = {
            let mut ledger = self.chain.inner.ledger.write();
            let id = BountyId(ledger.next_bounty);
            ledger.next_bounty += 1;
            let milestones = milestone_amounts
                .iter()
                .enumerate()
                .map(|(index, amount)| Milestone {
                    bounty_id: id,
                    index: index as u32,
                    amount: *amount,
                    approved: false,
                    released: false,
                })
                .collect();
            ledger.bounties.insert(
                id,
                BountyRecord {
                    bounty: Bounty {
                        id,
                        ngo: self.signer,
                        active: true,
                        lawyer_selected: false,
                        assigned_lawyer: None,
                    },
                    milestones,
                    applications: Vec::new(),
                },
            );
            (InMemoryChain::mine(&mut ledger), id)
        };
        self.chain.emit(ContractTopic::BountyCreated, Some(id));
        Ok(tx)
    }

    async fn approve_milestone(&self, bounty: BountyId, index: u32) -> ContractResult<TxHash> {
        let tx = {
            let mut ledger = self.chain.inner.ledger.write();
            let record = ledger
                .bounties
                .get_mut(&bounty)
                .ok_or_else(|| unknown_bounty(bounty))?;
            let milestone = record
                .milestones
                .get_mut(index as usize)
                .ok_or_else(|| ContractError::Reverted(format!("milestone {} does not exist", index)))?;
            if milestone.approved {
                return Err(ContractError::Reverted("milestone already approved".into()));
            }
            milestone.approved = true;
            InMemoryChain::mine(&mut ledger)
        };
        self.chain.emit(ContractTopic::MilestoneApproved, Some(bounty));
        Ok(tx)
    }

    async fn apply_for_bounty(
        &self,
        bounty: BountyId,
        proposal_uri: &str,
        _proposal_hash: Hash,
    ) -> ContractResult<TxHash> {
        let tx = {
            let mut ledger = self.chain.inner.ledger.write();
            let record = ledger
                .bounties
                .get_mut(&bounty)
                .ok_or_else(|| unknown_bounty(bounty))?;
            if record.applications.iter().any(|a| a.lawyer == self.signer) {
                return Err(ContractError::Reverted("already applied".into()));
            }
            record.applications.push(Application {
                bounty_id: bounty,
                lawyer: self.signer,
                proposal_uri: proposal_uri.to_string(),
                accepted: false,
            });
            InMemoryChain::mine(&mut ledger)
        };
        self.chain.emit(ContractTopic::BountyUpdated, Some(bounty));
        Ok(tx)
    }

    async fn set_escrow(&self, escrow: Address) -> ContractResult<TxHash> {
        let mut ledger = self.chain.inner.ledger.write();
        ledger.registry_escrow = escrow;
        Ok(InMemoryChain::mine(&mut ledger))
    }
}

#[async_trait]
impl Escrow for ChainView {
    async fn get_donors(&self, bounty: BountyId) -> ContractResult<Vec<Address>> {
        self.chain.check(ReadFault::Donors(bounty))?;
        let ledger = self.chain.inner.ledger.read();
        Ok(ledger.donors.get(&bounty).cloned().unwrap_or_default())
    }

    async fn get_donor_contribution(
        &self,
        bounty: BountyId,
        donor: Address,
    ) -> ContractResult<Amount> {
        self.chain.check(ReadFault::Contributions(bounty))?;
        let ledger = self.chain.inner.ledger.read();
        Ok(ledger
            .contributions
            .get(&(bounty, donor))
            .copied()
            .unwrap_or_default())
    }

    async fn get_bounty_balance(&self, bounty: BountyId) -> ContractResult<Amount> {
        self.chain.check(ReadFault::Balance(bounty))?;
        let ledger = self.chain.inner.ledger.read();
        Ok(ledger.escrow_balances.get(&bounty).copied().unwrap_or_default())
    }

    async fn deposit(
        &self,
        bounty: BountyId,
        donor: Address,
        amount: Amount,
    ) -> ContractResult<TxHash> {
        let escrow = self.chain.inner.addresses.escrow;
        let tx = {
            let mut ledger = self.chain.inner.ledger.write();
            if !ledger.bounties.contains_key(&bounty) {
                return Err(unknown_bounty(bounty));
            }
            let allowance = ledger
                .allowances
                .get(&(self.signer, escrow))
                .copied()
                .unwrap_or_default();
            if allowance < amount {
                return Err(ContractError::Reverted("insufficient allowance".into()));
            }
            let balance = ledger
                .token_balances
                .get(&self.signer)
                .copied()
                .unwrap_or_default();
            let remaining = balance
                .checked_sub(amount)
                .ok_or_else(|| ContractError::Reverted("insufficient balance".into()))?;

            ledger.token_balances.insert(self.signer, remaining);
            ledger.allowances.insert((self.signer, escrow), allowance - amount);
            let held = ledger.escrow_balances.entry(bounty).or_default();
            *held = held.saturating_add(amount);
            let given = ledger.contributions.entry((bounty, donor)).or_default();
            *given = given.saturating_add(amount);
            let donors = ledger.donors.entry(bounty).or_default();
            if !donors.contains(&donor) {
                donors.push(donor);
            }
            InMemoryChain::mine(&mut ledger)
        };
        self.chain.emit(ContractTopic::DonationReceived, Some(bounty));
        Ok(tx)
    }

    async fn release(&self, bounty: BountyId, index: u32) -> ContractResult<TxHash> {
        let tx = {
            let mut ledger = self.chain.inner.ledger.write();
            let held = ledger.escrow_balances.get(&bounty).copied().unwrap_or_default();
            let record = ledger
                .bounties
                .get_mut(&bounty)
                .ok_or_else(|| unknown_bounty(bounty))?;
            let payee = record.bounty.assigned_lawyer;
            let milestone = record
                .milestones
                .get_mut(index as usize)
                .ok_or_else(|| ContractError::Reverted(format!("milestone {} does not exist", index)))?;
            if !milestone.approved {
                return Err(ContractError::Reverted("milestone not approved".into()));
            }
            if milestone.released {
                return Err(ContractError::Reverted("milestone already released".into()));
            }
            let remaining = held
                .checked_sub(milestone.amount)
                .ok_or_else(|| ContractError::Reverted("insufficient escrow balance".into()))?;
            milestone.released = true;
            let amount = milestone.amount;

            ledger.escrow_balances.insert(bounty, remaining);
            if let Some(lawyer) = payee {
                let balance = ledger.token_balances.entry(lawyer).or_default();
                *balance = balance.saturating_add(amount);
            }
            InMemoryChain::mine(&mut ledger)
        };
        self.chain.emit(ContractTopic::BountyUpdated, Some(bounty));
        Ok(tx)
    }
}

#[async_trait]
impl Token for ChainView {
    async fn approve(&self, spender: Address, amount: Amount) -> ContractResult<TxHash> {
        let mut ledger = self.chain.inner.ledger.write();
        ledger.allowances.insert((self.signer, spender), amount);
        Ok(InMemoryChain::mine(&mut ledger))
    }

    async fn balance_of(&self, account: Address) -> ContractResult<Amount> {
        Ok(self.chain.token_balance(account))
    }
}

#[async_trait]
impl TxConfirmer for ChainView {
    async fn wait(&self, tx: TxHash) -> ContractResult<TxReceipt> {
        let ledger = self.chain.inner.ledger.read();
        ledger
            .mined
            .get(&tx)
            .map(|block| TxReceipt {
                tx_hash: tx,
                block_number: *block,
            })
            .ok_or_else(|| ContractError::Reverted(format!("transaction {:?} not found", tx)))
    }
}

#[async_trait]
impl ContractConnector for InMemoryChain {
    async fn connect(
        &self,
        addresses: &ContractAddresses,
        signer: Address,
        chain: ChainId,
    ) -> ContractResult<ContractHandles> {
        let view = Arc::new(self.view(signer));
        Ok(ContractHandles {
            signer,
            chain_id: chain,
            addresses: *addresses,
            registry: view.clone(),
            escrow: view.clone(),
            token: view.clone(),
            confirmer: view,
        })
    }
}
