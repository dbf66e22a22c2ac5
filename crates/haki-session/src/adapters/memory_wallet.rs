//! In-memory wallet provider.
//!
//! Behaves like a browser wallet extension: knows a set of networks, can be
//! told to reject prompts, and pushes change notifications when its account
//! list or network changes. Every RPC is recorded so callers can assert the
//! exact remediation sequence.

use std::collections::HashSet;

use async_trait::async_trait;
use haki_types::{Address, ChainId, NetworkParams};
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::ports::{WalletError, WalletEvent, WalletProvider};

/// One recorded wallet RPC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletCall {
    RequestAccounts,
    ChainId,
    Switch(ChainId),
    Add(ChainId),
}

struct WalletState {
    accounts: Vec<Address>,
    chain: ChainId,
    known_chains: HashSet<ChainId>,
    reject_accounts: bool,
    reject_switch: bool,
    ignore_switch: bool,
}

/// Scriptable wallet.
pub struct InMemoryWallet {
    state: Mutex<WalletState>,
    calls: Mutex<Vec<WalletCall>>,
    events: broadcast::Sender<WalletEvent>,
}

impl InMemoryWallet {
    /// Wallet on `chain` exposing one default account.
    pub fn new(chain: ChainId) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            state: Mutex::new(WalletState {
                accounts: vec![Address::repeat_byte(0xA1)],
                chain,
                known_chains: HashSet::from([chain]),
                reject_accounts: false,
                reject_switch: false,
                ignore_switch: false,
            }),
            calls: Mutex::new(Vec::new()),
            events,
        }
    }

    pub fn with_accounts(self, accounts: Vec<Address>) -> Self {
        self.state.lock().accounts = accounts;
        self
    }

    pub fn with_known_chain(self, chain: ChainId) -> Self {
        self.state.lock().known_chains.insert(chain);
        self
    }

    /// Decline the account-access prompt.
    pub fn rejecting_accounts(self) -> Self {
        self.state.lock().reject_accounts = true;
        self
    }

    /// Decline the network-switch prompt.
    pub fn rejecting_switch(self) -> Self {
        self.state.lock().reject_switch = true;
        self
    }

    /// Accept switch requests but stay on the current network.
    pub fn ignoring_switch(self) -> Self {
        self.state.lock().ignore_switch = true;
        self
    }

    /// Every RPC received so far, in order.
    pub fn calls(&self) -> Vec<WalletCall> {
        self.calls.lock().clone()
    }

    pub fn current_chain(&self) -> ChainId {
        self.state.lock().chain
    }

    /// Simulate the user picking other accounts (or locking with an empty list).
    pub fn set_accounts(&self, accounts: Vec<Address>) {
        self.state.lock().accounts = accounts.clone();
        let _ = self.events.send(WalletEvent::AccountsChanged(accounts));
    }

    /// Simulate the user moving the wallet to another network.
    pub fn set_chain(&self, chain: ChainId) {
        {
            let mut state = self.state.lock();
            state.known_chains.insert(chain);
            state.chain = chain;
        }
        let _ = self.events.send(WalletEvent::ChainChanged(chain));
    }

    fn record(&self, call: WalletCall) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl WalletProvider for InMemoryWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        self.record(WalletCall::RequestAccounts);
        let state = self.state.lock();
        if state.reject_accounts {
            return Err(WalletError::Rejected);
        }
        Ok(state.accounts.clone())
    }

    async fn chain_id(&self) -> Result<ChainId, WalletError> {
        self.record(WalletCall::ChainId);
        Ok(self.state.lock().chain)
    }

    async fn switch_chain(&self, chain: ChainId) -> Result<(), WalletError> {
        self.record(WalletCall::Switch(chain));
        let changed = {
            let mut state = self.state.lock();
            if state.reject_switch {
                return Err(WalletError::Rejected);
            }
            if !state.known_chains.contains(&chain) {
                return Err(WalletError::UnrecognizedChain(chain));
            }
            if state.ignore_switch || state.chain == chain {
                false
            } else {
                state.chain = chain;
                true
            }
        };
        if changed {
            let _ = self.events.send(WalletEvent::ChainChanged(chain));
        }
        Ok(())
    }

    async fn add_chain(&self, params: &NetworkParams) -> Result<(), WalletError> {
        self.record(WalletCall::Add(params.chain_id));
        self.state.lock().known_chains.insert(params.chain_id);
        Ok(())
    }

    fn events(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}
