//! Session manager: owns the active session and reacts to wallet changes.

use std::sync::Arc;

use haki_telemetry::metrics::SESSION_CONNECTS;
use haki_types::{Address, ChainId, HakiError, HakiResult};
use parking_lot::RwLock;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::domain::{Session, SessionConfig, SessionContext, SessionEvent};
use crate::network::{ensure_network, observe, METHOD_ACCOUNTS};
use crate::ports::{ContractConnector, WalletEvent, WalletProvider};
use crate::roles::resolve_roles;

/// Capacity of the session event channel.
const EVENT_CAPACITY: usize = 64;

/// Active session plus a counter bumped on every install or teardown, so a
/// rebind that raced with a teardown can tell it is stale.
#[derive(Default)]
struct Active {
    context: Option<SessionContext>,
    generation: u64,
}

impl Active {
    fn install(&mut self, context: SessionContext) {
        self.context = Some(context);
        self.generation += 1;
    }

    fn take(&mut self) -> Option<SessionContext> {
        let previous = self.context.take();
        if previous.is_some() {
            self.generation += 1;
        }
        previous
    }
}

/// Connects the wallet, enforces the target network and keeps the active
/// [`SessionContext`].
pub struct SessionManager {
    config: SessionConfig,
    wallet: Option<Arc<dyn WalletProvider>>,
    connector: Arc<dyn ContractConnector>,
    active: RwLock<Active>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionManager {
    /// `wallet` is `None` when no provider is available in this environment.
    pub fn new(
        config: SessionConfig,
        wallet: Option<Arc<dyn WalletProvider>>,
        connector: Arc<dyn ContractConnector>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            config,
            wallet,
            connector,
            active: RwLock::new(Active::default()),
            events,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The active session, if connected.
    pub fn current(&self) -> Option<SessionContext> {
        self.active.read().context.clone()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: SessionEvent) {
        debug!(event = event.name(), "Session event");
        // No receivers is fine
        let _ = self.events.send(event);
    }

    /// Request wallet access, enforce the target network, bind contract
    /// handles and resolve roles.
    #[instrument(skip(self), fields(target = %self.config.target_chain()))]
    pub async fn connect(&self) -> HakiResult<SessionContext> {
        let result = self.try_connect().await;
        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.kind(),
        };
        SESSION_CONNECTS.with_label_values(&[outcome]).inc();
        if let Err(e) = &result {
            warn!(error = %e, "Connect failed");
        }
        result
    }

    async fn try_connect(&self) -> HakiResult<SessionContext> {
        let wallet = self.wallet.as_ref().ok_or(HakiError::NoWalletProvider)?;

        let accounts = observe(METHOD_ACCOUNTS, wallet.request_accounts()).await?;
        let address = accounts.first().copied().ok_or(HakiError::UserRejected)?;

        let chain_id = ensure_network(wallet.as_ref(), &self.config.network).await?;
        let context = self.bind(address, chain_id).await?;

        self.active.write().install(context.clone());
        info!(
            account = ?address,
            chain = %chain_id,
            roles = %context.session.roles,
            "Wallet connected"
        );
        self.publish(SessionEvent::Connected(context.session.clone()));
        Ok(context)
    }

    async fn bind(&self, address: Address, chain_id: ChainId) -> HakiResult<SessionContext> {
        let handles = self
            .connector
            .connect(&self.config.contracts, address, chain_id)
            .await?;
        let roles = resolve_roles(handles.registry.as_ref(), address).await?;

        Ok(SessionContext {
            session: Session {
                address,
                chain_id,
                roles,
            },
            handles,
        })
    }

    /// Wallet reported a new account list.
    ///
    /// An empty list tears the session down. Otherwise handles are rebound
    /// to the first account and roles re-derived; if that fails the session
    /// is torn down rather than left bound to the previous account.
    ///
    /// If the session is replaced or torn down while the rebind is in
    /// flight, the rebind result is discarded and `Ok(None)` returned.
    pub async fn reconnect_on_account_change(
        &self,
        accounts: &[Address],
    ) -> HakiResult<Option<SessionContext>> {
        let Some(&address) = accounts.first() else {
            info!("Wallet exposed no accounts, disconnecting");
            self.disconnect();
            return Ok(None);
        };

        let (current, generation) = {
            let active = self.active.read();
            match &active.context {
                Some(context) => (context.clone(), active.generation),
                None => {
                    debug!("Account change without an active session");
                    return Ok(None);
                }
            }
        };
        if current.address() == address {
            return Ok(Some(current));
        }

        let result = self.bind(address, current.session.chain_id).await;

        let mut active = self.active.write();
        if active.generation != generation {
            drop(active);
            debug!(account = ?address, "Session changed during rebind, discarding");
            return Ok(None);
        }

        match result {
            Ok(context) => {
                active.install(context.clone());
                drop(active);
                info!(account = ?address, roles = %context.session.roles, "Account changed");
                self.publish(SessionEvent::AccountChanged(context.session.clone()));
                Ok(Some(context))
            }
            Err(e) => {
                let torn_down = active.take().is_some();
                drop(active);
                warn!(account = ?address, error = %e, "Rebinding after account change failed");
                if torn_down {
                    self.publish(SessionEvent::Disconnected);
                }
                Err(e)
            }
        }
    }

    /// Wallet moved to `chain`.
    ///
    /// Handles are bound to a network at construction, so any change drops
    /// the session and publishes [`SessionEvent::ReloadRequired`]. Returns
    /// whether a reload is required.
    pub fn reload_on_chain_change(&self, chain: ChainId) -> bool {
        let torn_down = {
            let mut active = self.active.write();
            let stale = matches!(active.context.as_ref(), Some(context) if context.session.chain_id != chain);
            if stale {
                active.take()
            } else {
                None
            }
        };

        match torn_down {
            Some(previous) => {
                info!(from = %previous.session.chain_id, to = %chain, "Network changed, reload required");
                self.publish(SessionEvent::ReloadRequired { chain });
                true
            }
            None => false,
        }
    }

    /// Drop the active session. Returns `false` if none was active.
    pub fn disconnect(&self) -> bool {
        let previous = self.active.write().take();
        if previous.is_some() {
            self.publish(SessionEvent::Disconnected);
        }
        previous.is_some()
    }

    /// Dispatch wallet notifications to the change hooks until the returned
    /// watch is dropped.
    pub fn watch_wallet(self: &Arc<Self>) -> HakiResult<WalletWatch> {
        let wallet = self.wallet.as_ref().ok_or(HakiError::NoWalletProvider)?;
        let mut notifications = wallet.events();
        let manager = Arc::clone(self);

        let handle = tokio::spawn(async move {
            loop {
                match notifications.recv().await {
                    Ok(WalletEvent::AccountsChanged(accounts)) => {
                        if let Err(e) = manager.reconnect_on_account_change(&accounts).await {
                            warn!(error = %e, "Account change handling failed");
                        }
                    }
                    Ok(WalletEvent::ChainChanged(chain)) => {
                        manager.reload_on_chain_change(chain);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Wallet notifications dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Ok(WalletWatch { handle })
    }
}

/// Running wallet watcher; aborted on [`WalletWatch::stop`] or drop.
pub struct WalletWatch {
    handle: JoinHandle<()>,
}

impl WalletWatch {
    pub fn stop(self) {
        self.handle.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for WalletWatch {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
