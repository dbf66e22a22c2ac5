//! Snapshot owner: runs refreshes and publishes the latest completed one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use haki_session::{ContractEvent, ContractHandles, Listener, SessionContext};
use haki_telemetry::metrics::CHAIN_NOTIFICATIONS;
use haki_types::HakiResult;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::domain::{Dashboard, RefreshPlan, Snapshot};
use crate::refresh::refresh;
use crate::subscription::{subscribe, Subscription};

/// Owns the published [`Snapshot`].
///
/// Publication is last-completed-wins: whichever refresh resolves last
/// replaces the snapshot, regardless of start order.
pub struct Synchronizer {
    handles: ContractHandles,
    plan: RefreshPlan,
    published: watch::Sender<Arc<Snapshot>>,
    started: AtomicU64,
}

impl Synchronizer {
    pub fn new(handles: ContractHandles, plan: RefreshPlan) -> Self {
        let (published, _) = watch::channel(Arc::new(Snapshot::default()));
        Self {
            handles,
            plan,
            published,
            started: AtomicU64::new(0),
        }
    }

    /// Synchronizer for one dashboard, if the session may open it.
    pub fn for_dashboard(context: &SessionContext, dashboard: Dashboard) -> HakiResult<Self> {
        context.require_any("open dashboard", dashboard.allowed_roles())?;
        Ok(Self::new(
            context.handles.clone(),
            RefreshPlan::for_dashboard(dashboard, context.address()),
        ))
    }

    pub fn handles(&self) -> &ContractHandles {
        &self.handles
    }

    pub fn plan(&self) -> &RefreshPlan {
        &self.plan
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.published.borrow().clone()
    }

    /// Receiver notified on every publication.
    pub fn watch(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.published.subscribe()
    }

    /// Refreshes started so far.
    pub fn refreshes_started(&self) -> u64 {
        self.started.load(Ordering::SeqCst)
    }

    /// Pull and publish a fresh snapshot.
    pub async fn refresh(&self) -> HakiResult<Arc<Snapshot>> {
        let run = self.started.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(run, "Refresh started");
        let fresh = Arc::new(refresh(&self.handles, &self.plan).await?);
        Ok(self.publish(fresh))
    }

    /// Replace the published snapshot with `fresh`.
    pub fn publish(&self, fresh: Arc<Snapshot>) -> Arc<Snapshot> {
        let previous = self.published.send_replace(Arc::clone(&fresh));
        for regression in fresh.regressions_since(&previous) {
            warn!(
                bounty = %regression.bounty_id,
                milestone = regression.index,
                from = ?regression.from,
                to = ?regression.to,
                "Milestone moved backwards"
            );
        }
        fresh
    }

    /// Refresh once per contract change notification until the returned
    /// subscription is dropped or unsubscribed.
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let (tx, mut rx) = mpsc::unbounded_channel::<ContractEvent>();
        let listener: Listener = Arc::new(move |event: ContractEvent| {
            CHAIN_NOTIFICATIONS.with_label_values(&[event.topic.name()]).inc();
            let _ = tx.send(event);
        });
        let subscription = subscribe(&self.handles, listener);

        let sync = Arc::clone(self);
        let task = tokio::spawn(async move {
            let mut inflight = JoinSet::new();
            loop {
                tokio::select! {
                    Some(event) = rx.recv() => {
                        debug!(topic = %event.topic, bounty = ?event.bounty_id, "Change notification");
                        let sync = Arc::clone(&sync);
                        inflight.spawn(async move {
                            if let Err(e) = sync.refresh().await {
                                warn!(error = %e, "Event-driven refresh failed");
                            }
                        });
                    }
                    Some(_) = inflight.join_next(), if !inflight.is_empty() => {}
                    else => break,
                }
            }
        });

        subscription.with_task(task)
    }
}
