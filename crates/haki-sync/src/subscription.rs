//! Symmetric listener registration on the registry and escrow.

use std::sync::Arc;

use haki_session::{
    ContractHandles, ContractTopic, Escrow, EventSource, Listener, ListenerId, Registry,
};
use haki_telemetry::metrics::ACTIVE_LISTENERS;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Registry,
    Escrow,
}

/// Listeners installed by [`subscribe`]. Teardown removes exactly those
/// listeners and stops the refresh task, if any.
pub struct Subscription {
    registry: Arc<dyn Registry>,
    escrow: Arc<dyn Escrow>,
    installed: Vec<(Source, ContractTopic, ListenerId)>,
    task: Option<JoinHandle<()>>,
}

/// Install `on_change` for every registry and escrow change topic.
pub fn subscribe(handles: &ContractHandles, on_change: Listener) -> Subscription {
    let mut installed = Vec::with_capacity(ContractTopic::REGISTRY.len() + ContractTopic::ESCROW.len());
    for topic in ContractTopic::REGISTRY {
        let id = handles.registry.on(topic, Arc::clone(&on_change));
        installed.push((Source::Registry, topic, id));
    }
    for topic in ContractTopic::ESCROW {
        let id = handles.escrow.on(topic, Arc::clone(&on_change));
        installed.push((Source::Escrow, topic, id));
    }

    ACTIVE_LISTENERS.add(installed.len() as f64);
    debug!(listeners = installed.len(), "Subscribed to contract changes");

    Subscription {
        registry: Arc::clone(&handles.registry),
        escrow: Arc::clone(&handles.escrow),
        installed,
        task: None,
    }
}

impl Subscription {
    pub(crate) fn with_task(mut self, task: JoinHandle<()>) -> Self {
        self.task = Some(task);
        self
    }

    /// Ids of the listeners still installed.
    pub fn listener_ids(&self) -> Vec<ListenerId> {
        self.installed.iter().map(|(_, _, id)| *id).collect()
    }

    pub fn is_active(&self) -> bool {
        !self.installed.is_empty()
    }

    /// Remove every listener this subscription installed.
    pub fn unsubscribe(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        if self.installed.is_empty() {
            return;
        }

        let count = self.installed.len();
        for (source, topic, id) in self.installed.drain(..) {
            let removed = match source {
                Source::Registry => self.registry.off(topic, id),
                Source::Escrow => self.escrow.off(topic, id),
            };
            if !removed {
                warn!(topic = %topic, id = id.0, "Listener already removed");
            }
        }
        ACTIVE_LISTENERS.sub(count as f64);
        debug!(listeners = count, "Unsubscribed from contract changes");
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.teardown();
    }
}
