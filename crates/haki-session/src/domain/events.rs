//! Session lifecycle notifications published by the manager.

use haki_types::ChainId;

use super::session::Session;

/// Published on every session state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// `connect` completed.
    Connected(Session),
    /// The wallet switched accounts; roles were re-derived.
    AccountChanged(Session),
    /// The session was torn down (empty account list or explicit disconnect).
    Disconnected,
    /// The wallet moved networks. Handles were dropped; call `connect` again.
    ReloadRequired { chain: ChainId },
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connected(_) => "connected",
            Self::AccountChanged(_) => "account_changed",
            Self::Disconnected => "disconnected",
            Self::ReloadRequired { .. } => "reload_required",
        }
    }
}
